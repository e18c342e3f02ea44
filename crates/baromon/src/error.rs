use baromon_alert::AlertError;
use baromon_notify::error::NotifyError;
use baromon_source::SourceError;
use baromon_storage::StorageError;

/// Why a decision cycle did not complete.
///
/// Every variant aborts the cycle with a non-zero exit. Only
/// [`CycleError::NotificationDeliveryFailed`] happens after memory has
/// been committed; the send is recorded even though delivery failed.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// A reading was not found, or its value is missing or not numeric.
    #[error("invalid reading: {0}")]
    InvalidReading(String),

    /// A reading source could not be reached or answered with an error.
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// Notification memory could not be opened, read, locked or written.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] StorageError),

    /// A SEND decision could not be delivered by any channel.
    #[error("notification delivery failed: {0}")]
    NotificationDeliveryFailed(#[from] NotifyError),

    /// The configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CycleError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CycleError::Config(_) => 1,
            CycleError::InvalidReading(_) | CycleError::DataSourceUnavailable(_) => 2,
            CycleError::PersistenceUnavailable(_) => 3,
            CycleError::NotificationDeliveryFailed(_) => 4,
        }
    }
}

impl From<AlertError> for CycleError {
    fn from(err: AlertError) -> Self {
        CycleError::InvalidReading(err.to_string())
    }
}

impl From<SourceError> for CycleError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(msg) => CycleError::DataSourceUnavailable(msg),
            SourceError::InvalidReading(msg) => CycleError::InvalidReading(msg),
            SourceError::InvalidConfig(msg) => CycleError::Config(msg),
        }
    }
}

impl From<anyhow::Error> for CycleError {
    fn from(err: anyhow::Error) -> Self {
        CycleError::Config(format!("{err:#}"))
    }
}
