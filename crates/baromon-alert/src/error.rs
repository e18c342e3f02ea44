/// Errors raised while evaluating a decision cycle.
///
/// # Examples
///
/// ```rust
/// use baromon_alert::error::{AlertError, ReadingRole};
///
/// let err = AlertError::InvalidReading {
///     which: ReadingRole::Current,
///     reason: "value is NaN".to_string(),
/// };
/// assert!(err.to_string().contains("current"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// A reading carried a missing or non-numeric pressure value.
    #[error("Alert: invalid {which} reading: {reason}")]
    InvalidReading { which: ReadingRole, reason: String },
}

/// Which side of the comparison a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingRole {
    Historical,
    Current,
}

impl std::fmt::Display for ReadingRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingRole::Historical => write!(f, "historical"),
            ReadingRole::Current => write!(f, "current"),
        }
    }
}

/// Convenience `Result` alias for alert evaluation.
pub type Result<T> = std::result::Result<T, AlertError>;
