/// Errors raised while retrieving a pressure reading.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be reached or returned a non-success response.
    #[error("Source: data source unavailable: {0}")]
    Unavailable(String),

    /// The source answered, but the reading is missing a field or is not numeric.
    #[error("Source: invalid reading: {0}")]
    InvalidReading(String),

    /// The source settings cannot produce a valid request.
    #[error("Source: invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}

/// Convenience `Result` alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
