/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use baromon_storage::error::StorageError;
///
/// let err = StorageError::Lock("database is locked".to_string());
/// assert!(err.to_string().contains("lock"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The exclusive write lock could not be acquired before the busy timeout.
    #[error("Storage: could not acquire memory lock: {0}")]
    Lock(String),

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Filesystem error (data directory, legacy memory file).
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write would move `last_sent_at` backwards.
    #[error("Storage: refusing to move last_sent_at for '{alert_key}' from {stored} back to {attempted}")]
    NonMonotonic {
        alert_key: String,
        stored: chrono::DateTime<chrono::Utc>,
        attempted: chrono::DateTime<chrono::Utc>,
    },

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StorageError::Lock(err.to_string())
            }
            other => StorageError::Sqlite(other),
        }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
