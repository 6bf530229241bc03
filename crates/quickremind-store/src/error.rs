use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking worker running the query panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Another thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// A stored preference value could not be interpreted.
    #[error("invalid value for preference {key}: {value}")]
    InvalidPreference { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
