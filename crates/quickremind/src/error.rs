use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] quickremind_store::StoreError),

    #[error(transparent)]
    Scheduler(#[from] quickremind_scheduler::SchedulerError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
