use thiserror::Error;

/// Errors that can occur within any notifier backend.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification channel could not be declared.
    #[error("Channel setup failed: {0}")]
    ChannelSetup(String),

    /// The host refused to display the notification.
    #[error("Show failed: {0}")]
    ShowFailed(String),

    /// The blocking display task panicked or was cancelled.
    #[error("Notifier task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
