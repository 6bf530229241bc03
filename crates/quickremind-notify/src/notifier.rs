use async_trait::async_trait;

use crate::{
    error::Result,
    types::{Notification, NotificationChannel},
};

/// Common interface implemented by every notification backend (desktop,
/// log, in-memory).
///
/// Implementations must be `Send + Sync` so a single backend can be shared
/// by the alarm and push receivers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable lowercase identifier for this backend (e.g. `"desktop"`).
    fn name(&self) -> &str;

    /// Declare `channel` with the host. Must be idempotent.
    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()>;

    /// Display a single notification.
    async fn show(&self, notification: &Notification) -> Result<()>;
}
