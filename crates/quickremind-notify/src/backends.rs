use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    error::Result,
    notifier::Notifier,
    types::{Notification, NotificationChannel},
};

/// Channels declared so far, keyed by id. Re-declaring replaces the entry.
#[derive(Default)]
struct ChannelTable {
    channels: Mutex<HashMap<String, NotificationChannel>>,
}

impl ChannelTable {
    fn declare(&self, channel: &NotificationChannel) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.insert(channel.id.clone(), channel.clone()).is_none()
    }

    fn snapshot(&self) -> Vec<NotificationChannel> {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = channels.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }
}

/// Native desktop notifications through `notify-rust`.
///
/// On platforms without a notification daemon binding the notification is
/// written to the log instead.
#[derive(Default)]
pub struct DesktopNotifier {
    channels: ChannelTable,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        if self.channels.declare(channel) {
            debug!(channel = %channel.id, "desktop notification channel declared");
        }
        Ok(())
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        let notification = notification.clone();
        // D-Bus / NSUserNotification calls block.
        tokio::task::spawn_blocking(move || desktop::show(&notification)).await?
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
mod desktop {
    use crate::error::{NotifyError, Result};
    use crate::types::Notification;

    pub(super) fn show(n: &Notification) -> Result<()> {
        let mut native = notify_rust::Notification::new();
        native.appname("QuickRemind").summary(&n.title).body(&n.body);
        #[cfg(target_os = "linux")]
        {
            use crate::types::Importance;
            native.id(n.id as u32);
            if n.importance == Importance::High {
                native.urgency(notify_rust::Urgency::Critical);
            }
        }
        native
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::ShowFailed(e.to_string()))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod desktop {
    use crate::error::Result;
    use crate::types::Notification;

    pub(super) fn show(n: &Notification) -> Result<()> {
        tracing::info!(id = n.id, title = %n.title, body = %n.body, "notification (no desktop backend)");
        Ok(())
    }
}

/// Writes every notification to the log. For headless hosts.
#[derive(Default)]
pub struct LogNotifier {
    channels: ChannelTable,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        if self.channels.declare(channel) {
            info!(channel = %channel.id, name = %channel.name, "notification channel declared");
        }
        Ok(())
    }

    async fn show(&self, n: &Notification) -> Result<()> {
        info!(
            id = n.id,
            channel = %n.channel_id,
            title = %n.title,
            body = %n.body,
            "notification"
        );
        Ok(())
    }
}

/// Records declared channels and shown notifications in memory.
#[derive(Default)]
pub struct MemoryNotifier {
    channels: ChannelTable,
    shown: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification shown so far, oldest first.
    pub fn shown(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Declared channels sorted by id.
    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.channels.snapshot()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        self.channels.declare(channel);
        Ok(())
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn declaring_a_channel_twice_keeps_one() {
        let notifier = MemoryNotifier::new();
        notifier.ensure_channel(&NotificationChannel::reminders()).await.unwrap();
        notifier.ensure_channel(&NotificationChannel::reminders()).await.unwrap();
        notifier.ensure_channel(&NotificationChannel::push()).await.unwrap();

        let ids: Vec<_> = notifier.channels().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["push_channel", "reminder_channel"]);
    }

    #[tokio::test]
    async fn log_backend_accepts_everything() {
        let notifier = LogNotifier::new();
        let channel = NotificationChannel::reminders();
        notifier.ensure_channel(&channel).await.unwrap();
        notifier
            .show(&Notification::new(1, &channel, "t", "b"))
            .await
            .unwrap();
        assert_eq!(notifier.name(), "log");
    }
}
