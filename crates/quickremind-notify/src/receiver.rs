use std::sync::Arc;

use quickremind_core::{AlarmPayload, PlatformGrants, PushMessage};
use tracing::{debug, info, instrument};

use crate::{
    error::Result,
    notifier::Notifier,
    types::{Notification, NotificationChannel},
};

/// Turns a fired reminder alarm into a notification.
#[derive(Clone)]
pub struct AlarmReceiver {
    notifier: Arc<dyn Notifier>,
    grants: Arc<dyn PlatformGrants>,
    channel: NotificationChannel,
}

impl AlarmReceiver {
    pub fn new(notifier: Arc<dyn Notifier>, grants: Arc<dyn PlatformGrants>) -> Self {
        Self {
            notifier,
            grants,
            channel: NotificationChannel::reminders(),
        }
    }

    /// Show the reminder carried by `payload`. Missing fields fall back to
    /// default text. Returns `false` when the notification grant is absent
    /// and nothing was shown.
    #[instrument(skip_all, fields(reminder_id = %payload.reminder_id))]
    pub async fn on_alarm(&self, payload: &AlarmPayload) -> Result<bool> {
        self.notifier.ensure_channel(&self.channel).await?;

        if !self.grants.can_post_notifications() {
            debug!("notification grant missing, reminder not shown");
            return Ok(false);
        }

        // Ids outside the i32 range fall back to 0.
        let id = i32::try_from(payload.reminder_id.get()).unwrap_or(0);
        let notification = Notification::new(
            id,
            &self.channel,
            payload.title_or_default(),
            payload.notes_or_default(),
        );
        self.notifier.show(&notification).await?;
        info!(backend = self.notifier.name(), "reminder notification shown");
        Ok(true)
    }
}

/// Turns inbound push messages into notifications, independent of the
/// reminder store.
#[derive(Clone)]
pub struct PushReceiver {
    notifier: Arc<dyn Notifier>,
    grants: Arc<dyn PlatformGrants>,
    channel: NotificationChannel,
}

impl PushReceiver {
    pub fn new(notifier: Arc<dyn Notifier>, grants: Arc<dyn PlatformGrants>) -> Self {
        Self {
            notifier,
            grants,
            channel: NotificationChannel::push(),
        }
    }

    /// Show one notification for `message`. The id is the current time in
    /// milliseconds truncated to `i32`, so pushes never replace each other.
    pub async fn on_message(&self, message: &PushMessage) -> Result<bool> {
        self.notifier.ensure_channel(&self.channel).await?;

        if !self.grants.can_post_notifications() {
            debug!("notification grant missing, push not shown");
            return Ok(false);
        }

        let id = chrono::Utc::now().timestamp_millis() as i32;
        let notification = Notification::new(
            id,
            &self.channel,
            message.title_or_default(),
            message.body_or_default(),
        );
        self.notifier.show(&notification).await?;
        info!(id, backend = self.notifier.name(), "push notification shown");
        Ok(true)
    }

    /// The push transport issued a new device token.
    pub fn on_new_token(&self, token: &str) {
        info!(%token, "push token refreshed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryNotifier;
    use crate::types::{Importance, PUSH_CHANNEL_ID, REMINDER_CHANNEL_ID};
    use quickremind_core::{GrantState, NewReminder, ReminderId};

    fn setup(grants: GrantState) -> (Arc<MemoryNotifier>, AlarmReceiver, PushReceiver) {
        let notifier = Arc::new(MemoryNotifier::new());
        let grants: Arc<dyn PlatformGrants> = Arc::new(grants);
        let alarms = AlarmReceiver::new(notifier.clone(), Arc::clone(&grants));
        let push = PushReceiver::new(notifier.clone(), grants);
        (notifier, alarms, push)
    }

    #[tokio::test]
    async fn alarm_shows_reminder_on_reminder_channel() {
        let (notifier, alarms, _) = setup(GrantState::granted());
        let reminder = NewReminder::new("Pay bills", 0)
            .with_notes("rent")
            .into_reminder(ReminderId(42));

        assert!(alarms.on_alarm(&AlarmPayload::for_reminder(&reminder)).await.unwrap());

        let shown = notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, 42);
        assert_eq!(shown[0].channel_id, REMINDER_CHANNEL_ID);
        assert_eq!(shown[0].title, "Pay bills");
        assert_eq!(shown[0].body, "rent");
        assert_eq!(shown[0].importance, Importance::High);
        assert!(shown[0].auto_cancel);

        let channel = &notifier.channels()[0];
        assert_eq!(channel.name, "Reminder Notifications");
        assert_eq!(channel.description.as_deref(), Some("Channel for reminder notifications"));
    }

    #[tokio::test]
    async fn bare_alarm_uses_default_text() {
        let (notifier, alarms, _) = setup(GrantState::granted());
        alarms.on_alarm(&AlarmPayload::bare(ReminderId(0))).await.unwrap();
        let shown = notifier.shown();
        assert_eq!(shown[0].id, 0);
        assert_eq!(shown[0].title, "Reminder");
        assert_eq!(shown[0].body, "You have a task to do.");
    }

    #[tokio::test]
    async fn out_of_range_reminder_id_maps_to_zero() {
        let (notifier, alarms, _) = setup(GrantState::granted());
        alarms
            .on_alarm(&AlarmPayload::bare(ReminderId(i64::from(i32::MAX) + 1)))
            .await
            .unwrap();
        alarms
            .on_alarm(&AlarmPayload::bare(ReminderId(i64::from(i32::MAX))))
            .await
            .unwrap();
        let ids: Vec<_> = notifier.shown().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, i32::MAX]);
    }

    #[tokio::test]
    async fn missing_notification_grant_drops_display() {
        let (notifier, alarms, push) = setup(GrantState::new(true, false));
        assert!(!alarms.on_alarm(&AlarmPayload::bare(ReminderId(1))).await.unwrap());
        assert!(!push.on_message(&PushMessage::default()).await.unwrap());
        assert!(notifier.shown().is_empty());
    }

    #[tokio::test]
    async fn push_shows_on_push_channel_with_defaults() {
        let (notifier, _, push) = setup(GrantState::granted());
        push.on_message(&PushMessage::default()).await.unwrap();
        push.on_message(&PushMessage::new("Hi", "there")).await.unwrap();

        let shown = notifier.shown();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].channel_id, PUSH_CHANNEL_ID);
        assert_eq!(shown[0].title, "New Notification");
        assert_eq!(shown[0].body, "You have a new message.");
        assert_eq!(shown[1].title, "Hi");
        assert_eq!(notifier.channels()[0].name, "Push Notifications");
    }
}
