use serde::{Deserialize, Serialize};

/// Identifier of the channel reminder alarms are shown on.
pub const REMINDER_CHANNEL_ID: &str = "reminder_channel";
/// Identifier of the channel push messages are shown on.
pub const PUSH_CHANNEL_ID: &str = "push_channel";

/// How intrusively the host should present a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    #[default]
    Default,
    /// Sound and heads-up display.
    High,
}

/// A pre-declared notification channel. Declaring it again is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub importance: Importance,
}

impl NotificationChannel {
    pub fn reminders() -> Self {
        Self {
            id: REMINDER_CHANNEL_ID.to_string(),
            name: "Reminder Notifications".to_string(),
            description: Some("Channel for reminder notifications".to_string()),
            importance: Importance::High,
        }
    }

    pub fn push() -> Self {
        Self {
            id: PUSH_CHANNEL_ID.to_string(),
            name: "Push Notifications".to_string(),
            description: None,
            importance: Importance::High,
        }
    }
}

/// A notification ready to be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Showing another notification with the same id replaces this one.
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub importance: Importance,
    /// Dismiss on tap.
    pub auto_cancel: bool,
}

impl Notification {
    pub fn new(
        id: i32,
        channel: &NotificationChannel,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            channel_id: channel.id.clone(),
            title: title.into(),
            body: body.into(),
            importance: Importance::High,
            auto_cancel: true,
        }
    }
}
