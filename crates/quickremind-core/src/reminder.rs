//! Wake-up payloads shared between the alarm engine, the push boundary and
//! the notification receivers.

use serde::{Deserialize, Serialize};

use crate::types::{Reminder, ReminderId};

/// Shown when an alarm payload carries no title.
pub const DEFAULT_REMINDER_TITLE: &str = "Reminder";
/// Shown when an alarm payload carries no notes.
pub const DEFAULT_REMINDER_NOTES: &str = "You have a task to do.";
/// Shown when a push message carries no title.
pub const DEFAULT_PUSH_TITLE: &str = "New Notification";
/// Shown when a push message carries no body.
pub const DEFAULT_PUSH_BODY: &str = "You have a new message.";

/// Stored as a JSON string in the `alarms.payload` column.
///
/// A copy of the reminder taken at scheduling time, not a reference to the
/// store row: a deleted reminder still fires with this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub reminder_id: ReminderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AlarmPayload {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id,
            title: Some(reminder.title.clone()),
            notes: Some(reminder.notes.clone()),
        }
    }

    /// Payload with only the identifier, used when the stored JSON is unreadable.
    pub fn bare(reminder_id: ReminderId) -> Self {
        Self {
            reminder_id,
            title: None,
            notes: None,
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_REMINDER_TITLE)
    }

    pub fn notes_or_default(&self) -> &str {
        self.notes.as_deref().unwrap_or(DEFAULT_REMINDER_NOTES)
    }
}

/// Title/body pair delivered by an external messaging transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_PUSH_TITLE)
    }

    pub fn body_or_default(&self) -> &str {
        self.body.as_deref().unwrap_or(DEFAULT_PUSH_BODY)
    }
}

/// Events that arrive from outside the request/response flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WakeEvent {
    /// A one-shot alarm reached its trigger instant.
    Alarm(AlarmPayload),
    /// An inbound push message.
    Push(PushMessage),
    /// The push transport issued a new device token.
    PushToken { token: String },
}
