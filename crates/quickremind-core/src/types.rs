use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned reminder identifier (SQLite `INTEGER PRIMARY KEY`).
///
/// Stable for the lifetime of the row and reused as the alarm request code,
/// so re-scheduling the same reminder replaces its pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub i64);

impl ReminderId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ReminderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A persisted reminder row.
///
/// Rows are never updated in place: the only transitions are insert and
/// hard delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    /// Free text, empty when the user left it blank.
    #[serde(default)]
    pub notes: String,
    /// Absolute fire instant in epoch milliseconds. May lie in the past.
    pub reminder_time: i64,
}

impl Reminder {
    /// `reminder_time` as a UTC instant, `None` if out of chrono's range.
    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.reminder_time).single()
    }
}

/// Input for `insert`: everything except the id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub reminder_time: i64,
}

impl NewReminder {
    pub fn new(title: impl Into<String>, reminder_time: i64) -> Self {
        Self {
            title: title.into(),
            notes: String::new(),
            reminder_time,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Attach the id assigned by the store.
    pub fn into_reminder(self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            title: self.title,
            notes: self.notes,
            reminder_time: self.reminder_time,
        }
    }
}

/// Which screen the presentation layer should open with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartScreen {
    /// First launch: the walkthrough has not been completed yet.
    Onboarding,
    ReminderList,
}

impl StartScreen {
    pub fn for_onboarding(complete: bool) -> Self {
        if complete {
            StartScreen::ReminderList
        } else {
            StartScreen::Onboarding
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reminder_defaults_to_empty_notes() {
        let new = NewReminder::new("Pay bills", 1_000);
        assert!(new.notes.is_empty());
        let reminder = new.into_reminder(ReminderId(7));
        assert_eq!(reminder.id, ReminderId(7));
        assert_eq!(reminder.title, "Pay bills");
    }

    #[test]
    fn fire_at_converts_epoch_millis() {
        let reminder = NewReminder::new("x", 1_700_000_000_000).into_reminder(ReminderId(1));
        let at = reminder.fire_at().expect("in range");
        assert_eq!(at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn start_screen_follows_onboarding_flag() {
        assert_eq!(StartScreen::for_onboarding(false), StartScreen::Onboarding);
        assert_eq!(StartScreen::for_onboarding(true), StartScreen::ReminderList);
    }

    #[test]
    fn reminder_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&ReminderId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
