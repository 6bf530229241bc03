use quickremind_core::{AlarmPayload, ReminderId};
use serde::{Deserialize, Serialize};

/// Component that receives reminder alarms.
pub const REMINDER_RECEIVER: &str = "alarm_receiver";

/// Identity of a pending alarm: registering the same key again replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlarmKey {
    pub component: String,
    pub request_code: i64,
}

impl AlarmKey {
    pub fn new(component: impl Into<String>, request_code: i64) -> Self {
        Self {
            component: component.into(),
            request_code,
        }
    }

    /// Key used for a reminder's wake-up.
    pub fn for_reminder(id: ReminderId) -> Self {
        Self::new(REMINDER_RECEIVER, id.get())
    }
}

impl std::fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.component, self.request_code)
    }
}

/// A pending one-shot alarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    pub key: AlarmKey,
    /// Epoch milliseconds at which the alarm fires.
    pub trigger_at: i64,
    /// Snapshot delivered to the receiver when the alarm fires.
    pub payload: AlarmPayload,
    /// RFC3339 registration timestamp.
    pub created_at: String,
}

/// Result of [`schedule`](crate::schedule::schedule). Never an error: every
/// failure degrades to a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The alarm is pending.
    Scheduled,
    /// The exact-alarm grant is missing; nothing was registered.
    MissingExactAlarmGrant,
    /// The timer service refused the registration.
    RegistrationFailed,
}

impl ScheduleOutcome {
    pub fn is_scheduled(self) -> bool {
        matches!(self, ScheduleOutcome::Scheduled)
    }
}
