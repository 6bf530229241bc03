use quickremind_core::{AlarmPayload, PlatformGrants, Reminder};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::types::{AlarmKey, ScheduleOutcome};

/// Host timer service able to wake the process at an exact instant, even
/// from idle.
pub trait AlarmRegistry: Send + Sync {
    /// Register (or replace) the alarm for `key`.
    fn set_exact(&self, key: &AlarmKey, trigger_at: i64, payload: &AlarmPayload) -> Result<()>;
    /// Withdraw the alarm for `key`, if any.
    fn cancel(&self, key: &AlarmKey) -> Result<bool>;
}

/// Arrange for `reminder` to wake the notification receiver at its
/// `reminder_time`.
///
/// Never fails: a missing exact-alarm grant or a refused registration is
/// logged and reported through the outcome, and the reminder simply does
/// not fire. Scheduling an id again replaces the earlier alarm.
#[instrument(skip_all, fields(reminder_id = %reminder.id, trigger_at = reminder.reminder_time))]
pub fn schedule(
    registry: &dyn AlarmRegistry,
    grants: &dyn PlatformGrants,
    reminder: &Reminder,
) -> ScheduleOutcome {
    if !grants.can_schedule_exact_alarms() {
        warn!("exact alarm grant missing, reminder will not fire");
        return ScheduleOutcome::MissingExactAlarmGrant;
    }

    let key = AlarmKey::for_reminder(reminder.id);
    let payload = AlarmPayload::for_reminder(reminder);
    match registry.set_exact(&key, reminder.reminder_time, &payload) {
        Ok(()) => {
            info!("reminder alarm scheduled");
            ScheduleOutcome::Scheduled
        }
        Err(e) => {
            warn!("alarm registration refused: {e}");
            ScheduleOutcome::RegistrationFailed
        }
    }
}

/// Withdraw the pending alarm for `reminder`. Failures are logged only.
pub fn unschedule(registry: &dyn AlarmRegistry, reminder: quickremind_core::ReminderId) -> bool {
    match registry.cancel(&AlarmKey::for_reminder(reminder)) {
        Ok(cancelled) => cancelled,
        Err(e) => {
            warn!(reminder_id = %reminder, "alarm cancel failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AlarmHandle;
    use crate::error::SchedulerError;
    use quickremind_core::{GrantState, NewReminder, ReminderId};

    struct RefusingRegistry;

    impl AlarmRegistry for RefusingRegistry {
        fn set_exact(&self, _: &AlarmKey, _: i64, _: &AlarmPayload) -> Result<()> {
            Err(SchedulerError::LockPoisoned)
        }
        fn cancel(&self, _: &AlarmKey) -> Result<bool> {
            Err(SchedulerError::LockPoisoned)
        }
    }

    fn reminder(id: i64, at: i64) -> Reminder {
        NewReminder::new("Pay bills", at)
            .with_notes("rent")
            .into_reminder(ReminderId(id))
    }

    #[test]
    fn scheduled_alarm_carries_reminder_snapshot() {
        let handle = AlarmHandle::open_in_memory().unwrap();
        let outcome = schedule(&handle, &GrantState::granted(), &reminder(5, 1_234));
        assert_eq!(outcome, ScheduleOutcome::Scheduled);

        let pending = handle.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, AlarmKey::for_reminder(ReminderId(5)));
        assert_eq!(pending[0].trigger_at, 1_234);
        assert_eq!(pending[0].payload.notes.as_deref(), Some("rent"));
    }

    #[test]
    fn missing_grant_registers_nothing() {
        let handle = AlarmHandle::open_in_memory().unwrap();
        let grants = GrantState::new(false, true);
        let outcome = schedule(&handle, &grants, &reminder(1, 10));
        assert_eq!(outcome, ScheduleOutcome::MissingExactAlarmGrant);
        assert!(handle.list_pending().unwrap().is_empty());
    }

    #[test]
    fn rescheduling_replaces_previous_alarm() {
        let handle = AlarmHandle::open_in_memory().unwrap();
        let grants = GrantState::granted();
        schedule(&handle, &grants, &reminder(2, 100));
        schedule(&handle, &grants, &reminder(2, 900));
        let pending = handle.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].trigger_at, 900);
    }

    #[test]
    fn refused_registration_is_not_an_error() {
        let outcome = schedule(&RefusingRegistry, &GrantState::granted(), &reminder(3, 0));
        assert_eq!(outcome, ScheduleOutcome::RegistrationFailed);
        assert!(!unschedule(&RefusingRegistry, ReminderId(3)));
    }

    #[test]
    fn unschedule_removes_pending_alarm() {
        let handle = AlarmHandle::open_in_memory().unwrap();
        schedule(&handle, &GrantState::granted(), &reminder(8, 50));
        assert!(unschedule(&handle, ReminderId(8)));
        assert!(handle.list_pending().unwrap().is_empty());
    }
}
