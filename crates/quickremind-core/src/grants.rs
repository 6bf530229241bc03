use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime capability grants owned by the host platform.
///
/// Both checks are made at the moment of use: exact alarms when a reminder
/// is scheduled, notifications when an alarm or push is about to be shown.
pub trait PlatformGrants: Send + Sync {
    fn can_schedule_exact_alarms(&self) -> bool;
    fn can_post_notifications(&self) -> bool;
}

/// Grants held in memory, seeded from config and flippable at runtime.
#[derive(Debug)]
pub struct GrantState {
    exact_alarms: AtomicBool,
    notifications: AtomicBool,
}

impl GrantState {
    pub fn new(exact_alarms: bool, notifications: bool) -> Self {
        Self {
            exact_alarms: AtomicBool::new(exact_alarms),
            notifications: AtomicBool::new(notifications),
        }
    }

    /// Everything granted.
    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn set_exact_alarms(&self, granted: bool) {
        self.exact_alarms.store(granted, Ordering::Relaxed);
    }

    pub fn set_notifications(&self, granted: bool) {
        self.notifications.store(granted, Ordering::Relaxed);
    }
}

impl Default for GrantState {
    fn default() -> Self {
        Self::granted()
    }
}

impl PlatformGrants for GrantState {
    fn can_schedule_exact_alarms(&self) -> bool {
        self.exact_alarms.load(Ordering::Relaxed)
    }

    fn can_post_notifications(&self) -> bool {
        self.notifications.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_can_be_revoked() {
        let grants = GrantState::granted();
        assert!(grants.can_schedule_exact_alarms());
        grants.set_exact_alarms(false);
        grants.set_notifications(false);
        assert!(!grants.can_schedule_exact_alarms());
        assert!(!grants.can_post_notifications());
    }
}
