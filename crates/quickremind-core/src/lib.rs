//! `quickremind-core`: types shared by every QuickRemind crate.

pub mod config;
pub mod error;
pub mod grants;
pub mod reminder;
pub mod types;

pub use error::{CoreError, Result};
pub use grants::{GrantState, PlatformGrants};
pub use reminder::{AlarmPayload, PushMessage, WakeEvent};
pub use types::{now_millis, NewReminder, Reminder, ReminderId, StartScreen};
