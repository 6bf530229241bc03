//! `quickremind-notify`: notification backends and the receivers that turn
//! wake events into notifications.

pub mod backends;
pub mod dispatch;
pub mod error;
pub mod notifier;
pub mod receiver;
pub mod types;

pub use backends::{DesktopNotifier, LogNotifier, MemoryNotifier};
pub use dispatch::WakeDispatcher;
pub use error::{NotifyError, Result};
pub use notifier::Notifier;
pub use receiver::{AlarmReceiver, PushReceiver};
pub use types::{Importance, Notification, NotificationChannel, PUSH_CHANNEL_ID, REMINDER_CHANNEL_ID};
