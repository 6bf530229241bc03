//! `quickremind-store`: SQLite-backed reminder table, its live ordered view,
//! the presentation feed, and the preference area.

pub mod db;
pub mod error;
pub mod feed;
pub mod prefs;
pub mod store;

pub use error::{Result, StoreError};
pub use feed::{FeedSubscription, ReminderFeed};
pub use prefs::{KeyValueStore, MemoryPreferences, OnboardingState, SqlitePreferences};
pub use store::ReminderStore;
