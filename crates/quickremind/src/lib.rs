//! `quickremind`: wires the reminder store, alarm scheduler and
//! notification receivers into one service.

pub mod app;
pub mod error;

pub use app::{build_notifier, spawn_background, Background, ReminderService};
pub use error::{AppError, Result};
