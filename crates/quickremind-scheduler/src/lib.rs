//! `quickremind-scheduler`: one-shot reminder alarms with SQLite persistence.
//!
//! # Overview
//!
//! Alarms are persisted to a SQLite `alarms` table keyed by
//! `(component, request_code)`. [`schedule::schedule`] registers a reminder's
//! alarm after checking the exact-alarm grant; the [`engine::AlarmEngine`]
//! polls the table and hands every due alarm to the notification side as a
//! [`quickremind_core::WakeEvent::Alarm`].
//!
//! A pending alarm is independent of its reminder row: deleting the reminder
//! does not withdraw the alarm unless the caller cancels it explicitly.

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use engine::{AlarmEngine, AlarmHandle};
pub use error::{Result, SchedulerError};
pub use schedule::{schedule, unschedule, AlarmRegistry};
pub use types::{Alarm, AlarmKey, ScheduleOutcome, REMINDER_RECEIVER};
