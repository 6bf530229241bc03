use std::collections::HashMap;
use std::sync::Mutex;

use quickremind_core::StartScreen;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::init_db;
use crate::error::{Result, StoreError};

const KEY_ONBOARDING_COMPLETE: &str = "onboarding_complete";

/// Small key-value area for app-level flags.
pub trait KeyValueStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// Preferences persisted in the `preferences` table.
pub struct SqlitePreferences {
    db: Mutex<Connection>,
}

impl SqlitePreferences {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqlitePreferences {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let db = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        let value = match db.query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(StoreError::Database(e)),
        };
        match value.as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(StoreError::InvalidPreference {
                key: key.to_string(),
                value,
            }),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        db.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            rusqlite::params![key, value.to_string(), now],
        )?;
        debug!(key, value, "preference stored");
        Ok(())
    }
}

/// In-process preferences; nothing survives a restart.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, bool>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// The "onboarding complete" flag, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnboardingState {
    complete: bool,
}

impl OnboardingState {
    /// Read the flag; an unset flag means first launch.
    pub fn load(prefs: &dyn KeyValueStore) -> Result<Self> {
        let complete = prefs.get_bool(KEY_ONBOARDING_COMPLETE)?.unwrap_or(false);
        debug!(complete, "onboarding flag loaded");
        Ok(Self { complete })
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn start_screen(&self) -> StartScreen {
        StartScreen::for_onboarding(self.complete)
    }

    /// Persist completion. There is no way back to "incomplete".
    pub fn mark_complete(&mut self, prefs: &dyn KeyValueStore) -> Result<()> {
        prefs.set_bool(KEY_ONBOARDING_COMPLETE, true)?;
        if !self.complete {
            info!("onboarding marked complete");
        }
        self.complete = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_launch_shows_onboarding() {
        let prefs = MemoryPreferences::new();
        let state = OnboardingState::load(&prefs).unwrap();
        assert!(!state.is_complete());
        assert_eq!(state.start_screen(), StartScreen::Onboarding);
    }

    #[test]
    fn completion_survives_reload() {
        let prefs = SqlitePreferences::new(Connection::open_in_memory().unwrap()).unwrap();
        let mut state = OnboardingState::load(&prefs).unwrap();
        state.mark_complete(&prefs).unwrap();
        state.mark_complete(&prefs).unwrap();

        let reloaded = OnboardingState::load(&prefs).unwrap();
        assert!(reloaded.is_complete());
        assert_eq!(reloaded.start_screen(), StartScreen::ReminderList);
    }

    #[test]
    fn garbage_value_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES ('flag', 'maybe', 'now')",
            [],
        )
        .unwrap();
        let prefs = SqlitePreferences::new(conn).unwrap();
        assert!(matches!(
            prefs.get_bool("flag"),
            Err(StoreError::InvalidPreference { .. })
        ));
    }
}
