use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000; // alarm engine tick
pub const DEFAULT_FEED_GRACE_MS: u64 = 5_000; // keep the feed alive across brief hides
pub const WAKE_CHANNEL_CAPACITY: usize = 256;

/// Top-level config (quickremind.toml + QUICKREMIND_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickRemindConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alarms: AlarmConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// How often the engine looks for due alarms.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Withdraw the pending alarm when its reminder is deleted.
    /// Off by default: a deleted reminder still fires with its stale payload.
    #[serde(default)]
    pub cancel_on_delete: bool,
    /// Whether the host allows exact wake-from-idle alarms.
    #[serde(default = "bool_true")]
    pub exact_alarms_granted: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            cancel_on_delete: false,
            exact_alarms_granted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NotifierBackend {
    /// Native desktop notifications.
    #[default]
    Desktop,
    /// Write notifications to the log only (headless hosts).
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub backend: NotifierBackend,
    #[serde(default = "bool_true")]
    pub permission_granted: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            backend: NotifierBackend::default(),
            permission_granted: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Delay between the last unsubscribe and tearing the feed down.
    #[serde(default = "default_feed_grace_ms")]
    pub grace_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_FEED_GRACE_MS,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_feed_grace_ms() -> u64 {
    DEFAULT_FEED_GRACE_MS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quickremind/quickremind.db", home)
}

impl QuickRemindConfig {
    /// Load config from a TOML file with QUICKREMIND_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `QUICKREMIND_ALARMS__CANCEL_ON_DELETE=true`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(%path, "loading config");

        let config: QuickRemindConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("QUICKREMIND_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quickremind/quickremind.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_stale_alarms() {
        let config = QuickRemindConfig::default();
        assert!(!config.alarms.cancel_on_delete);
        assert!(config.alarms.exact_alarms_granted);
        assert_eq!(config.feed.grace_ms, 5_000);
        assert_eq!(config.notifications.backend, NotifierBackend::Desktop);
    }

    #[test]
    fn load_reads_toml_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quickremind.toml");
        std::fs::write(
            &path,
            r#"
[database]
path = "/tmp/qr-test.db"

[alarms]
cancel_on_delete = true
poll_interval_ms = 250

[notifications]
backend = "log"
"#,
        )
        .expect("write config");

        let config = QuickRemindConfig::load(path.to_str()).expect("load");
        assert_eq!(config.database.path, "/tmp/qr-test.db");
        assert!(config.alarms.cancel_on_delete);
        assert_eq!(config.alarms.poll_interval_ms, 250);
        assert_eq!(config.notifications.backend, NotifierBackend::Log);
        assert!(config.notifications.permission_granted);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        let config = QuickRemindConfig::load(path.to_str()).expect("load");
        assert_eq!(config.alarms.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }
}
