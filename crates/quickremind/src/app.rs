use std::sync::Arc;
use std::time::Duration;

use quickremind_core::config::{NotifierBackend, QuickRemindConfig, WAKE_CHANNEL_CAPACITY};
use quickremind_core::{GrantState, NewReminder, PlatformGrants, Reminder, ReminderId, WakeEvent};
use quickremind_notify::{
    AlarmReceiver, DesktopNotifier, LogNotifier, Notifier, PushReceiver, WakeDispatcher,
};
use quickremind_scheduler::{schedule, unschedule, AlarmEngine, AlarmHandle, ScheduleOutcome};
use quickremind_store::{ReminderFeed, ReminderStore};
use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::error::Result;

/// Central shared state: the reminder table, pending alarms, capability
/// grants and the presentation feed.
pub struct ReminderService {
    pub config: QuickRemindConfig,
    store: ReminderStore,
    alarms: AlarmHandle,
    grants: Arc<GrantState>,
    feed: ReminderFeed,
}

impl ReminderService {
    pub fn new(
        config: QuickRemindConfig,
        store: ReminderStore,
        alarms: AlarmHandle,
        grants: Arc<GrantState>,
    ) -> Self {
        let feed = ReminderFeed::new(store.clone(), Duration::from_millis(config.feed.grace_ms));
        Self {
            config,
            store,
            alarms,
            grants,
            feed,
        }
    }

    /// Open every subsystem on the configured database file. Each subsystem
    /// gets its own connection.
    pub fn open(config: QuickRemindConfig) -> Result<Self> {
        let db_path = config.database.path.clone();
        ensure_parent_dir(&db_path);
        info!(path = %db_path, "opening SQLite database");

        let store = ReminderStore::open(&db_path)?;
        let alarm_conn = Connection::open(&db_path)?;
        alarm_conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let alarms = AlarmHandle::new(alarm_conn)?;
        let grants = Arc::new(GrantState::new(
            config.alarms.exact_alarms_granted,
            config.notifications.permission_granted,
        ));
        Ok(Self::new(config, store, alarms, grants))
    }

    /// Save a reminder, then schedule its alarm under the assigned id.
    ///
    /// The insert is the only fallible part; scheduling problems are logged
    /// and reported through the outcome.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn add_reminder(&self, new: NewReminder) -> Result<(Reminder, ScheduleOutcome)> {
        let reminder = self.store.insert(new).await?;
        let outcome = schedule(&self.alarms, self.grants.as_ref(), &reminder);
        Ok((reminder, outcome))
    }

    /// Remove a reminder. Its pending alarm keeps firing unless
    /// `alarms.cancel_on_delete` is set.
    #[instrument(skip(self), fields(reminder_id = %id))]
    pub async fn delete_reminder(&self, id: ReminderId) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        if self.config.alarms.cancel_on_delete {
            unschedule(&self.alarms, id);
        }
        Ok(removed)
    }

    /// Completing a reminder deletes it.
    pub async fn complete_reminder(&self, id: ReminderId) -> Result<bool> {
        self.delete_reminder(id).await
    }

    pub async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        Ok(self.store.list_all().await?)
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    pub fn alarms(&self) -> &AlarmHandle {
        &self.alarms
    }

    pub fn grants(&self) -> Arc<GrantState> {
        Arc::clone(&self.grants)
    }

    pub fn feed(&self) -> &ReminderFeed {
        &self.feed
    }
}

/// Build the notification backend selected in config.
pub fn build_notifier(config: &QuickRemindConfig) -> Arc<dyn Notifier> {
    match config.notifications.backend {
        NotifierBackend::Desktop => Arc::new(DesktopNotifier::new()),
        NotifierBackend::Log => Arc::new(LogNotifier::new()),
    }
}

/// Background tasks started by [`spawn_background`].
pub struct Background {
    wake_tx: mpsc::Sender<WakeEvent>,
    shutdown_tx: watch::Sender<bool>,
    engine: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    follower: JoinHandle<()>,
}

impl Background {
    /// Inbound boundary for push messages and token refreshes.
    pub fn push_sender(&self) -> mpsc::Sender<WakeEvent> {
        self.wake_tx.clone()
    }

    /// Signal every loop to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.engine.await;
        let _ = self.dispatcher.await;
        let _ = self.follower.await;
    }
}

/// Spawn the alarm engine, the wake dispatcher and the follower that
/// republishes reminders committed by other processes.
///
/// Alarm engine → wake channel ← push boundary; the dispatcher drains the
/// channel into the notification receivers.
pub fn spawn_background(service: &ReminderService, notifier: Arc<dyn Notifier>) -> Background {
    let (wake_tx, wake_rx) = mpsc::channel::<WakeEvent>(WAKE_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let grants: Arc<dyn PlatformGrants> = service.grants();
    let dispatcher = WakeDispatcher::new(
        AlarmReceiver::new(Arc::clone(&notifier), Arc::clone(&grants)),
        PushReceiver::new(notifier, grants),
    );
    let engine = AlarmEngine::with_handle(service.alarms().clone(), Some(wake_tx.clone()));
    let poll = Duration::from_millis(service.config.alarms.poll_interval_ms.max(1));

    let engine = tokio::spawn(engine.run(shutdown_rx.clone(), poll));
    let follower = tokio::spawn(
        service
            .store()
            .clone()
            .follow_external_writes(shutdown_rx.clone(), poll),
    );
    let dispatcher = tokio::spawn(dispatcher.run(wake_rx, shutdown_rx));

    Background {
        wake_tx,
        shutdown_tx,
        engine,
        dispatcher,
        follower,
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
