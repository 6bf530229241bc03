use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use quickremind_core::{AlarmPayload, ReminderId, WakeEvent};
use rusqlite::{Connection, TransactionBehavior};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::{
    db::init_db,
    error::{Result, SchedulerError},
    schedule::AlarmRegistry,
    types::{Alarm, AlarmKey},
};

/// Shared handle for alarm management (register/cancel/list) while the engine
/// loop runs. Cloning is cheap; every clone talks to the same connection.
#[derive(Clone)]
pub struct AlarmHandle {
    conn: Arc<Mutex<Connection>>,
}

impl AlarmHandle {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SchedulerError::LockPoisoned)
    }

    /// Register a one-shot alarm. A pending alarm with the same key is replaced.
    pub fn register(&self, key: &AlarmKey, trigger_at: i64, payload: &AlarmPayload) -> Result<Alarm> {
        let payload_json = serde_json::to_string(payload)?;
        let now_str = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO alarms (component, request_code, trigger_at, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(component, request_code) DO UPDATE SET
                 trigger_at = excluded.trigger_at,
                 payload    = excluded.payload,
                 created_at = excluded.created_at",
            rusqlite::params![key.component, key.request_code, trigger_at, payload_json, now_str],
        )?;
        info!(alarm = %key, trigger_at, "alarm registered");
        Ok(Alarm {
            key: key.clone(),
            trigger_at,
            payload: payload.clone(),
            created_at: now_str,
        })
    }

    /// Withdraw a pending alarm. Returns `false` when nothing was pending.
    pub fn cancel(&self, key: &AlarmKey) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM alarms WHERE component = ?1 AND request_code = ?2",
            rusqlite::params![key.component, key.request_code],
        )?;
        if n > 0 {
            info!(alarm = %key, "alarm cancelled");
        }
        Ok(n > 0)
    }

    /// All pending alarms, soonest first.
    pub fn list_pending(&self) -> Result<Vec<Alarm>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT component, request_code, trigger_at, payload, created_at
             FROM alarms ORDER BY trigger_at, request_code",
        )?;
        let alarms = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?, // component
                    row.get::<_, i64>(1)?,    // request_code
                    row.get::<_, i64>(2)?,    // trigger_at
                    row.get::<_, String>(3)?, // payload JSON
                    row.get::<_, String>(4)?, // created_at
                ))
            })?
            .filter_map(|r| match r {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!("unreadable alarm row skipped: {e}");
                    None
                }
            })
            .map(|(component, request_code, trigger_at, payload_json, created_at)| Alarm {
                payload: decode_payload(request_code, &payload_json),
                key: AlarmKey::new(component, request_code),
                trigger_at,
                created_at,
            })
            .collect();
        Ok(alarms)
    }
}

impl AlarmRegistry for AlarmHandle {
    fn set_exact(&self, key: &AlarmKey, trigger_at: i64, payload: &AlarmPayload) -> Result<()> {
        self.register(key, trigger_at, payload).map(|_| ())
    }

    fn cancel(&self, key: &AlarmKey) -> Result<bool> {
        AlarmHandle::cancel(self, key)
    }
}

/// Drives pending alarms: every poll interval, due rows are removed and
/// delivered as [`WakeEvent::Alarm`]. Alarms are one-shot and survive
/// restarts; anything already overdue at startup fires on the first tick.
pub struct AlarmEngine {
    handle: AlarmHandle,
    /// If set, fired alarms are sent here for the notification receivers.
    fired_tx: Option<mpsc::Sender<WakeEvent>>,
}

impl AlarmEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// The sender is non-blocking (`try_send`) so the tick loop is never stalled.
    pub fn new(conn: Connection, fired_tx: Option<mpsc::Sender<WakeEvent>>) -> Result<Self> {
        Ok(Self::with_handle(AlarmHandle::new(conn)?, fired_tx))
    }

    /// Build an engine over an existing handle's connection.
    pub fn with_handle(handle: AlarmHandle, fired_tx: Option<mpsc::Sender<WakeEvent>>) -> Self {
        Self { handle, fired_tx }
    }

    /// Handle sharing this engine's connection.
    pub fn handle(&self) -> AlarmHandle {
        self.handle.clone()
    }

    /// Main event loop. Polls every `poll_interval` until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>, poll_interval: Duration) {
        info!(poll_ms = poll_interval.as_millis() as u64, "alarm engine started");

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now().timestamp_millis()) {
                        error!("alarm tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("alarm engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Fire every alarm whose trigger instant is at or before `now_ms`.
    /// Returns how many fired.
    ///
    /// A row is removed only once a slot on the wake channel is reserved for
    /// it; anything that does not fit stays pending for the next tick.
    /// Selection and removal share one immediate transaction so a row
    /// committed concurrently by another connection is never removed unseen.
    pub fn tick(&self, now_ms: i64) -> Result<usize> {
        let mut conn = self.handle.lock()?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let due: Vec<(String, i64, String)> = {
            let mut stmt = txn.prepare_cached(
                "SELECT component, request_code, payload FROM alarms
                 WHERE trigger_at <= ?1
                 ORDER BY trigger_at, request_code",
            )?;
            let rows = stmt
                .query_map([now_ms], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .filter_map(|r| match r {
                    Ok(row) => Some(row),
                    Err(e) => {
                        warn!("unreadable alarm row left pending: {e}");
                        None
                    }
                })
                .collect();
            rows
        };

        let mut ready = Vec::with_capacity(due.len());
        for (component, request_code, payload_json) in due {
            let permit = match self.fired_tx {
                Some(ref tx) => match tx.try_reserve() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(request_code, "wake channel full or closed, alarm left pending");
                        break;
                    }
                },
                None => None,
            };
            txn.execute(
                "DELETE FROM alarms WHERE component = ?1 AND request_code = ?2",
                rusqlite::params![component, request_code],
            )?;
            ready.push((permit, component, request_code, payload_json));
        }
        txn.commit()?;
        drop(conn);

        let fired = ready.len();
        for (permit, component, request_code, payload_json) in ready {
            info!(%component, request_code, "alarm fired");
            if let Some(permit) = permit {
                permit.send(WakeEvent::Alarm(decode_payload(request_code, &payload_json)));
            }
        }
        Ok(fired)
    }
}

/// Decode a stored payload, degrading to an identifier-only payload so the
/// receiver still shows its defaults.
fn decode_payload(request_code: i64, json: &str) -> AlarmPayload {
    match serde_json::from_str(json) {
        Ok(p) => p,
        Err(e) => {
            warn!(request_code, "unreadable alarm payload: {e}");
            AlarmPayload::bare(ReminderId(request_code))
        }
    }
}
