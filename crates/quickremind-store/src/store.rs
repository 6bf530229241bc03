use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quickremind_core::{NewReminder, Reminder, ReminderId};
use rusqlite::Connection;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, instrument};

use crate::db::init_db;
use crate::error::{Result, StoreError};

/// Append/delete-only reminder table with a live, ordered view.
///
/// Wraps a single SQLite connection in a `Mutex`; every query runs on the
/// blocking pool so async callers never stall. After each committed write the
/// full ordered list is re-read and published while the connection is still
/// locked, so observers see snapshots in commit order.
///
/// Commits made through other connections to the same file are picked up by
/// [`refresh`](Self::refresh), which compares SQLite's `data_version`.
#[derive(Clone)]
pub struct ReminderStore {
    db: Arc<Mutex<Connection>>,
    snapshot_tx: Arc<watch::Sender<Vec<Reminder>>>,
    /// `PRAGMA data_version` as of the last published snapshot.
    seen_version: Arc<AtomicI64>,
}

impl ReminderStore {
    /// Wrap an already-open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        let version = data_version(&conn)?;
        let current = query_all(&conn)?;
        let (snapshot_tx, _) = watch::channel(current);
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            snapshot_tx: Arc::new(snapshot_tx),
            seen_version: Arc::new(AtomicI64::new(version)),
        })
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Append a reminder and return it with its store-assigned id.
    ///
    /// No validation: empty titles and past instants are accepted.
    #[instrument(skip(self, new), fields(title = %new.title, reminder_time = new.reminder_time))]
    pub async fn insert(&self, new: NewReminder) -> Result<Reminder> {
        let db = Arc::clone(&self.db);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);

        let reminder = tokio::task::spawn_blocking(move || -> Result<Reminder> {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            conn.execute(
                "INSERT INTO reminders (title, notes, reminder_time) VALUES (?1, ?2, ?3)",
                rusqlite::params![new.title, new.notes, new.reminder_time],
            )?;
            let id = ReminderId(conn.last_insert_rowid());
            publish(&conn, &snapshot_tx)?;
            Ok(new.into_reminder(id))
        })
        .await??;

        info!(reminder_id = %reminder.id, "reminder inserted");
        Ok(reminder)
    }

    /// Hard-delete the reminder with `id`.
    ///
    /// Returns `false` when no such row exists; that is not an error.
    #[instrument(skip(self), fields(reminder_id = %id))]
    pub async fn delete(&self, id: ReminderId) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);

        let removed = tokio::task::spawn_blocking(move || -> Result<bool> {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let n = conn.execute("DELETE FROM reminders WHERE id = ?1", [id.get()])?;
            if n > 0 {
                publish(&conn, &snapshot_tx)?;
            }
            Ok(n > 0)
        })
        .await??;

        if removed {
            info!("reminder deleted");
        } else {
            debug!("delete of absent reminder ignored");
        }
        Ok(removed)
    }

    /// All current reminders ordered by `reminder_time`, then `id`.
    pub async fn list_all(&self) -> Result<Vec<Reminder>> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<Vec<Reminder>> {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            query_all(&conn)
        })
        .await?
    }

    /// Live ordered view of the table.
    ///
    /// The first item is the current full list; afterwards one item per
    /// committed insert or delete. Intermediate states may be skipped by a slow
    /// observer but the latest state is always delivered.
    pub fn observe_all(&self) -> WatchStream<Vec<Reminder>> {
        WatchStream::new(self.snapshot_tx.subscribe())
    }

    /// Raw watch receiver over the same snapshots as [`observe_all`](Self::observe_all).
    pub fn watch(&self) -> watch::Receiver<Vec<Reminder>> {
        self.snapshot_tx.subscribe()
    }

    /// Republish the list if another connection committed since the last
    /// check. Returns whether a new snapshot was published.
    pub async fn refresh(&self) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let seen_version = Arc::clone(&self.seen_version);

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let version = data_version(&conn)?;
            if seen_version.swap(version, Ordering::Relaxed) == version {
                return Ok(false);
            }
            publish(&conn, &snapshot_tx)?;
            debug!(version, "external reminder changes published");
            Ok(true)
        })
        .await?
    }

    /// Poll [`refresh`](Self::refresh) every `interval` until `shutdown`
    /// broadcasts `true`.
    pub async fn follow_external_writes(self, mut shutdown: watch::Receiver<bool>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        error!("reminder refresh error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("external write follower stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Last published snapshot, without touching the database.
    pub fn snapshot(&self) -> Vec<Reminder> {
        self.snapshot_tx.borrow().clone()
    }
}

fn publish(conn: &Connection, tx: &watch::Sender<Vec<Reminder>>) -> Result<()> {
    let rows = query_all(conn)?;
    tx.send_replace(rows);
    Ok(())
}

/// Changes only when another connection commits to the database.
fn data_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}

fn query_all(conn: &Connection) -> Result<Vec<Reminder>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, title, notes, reminder_time
         FROM reminders
         ORDER BY reminder_time ASC, id ASC",
    )?;
    let rows = stmt
        .query_map([], row_to_reminder)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Map a SQLite row to a `Reminder`.
fn row_to_reminder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: ReminderId(row.get(0)?),
        title: row.get(1)?,
        notes: row.get(2)?,
        reminder_time: row.get(3)?,
    })
}
