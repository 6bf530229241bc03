use rusqlite::Connection;

use crate::error::Result;

/// Initialise the store schema in `conn`.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reminders (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT    NOT NULL,
            notes         TEXT    NOT NULL DEFAULT '',
            reminder_time INTEGER NOT NULL     -- epoch milliseconds
        );
        -- The observed list is always read ORDER BY reminder_time
        CREATE INDEX IF NOT EXISTS idx_reminders_time
            ON reminders(reminder_time, id);

        CREATE TABLE IF NOT EXISTS preferences (
            key         TEXT NOT NULL PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}
