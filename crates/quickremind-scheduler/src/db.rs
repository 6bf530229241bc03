use rusqlite::Connection;

use crate::error::Result;

/// Initialise the alarm schema in `conn`.
///
/// Creates the `alarms` table (idempotent) and an index on `trigger_at` so
/// the polling query stays cheap with many pending alarms.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS alarms (
            component     TEXT    NOT NULL,   -- receiving component
            request_code  INTEGER NOT NULL,   -- reminder id
            trigger_at    INTEGER NOT NULL,   -- epoch milliseconds
            payload       TEXT    NOT NULL,   -- JSON-encoded AlarmPayload
            created_at    TEXT    NOT NULL,
            PRIMARY KEY (component, request_code)
        ) STRICT;

        -- Efficient polling: SELECT … WHERE trigger_at <= ?  ORDER BY trigger_at
        CREATE INDEX IF NOT EXISTS idx_alarms_trigger_at ON alarms (trigger_at);
        ",
    )?;
    Ok(())
}
