use rusqlite::Connection;

use crate::error::Result;

/// Initialise the schedule schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout. Nested
/// lists (days, media, players, announcements) are stored as JSON columns so
/// one row fully describes a schedule; no join table is needed.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedules (
            schedule_id   TEXT    NOT NULL PRIMARY KEY,
            name          TEXT    NOT NULL,
            enabled       INTEGER NOT NULL DEFAULT 1,
            start_time    TEXT    NOT NULL,   -- HH:MM
            end_time      TEXT    NOT NULL,   -- HH:MM
            days_of_week  TEXT    NOT NULL,   -- JSON array, 0=Mon … 6=Sun
            media_items   TEXT    NOT NULL,   -- JSON array of URIs
            players       TEXT    NOT NULL,   -- JSON array of {player_id, volume}
            group_players INTEGER NOT NULL DEFAULT 0,
            loop_content  INTEGER NOT NULL DEFAULT 1,
            shuffle       INTEGER NOT NULL DEFAULT 0,
            announcements TEXT    NOT NULL DEFAULT '[]',  -- JSON array
            created_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL
        ) STRICT;

        -- The loop reads enabled schedules every tick.
        CREATE INDEX IF NOT EXISTS idx_schedules_enabled ON schedules (enabled);
        ",
    )?;
    Ok(())
}
