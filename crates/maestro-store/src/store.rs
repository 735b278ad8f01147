use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{types::Type, Connection};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{self, Schedule, SchedulePatch, ScheduleDraft};

/// Thread-safe CRUD store for schedule records.
///
/// Wraps a single SQLite connection in a `Mutex`. The scheduler loop and the
/// authoring surface each hold an `Arc<ScheduleStore>`; a Mutex is sufficient
/// for the single-node target.
pub struct ScheduleStore {
    db: Mutex<Connection>,
}

impl ScheduleStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Validate and persist a new schedule. Returns the stored record.
    pub fn create(&self, draft: ScheduleDraft) -> Result<Schedule> {
        let now = Utc::now().timestamp();
        let schedule = Schedule {
            schedule_id: Uuid::new_v4().to_string(),
            name: draft.name,
            enabled: draft.enabled,
            start_time: draft.start_time,
            end_time: draft.end_time,
            days_of_week: draft.days_of_week,
            media_items: draft.media_items,
            players: draft.players,
            group_players: draft.group_players,
            loop_content: draft.loop_content,
            shuffle: draft.shuffle,
            announcements: draft.announcements,
            created_at: now,
            updated_at: now,
        };
        types::validate(&schedule)?;
        self.save(&schedule)?;
        info!(schedule_id = %schedule.schedule_id, name = %schedule.name, "schedule created");
        Ok(schedule)
    }

    /// Retrieve a schedule by ID, returning `None` if it does not exist.
    pub fn get(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("SELECT {COLUMNS} FROM schedules WHERE schedule_id = ?1"),
            rusqlite::params![schedule_id],
            row_to_schedule,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Return all schedules ordered by creation time.
    ///
    /// The scheduler loop calls this once per tick as its consistent
    /// snapshot. Partial reads are not trusted: any row error fails the
    /// whole call so the loop skips the tick instead of acting on a
    /// truncated view.
    pub fn list_all(&self) -> Result<Vec<Schedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM schedules ORDER BY created_at, rowid"
        ))?;
        let rows = stmt.query_map([], row_to_schedule)?;
        let schedules = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// Apply a partial update to an existing schedule.
    pub fn update(&self, schedule_id: &str, patch: SchedulePatch) -> Result<Schedule> {
        let mut schedule = self.get(schedule_id)?.ok_or_else(|| StoreError::NotFound {
            id: schedule_id.to_string(),
        })?;

        if let Some(name) = patch.name {
            schedule.name = name;
        }
        if let Some(enabled) = patch.enabled {
            schedule.enabled = enabled;
        }
        if let Some(start_time) = patch.start_time {
            schedule.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            schedule.end_time = end_time;
        }
        if let Some(days) = patch.days_of_week {
            schedule.days_of_week = days;
        }
        if let Some(media) = patch.media_items {
            schedule.media_items = media;
        }
        if let Some(players) = patch.players {
            schedule.players = players;
        }
        if let Some(group) = patch.group_players {
            schedule.group_players = group;
        }
        if let Some(loop_content) = patch.loop_content {
            schedule.loop_content = loop_content;
        }
        if let Some(shuffle) = patch.shuffle {
            schedule.shuffle = shuffle;
        }
        if let Some(announcements) = patch.announcements {
            schedule.announcements = announcements;
        }
        schedule.updated_at = Utc::now().timestamp();

        types::validate(&schedule)?;
        self.save(&schedule)?;
        info!(schedule_id = %schedule.schedule_id, name = %schedule.name, "schedule updated");
        Ok(schedule)
    }

    /// Enable or disable a schedule.
    ///
    /// Disabling does not touch an in-flight run — the loop keeps serving
    /// its announcements and a manual stop remains available.
    pub fn set_enabled(&self, schedule_id: &str, enabled: bool) -> Result<Schedule> {
        self.update(
            schedule_id,
            SchedulePatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
    }

    /// Permanently delete a schedule record.
    pub fn delete(&self, schedule_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "DELETE FROM schedules WHERE schedule_id = ?1",
            rusqlite::params![schedule_id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                id: schedule_id.to_string(),
            });
        }
        info!(schedule_id = %schedule_id, "schedule deleted");
        Ok(())
    }

    /// Write a full row (insert-or-replace, matching the one-record layout).
    fn save(&self, schedule: &Schedule) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO schedules
             (schedule_id, name, enabled, start_time, end_time, days_of_week,
              media_items, players, group_players, loop_content, shuffle,
              announcements, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            rusqlite::params![
                schedule.schedule_id,
                schedule.name,
                schedule.enabled as i64,
                types::format_hhmm(&schedule.start_time),
                types::format_hhmm(&schedule.end_time),
                serde_json::to_string(&schedule.days_of_week)?,
                serde_json::to_string(&schedule.media_items)?,
                serde_json::to_string(&schedule.players)?,
                schedule.group_players as i64,
                schedule.loop_content as i64,
                schedule.shuffle as i64,
                serde_json::to_string(&schedule.announcements)?,
                schedule.created_at,
                schedule.updated_at,
            ],
        )?;
        Ok(())
    }
}

const COLUMNS: &str = "schedule_id, name, enabled, start_time, end_time, days_of_week, \
                       media_items, players, group_players, loop_content, shuffle, \
                       announcements, created_at, updated_at";

/// Map a SQLite row to a `Schedule`, surfacing JSON/time parse failures as
/// column conversion errors rather than panicking.
fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Schedule> {
    fn json_col<T: serde::de::DeserializeOwned>(
        row: &rusqlite::Row<'_>,
        idx: usize,
    ) -> rusqlite::Result<T> {
        let raw: String = row.get(idx)?;
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }
    fn time_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveTime> {
        let raw: String = row.get(idx)?;
        crate::types::parse_hhmm(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    Ok(Schedule {
        schedule_id: row.get(0)?,
        name: row.get(1)?,
        enabled: row.get::<_, i64>(2)? != 0,
        start_time: time_col(row, 3)?,
        end_time: time_col(row, 4)?,
        days_of_week: json_col(row, 5)?,
        media_items: json_col(row, 6)?,
        players: json_col(row, 7)?,
        group_players: row.get::<_, i64>(8)? != 0,
        loop_content: row.get::<_, i64>(9)? != 0,
        shuffle: row.get::<_, i64>(10)? != 0,
        announcements: json_col(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::types::{parse_hhmm, PlayerVolume, ScheduledAnnouncement};

    fn store() -> ScheduleStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        ScheduleStore::new(conn)
    }

    fn draft() -> ScheduleDraft {
        ScheduleDraft {
            name: "Evening ambience".into(),
            enabled: true,
            start_time: parse_hhmm("18:00").unwrap(),
            end_time: parse_hhmm("22:00").unwrap(),
            days_of_week: vec![4, 5],
            media_items: vec!["library://playlist/7".into()],
            players: vec![
                PlayerVolume {
                    player_id: "p1".into(),
                    volume: 35,
                },
                PlayerVolume {
                    player_id: "p2".into(),
                    volume: 40,
                },
            ],
            group_players: true,
            loop_content: true,
            shuffle: false,
            announcements: vec![ScheduledAnnouncement {
                announcement_id: "a1".into(),
                name: "Closing soon".into(),
                asset_uri: "file:///assets/closing.mp3".into(),
                time: parse_hhmm("21:45").unwrap(),
                repeat_interval: None,
            }],
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = store();
        let created = store.create(draft()).unwrap();
        let fetched = store.get(&created.schedule_id).unwrap().unwrap();
        assert_eq!(fetched.name, "Evening ambience");
        assert_eq!(fetched.start_time, parse_hhmm("18:00").unwrap());
        assert_eq!(fetched.players.len(), 2);
        assert_eq!(fetched.announcements[0].announcement_id, "a1");
        assert!(fetched.group_players);
    }

    #[test]
    fn get_unknown_is_none() {
        assert!(store().get("nope").unwrap().is_none());
    }

    #[test]
    fn list_all_orders_by_creation() {
        let store = store();
        let a = store.create(draft()).unwrap();
        let mut second = draft();
        second.name = "Second".into();
        let b = store.create(second).unwrap();
        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        let ids: Vec<&str> = all.iter().map(|s| s.schedule_id.as_str()).collect();
        assert!(ids.contains(&a.schedule_id.as_str()));
        assert!(ids.contains(&b.schedule_id.as_str()));
    }

    #[test]
    fn update_applies_only_given_fields() {
        let store = store();
        let created = store.create(draft()).unwrap();
        let updated = store
            .update(
                &created.schedule_id,
                SchedulePatch {
                    name: Some("Renamed".into()),
                    shuffle: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(updated.shuffle);
        assert_eq!(updated.start_time, created.start_time);
        assert_eq!(updated.players, created.players);
    }

    #[test]
    fn update_rejects_invalid_patch() {
        let store = store();
        let created = store.create(draft()).unwrap();
        let result = store.update(
            &created.schedule_id,
            SchedulePatch {
                players: Some(vec![]),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(StoreError::Validation(_))));
        // Stored record is untouched.
        let fetched = store.get(&created.schedule_id).unwrap().unwrap();
        assert_eq!(fetched.players.len(), 2);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let result = store().update("nope", SchedulePatch::default());
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn set_enabled_toggles() {
        let store = store();
        let created = store.create(draft()).unwrap();
        let disabled = store.set_enabled(&created.schedule_id, false).unwrap();
        assert!(!disabled.enabled);
        assert!(store.set_enabled(&created.schedule_id, true).unwrap().enabled);
    }

    #[test]
    fn delete_removes_record() {
        let store = store();
        let created = store.create(draft()).unwrap();
        store.delete(&created.schedule_id).unwrap();
        assert!(store.get(&created.schedule_id).unwrap().is_none());
        assert!(matches!(
            store.delete(&created.schedule_id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn create_rejects_invalid_draft() {
        let mut bad = draft();
        bad.players.clear();
        assert!(matches!(
            store().create(bad),
            Err(StoreError::Validation(_))
        ));
    }
}
