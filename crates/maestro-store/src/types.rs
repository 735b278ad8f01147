use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Volume setting for one player participating in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVolume {
    pub player_id: String,
    /// Target volume applied at run start (0–100).
    pub volume: u8,
}

/// An announcement bound to a schedule.
///
/// Fires while the owning schedule has an active run; `repeat_interval`
/// of `None` means at most once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAnnouncement {
    /// Unique within the owning schedule.
    pub announcement_id: String,
    /// Human-readable label.
    pub name: String,
    /// Addressable stream location of the uploaded audio asset.
    pub asset_uri: String,
    /// Time of day the announcement fires.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Minutes between repeats within a run.
    pub repeat_interval: Option<u32>,
}

/// A recurring time-windowed playback rule.
///
/// `end_time` numerically ≤ `start_time` denotes a window crossing
/// midnight; `start_time == end_time` is a zero-length window that never
/// activates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// UUID v4 string — primary key, immutable once created.
    pub schedule_id: String,
    pub name: String,
    /// Disabled schedules are never evaluated for start.
    pub enabled: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Weekdays the window *start* is evaluated on (0 = Monday … 6 = Sunday).
    pub days_of_week: Vec<u8>,
    /// URIs of playlists/tracks; empty produces a no-op run.
    pub media_items: Vec<String>,
    pub players: Vec<PlayerVolume>,
    /// Merge the listed players into one synchronized group for the run.
    pub group_players: bool,
    /// Repeat the queue (`All`) for the duration of the window.
    pub loop_content: bool,
    pub shuffle: bool,
    pub announcements: Vec<ScheduledAnnouncement>,
    /// Unix seconds.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields accepted by [`ScheduleStore::create`](crate::store::ScheduleStore::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub name: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    pub media_items: Vec<String>,
    pub players: Vec<PlayerVolume>,
    #[serde(default)]
    pub group_players: bool,
    #[serde(default = "bool_true")]
    pub loop_content: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub announcements: Vec<ScheduledAnnouncement>,
}

/// All-fields-optional patch applied by
/// [`ScheduleStore::update`](crate::store::ScheduleStore::update).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
    pub days_of_week: Option<Vec<u8>>,
    pub media_items: Option<Vec<String>>,
    pub players: Option<Vec<PlayerVolume>>,
    pub group_players: Option<bool>,
    pub loop_content: Option<bool>,
    pub shuffle: Option<bool>,
    pub announcements: Option<Vec<ScheduledAnnouncement>>,
}

fn bool_true() -> bool {
    true
}

/// Reject malformed schedules before they can reach the scheduler loop.
pub fn validate(schedule: &Schedule) -> Result<()> {
    if schedule.name.trim().is_empty() {
        return Err(StoreError::Validation("name must not be empty".into()));
    }
    if schedule.players.is_empty() {
        return Err(StoreError::Validation(
            "at least one player is required".into(),
        ));
    }
    for player in &schedule.players {
        if player.volume > 100 {
            return Err(StoreError::Validation(format!(
                "volume {} for player {} is out of range (0-100)",
                player.volume, player.player_id
            )));
        }
    }
    for day in &schedule.days_of_week {
        if *day > 6 {
            return Err(StoreError::Validation(format!(
                "weekday index {day} is out of range (0=Mon … 6=Sun)"
            )));
        }
    }
    for ann in &schedule.announcements {
        if ann.repeat_interval == Some(0) {
            return Err(StoreError::Validation(format!(
                "announcement {} repeat_interval must be at least 1 minute",
                ann.announcement_id
            )));
        }
    }
    Ok(())
}

/// Parse a stored `HH:MM` time-of-day string.
pub fn parse_hhmm(s: &str) -> std::result::Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
}

/// Render a time-of-day as the stored `HH:MM` form.
pub fn format_hhmm(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

const TIME_FORMAT: &str = "%H:%M";

/// Serde adapter: `NaiveTime` ⇄ `"HH:MM"`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &NaiveTime,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hhmm(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Option<NaiveTime>` ⇄ optional `"HH:MM"`.
mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_some(&super::format_hhmm(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<NaiveTime>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::parse_hhmm(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            schedule_id: "s1".into(),
            name: "Morning music".into(),
            enabled: true,
            start_time: parse_hhmm("08:00").unwrap(),
            end_time: parse_hhmm("10:00").unwrap(),
            days_of_week: vec![0, 1, 2, 3, 4],
            media_items: vec!["library://playlist/42".into()],
            players: vec![PlayerVolume {
                player_id: "p1".into(),
                volume: 40,
            }],
            group_players: false,
            loop_content: true,
            shuffle: false,
            announcements: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn valid_schedule_passes() {
        assert!(validate(&schedule()).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let mut s = schedule();
        s.name = "  ".into();
        assert!(matches!(validate(&s), Err(StoreError::Validation(_))));
    }

    #[test]
    fn no_players_rejected() {
        let mut s = schedule();
        s.players.clear();
        assert!(matches!(validate(&s), Err(StoreError::Validation(_))));
    }

    #[test]
    fn out_of_range_volume_rejected() {
        let mut s = schedule();
        s.players[0].volume = 101;
        assert!(matches!(validate(&s), Err(StoreError::Validation(_))));
    }

    #[test]
    fn out_of_range_weekday_rejected() {
        let mut s = schedule();
        s.days_of_week.push(7);
        assert!(matches!(validate(&s), Err(StoreError::Validation(_))));
    }

    #[test]
    fn zero_repeat_interval_rejected() {
        let mut s = schedule();
        s.announcements.push(ScheduledAnnouncement {
            announcement_id: "a1".into(),
            name: "Chime".into(),
            asset_uri: "file:///tmp/chime.mp3".into(),
            time: parse_hhmm("09:00").unwrap(),
            repeat_interval: Some(0),
        });
        assert!(matches!(validate(&s), Err(StoreError::Validation(_))));
    }

    #[test]
    fn hhmm_round_trips_through_json() {
        let s = schedule();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"08:00\""));
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_time, s.start_time);
        assert_eq!(back.end_time, s.end_time);
    }
}
