use chrono::{Duration, NaiveDateTime, NaiveTime};

use maestro_store::ScheduledAnnouncement;

/// Whether an announcement should fire now within a live run.
///
/// First fire: the announcement's time-of-day must have been crossed since
/// the run started. Repeats: due again once `repeat_interval` minutes have
/// elapsed since the last fire, giving fires at t0, t0+R, t0+2R within one
/// run. One-shots (`repeat_interval` absent) never re-fire; their mark
/// resets only when the run ends and a new one begins.
pub fn announcement_due(
    ann: &ScheduledAnnouncement,
    run_started: NaiveDateTime,
    last_fire: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    match last_fire {
        None => most_recent_occurrence(ann.time, now) >= run_started,
        Some(last) => match ann.repeat_interval {
            None => false,
            Some(minutes) => now - last >= Duration::minutes(i64::from(minutes)),
        },
    }
}

/// The most recent instant (≤ `now`) at which the given time-of-day
/// occurred: today if already passed, otherwise yesterday.
fn most_recent_occurrence(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let candidate = now.date().and_time(time);
    if candidate <= now {
        candidate
    } else {
        candidate - Duration::days(1)
    }
}
