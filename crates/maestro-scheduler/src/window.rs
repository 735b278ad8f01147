use chrono::{Datelike, Duration, NaiveDateTime};

use maestro_store::Schedule;

/// Classification of one schedule against one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEval {
    /// Inside the window with no live run — a run must be started.
    Start,
    /// Outside the window with a live run — the run must be stopped.
    Stop,
    /// Inside the window, run already live. No transition.
    Inside,
    /// Outside the window, no run. No transition.
    Outside,
}

/// Whether `now` falls within the schedule's recurring window.
///
/// `days_of_week` gates the day the window *starts* on. A window whose
/// `end_time` is numerically ≤ `start_time` crosses midnight and spills
/// into the following calendar day, so after midnight the candidate day to
/// check is *yesterday's* weekday — a same-day-only check would silently
/// drop overnight schedules once the clock wraps.
///
/// `start_time == end_time` is a zero-length window and is never inside,
/// avoiding the ambiguity of a full-day interpretation.
pub fn in_window(schedule: &Schedule, now: NaiveDateTime) -> bool {
    if schedule.start_time == schedule.end_time {
        return false;
    }

    let time = now.time();
    let today = now.weekday().num_days_from_monday() as u8;

    if schedule.start_time < schedule.end_time {
        // Same-day window.
        schedule.days_of_week.contains(&today)
            && time >= schedule.start_time
            && time < schedule.end_time
    } else {
        // Overnight window: either today's portion (start_time → midnight)
        // or the spill-over from a window that started yesterday.
        let yesterday = (now - Duration::days(1)).weekday().num_days_from_monday() as u8;
        (schedule.days_of_week.contains(&today) && time >= schedule.start_time)
            || (schedule.days_of_week.contains(&yesterday) && time < schedule.end_time)
    }
}

/// Classify `schedule` at `now` given whether a run currently exists.
pub fn evaluate(schedule: &Schedule, now: NaiveDateTime, has_run: bool) -> WindowEval {
    match (in_window(schedule, now), has_run) {
        (true, false) => WindowEval::Start,
        (false, true) => WindowEval::Stop,
        (true, true) => WindowEval::Inside,
        (false, false) => WindowEval::Outside,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use maestro_store::{types::parse_hhmm, PlayerVolume};

    /// January 2024: the 1st is a Monday, so day-of-month N has weekday
    /// index (N - 1) % 7 in the 0=Mon … 6=Sun convention.
    fn at(day: u32, time: &str) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_time(parse_hhmm(time).unwrap())
    }

    fn schedule(start: &str, end: &str, days: Vec<u8>) -> Schedule {
        Schedule {
            schedule_id: "s1".into(),
            name: "Test".into(),
            enabled: true,
            start_time: parse_hhmm(start).unwrap(),
            end_time: parse_hhmm(end).unwrap(),
            days_of_week: days,
            media_items: vec![],
            players: vec![PlayerVolume {
                player_id: "p1".into(),
                volume: 50,
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
    fn same_day_window_bounds() {
        let s = schedule("08:00", "10:00", vec![0]); // Mondays
        assert!(!in_window(&s, at(1, "07:59")));
        assert!(in_window(&s, at(1, "08:00"))); // inclusive start
        assert!(in_window(&s, at(1, "09:59")));
        assert!(!in_window(&s, at(1, "10:00"))); // exclusive end
    }

    #[test]
    fn same_day_window_requires_candidate_weekday() {
        let s = schedule("08:00", "10:00", vec![0]);
        assert!(!in_window(&s, at(2, "09:00"))); // Tuesday
    }

    #[test]
    fn overnight_window_spans_midnight() {
        // Friday 23:30 → Saturday 00:30.
        let s = schedule("23:30", "00:30", vec![4]);
        assert!(in_window(&s, at(5, "23:45"))); // Friday night
        assert!(in_window(&s, at(6, "00:15"))); // Saturday morning spill
        assert!(!in_window(&s, at(6, "00:45")));
    }

    #[test]
    fn overnight_window_end_boundary() {
        // Inside one minute before end on the following day, not at end.
        let s = schedule("22:00", "06:00", vec![0]); // Monday nights
        assert!(in_window(&s, at(2, "05:59")));
        assert!(!in_window(&s, at(2, "06:00")));
    }

    #[test]
    fn overnight_spill_requires_yesterday_candidate() {
        let s = schedule("23:30", "00:30", vec![4]); // Fridays only
        // Monday 00:15: yesterday was Sunday, not a candidate.
        assert!(!in_window(&s, at(1, "00:15")));
        // Friday 00:15: yesterday was Thursday, not a candidate, and the
        // Friday start has not arrived yet.
        assert!(!in_window(&s, at(5, "00:15")));
    }

    #[test]
    fn zero_length_window_never_inside() {
        let s = schedule("08:00", "08:00", vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(!in_window(&s, at(1, "08:00")));
        assert!(!in_window(&s, at(1, "12:00")));
    }

    #[test]
    fn evaluate_transitions() {
        let s = schedule("08:00", "10:00", vec![0]);
        assert_eq!(evaluate(&s, at(1, "09:00"), false), WindowEval::Start);
        assert_eq!(evaluate(&s, at(1, "09:00"), true), WindowEval::Inside);
        assert_eq!(evaluate(&s, at(1, "11:00"), true), WindowEval::Stop);
        assert_eq!(evaluate(&s, at(1, "11:00"), false), WindowEval::Outside);
    }
}
