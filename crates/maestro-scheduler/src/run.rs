use std::collections::HashMap;

use chrono::NaiveDateTime;

use maestro_players::{PlaybackTarget, PlayerId};

/// The transient record that a schedule is currently executing.
///
/// Owned exclusively by the scheduler loop and never persisted; after a
/// process restart the first tick recomputes membership from the wall
/// clock and re-issues the (idempotent) start commands. At most one `Run`
/// exists per schedule at any instant.
#[derive(Debug, Clone)]
pub struct Run {
    pub schedule_id: String,
    /// Local wall-clock instant the run started.
    pub started_at: NaiveDateTime,
    /// The target playback commands are addressed to (group handle when
    /// the schedule grouped its players).
    pub target: PlaybackTarget,
    /// Players participating in this run, for conflict detection.
    pub players: Vec<PlayerId>,
    /// announcement_id → last fire instant within this run.
    fired: HashMap<String, NaiveDateTime>,
}

impl Run {
    pub fn new(
        schedule_id: String,
        started_at: NaiveDateTime,
        target: PlaybackTarget,
        players: Vec<PlayerId>,
    ) -> Self {
        Self {
            schedule_id,
            started_at,
            target,
            players,
            fired: HashMap::new(),
        }
    }

    /// When the announcement last fired within this run, if ever.
    pub fn last_fire(&self, announcement_id: &str) -> Option<NaiveDateTime> {
        self.fired.get(announcement_id).copied()
    }

    /// Record an announcement fire. One-shot announcements stay marked for
    /// the lifetime of the run; the mark resets only with a new run.
    pub fn mark_fired(&mut self, announcement_id: &str, at: NaiveDateTime) {
        self.fired.insert(announcement_id.to_string(), at);
    }
}
