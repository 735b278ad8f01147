use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use maestro_core::config::SchedulerConfig;
use maestro_players::{PlaybackTarget, PlayerApi, PlayerError, PlayerId, RepeatMode};
use maestro_store::{Schedule, ScheduleStore};

use crate::announce::announcement_due;
use crate::error::Result;
use crate::run::Run;
use crate::window::{evaluate, WindowEval};

/// Maximum device commands in flight during one fan-out.
const MAX_DEVICE_FANOUT: usize = 4;

/// Manual commands delivered asynchronously to the loop's authoritative
/// run state. Both bypass the time predicate but still honor the
/// at-most-one-run-per-schedule invariant.
#[derive(Debug)]
pub enum EngineCommand {
    /// Force-start a schedule.
    Trigger(String),
    /// Force-stop a schedule's run.
    Stop(String),
}

/// The scheduler control loop.
///
/// A single task polls the store at a fixed cadence, classifies every
/// enabled schedule against the wall clock, and drives run transitions
/// through the device command facade. All run state lives here and only
/// here; nothing about a run is persisted.
pub struct SchedulerEngine {
    store: Arc<ScheduleStore>,
    players: Arc<dyn PlayerApi>,
    runs: HashMap<String, Run>,
    poll_interval: Duration,
    command_timeout: Duration,
    startup_grace: Duration,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<ScheduleStore>,
        players: Arc<dyn PlayerApi>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            players,
            runs: HashMap::new(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            startup_grace: Duration::from_secs(config.startup_grace_secs),
        }
    }

    /// Main control loop. Ticks every `poll_interval` until `shutdown`
    /// broadcasts `true`.
    ///
    /// Ticks are strictly serialized: the next tick cannot begin until the
    /// previous tick's command fan-out has fully settled. Run state does
    /// not survive restarts — the first tick simply starts every schedule
    /// currently inside its window, which is safe because the device
    /// commands are idempotent.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if !self.startup_grace.is_zero() {
            // Give the device layer time to register players before the
            // first tick issues commands at them.
            info!(
                grace_secs = self.startup_grace.as_secs(),
                "scheduler waiting for player registration"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.startup_grace) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }

        info!("scheduler engine started");
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Race the tick against shutdown so an in-flight fan-out
                    // cannot block exit; partially applied device state is
                    // acceptable and left as-is.
                    tokio::select! {
                        res = self.tick() => {
                            if let Err(e) = res {
                                error!("scheduler tick error: {e}");
                            }
                        }
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }
                Some(cmd) = commands.recv() => self.handle_command(cmd).await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("scheduler engine shutting down");
    }

    async fn tick(&mut self) -> Result<()> {
        self.tick_at(Local::now().naive_local()).await
    }

    /// One evaluation pass at a given instant (separated from the wall
    /// clock for tests).
    async fn tick_at(&mut self, now: NaiveDateTime) -> Result<()> {
        // One consistent snapshot per tick. On store failure the whole tick
        // is skipped and run state is left untouched until the store
        // recovers.
        let schedules = self.store.list_all()?;

        // Runs whose schedule row disappeared were deleted while active.
        let known: HashSet<&str> = schedules.iter().map(|s| s.schedule_id.as_str()).collect();
        let stale: Vec<String> = self
            .runs
            .keys()
            .filter(|id| !known.contains(id.as_str()))
            .cloned()
            .collect();
        for schedule_id in stale {
            info!(schedule_id = %schedule_id, "schedule deleted while active, stopping run");
            self.stop_run(&schedule_id).await;
        }

        for schedule in &schedules {
            if schedule.enabled {
                let has_run = self.runs.contains_key(&schedule.schedule_id);
                match evaluate(schedule, now, has_run) {
                    WindowEval::Start => self.start_run(schedule, now).await,
                    WindowEval::Stop => {
                        info!(schedule_id = %schedule.schedule_id, name = %schedule.name,
                              "schedule window ended");
                        self.stop_run(&schedule.schedule_id).await;
                    }
                    WindowEval::Inside | WindowEval::Outside => {}
                }
            }
            // Announcements are served for every live run, including runs
            // whose schedule was disabled after starting.
            if self.runs.contains_key(&schedule.schedule_id) {
                self.check_announcements(schedule, now).await;
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Trigger(schedule_id) => {
                if self.runs.contains_key(&schedule_id) {
                    warn!(schedule_id = %schedule_id, "manual trigger ignored: schedule already active");
                    return;
                }
                match self.store.get(&schedule_id) {
                    Ok(Some(schedule)) => {
                        info!(schedule_id = %schedule_id, "manual trigger");
                        self.start_run(&schedule, Local::now().naive_local()).await;
                    }
                    Ok(None) => {
                        warn!(schedule_id = %schedule_id, "manual trigger for unknown schedule");
                    }
                    Err(e) => {
                        warn!(schedule_id = %schedule_id, error = %e, "manual trigger failed to load schedule");
                    }
                }
            }
            EngineCommand::Stop(schedule_id) => {
                info!(schedule_id = %schedule_id, "manual stop");
                self.stop_run(&schedule_id).await;
            }
        }
    }

    /// Begin playback for `schedule` and record the run.
    ///
    /// Per-player failures (volume, grouping) are isolated and never abort
    /// the start; only a failed enqueue on the primary target does, in
    /// which case no run is recorded and the next tick retries the whole
    /// idempotent sequence.
    async fn start_run(&mut self, schedule: &Schedule, now: NaiveDateTime) {
        if self.runs.contains_key(&schedule.schedule_id) {
            return;
        }
        let Some(first) = schedule.players.first() else {
            warn!(schedule_id = %schedule.schedule_id, "schedule has no players configured");
            return;
        };
        info!(schedule_id = %schedule.schedule_id, name = %schedule.name, "starting schedule");

        self.log_conflicts(schedule);

        let players = Arc::clone(&self.players);
        let timeout = self.command_timeout;

        // Volume fan-out: concurrent, bounded, one player's failure never
        // blocks or rolls back the others.
        futures_util::stream::iter(schedule.players.clone())
            .for_each_concurrent(MAX_DEVICE_FANOUT, |setting| {
                let players = Arc::clone(&players);
                async move {
                    let player = PlayerId(setting.player_id.clone());
                    if let Err(e) = timed(timeout, players.set_volume(&player, setting.volume)).await
                    {
                        warn!(player = %player, error = %e, "failed to set volume");
                    }
                }
            })
            .await;

        let member_ids: Vec<PlayerId> = schedule
            .players
            .iter()
            .map(|p| PlayerId(p.player_id.clone()))
            .collect();
        let primary = PlayerId(first.player_id.clone());

        let target = if schedule.group_players && schedule.players.len() > 1 {
            match timed(timeout, players.group_players(&primary, &member_ids)).await {
                Ok(handle) => {
                    info!(schedule_id = %schedule.schedule_id, group = %handle, "created sync group");
                    PlaybackTarget::Group(handle)
                }
                Err(e) => {
                    warn!(schedule_id = %schedule.schedule_id, error = %e,
                          "failed to create sync group, falling back to first player");
                    PlaybackTarget::Player(primary.clone())
                }
            }
        } else {
            PlaybackTarget::Player(primary.clone())
        };

        let mode = if schedule.loop_content {
            RepeatMode::All
        } else {
            RepeatMode::Off
        };
        if let Err(e) = timed(timeout, players.set_repeat(&target, mode)).await {
            warn!(target = %target, error = %e, "failed to set repeat mode");
        }
        if let Err(e) = timed(timeout, players.set_shuffle(&target, schedule.shuffle)).await {
            warn!(target = %target, error = %e, "failed to set shuffle");
        }

        if schedule.media_items.is_empty() {
            debug!(schedule_id = %schedule.schedule_id, "no media items, run is a no-op");
        } else if let Err(e) =
            timed(timeout, players.enqueue_replace(&target, &schedule.media_items)).await
        {
            warn!(schedule_id = %schedule.schedule_id, target = %target, error = %e,
                  "failed to start playback");
            // Best-effort: do not leak a group nothing will ever play on.
            if let Some(group) = target.group_handle() {
                let _ = timed(timeout, players.ungroup(group)).await;
            }
            return;
        }

        self.runs.insert(
            schedule.schedule_id.clone(),
            Run::new(schedule.schedule_id.clone(), now, target, member_ids),
        );
        info!(schedule_id = %schedule.schedule_id, name = %schedule.name, "schedule run started");
    }

    /// Stop a run if one exists. Idempotent: no run means no-op, never an
    /// error.
    async fn stop_run(&mut self, schedule_id: &str) {
        let Some(run) = self.runs.remove(schedule_id) else {
            return;
        };
        let timeout = self.command_timeout;
        if let Err(e) = timed(timeout, self.players.stop(&run.target)).await {
            warn!(schedule_id = %schedule_id, target = %run.target, error = %e,
                  "failed to stop playback");
        }
        if let Some(group) = run.target.group_handle() {
            if let Err(e) = timed(timeout, self.players.ungroup(group)).await {
                warn!(schedule_id = %schedule_id, group = %group, error = %e,
                      "failed to dissolve sync group");
            }
        }
        info!(schedule_id = %schedule_id, "schedule run stopped");
    }

    /// Fire any due announcements for a live run.
    ///
    /// The fire is recorded before the player fan-out so a partial failure
    /// can never replay the announcement on the next tick: a failed
    /// one-shot is missed, not retried.
    async fn check_announcements(&mut self, schedule: &Schedule, now: NaiveDateTime) {
        let players = Arc::clone(&self.players);
        let timeout = self.command_timeout;
        let Some(run) = self.runs.get_mut(&schedule.schedule_id) else {
            return;
        };

        for ann in &schedule.announcements {
            if !announcement_due(ann, run.started_at, run.last_fire(&ann.announcement_id), now) {
                continue;
            }
            run.mark_fired(&ann.announcement_id, now);
            info!(schedule_id = %schedule.schedule_id, announcement = %ann.name,
                  "playing announcement");
            for setting in &schedule.players {
                let player = PlayerId(setting.player_id.clone());
                if let Err(e) =
                    timed(timeout, players.play_announcement(&player, &ann.asset_uri)).await
                {
                    warn!(player = %player, announcement = %ann.announcement_id, error = %e,
                          "failed to play announcement");
                }
            }
        }
    }

    /// Log overlapping-player takeovers. Last write wins by design: time
    /// windows are expected to be authored non-overlapping, and the
    /// override must be distinguishable in logs from a failure.
    fn log_conflicts(&self, schedule: &Schedule) {
        let incoming: HashSet<&str> = schedule
            .players
            .iter()
            .map(|p| p.player_id.as_str())
            .collect();
        for run in self.runs.values() {
            let shared: Vec<&str> = run
                .players
                .iter()
                .map(|p| p.as_str())
                .filter(|p| incoming.contains(p))
                .collect();
            if !shared.is_empty() {
                info!(schedule_id = %schedule.schedule_id, overrides = %run.schedule_id,
                      players = ?shared, "overlapping windows: taking over shared players");
            }
        }
    }
}

/// Bound a device command by the configured timeout. A timeout is a
/// failure for that player only, never for the tick.
async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = maestro_players::Result<T>>,
) -> maestro_players::Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PlayerError::Timeout {
            ms: limit.as_millis() as u64,
        }),
    }
}
