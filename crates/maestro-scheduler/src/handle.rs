use std::sync::Arc;

use chrono::NaiveTime;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use maestro_store::{
    AnnouncementAssets, AssetFile, Schedule, ScheduleDraft, SchedulePatch, ScheduleStore,
    ScheduledAnnouncement,
};

use crate::engine::EngineCommand;
use crate::error::{Result, SchedulerError};

/// The query/command surface exposed to the authoring/control layer.
///
/// CRUD goes straight to the store (the engine reads a fresh snapshot every
/// tick, so edits are picked up within one poll interval). Manual trigger
/// and stop are delivered to the engine's command channel without blocking.
pub struct SchedulerHandle {
    store: Arc<ScheduleStore>,
    assets: Arc<AnnouncementAssets>,
    commands: mpsc::Sender<EngineCommand>,
}

impl SchedulerHandle {
    pub fn new(
        store: Arc<ScheduleStore>,
        assets: Arc<AnnouncementAssets>,
        commands: mpsc::Sender<EngineCommand>,
    ) -> Self {
        Self {
            store,
            assets,
            commands,
        }
    }

    /// Return all schedules.
    pub fn list(&self) -> Result<Vec<Schedule>> {
        Ok(self.store.list_all()?)
    }

    /// Return one schedule by ID.
    pub fn get(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        Ok(self.store.get(schedule_id)?)
    }

    /// Validate and persist a new schedule.
    pub fn create(&self, draft: ScheduleDraft) -> Result<Schedule> {
        Ok(self.store.create(draft)?)
    }

    /// Apply a partial update to an existing schedule.
    pub fn update(&self, schedule_id: &str, patch: SchedulePatch) -> Result<Schedule> {
        Ok(self.store.update(schedule_id, patch)?)
    }

    /// Delete a schedule.
    ///
    /// A best-effort stop command is sent first so an active run is torn
    /// down promptly; the engine also reaps runs of deleted schedules on
    /// its next tick, so a full channel is harmless.
    pub fn delete(&self, schedule_id: &str) -> Result<()> {
        let _ = self
            .commands
            .try_send(EngineCommand::Stop(schedule_id.to_string()));
        Ok(self.store.delete(schedule_id)?)
    }

    /// Enable or disable a schedule.
    pub fn set_enabled(&self, schedule_id: &str, enabled: bool) -> Result<Schedule> {
        Ok(self.store.set_enabled(schedule_id, enabled)?)
    }

    /// Force-start a schedule, bypassing the time predicate.
    pub fn trigger(&self, schedule_id: &str) -> Result<()> {
        self.require(schedule_id)?;
        self.send(EngineCommand::Trigger(schedule_id.to_string()))
    }

    /// Force-stop a schedule's run, bypassing the time predicate.
    pub fn stop(&self, schedule_id: &str) -> Result<()> {
        self.require(schedule_id)?;
        self.send(EngineCommand::Stop(schedule_id.to_string()))
    }

    /// Store an uploaded announcement audio payload and bind it to a
    /// schedule. Returns the created announcement record.
    pub fn upload_announcement(
        &self,
        schedule_id: &str,
        name: &str,
        file_name: &str,
        bytes: &[u8],
        time: NaiveTime,
        repeat_interval: Option<u32>,
    ) -> Result<ScheduledAnnouncement> {
        let mut schedule = self.require(schedule_id)?;
        let asset = self.assets.save(file_name, bytes)?;
        let announcement = ScheduledAnnouncement {
            announcement_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            asset_uri: asset.uri,
            time,
            repeat_interval,
        };

        schedule.announcements.push(announcement.clone());
        self.store.update(
            schedule_id,
            SchedulePatch {
                announcements: Some(schedule.announcements),
                ..Default::default()
            },
        )?;
        Ok(announcement)
    }

    /// Remove an announcement from a schedule and delete its audio asset.
    pub fn delete_announcement(&self, schedule_id: &str, announcement_id: &str) -> Result<()> {
        let mut schedule = self.require(schedule_id)?;
        let Some(idx) = schedule
            .announcements
            .iter()
            .position(|a| a.announcement_id == announcement_id)
        else {
            return Err(SchedulerError::AnnouncementNotFound {
                schedule_id: schedule_id.to_string(),
                announcement_id: announcement_id.to_string(),
            });
        };
        let removed = schedule.announcements.remove(idx);
        self.store.update(
            schedule_id,
            SchedulePatch {
                announcements: Some(schedule.announcements),
                ..Default::default()
            },
        )?;

        // The record is gone; a stale file is only worth a warning.
        if let Err(e) = self.assets.delete_uri(&removed.asset_uri) {
            warn!(uri = %removed.asset_uri, error = %e, "failed to delete announcement asset");
        }
        Ok(())
    }

    /// List all uploaded announcement assets.
    pub fn list_assets(&self) -> Result<Vec<AssetFile>> {
        Ok(self.assets.list()?)
    }

    fn require(&self, schedule_id: &str) -> Result<Schedule> {
        self.store
            .get(schedule_id)?
            .ok_or_else(|| SchedulerError::ScheduleNotFound {
                id: schedule_id.to_string(),
            })
    }

    fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.commands
            .try_send(cmd)
            .map_err(|e| SchedulerError::EngineUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_store::types::parse_hhmm;
    use maestro_store::{db::init_db, PlayerVolume};
    use rusqlite::Connection;

    fn handle() -> (SchedulerHandle, mpsc::Receiver<EngineCommand>) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = Arc::new(ScheduleStore::new(conn));
        let dir = std::env::temp_dir().join(format!("maestro-handle-{}", Uuid::new_v4()));
        let assets = Arc::new(AnnouncementAssets::new(dir).unwrap());
        let (tx, rx) = mpsc::channel(8);
        (SchedulerHandle::new(store, assets, tx), rx)
    }

    fn draft() -> ScheduleDraft {
        ScheduleDraft {
            name: "Lobby music".into(),
            enabled: true,
            start_time: parse_hhmm("09:00").unwrap(),
            end_time: parse_hhmm("17:00").unwrap(),
            days_of_week: vec![0, 1, 2, 3, 4],
            media_items: vec!["library://playlist/lobby".into()],
            players: vec![PlayerVolume {
                player_id: "p1".into(),
                volume: 30,
            }],
            group_players: false,
            loop_content: true,
            shuffle: false,
            announcements: vec![],
        }
    }

    #[tokio::test]
    async fn trigger_reaches_engine_channel() {
        let (handle, mut rx) = handle();
        let schedule = handle.create(draft()).unwrap();

        handle.trigger(&schedule.schedule_id).unwrap();
        match rx.recv().await.unwrap() {
            EngineCommand::Trigger(id) => assert_eq!(id, schedule.schedule_id),
            other => panic!("unexpected command: {other:?}"),
        }

        handle.stop(&schedule.schedule_id).unwrap();
        assert!(matches!(rx.recv().await.unwrap(), EngineCommand::Stop(_)));
    }

    #[tokio::test]
    async fn trigger_unknown_schedule_fails() {
        let (handle, _rx) = handle();
        assert!(matches!(
            handle.trigger("nope"),
            Err(SchedulerError::ScheduleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_sends_best_effort_stop() {
        let (handle, mut rx) = handle();
        let schedule = handle.create(draft()).unwrap();
        handle.delete(&schedule.schedule_id).unwrap();
        assert!(matches!(rx.recv().await.unwrap(), EngineCommand::Stop(_)));
        assert!(handle.get(&schedule.schedule_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn announcement_upload_binds_and_delete_unbinds() {
        let (handle, _rx) = handle();
        let schedule = handle.create(draft()).unwrap();

        let ann = handle
            .upload_announcement(
                &schedule.schedule_id,
                "Closing time",
                "closing.mp3",
                b"audio-bytes",
                parse_hhmm("16:45").unwrap(),
                None,
            )
            .unwrap();
        assert!(ann.asset_uri.starts_with("file://"));

        let stored = handle.get(&schedule.schedule_id).unwrap().unwrap();
        assert_eq!(stored.announcements.len(), 1);
        assert_eq!(stored.announcements[0].announcement_id, ann.announcement_id);
        assert_eq!(handle.list_assets().unwrap().len(), 1);

        handle
            .delete_announcement(&schedule.schedule_id, &ann.announcement_id)
            .unwrap();
        let stored = handle.get(&schedule.schedule_id).unwrap().unwrap();
        assert!(stored.announcements.is_empty());
        assert!(handle.list_assets().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_announcement_fails() {
        let (handle, _rx) = handle();
        let schedule = handle.create(draft()).unwrap();
        assert!(matches!(
            handle.delete_announcement(&schedule.schedule_id, "nope"),
            Err(SchedulerError::AnnouncementNotFound { .. })
        ));
    }
}
