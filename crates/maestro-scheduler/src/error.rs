use thiserror::Error;

use maestro_store::StoreError;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying schedule store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No schedule with the given ID exists.
    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: String },

    /// The schedule exists but has no announcement with the given ID.
    #[error("Announcement not found: {announcement_id} (schedule {schedule_id})")]
    AnnouncementNotFound {
        schedule_id: String,
        announcement_id: String,
    },

    /// The engine's command channel is full or closed.
    #[error("Scheduler engine unavailable: {0}")]
    EngineUnavailable(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
