//! `maestro-store` — durable schedule records with SQLite persistence.
//!
//! # Overview
//!
//! One `schedules` row fully describes a schedule: the nested player,
//! media, weekday, and announcement lists are JSON columns. The store is
//! pure CRUD plus create/update validation — all run-time behavior lives in
//! `maestro-scheduler`, which reads a snapshot of these records every tick.
//!
//! Announcement audio assets are plain files under a configured directory,
//! managed by [`assets::AnnouncementAssets`]; schedule records reference
//! them by URI.

pub mod assets;
pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use assets::{AnnouncementAssets, AssetFile};
pub use error::{Result, StoreError};
pub use store::ScheduleStore;
pub use types::{
    PlayerVolume, Schedule, ScheduleDraft, SchedulePatch, ScheduledAnnouncement,
};
