//! `maestro-players` — the device command facade.
//!
//! The scheduler drives playback exclusively through the [`PlayerApi`]
//! trait: volume, grouping, queue configuration, enqueue-replace, stop, and
//! transient announcements. [`PlaybackTarget`] is the single/group
//! polymorphic target so queue commands never branch on grouping.
//!
//! [`HttpPlayerApi`] is the production adapter for the external
//! device-control service; tests substitute their own recording
//! implementations of the trait.

pub mod error;
pub mod facade;
pub mod http;
pub mod target;
pub mod types;

pub use error::{PlayerError, Result};
pub use facade::PlayerApi;
pub use http::HttpPlayerApi;
pub use target::PlaybackTarget;
pub use types::{GroupHandle, PlayerId, RepeatMode};
