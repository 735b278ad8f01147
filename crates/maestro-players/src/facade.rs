use async_trait::async_trait;

use crate::{
    error::Result,
    target::PlaybackTarget,
    types::{GroupHandle, PlayerId, RepeatMode},
};

/// The capability surface of the external player/queue subsystem.
///
/// The scheduler only ever commands devices through this trait; it performs
/// no decoding, transport, or discovery itself. Implementations must be
/// `Send + Sync` so one facade can be shared across Tokio tasks.
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Set the absolute volume (0–100) of a single player.
    async fn set_volume(&self, player: &PlayerId, volume: u8) -> Result<()>;

    /// Merge `members` into one synchronized group led by `primary`.
    ///
    /// Returns the handle the group is addressed by until
    /// [`ungroup`](Self::ungroup) is called.
    async fn group_players(
        &self,
        primary: &PlayerId,
        members: &[PlayerId],
    ) -> Result<GroupHandle>;

    /// Dissolve a group created by [`group_players`](Self::group_players).
    async fn ungroup(&self, group: &GroupHandle) -> Result<()>;

    /// Configure queue repeat behavior on a target.
    async fn set_repeat(&self, target: &PlaybackTarget, mode: RepeatMode) -> Result<()>;

    /// Configure queue shuffle on a target.
    async fn set_shuffle(&self, target: &PlaybackTarget, shuffle: bool) -> Result<()>;

    /// Load `items` into the target's queue, discarding any prior content,
    /// and start playback.
    async fn enqueue_replace(&self, target: &PlaybackTarget, items: &[String]) -> Result<()>;

    /// Stop playback and clear transport state on a target.
    async fn stop(&self, target: &PlaybackTarget) -> Result<()>;

    /// Play a short announcement on a single player.
    ///
    /// Contract owned by the device layer: current program audio is
    /// suspended, the announcement plays to completion, and the program
    /// resumes automatically.
    async fn play_announcement(&self, player: &PlayerId, asset_uri: &str) -> Result<()>;
}
