use std::fmt;

use crate::types::{GroupHandle, PlayerId};

/// A playback target addressed as one unit: a single device or a
/// synchronized group of devices.
///
/// Queue-level commands (repeat, shuffle, enqueue, stop) take a target so
/// callers never branch on "grouped or not".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    Player(PlayerId),
    Group(GroupHandle),
}

impl PlaybackTarget {
    /// Raw device-layer identifier this target is addressed by.
    pub fn id(&self) -> &str {
        match self {
            PlaybackTarget::Player(p) => p.as_str(),
            PlaybackTarget::Group(g) => g.as_str(),
        }
    }

    /// The group handle, when this target is a synchronized group.
    pub fn group_handle(&self) -> Option<&GroupHandle> {
        match self {
            PlaybackTarget::Player(_) => None,
            PlaybackTarget::Group(g) => Some(g),
        }
    }
}

impl fmt::Display for PlaybackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackTarget::Player(p) => write!(f, "player:{p}"),
            PlaybackTarget::Group(g) => write!(f, "group:{g}"),
        }
    }
}
