//! `maestro-scheduler` — the time-driven playback control loop.
//!
//! # Overview
//!
//! A single Tokio task polls the schedule store at a fixed cadence
//! (default 30 s), classifies every enabled schedule against the local
//! wall clock, and drives playback transitions through the device command
//! facade. Worst-case start/stop latency is bounded by the poll interval —
//! a deliberate trade of latency for simplicity and crash-safety over
//! per-schedule timers.
//!
//! # Pieces
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `window`   | Pure time predicate: same-day and overnight windows     |
//! | `run`      | Transient per-schedule run state (never persisted)      |
//! | `announce` | Announcement due predicate within a run                 |
//! | `engine`   | The serialized tick loop and run transitions            |
//! | `handle`   | CRUD + manual trigger/stop surface for the authoring UI |

pub mod announce;
pub mod engine;
pub mod error;
pub mod handle;
pub mod run;
pub mod window;

pub use engine::{EngineCommand, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use handle::SchedulerHandle;
pub use run::Run;
pub use window::{evaluate, in_window, WindowEval};
