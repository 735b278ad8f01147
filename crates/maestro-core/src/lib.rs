//! `maestro-core` — shared configuration and error types.
//!
//! Everything here is consumed by the other maestro crates; no behavior
//! lives at this layer.

pub mod config;
pub mod error;

pub use config::MaestroConfig;
pub use error::{MaestroError, Result};
