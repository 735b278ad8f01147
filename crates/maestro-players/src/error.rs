use thiserror::Error;

/// Errors surfaced by device command facade implementations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Transport-level failure talking to the device-control service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device layer rejected a command.
    #[error("Command failed on {target}: {reason}")]
    Command { target: String, reason: String },

    /// The device call exceeded its deadline and was abandoned.
    #[error("Command timeout after {ms}ms")]
    Timeout { ms: u64 },

    /// The device layer answered with a body we could not interpret.
    #[error("Bad response from device layer: {0}")]
    BadResponse(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
