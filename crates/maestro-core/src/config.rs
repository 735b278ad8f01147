use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Scheduler tunables — coarse enough to be cheap, fine enough that worst-case
// start/stop latency stays acceptable for media playback.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000; // per device call, never block the loop
pub const DEFAULT_STARTUP_GRACE_SECS: u64 = 60; // let the device layer register players
pub const DEFAULT_DEVICE_FANOUT: usize = 4; // concurrent commands per fan-out

/// Top-level config (maestro.toml + MAESTRO_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaestroConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub players: PlayersConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub announcements: AnnouncementsConfig,
}

impl Default for MaestroConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            players: PlayersConfig::default(),
            scheduler: SchedulerConfig::default(),
            announcements: AnnouncementsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Endpoint of the external device-control service the facade commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayersConfig {
    #[serde(default = "default_players_base_url")]
    pub base_url: String,
    /// Optional bearer token sent with every device command.
    pub api_token: Option<String>,
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            base_url: default_players_base_url(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between schedule evaluation ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Upper bound for any single device command, in milliseconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// Delay before the first tick so player registration can settle.
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            startup_grace_secs: DEFAULT_STARTUP_GRACE_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementsConfig {
    /// Directory where uploaded announcement audio files are stored.
    #[serde(default = "default_announcements_dir")]
    pub dir: String,
}

impl Default for AnnouncementsConfig {
    fn default() -> Self {
        Self {
            dir: default_announcements_dir(),
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}
fn default_startup_grace() -> u64 {
    DEFAULT_STARTUP_GRACE_SECS
}
fn default_players_base_url() -> String {
    "http://localhost:8095".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.maestro/maestro.db", home)
}
fn default_announcements_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.maestro/announcements", home)
}

impl MaestroConfig {
    /// Load config from a TOML file with MAESTRO_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.maestro/maestro.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: MaestroConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MAESTRO_").split("_"))
            .extract()
            .map_err(|e| crate::error::MaestroError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.maestro/maestro.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MaestroConfig::default();
        assert_eq!(config.scheduler.poll_interval_secs, 30);
        assert_eq!(config.scheduler.command_timeout_ms, 10_000);
        assert!(config.database.path.ends_with("maestro.db"));
    }

    #[test]
    fn missing_file_yields_defaults_for_optional_sections() {
        let config = MaestroConfig::load(Some("/nonexistent/maestro.toml")).unwrap();
        assert_eq!(
            config.scheduler.poll_interval_secs,
            DEFAULT_POLL_INTERVAL_SECS
        );
        assert_eq!(config.players.base_url, default_players_base_url());
    }
}
