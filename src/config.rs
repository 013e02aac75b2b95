//! Application settings for statusboard
//!
//! Startup settings read from `~/.statusboard/config.toml`. These seed the
//! runtime configuration; edits made through the dashboard are not written
//! back.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::DEFAULT_CHANNEL_BUFFER;
use crate::state::{ConfigFields, RuntimeConfig, LOG_SEVERITY_KEY, STATUS_UPDATE_PERIOD_KEY};
use crate::timers::DEFAULT_PROBE_INTERVAL;

/// Environment variable overriding the listening port
pub const PORT_ENV_VAR: &str = "STATUSBOARD_PORT";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port for the dashboard HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind the HTTP server to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Initial minimum log severity: "Trace", "Info", "Warning" or "Error"
    #[serde(default = "default_log_severity")]
    pub log_severity: String,

    /// Initial status update period in seconds (1-60)
    #[serde(default = "default_status_update_period_secs")]
    pub status_update_period_secs: u64,

    /// Interval of the synthetic trace log in seconds (default: 3)
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Capacity of the state controller's command queue
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_port() -> u16 {
    8000
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_log_severity() -> String {
    "Trace".to_string()
}

fn default_status_update_period_secs() -> u64 {
    1
}

fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL.as_secs()
}

fn default_channel_buffer() -> usize {
    DEFAULT_CHANNEL_BUFFER
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            log_severity: default_log_severity(),
            status_update_period_secs: default_status_update_period_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl Config {
    /// Load configuration from the default file, or defaults if not found
    ///
    /// The port can be overridden with `STATUSBOARD_PORT`.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_file_path())?;
        if let Ok(port) = std::env::var(PORT_ENV_VAR) {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid {} value '{}'", PORT_ENV_VAR, port))?;
        }
        Ok(config)
    }

    /// Load configuration from a specific file, or defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Socket address for the HTTP server
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Probe emitter interval
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    /// Build the initial runtime configuration
    ///
    /// The settings go through the same validation as dashboard edits, so a
    /// bad severity or period is rejected at startup.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let mut fields = ConfigFields::new();
        fields.insert(
            LOG_SEVERITY_KEY.to_string(),
            vec![self.log_severity.clone()],
        );
        fields.insert(
            STATUS_UPDATE_PERIOD_KEY.to_string(),
            vec![self.status_update_period_secs.to_string()],
        );

        let mut runtime = RuntimeConfig::default();
        runtime
            .update(&fields)
            .context("Invalid initial runtime settings")?;
        Ok(runtime)
    }
}

/// Get the base configuration directory (~/.statusboard)
/// Falls back to ./.statusboard if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".statusboard")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".statusboard"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
