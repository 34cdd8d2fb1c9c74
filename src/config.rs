//! Application configuration, persisted as TOML
//!
//! Configuration is best-effort: a missing or unreadable file falls back to
//! defaults with a warning, so the integration never fails to start over a
//! config problem.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Serial link and discovery settings
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SerialConfig {
    /// Line speed of the accessory firmware
    pub baud_rate: u32,

    /// Per-port wall-clock budget while waiting for the handshake banner
    pub handshake_timeout_ms: u64,

    /// Read timeout configured on opened ports
    pub probe_read_timeout_ms: u64,

    /// Candidate ports to probe; empty means "enumerate all system ports"
    pub preferred_ports: Vec<String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            handshake_timeout_ms: 3_000,
            probe_read_timeout_ms: 500,
            preferred_ports: Vec::new(),
        }
    }
}

/// Defaults for LED blink and vibration sequences
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct FeedbackConfig {
    /// On-duration of one LED blink iteration
    pub blink_duration_ms: u64,

    /// On-duration of one vibration iteration
    pub vibrate_duration_ms: u64,

    /// Iterations used by the connect notification blink
    pub connect_blink_iterations: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            blink_duration_ms: 250,
            vibrate_duration_ms: 400,
            connect_blink_iterations: 3,
        }
    }
}

/// Root configuration for the Microtwi integration
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct MicrotwiConfig {
    pub serial: SerialConfig,
    pub feedback: FeedbackConfig,
}

impl MicrotwiConfig {
    /// Location of the configuration file, if a config directory exists
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("microtwi").join("config.toml"))
    }

    /// Writes a default configuration file when none exists yet.
    pub fn ensure_default_config() -> std::io::Result<()> {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, skipping default config");
            return Ok(());
        };

        if path.exists() {
            debug!("Config file already present at {:?}", path);
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(&Self::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, rendered)?;
        info!("Wrote default configuration to {:?}", path);
        Ok(())
    }

    /// Loads the configuration, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, using default configuration");
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Invalid configuration at {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }
}
