//! Accessory discovery and handshake
//!
//! The accessory announces itself by streaming stick frames as soon as its
//! port is opened with DTR raised, so discovery is a probe loop: open each
//! candidate port, listen briefly for a line starting with the handshake
//! banner, and keep the first port that matches. Probing blocks the calling
//! thread for up to the handshake budget per candidate, which is acceptable
//! because it runs once at startup (or on a manual retry).

use std::thread;
use std::time::{Duration, Instant};

use statum::{machine, state};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::transport::serial::SerialTransport;
use crate::transport::{Transport, TransportError};

/// Prefix identifying an accessory frame during the handshake
pub const HANDSHAKE_PREFIX: &str = "MOVE_";

/// Pause between handshake buffer polls
const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tunables for the discovery routine
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Line speed shared by probe and persistent transport
    pub baud_rate: u32,

    /// Wall-clock budget per candidate port while waiting for the banner
    pub handshake_timeout: Duration,

    /// Read timeout configured on each opened port
    pub probe_read_timeout: Duration,

    /// Explicit candidate ports; when empty, all system ports are tried
    pub preferred_ports: Vec<String>,
}

impl DiscoverySettings {
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
            probe_read_timeout: Duration::from_millis(config.probe_read_timeout_ms),
            preferred_ports: config.preferred_ports.clone(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self::from_config(&SerialConfig::default())
    }
}

/// Discovery failures
///
/// Per-candidate open/read errors are swallowed inside the probe loop; only
/// the terminal outcomes surface here.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No candidate produced a banner line within its handshake budget
    #[error("No compatible accessory found on any serial port")]
    NoDeviceFound,

    /// The system port list could not be enumerated
    #[error("Failed to enumerate serial ports: {0}")]
    Enumeration(#[from] serialport::Error),
}

// Probe states: a probe is opened on one candidate, then listens until the
// banner arrives or the budget runs out.
#[state]
#[derive(Debug, Clone)]
pub enum ProbeState {
    Opening,
    Listening,
}

/// Handshake probe for a single candidate port
#[machine]
pub struct HandshakeProbe<S: ProbeState> {
    port_name: String,
    settings: DiscoverySettings,
    link: Option<SerialTransport>,
}

impl HandshakeProbe<Opening> {
    /// Opens the candidate port for probing.
    pub fn create(port_name: &str, settings: DiscoverySettings) -> Result<Self, TransportError> {
        let link = SerialTransport::open(port_name, settings.baud_rate, settings.probe_read_timeout)?;
        Ok(Self::new(port_name.to_string(), settings, Some(link)))
    }

    pub fn begin_listening(self) -> HandshakeProbe<Listening> {
        debug!("Probing {} for accessory banner", self.port_name);
        self.transition()
    }
}

impl HandshakeProbe<Listening> {
    /// Polls the candidate until the banner arrives or the budget elapses.
    ///
    /// Consumes the probe either way; the probe port is closed on drop and
    /// the matched endpoint gets reopened fresh as the persistent transport.
    /// Read errors count as "no match" so the caller moves on to the next
    /// candidate.
    pub fn await_banner(mut self) -> bool {
        let deadline = Instant::now() + self.settings.handshake_timeout;

        while Instant::now() < deadline {
            let line = match self.link.as_mut() {
                Some(link) => link.read_line(),
                None => return false,
            };

            match line {
                Ok(Some(line)) if line.starts_with(HANDSHAKE_PREFIX) => {
                    info!("Accessory identified on {}", self.port_name);
                    return true;
                }
                Ok(Some(line)) => {
                    debug!("Non-banner line on {}: {:?}", self.port_name, line);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Probe read failed on {}: {}", self.port_name, e);
                    return false;
                }
            }

            thread::sleep(PROBE_POLL_INTERVAL);
        }

        debug!("No banner on {} within budget", self.port_name);
        false
    }
}

/// Tries every candidate port and returns the first with a banner match.
///
/// The matching endpoint is reopened as the persistent transport. Blocks the
/// calling thread for up to the handshake budget per candidate.
pub fn discover(settings: &DiscoverySettings) -> Result<SerialTransport, DiscoveryError> {
    let candidates = candidate_ports(settings)?;
    info!("Scanning serial ports: {:?}", candidates);

    for port_name in &candidates {
        let probe = match HandshakeProbe::create(port_name, settings.clone()) {
            Ok(probe) => probe,
            Err(e) => {
                debug!("Could not open {}: {}, trying next port", port_name, e);
                continue;
            }
        };

        if probe.begin_listening().await_banner() {
            match SerialTransport::open(port_name, settings.baud_rate, settings.probe_read_timeout)
            {
                Ok(transport) => return Ok(transport),
                Err(e) => {
                    warn!("Reopening matched port {} failed: {}", port_name, e);
                    continue;
                }
            }
        }
    }

    Err(DiscoveryError::NoDeviceFound)
}

/// Candidate list: configured ports first, system enumeration as fallback.
fn candidate_ports(settings: &DiscoverySettings) -> Result<Vec<String>, DiscoveryError> {
    if !settings.preferred_ports.is_empty() {
        return Ok(settings.preferred_ports.clone());
    }

    let ports = serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect();
    Ok(ports)
}
