//! Serial transport to the Microtwi accessory
//!
//! The accessory link is modeled as a single capability trait, [`Transport`],
//! so that the desktop serial implementation and any platform-native variant
//! (or a scripted test double) are interchangeable at startup instead of
//! being selected by conditional compilation inside the logic.
//!
//! At most one transport is open at a time. It is created by a successful
//! handshake in [`discovery`], owned exclusively by the integration, and
//! destroyed on I/O error, explicit disable, or drop.

pub mod discovery;
pub mod serial;

use thiserror::Error;

pub use discovery::{discover, DiscoveryError, DiscoverySettings, HANDSHAKE_PREFIX};
pub use serial::SerialTransport;

/// Errors on an open accessory link
#[derive(Debug, Error)]
pub enum TransportError {
    /// Serial port layer failure (open, line settings, queue queries)
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    /// Raw read/write failure on the open stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bidirectional line stream to exactly one accessory
pub trait Transport: Send {
    /// Non-blocking read of the newest complete inbound line.
    ///
    /// Drains whatever bytes the link has buffered. When the drain contains
    /// more than one complete line only the newest is returned; older ones
    /// are stale stick samples and get dropped. Returns `Ok(None)` when no
    /// complete line is pending.
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Writes one line (terminator appended) and flushes.
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;
}
