//! Desktop serial port implementation of [`Transport`]

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::transport::{Transport, TransportError};

/// Serial link to the accessory with line reassembly
///
/// Reads are non-blocking: only bytes already queued by the OS are drained
/// into an internal buffer, from which complete lines are cut. The port's
/// read timeout therefore only matters for the rare drain that races the
/// driver, not for steady-state polling.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    port_name: String,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Opens `port_name` at `baud_rate` and raises DTR.
    ///
    /// The accessory starts streaming frames only while DTR is asserted.
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        debug!("Opening serial port {} at {} baud", port_name, baud_rate);

        let mut port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .open()?;
        port.write_data_terminal_ready(true)?;

        Ok(Self {
            port,
            port_name: port_name.to_string(),
            pending: Vec::new(),
        })
    }

    /// Name of the underlying endpoint
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let available = self.port.bytes_to_read()?;
        if available > 0 {
            let mut chunk = vec![0u8; available as usize];
            let read = self.port.read(&mut chunk)?;
            self.pending.extend_from_slice(&chunk[..read]);
            trace!("Drained {} bytes from {}", read, self.port_name);
        }

        Ok(take_newest_line(&mut self.pending))
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        trace!("Sent line to {}: {}", self.port_name, line);
        Ok(())
    }
}

/// Cuts all complete lines out of `pending` and returns the newest one.
///
/// Bytes after the last newline stay buffered as the start of the next line.
/// The trailing `\r` of CRLF-terminated lines is stripped.
fn take_newest_line(pending: &mut Vec<u8>) -> Option<String> {
    let last_newline = pending.iter().rposition(|&b| b == b'\n')?;
    let complete: Vec<u8> = pending.drain(..=last_newline).collect();

    let line_start = complete[..last_newline]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    let line = String::from_utf8_lossy(&complete[line_start..last_newline])
        .trim_end_matches('\r')
        .to_string();
    Some(line)
}
