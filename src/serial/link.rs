use log::{debug, info};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::utils::error::ScaleError;

/// Longest frame accepted before a line is cut short.
pub const MAX_LINE_BYTES: usize = 1024;

const READ_CHUNK: usize = 64;

/// An open, exclusively owned connection to a scale.
///
/// Dropping the link closes the underlying port.
pub trait ScaleLink: Send {
    fn port_name(&self) -> &str;

    fn send(&mut self, data: &[u8]) -> Result<(), ScaleError>;

    /// Reads one `\n`-terminated line, decoded as UTF-8 and trimmed.
    ///
    /// The whole call is bounded by the port timeout. Bytes received before
    /// the deadline are returned as the line; nothing at all is reported as
    /// [`ScaleError::Timeout`].
    fn read_line(&mut self) -> Result<String, ScaleError>;
}

pub struct SerialLink {
    port_name: String,
    port: Box<dyn SerialPort>,
    timeout: Duration,
    // bytes received after the last returned `\n`
    pending: Vec<u8>,
}

impl SerialLink {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ScaleError> {
        debug!("🔌 Opening {} at {} baud (timeout {:?})", port_name, baud_rate, timeout);

        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open()
            .map_err(|e| {
                ScaleError::ConnectionError(format!("Failed to open {}: {}", port_name, e))
            })?;

        info!("🔌 Serial port {} opened", port_name);
        Ok(Self::from_port(port_name, port, timeout))
    }

    /// Wraps an already configured port.
    pub fn from_port(port_name: &str, port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self {
            port_name: port_name.to_string(),
            port,
            timeout,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Takes the next complete line out of `pending`, if there is one.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            return Some(self.pending.drain(..=pos).collect());
        }
        if self.pending.len() >= MAX_LINE_BYTES {
            debug!("✂️  {} frame exceeded {} bytes", self.port_name, MAX_LINE_BYTES);
            return Some(self.pending.drain(..MAX_LINE_BYTES).collect());
        }
        None
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, ScaleError> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining)?;

            match self.port.read(&mut chunk) {
                Ok(0) => {
                    if self.pending.is_empty() {
                        return Err(ScaleError::CommunicationError("Port closed".to_string()));
                    }
                    break;
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => match ScaleError::from(e) {
                    ScaleError::Timeout => break,
                    err => return Err(err),
                },
            }
        }

        if self.pending.is_empty() {
            return Err(ScaleError::Timeout);
        }
        debug!("⏱️  Timeout on {} with {} partial bytes", self.port_name, self.pending.len());
        Ok(std::mem::take(&mut self.pending))
    }
}

impl ScaleLink for SerialLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(&mut self, data: &[u8]) -> Result<(), ScaleError> {
        self.port
            .write_all(data)
            .map_err(|e| ScaleError::CommunicationError(format!("Write failed: {}", e)))?;
        self.port
            .flush()
            .map_err(|e| ScaleError::CommunicationError(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ScaleError> {
        let frame = self.read_frame()?;
        debug!("📥 {} raw frame: {}", self.port_name, hex::encode(&frame));
        decode_line(&frame)
    }
}

/// UTF-8 decode + trim; a non-UTF-8 frame is a communication failure.
pub fn decode_line(bytes: &[u8]) -> Result<String, ScaleError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ScaleError::CommunicationError(format!("'utf-8' decode failed: {}", e)))?;
    Ok(text.trim().to_string())
}
