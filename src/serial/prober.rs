use log::{debug, info, warn};
use std::time::Duration;

use super::enumerator::{system_enumerator, PortEnumerator};
use super::link::{ScaleLink, SerialLink};
use crate::config::SerialConfig;
use crate::scale::parser::FrameParser;
use crate::utils::error::ScaleError;

/// Opens a candidate endpoint. Split out so discovery can run against fakes.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, candidate: &str) -> Result<Box<dyn ScaleLink>, ScaleError>;
}

#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud_rate: u32,
    timeout: Duration,
}

impl SerialOpener {
    pub fn new(baud_rate: u32, timeout: Duration) -> Self {
        Self { baud_rate, timeout }
    }
}

impl DeviceOpener for SerialOpener {
    fn open(&self, candidate: &str) -> Result<Box<dyn ScaleLink>, ScaleError> {
        let link = SerialLink::open(candidate, self.baud_rate, self.timeout)?;
        Ok(Box::new(link))
    }
}

pub struct DeviceProber {
    enumerator: Box<dyn PortEnumerator>,
    opener: Box<dyn DeviceOpener>,
    probe_token: Vec<u8>,
    strict: bool,
    parser: FrameParser,
}

impl DeviceProber {
    pub fn new(
        enumerator: Box<dyn PortEnumerator>,
        opener: Box<dyn DeviceOpener>,
        probe_token: &str,
        strict: bool,
        parser: FrameParser,
    ) -> Self {
        Self {
            enumerator,
            opener,
            probe_token: probe_token.as_bytes().to_vec(),
            strict,
            parser,
        }
    }

    pub fn from_config(config: &SerialConfig, parser: FrameParser) -> Self {
        let opener = SerialOpener::new(config.baud_rate, Duration::from_millis(config.timeout_ms));
        Self::new(
            system_enumerator(config),
            Box::new(opener),
            &config.probe_token,
            config.strict_probe,
            parser,
        )
    }

    pub fn candidates(&self) -> Vec<String> {
        self.enumerator.list_candidates()
    }

    /// Opens `candidate` and runs the probe handshake.
    ///
    /// Lenient probing accepts the port as soon as it opens; the echo is read
    /// but not checked. Strict probing requires the echo to be a weight frame.
    pub fn probe(&self, candidate: &str) -> Result<Box<dyn ScaleLink>, ScaleError> {
        let mut link = self.opener.open(candidate)?;

        let echo = link
            .send(&self.probe_token)
            .and_then(|_| link.read_line());

        match echo {
            Ok(line) => {
                debug!("📡 Probe echo from {}: {:?}", candidate, line);
                if self.strict {
                    self.parser.parse(&line).map_err(|_| ScaleError::ProbeRejected {
                        port: candidate.to_string(),
                        reason: format!("unexpected probe response {:?}", line),
                    })?;
                }
            }
            Err(e) if self.strict => {
                return Err(ScaleError::ProbeRejected {
                    port: candidate.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                debug!("📡 No probe echo from {} ({}), accepting anyway", candidate, e);
            }
        }

        Ok(link)
    }

    /// First candidate that passes [`probe`](Self::probe), in enumeration order.
    pub fn find_device(&self) -> Result<Box<dyn ScaleLink>, ScaleError> {
        info!("🔍 Searching for USB scale...");

        for candidate in self.enumerator.list_candidates() {
            match self.probe(&candidate) {
                Ok(link) => {
                    info!("✅ Found USB scale at {}", candidate);
                    return Ok(link);
                }
                Err(ScaleError::ProbeRejected { port, reason }) => {
                    warn!("⚠️  Skipping {}: {}", port, reason);
                }
                Err(e) => {
                    debug!("Skipping {}: {}", candidate, e);
                }
            }
        }

        warn!("❌ USB scale not found");
        Err(ScaleError::DeviceNotFound)
    }
}
