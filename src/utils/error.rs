use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Read timed out")]
    Timeout,

    #[error("Unparseable frame: {0:?}")]
    ParseError(String),

    #[error("USB scale not found")]
    DeviceNotFound,

    #[error("Probe rejected on {port}: {reason}")]
    ProbeRejected { port: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tunnel manager error: {0}")]
    TunnelError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ScaleError {
    /// True for failures that mean the open handle can no longer be trusted.
    pub fn invalidates_handle(&self) -> bool {
        matches!(
            self,
            ScaleError::CommunicationError(_) | ScaleError::Timeout | ScaleError::ConnectionError(_)
        )
    }
}

impl From<io::Error> for ScaleError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ScaleError::Timeout,
            _ => ScaleError::CommunicationError(format!("IO error: {}", err)),
        }
    }
}

impl From<serialport::Error> for ScaleError {
    fn from(err: serialport::Error) -> Self {
        ScaleError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for ScaleError {
    fn from(err: serde_json::Error) -> Self {
        ScaleError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ScaleError {
    fn from(err: toml::de::Error) -> Self {
        ScaleError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for ScaleError {
    fn from(err: toml::ser::Error) -> Self {
        ScaleError::SerializationError(format!("TOML error: {}", err))
    }
}

impl From<reqwest::Error> for ScaleError {
    fn from(err: reqwest::Error) -> Self {
        ScaleError::TunnelError(err.to_string())
    }
}
