use clap::ArgMatches;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::error::ScaleError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub serial: SerialConfig,
    pub parser: ParserConfig,
    pub tunnel: TunnelConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub probe_token: String,
    /// Explicit port; when set, enumeration is skipped.
    pub port: Option<String>,
    pub device_dir: String,
    pub device_prefixes: Vec<String>,
    pub max_com_port: u16,
    pub strict_probe: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// Only `g` survives the character filter, so `kg`/`lb` frames read as grams.
    #[default]
    Legacy,
    /// Keeps the `k`, `l` and `b` letters so `kg` and `lb` are recognised.
    UnitAware,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ParserConfig {
    pub unit_mode: UnitMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TunnelConfig {
    pub api_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout_ms: 1000,
            probe_token: "CHECK".to_string(),
            port: None,
            device_dir: "/dev".to_string(),
            device_prefixes: vec!["ttyUSB".to_string(), "ttyACM".to_string()],
            max_com_port: 255,
            strict_probe: false,
        }
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:4040/api/tunnels".to_string(),
            timeout_ms: 2000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            serial: SerialConfig::default(),
            parser: ParserConfig::default(),
            tunnel: TunnelConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScaleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScaleError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        info!("📄 Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ScaleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ScaleError::ConfigError(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            ScaleError::ConfigError(format!("Cannot write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Overrides file/default values with whatever was given on the command line.
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> Result<(), ScaleError> {
        if let Some(port) = matches.get_one::<String>("port") {
            debug!("CLI override: serial port {}", port);
            self.serial.port = Some(port.clone());
        }

        if let Some(baud) = matches.get_one::<String>("baud") {
            self.serial.baud_rate = baud
                .parse()
                .map_err(|_| ScaleError::ConfigError(format!("Invalid baud rate: {}", baud)))?;
        }

        if let Some(listen) = matches.get_one::<String>("listen-port") {
            self.server.port = listen
                .parse()
                .map_err(|_| ScaleError::ConfigError(format!("Invalid listen port: {}", listen)))?;
        }

        if matches.get_flag("unit-aware") {
            self.parser.unit_mode = UnitMode::UnitAware;
        }

        if matches.get_flag("strict-probe") {
            self.serial.strict_probe = true;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ScaleError> {
        if self.serial.baud_rate == 0 {
            return Err(ScaleError::ConfigError(
                "serial.baud_rate must be greater than 0".to_string(),
            ));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ScaleError::ConfigError(
                "serial.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.serial.device_prefixes.iter().any(|p| p.is_empty()) {
            return Err(ScaleError::ConfigError(
                "serial.device_prefixes must not contain empty entries".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ScaleError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if self.monitor.poll_interval_seconds == 0 {
            return Err(ScaleError::ConfigError(
                "monitor.poll_interval_seconds must be greater than 0".to_string(),
            ));
        }
        url::Url::parse(&self.tunnel.api_url).map_err(|e| {
            ScaleError::ConfigError(format!("tunnel.api_url is not a URL: {}", e))
        })?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_legacy_deployment() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.timeout_ms, 1000);
        assert_eq!(config.serial.probe_token, "CHECK");
        assert_eq!(config.parser.unit_mode, UnitMode::Legacy);
        assert!(!config.serial.strict_probe);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("scale.toml");

        let mut config = Config::default();
        config.serial.port = Some("/dev/ttyUSB3".to_string());
        config.parser.unit_mode = UnitMode::UnitAware;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scale.toml");
        std::fs::write(&path, "[server]\nport = 8080\n\n[parser]\nunit_mode = \"unit_aware\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.server.host, "0.0.0.0");
        assert_eq!(loaded.parser.unit_mode, UnitMode::UnitAware);
        assert_eq!(loaded.serial, SerialConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(matches!(config.validate(), Err(ScaleError::ConfigError(_))));

        let mut config = Config::default();
        config.tunnel.api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_each_zero_or_empty_setting_names_its_key() {
        let cases: Vec<(fn(&mut Config), &str)> = vec![
            (|c| c.serial.timeout_ms = 0, "serial.timeout_ms"),
            (|c| c.serial.device_prefixes.push(String::new()), "serial.device_prefixes"),
            (|c| c.server.port = 0, "server.port"),
            (|c| c.monitor.poll_interval_seconds = 0, "monitor.poll_interval_seconds"),
        ];

        for (break_it, key) in cases {
            let mut config = Config::default();
            break_it(&mut config);
            match config.validate() {
                Err(ScaleError::ConfigError(msg)) => assert!(msg.starts_with(key), "{}", msg),
                other => panic!("{} accepted: {:?}", key, other),
            }
        }
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/nonexistent/scale.toml").unwrap_err();
        assert!(matches!(err, ScaleError::ConfigError(_)));
    }
}
