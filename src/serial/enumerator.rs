use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::config::SerialConfig;

/// Lists the serial endpoints that might be a scale. Never fails: an empty
/// list simply means there is nothing to probe right now.
pub trait PortEnumerator: Send + Sync {
    fn list_candidates(&self) -> Vec<String>;
}

/// Numbered `COMn` ports, produced eagerly without touching the hardware.
#[derive(Debug, Clone)]
pub struct ComPortEnumerator {
    max_port: u16,
}

impl ComPortEnumerator {
    pub fn new(max_port: u16) -> Self {
        Self { max_port }
    }
}

impl PortEnumerator for ComPortEnumerator {
    fn list_candidates(&self) -> Vec<String> {
        (1..=self.max_port).map(|n| format!("COM{}", n)).collect()
    }
}

/// Device files such as `/dev/ttyUSB0` or `/dev/ttyACM1`.
#[derive(Debug, Clone)]
pub struct DeviceDirEnumerator {
    device_dir: PathBuf,
    prefixes: Vec<String>,
}

impl DeviceDirEnumerator {
    pub fn new<P: AsRef<Path>>(device_dir: P, prefixes: Vec<String>) -> Self {
        Self {
            device_dir: device_dir.as_ref().to_path_buf(),
            prefixes,
        }
    }
}

impl PortEnumerator for DeviceDirEnumerator {
    fn list_candidates(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.device_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️  Cannot list {}: {}", self.device_dir.display(), e);
                return Vec::new();
            }
        };

        let mut candidates: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
            })
            .map(|entry| entry.path().to_string_lossy().to_string())
            .collect();

        candidates.sort();
        debug!("🔍 {} candidate(s) under {}", candidates.len(), self.device_dir.display());
        candidates
    }
}

/// A fixed list, used when the port is pinned in the configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPortEnumerator {
    ports: Vec<String>,
}

impl StaticPortEnumerator {
    pub fn new(ports: Vec<String>) -> Self {
        Self { ports }
    }
}

impl PortEnumerator for StaticPortEnumerator {
    fn list_candidates(&self) -> Vec<String> {
        self.ports.clone()
    }
}

/// Picks the enumerator for this host and configuration.
pub fn system_enumerator(config: &SerialConfig) -> Box<dyn PortEnumerator> {
    if let Some(port) = &config.port {
        return Box::new(StaticPortEnumerator::new(vec![port.clone()]));
    }

    if cfg!(windows) {
        Box::new(ComPortEnumerator::new(config.max_com_port))
    } else {
        Box::new(DeviceDirEnumerator::new(&config.device_dir, config.device_prefixes.clone()))
    }
}
