//! USB Scale Bridge
//!
//! Discovers a serial weighing scale, parses its text frames into weights and
//! serves the current reading over HTTP. Tunnel status from a local tunnel
//! manager is exposed alongside so remote clients can find the endpoint.

pub mod cli;
pub mod config;
pub mod scale;
pub mod serial;
pub mod services;
pub mod tunnel;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, UnitMode};
pub use scale::{FrameParser, ReadingOutcome, ReadingService, WeightReading, WeightUnit};
pub use serial::{DeviceOpener, DeviceProber, PortEnumerator, ScaleLink};
pub use services::MonitorService;
#[cfg(feature = "api")]
pub use services::{ApiService, ApiServiceState};
pub use tunnel::{TunnelInfoProvider, TunnelSource, TunnelState, TunnelStatus};
pub use utils::error::ScaleError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
