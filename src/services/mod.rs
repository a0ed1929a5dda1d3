#[cfg(feature = "api")]
pub mod api_service;
pub mod monitor_service;

#[cfg(feature = "api")]
pub use api_service::{ApiService, ApiServiceState};
pub use monitor_service::MonitorService;
