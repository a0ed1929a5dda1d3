pub mod settings;

pub use settings::{
    Config,
    MonitorConfig,
    ParserConfig,
    SerialConfig,
    ServerConfig,
    TunnelConfig,
    UnitMode,
};
