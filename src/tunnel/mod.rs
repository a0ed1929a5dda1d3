pub mod provider;

pub use provider::{
    secure_subdomain, subdomain_of, TunnelEntry, TunnelInfoProvider, TunnelList, TunnelSource,
    TunnelState, TunnelStatus,
};
