use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TunnelConfig;
use crate::utils::error::ScaleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelState {
    Connected,
    NotFound,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStatus {
    pub subdomain: Option<String>,
    pub state: TunnelState,
}

impl TunnelStatus {
    pub fn connected(subdomain: String) -> Self {
        Self {
            subdomain: Some(subdomain),
            state: TunnelState::Connected,
        }
    }

    pub fn not_found() -> Self {
        Self {
            subdomain: None,
            state: TunnelState::NotFound,
        }
    }

    pub fn offline() -> Self {
        Self {
            subdomain: None,
            state: TunnelState::Offline,
        }
    }
}

/// Answer of the tunnel manager's `/api/tunnels`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TunnelList {
    #[serde(default)]
    pub tunnels: Vec<TunnelEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TunnelEntry {
    #[serde(default)]
    pub public_url: String,
}

/// Always answers; failures degrade into a [`TunnelStatus`].
#[async_trait]
pub trait TunnelSource: Send + Sync {
    async fn get_tunnel_info(&self) -> TunnelStatus;
}

pub struct TunnelInfoProvider {
    client: reqwest::Client,
    api_url: String,
}

impl TunnelInfoProvider {
    pub fn new(config: &TunnelConfig) -> Result<Self, ScaleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// `Ok(None)` means the manager answered with a non-success status.
    async fn fetch_tunnels(&self) -> Result<Option<TunnelList>, ScaleError> {
        let response = self.client.get(&self.api_url).send().await?;

        if !response.status().is_success() {
            debug!("Tunnel manager answered {}", response.status());
            return Ok(None);
        }

        let list = response.json::<TunnelList>().await?;
        Ok(Some(list))
    }
}

#[async_trait]
impl TunnelSource for TunnelInfoProvider {
    async fn get_tunnel_info(&self) -> TunnelStatus {
        match self.fetch_tunnels().await {
            Ok(Some(list)) => match secure_subdomain(&list) {
                Some(subdomain) => TunnelStatus::connected(subdomain),
                None => TunnelStatus::not_found(),
            },
            Ok(None) => TunnelStatus::not_found(),
            Err(e) => {
                warn!("🌐 Tunnel manager unreachable at {}: {}", self.api_url, e);
                TunnelStatus::offline()
            }
        }
    }
}

/// Subdomain of the first `https` tunnel in the list.
pub fn secure_subdomain(list: &TunnelList) -> Option<String> {
    list.tunnels
        .iter()
        .find(|tunnel| tunnel.public_url.starts_with("https://"))
        .and_then(|tunnel| subdomain_of(&tunnel.public_url))
}

/// First DNS label of the URL's host: `https://ab12.ngrok.app` -> `ab12`.
pub fn subdomain_of(public_url: &str) -> Option<String> {
    let parsed = url::Url::parse(public_url).ok()?;
    let host = parsed.host_str()?;
    host.split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}
