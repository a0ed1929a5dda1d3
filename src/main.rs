use anyhow::{anyhow, Result};
use log::{error, info};
use std::sync::Arc;

use scale_bridge::cli::{build_cli, handle_subcommands, load_config};
use scale_bridge::ReadingService;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&matches).map_err(|e| anyhow!("{}", e))?;

    if handle_subcommands(&matches, &config)
        .await
        .map_err(|e| anyhow!("{}", e))?
    {
        return Ok(());
    }

    info!("⚖️  USB Scale Bridge v{}", scale_bridge::VERSION);
    let reading_service = Arc::new(ReadingService::from_config(&config));
    serve(&config, reading_service).await
}

#[cfg(feature = "api")]
async fn serve(config: &scale_bridge::Config, reading_service: Arc<ReadingService>) -> Result<()> {
    use scale_bridge::{ApiService, ApiServiceState, TunnelInfoProvider};

    let tunnel = Arc::new(TunnelInfoProvider::new(&config.tunnel)?);
    let state = ApiServiceState::new(reading_service.clone(), tunnel);

    let mut api = ApiService::new(state);
    api.start(config).await?;

    info!("🌐 GET http://{}/read-scale", config.bind_address());
    info!("💡 Press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ Failed to listen for Ctrl-C: {}", e);
    }

    api.stop().await?;
    reading_service.shutdown();
    info!("👋 Goodbye!");
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn serve(_config: &scale_bridge::Config, _reading_service: Arc<ReadingService>) -> Result<()> {
    Err(anyhow!("built without the `api` feature; use `read`, `watch`, `ports` or `tunnel`"))
}
