use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::scale::ReadingService;
use crate::services::MonitorService;
use crate::tunnel::{TunnelInfoProvider, TunnelSource};

pub fn build_cli() -> Command {
    Command::new("scale-bridge")
        .version(crate::VERSION)
        .about("Reads a USB serial scale and serves the weight over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .global(true)
                .help("Serial port to use instead of scanning (e.g. /dev/ttyUSB0, COM3)"),
        )
        .arg(
            Arg::new("baud")
                .short('b')
                .long("baud")
                .global(true)
                .help("Serial baud rate"),
        )
        .arg(
            Arg::new("listen-port")
                .short('l')
                .long("listen-port")
                .global(true)
                .help("HTTP port to listen on"),
        )
        .arg(
            Arg::new("unit-aware")
                .long("unit-aware")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Recognise kg and lb frames instead of reading everything as grams"),
        )
        .arg(
            Arg::new("strict-probe")
                .long("strict-probe")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only accept ports whose probe response is a weight frame"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("error, warn, info, debug or trace"),
        )
        .subcommand(Command::new("serve").about("Serve /read-scale over HTTP (default)"))
        .subcommand(Command::new("ports").about("List candidate serial ports"))
        .subcommand(Command::new("read").about("Read the scale once and print the JSON response"))
        .subcommand(Command::new("watch").about("Poll the scale on the configured interval"))
        .subcommand(Command::new("tunnel").about("Show the tunnel manager status"))
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration file")
                .arg(Arg::new("path").required(true).help("Where to write the TOML file")),
        )
}

/// Loads the config file (if any) and applies command-line overrides.
pub fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_matches(matches)?;
    Ok(config)
}

/// Runs every subcommand except `serve`. Returns `false` when the caller
/// should fall through to serving.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    config: &Config,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(matches) = matches.subcommand_matches("init-config") {
        let path = matches
            .get_one::<String>("path")
            .ok_or("init-config needs a path")?;
        Config::default().save_to_file(path)?;
        println!("✅ Default configuration written to {}", path);
        return Ok(true);
    }

    if matches.subcommand_matches("ports").is_some() {
        let service = ReadingService::from_config(config);
        let candidates = service.prober().candidates();
        if candidates.is_empty() {
            println!("⚠️  No candidate serial ports found");
        }
        for (index, candidate) in candidates.iter().enumerate() {
            println!("   {}. {}", index + 1, candidate);
        }
        return Ok(true);
    }

    if matches.subcommand_matches("read").is_some() {
        info!("🔍 Executing single read...");
        let service = Arc::new(ReadingService::from_config(config));
        let worker = service.clone();
        let outcome = tokio::task::spawn_blocking(move || worker.get_weight()).await?;
        println!("{} {}", outcome.status_code(), outcome.body());
        service.shutdown();
        return Ok(true);
    }

    if matches.subcommand_matches("watch").is_some() {
        let service = Arc::new(ReadingService::from_config(config));
        let monitor = MonitorService::new(
            service.clone(),
            Duration::from_secs(config.monitor.poll_interval_seconds),
        );

        let runner = monitor.clone();
        let task = tokio::spawn(async move { runner.run().await });

        tokio::signal::ctrl_c().await?;
        monitor.stop().await;
        task.await?;

        let stats = monitor.stats().await;
        println!(
            "📊 {} polls: {} ok, {} not found, {} parse failures, {} I/O errors",
            stats.polls, stats.successes, stats.not_found, stats.parse_failures, stats.io_errors
        );
        service.shutdown();
        return Ok(true);
    }

    if matches.subcommand_matches("tunnel").is_some() {
        let provider = TunnelInfoProvider::new(&config.tunnel)?;
        let status = provider.get_tunnel_info().await;
        println!("{}", serde_json::to_string(&status)?);
        return Ok(true);
    }

    Ok(false)
}
