//! Serve command handler.
//!
//! Wires the platform providers into a `Telemetry` and runs the HTTP server
//! until `/exit` or Ctrl-C.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use crate::core::telemetry::{Providers, Telemetry};
use crate::core::Config;
use crate::platform::{foreground_watcher, PresentMonProvider, SystemMemory, SystemSensorProvider};
use crate::server::Server;

/// Apply command-line overrides on top of the stored configuration
pub fn resolve_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::load()?;

    if let Some(port) = matches
        .get_one::<u16>("port")
        .or_else(|| matches.get_one::<u16>("port-positional"))
    {
        config.set_port(*port);
    }
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind_address = bind.clone();
    }
    if let Some(path) = matches.get_one::<String>("presentmon") {
        config.set_presentmon_path(path.clone());
    }

    Ok(config)
}

/// Execute the serve command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;

    // Both collaborators are required; refuse to start without them
    let foreground = match foreground_watcher() {
        Ok(watcher) => watcher,
        Err(e) => {
            println!("{}", format!("This server is not available here: {}", e).red());
            return Err(e).context("Foreground process tracking unavailable");
        }
    };
    let frame_rate = PresentMonProvider::locate(
        config.get_presentmon_path().map(String::as_str),
        Duration::from_millis(config.fps_period_ms),
    )
    .context("Frame rate provider unavailable")?;
    log::info!("Using PresentMon at {}", frame_rate.binary().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("lemon-worker")
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let providers = Providers {
            sensors: Box::new(SystemSensorProvider::new()),
            memory: Box::new(SystemMemory::new()),
            foreground,
            frame_rate: Arc::new(frame_rate),
        };
        let telemetry = Telemetry::new(providers, tokio::runtime::Handle::current())
            .context("Failed to open hardware sensors")?;

        let address = config.listen_address();
        let server = Server::bind(
            &address,
            telemetry,
            Duration::from_millis(config.shutdown_grace_ms),
        )
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

        println!(
            "{} {}",
            "Server started on".green(),
            format!("http://{}/", address).cyan().bold()
        );

        let shutdown = server.shutdown_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupted, shutting down");
                shutdown.cancel();
            }
        });

        server.run().await.context("Server failed")
    })
}
