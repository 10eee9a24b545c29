use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn handle_config(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set-port", sub_matches)) => {
            let port = sub_matches
                .get_one::<u16>("port")
                .context("Port argument is required")?;
            set_port(*port)
        }
        Some(("set-presentmon", sub_matches)) => {
            let path = sub_matches
                .get_one::<String>("path")
                .context("Path argument is required")?;
            set_presentmon(path)
        }
        _ => {
            println!("Use 'lemon-server config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    let path = Config::get_config_path()?;

    println!("{} {}", "Config file:".white(), path.display().to_string().dimmed());
    println!("  port:              {}", config.port.to_string().cyan());
    println!("  bind_address:      {}", config.bind_address.cyan());
    println!(
        "  presentmon_path:   {}",
        config
            .get_presentmon_path()
            .map(|p| p.cyan())
            .unwrap_or_else(|| "(search PATH)".dimmed())
    );
    println!("  fps_period_ms:     {}", config.fps_period_ms);
    println!("  shutdown_grace_ms: {}", config.shutdown_grace_ms);
    Ok(())
}

fn set_port(port: u16) -> Result<()> {
    let mut config = Config::load()?;
    config.set_port(port);
    config.save()?;

    println!("{} {}", "✓ Port set to:".green(), port);
    Ok(())
}

fn set_presentmon(path: &str) -> Result<()> {
    let path_buf = Path::new(path);
    if !path_buf.is_file() {
        println!(
            "{}",
            format!("⚠️  Warning: '{}' is not a file", path).yellow()
        );
        println!(
            "{}",
            "The path will be saved but the server will refuse to start until it exists.".dimmed()
        );
    }

    let canonical_path = if path_buf.exists() {
        path_buf
            .canonicalize()
            .map_err(|e| anyhow::anyhow!("Failed to resolve path: {}", e))?
            .to_string_lossy()
            .to_string()
    } else {
        path.to_string()
    };

    let mut config = Config::load()?;
    config.set_presentmon_path(canonical_path.clone());
    config.save()?;

    println!("{} {}", "✓ PresentMon path set to:".green(), canonical_path);
    Ok(())
}
