#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Real-Time 911 watcher.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sea_fires_watcher::config::WatcherConfig;
use sea_fires_watcher::{Watcher, init_logger, present};

#[derive(Parser)]
#[command(
    name = "sea_fires_watcher",
    about = "Reports Seattle Fire incidents opening and closing near you"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed until interrupted (the default)
    Run,
    /// Run a single poll cycle and exit
    Once,
    /// Print the active rows of a saved dispatch page
    Parse {
        /// HTML file saved from the feed
        file: PathBuf,
        /// Print rows as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = WatcherConfig::load(&cli.config)?;
            let mut watcher = Watcher::new(&config)?;
            watcher.run_forever().await;
        }
        Commands::Once => {
            let config = WatcherConfig::load(&cli.config)?;
            let mut watcher = Watcher::new(&config)?;
            let events = watcher.run_cycle().await?;
            present(&events);
            log::info!("{} open incident(s)", watcher.reconciler().len());
        }
        Commands::Parse { file, json } => {
            let document = std::fs::read_to_string(&file)?;
            let rows = sea_fires_feed::parse_rows(&document);

            if json {
                for row in &rows {
                    println!("{}", serde_json::to_string(row)?);
                }
            } else {
                println!(
                    "{:<24} {:<12} {:>5}  {:<24} {:<32} UNITS",
                    "TIME", "ID", "LEVEL", "TYPE", "LOCATION"
                );
                println!("{}", "-".repeat(110));
                for row in &rows {
                    println!(
                        "{:<24} {:<12} {:>5}  {:<24} {:<32} {}",
                        row.timestamp_text,
                        row.id,
                        row.level(),
                        row.type_text,
                        row.location_text,
                        row.units_text
                    );
                }
            }
            log::info!("{} active row(s) in {}", rows.len(), file.display());
        }
    }

    Ok(())
}
