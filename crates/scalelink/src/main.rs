//! Scalelink - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use scalelink::config::Config;
use scalelink::delivery::key_map_lines;
use scalelink::models::Action;
use scalelink::store::{CatalogStore, PgStore};
use scalelink::{ChangeLog, Cli, Commands, CycleReport, DeliveryCycle, FtpTransport};
use scalelink_common::logging::{init_logging, LogConfig, LogLevel};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("scalelink")
        .filter_directives("sqlx=warn,suppaftp=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    match execute_command(&cli).await {
        Ok(true) => {},
        Ok(false) => process::exit(1),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            process::exit(1);
        },
    }
}

/// Run the command; `Ok(false)` when some scale systems could not be served
async fn execute_command(cli: &Cli) -> Result<bool> {
    let config = Config::load()?;
    let store = Arc::new(
        PgStore::connect(&config.database)
            .await
            .context("Failed to connect to the database")?,
    );

    match &cli.command {
        Commands::Send => {
            let cycle = DeliveryCycle::new(store, FtpTransport::new(), config.delivery_settings());
            let report = cycle.run().await?;
            Ok(summarize(&report))
        },

        Commands::SendIds { ids } => {
            let cycle = DeliveryCycle::new(store, FtpTransport::new(), config.delivery_settings());
            let report = cycle.send_entries(ids).await?;
            Ok(summarize(&report))
        },

        Commands::Pending => {
            let count = ChangeLog::new(store).pending_count().await?;
            println!("{}", count);
            Ok(true)
        },

        Commands::Keymap { system } => {
            let system = store.scale_system(*system).await?;
            let query = config.delivery_settings().slot_query;
            let occupied = store.occupied_slots(&query).await?;
            for line in key_map_lines(&query, &occupied, system.encoding) {
                print!("{}", line);
            }
            Ok(true)
        },

        Commands::Record { action, product, system } => {
            let action: Action = action.parse().map_err(anyhow::Error::msg)?;
            let id = ChangeLog::new(store).record_change(action, *product, *system).await?;
            println!("{}", id);
            Ok(true)
        },

        Commands::Refresh { id } => {
            let entry = ChangeLog::new(store).refresh(*id).await?;
            print!("{}", entry.product_text);
            Ok(true)
        },
    }
}

fn summarize(report: &CycleReport) -> bool {
    if report.skipped {
        info!("Another delivery cycle is running");
        return true;
    }
    for (system_id, message) in &report.failed_systems {
        eprintln!("Scale system {}: {}", system_id, message);
    }
    report.is_success()
}
