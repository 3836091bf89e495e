mod cli;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use edgar_core::{config::load_dotenv, Config};
use edgar_warehouse::{SnowflakeClient, Warehouse};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let args = CliArgs::parse();
    let warehouse: Arc<dyn Warehouse> = Arc::new(
        SnowflakeClient::new(config.warehouse.clone()).context("connecting to the warehouse")?,
    );

    let tickers = if args.tickers.is_empty() {
        config.target_companies.clone()
    } else {
        args.tickers.iter().map(|t| t.to_uppercase()).collect()
    };

    match args.command {
        Command::Process { filing_type, limit } => {
            commands::run_process(warehouse, &config, &tickers, filing_type.as_deref(), limit)
                .await?;
        }
        Command::Embed => {
            commands::run_embed(warehouse, &config).await?;
        }
        Command::Metrics => {
            commands::run_metrics(warehouse, &config, &tickers).await?;
        }
        Command::Risks => {
            commands::run_risks(warehouse, &config, &tickers).await?;
        }
        Command::All => {
            info!("running full pipeline");
            commands::run_process(warehouse.clone(), &config, &tickers, None, 20).await?;
            commands::run_embed(warehouse.clone(), &config).await?;
            commands::run_metrics(warehouse.clone(), &config, &tickers).await?;
            commands::run_risks(warehouse, &config, &tickers).await?;
        }
    }

    Ok(())
}
