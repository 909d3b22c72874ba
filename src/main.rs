//! regime-pilot: explainable regime-aware trading loop
//!
//! Runs against the built-in simulated exchange. Metrics are pushed via
//! structured JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! regime-pilot once --symbols BTCUSDT,ETHUSDT
//! regime-pilot run --interval-ms 30000
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use regime_pilot::application::trading_loop::TradingLoop;
use regime_pilot::config::Config;
use regime_pilot::domain::ports::{AuditLogger, ExchangeClient};
use regime_pilot::domain::trading::trading_pair::TradingPair;
use regime_pilot::infrastructure::observability::{Metrics, MetricsReporter};
use regime_pilot::infrastructure::persistence::{Database, SqliteAuditLogger};
use regime_pilot::infrastructure::simulation::SimulatedExchange;
use regime_pilot::infrastructure::{CircuitBreaker, CircuitBreakingExchange, InMemoryAuditLog};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the timer loop until Ctrl+C
    Run(LoopArgs),
    /// Run one cycle over all symbols and print the report as JSON
    Once(LoopArgs),
}

#[derive(Args, Clone)]
struct LoopArgs {
    /// Symbol(s) to trade (comma separated), overrides SYMBOLS
    #[arg(short, long)]
    symbols: Option<String>,

    /// Submit orders instead of dry-running them
    #[arg(long)]
    live: bool,

    /// Milliseconds between cycles, overrides INTERVAL_MS
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl LoopArgs {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(symbols) = &self.symbols {
            let list: Vec<&str> = symbols.split(',').map(str::trim).collect();
            config.trading_loop.symbols =
                TradingPair::parse_list(&list).context("Invalid --symbols")?;
        }
        if self.live {
            config.trading_loop.dry_run = false;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.trading_loop.interval_ms = interval_ms;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    let args = match &cli.command {
        Commands::Run(args) | Commands::Once(args) => args.clone(),
    };
    args.apply(&mut config)?;

    info!("regime-pilot {} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: Symbols={:?}, DryRun={}, Interval={}ms",
        config.trading_loop.symbols, config.trading_loop.dry_run, config.trading_loop.interval_ms
    );

    let trading_loop = build_loop(&config).await?;

    match cli.command {
        Commands::Once(_) => {
            let report = trading_loop.run_single_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run(_) => {
            trading_loop.start().await?;

            if config.observability.enabled {
                let reporter = MetricsReporter::new(
                    Arc::clone(&trading_loop),
                    config.observability.interval_seconds,
                );
                tokio::spawn(async move {
                    reporter.run().await;
                });
                info!(
                    "Metrics reporter started (interval: {}s)",
                    config.observability.interval_seconds
                );
            } else {
                info!("Metrics reporting disabled.");
            }

            info!("Trading loop running. Press Ctrl+C to shutdown.");
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received, waiting for the current cycle...");
            trading_loop.stop().await;
        }
    }

    Ok(())
}

async fn build_loop(config: &Config) -> Result<Arc<TradingLoop>> {
    let simulated = SimulatedExchange::new(config.simulation.to_simulation_config());
    let exchange: Arc<dyn ExchangeClient> = Arc::new(CircuitBreakingExchange::new(
        Arc::new(simulated),
        CircuitBreaker::new("exchange", 5, 2, Duration::from_secs(30)),
    ));

    let audit: Arc<dyn AuditLogger> = match &config.audit_database_url {
        Some(url) => {
            let db = Database::new(url).await?;
            Arc::new(SqliteAuditLogger::new(db.pool.clone()))
        }
        None => {
            warn!("AUDIT_DATABASE_URL not set, audit records are kept in memory only");
            Arc::new(InMemoryAuditLog::new())
        }
    };

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let settings = config.to_settings()?;
    let trading_loop = TradingLoop::new(exchange, audit, metrics, settings)?;
    Ok(trading_loop)
}
