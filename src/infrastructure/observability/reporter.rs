//! Push-based status reporter
//!
//! Periodically outputs the loop status as structured JSON to stdout.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::application::trading_loop::{LoopState, TradingLoop};
use crate::domain::trading::trading_pair::TradingPair;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub trading_loop: LoopSnapshot,
    pub symbols: Vec<SymbolSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct LoopSnapshot {
    pub running: bool,
    pub dry_run: bool,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<i64>,
    pub kill_switches_tripped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub regime: String,
    pub regime_confidence: f64,
    pub risk_level: String,
    pub size_multiplier: f64,
    pub outcome: String,
    pub decided_at: i64,
}

/// Outputs `METRICS_JSON:` lines on a fixed interval.
/// No HTTP server, no incoming connections.
pub struct MetricsReporter {
    trading_loop: Arc<TradingLoop>,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(trading_loop: Arc<TradingLoop>, interval_seconds: u64) -> Self {
        Self {
            trading_loop,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot().await;
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Cycles: {} | Tripped: {:?} | Uptime: {}s",
                        snapshot.trading_loop.cycles_completed,
                        snapshot.trading_loop.kill_switches_tripped,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    pub async fn collect_snapshot(&self) -> MetricsSnapshot {
        let config = self.trading_loop.get_config().await;
        let state = self.trading_loop.get_state().await;

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trading_loop: LoopSnapshot {
                running: state.is_running(),
                dry_run: config.dry_run,
                cycles_completed: state.cycles_completed,
                last_cycle_at: state.last_cycle_at,
                kill_switches_tripped: state
                    .tripped_symbols()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            symbols: symbol_snapshots(&state, &config.symbols),
        }
    }
}

fn symbol_snapshots(state: &LoopState, symbols: &[TradingPair]) -> Vec<SymbolSnapshot> {
    symbols
        .iter()
        .filter_map(|symbol| state.last_decisions.get(symbol))
        .map(|d| SymbolSnapshot {
            symbol: d.symbol.to_string(),
            regime: d.regime.regime.to_string(),
            regime_confidence: d.regime.confidence,
            risk_level: d.risk.risk_level.to_string(),
            size_multiplier: d.effective_multiplier,
            outcome: d.outcome.label().to_string(),
            decided_at: d.timestamp,
        })
        .collect()
}
