//! Trading loop configuration parsing from environment variables.

use super::env::EnvReader;
use crate::application::trading_loop::LoopConfig;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::Granularity;
use anyhow::{Context, Result};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopEnvConfig {
    pub symbols: Vec<TradingPair>,
    pub interval_ms: u64,
    pub dry_run: bool,
    pub base_position_size: Decimal,
    pub max_concurrent_trades: usize,
    pub enabled: bool,
    pub exchange_timeout_ms: u64,
    pub candle_granularity: Granularity,
    pub candle_limit: usize,
    pub depth_limit: usize,
    pub message_log_capacity: usize,
}

impl LoopEnvConfig {
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let defaults = LoopConfig::default();
        let symbols = env.list("SYMBOLS", &["BTCUSDT", "ETHUSDT"]);
        let symbols = TradingPair::parse_list(&symbols).context("Invalid SYMBOLS")?;

        let candle_granularity = match env.string("CANDLE_GRANULARITY") {
            Some(raw) => raw
                .parse::<Granularity>()
                .context("Invalid CANDLE_GRANULARITY")?,
            None => defaults.candle_granularity,
        };

        Ok(Self {
            symbols,
            interval_ms: env.parse("INTERVAL_MS", defaults.interval_ms)?,
            dry_run: env.flag("DRY_RUN", defaults.dry_run)?,
            base_position_size: env.parse("BASE_POSITION_SIZE", defaults.base_position_size)?,
            max_concurrent_trades: env
                .parse("MAX_CONCURRENT_TRADES", defaults.max_concurrent_trades)?,
            enabled: env.flag("TRADING_ENABLED", defaults.enabled)?,
            exchange_timeout_ms: env.parse("EXCHANGE_TIMEOUT_MS", defaults.exchange_timeout_ms)?,
            candle_granularity,
            candle_limit: env.parse("CANDLE_LIMIT", defaults.candle_limit)?,
            depth_limit: env.parse("DEPTH_LIMIT", defaults.depth_limit)?,
            message_log_capacity: env.parse("MESSAGE_LOG_CAPACITY", 200)?,
        })
    }

    /// Unvalidated; `TradingLoop::new` normalizes it
    pub fn to_loop_config(&self) -> LoopConfig {
        LoopConfig {
            symbols: self.symbols.clone(),
            interval_ms: self.interval_ms,
            dry_run: self.dry_run,
            base_position_size: self.base_position_size,
            max_concurrent_trades: self.max_concurrent_trades,
            enabled: self.enabled,
            exchange_timeout_ms: self.exchange_timeout_ms,
            candle_granularity: self.candle_granularity,
            candle_limit: self.candle_limit,
            depth_limit: self.depth_limit,
        }
    }
}
