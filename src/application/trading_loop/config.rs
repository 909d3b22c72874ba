use crate::domain::errors::ConfigError;
use crate::domain::market::indicators::MIN_CANDLES;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::Granularity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MIN_INTERVAL_MS: u64 = 10_000;
pub const MAX_CONCURRENT_TRADES_LIMIT: usize = 5;

/// Process-wide loop configuration. Read by every cycle, changed only through `configure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Deduplicated, in configuration order
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
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            symbols: vec![TradingPair::BtcUsdt, TradingPair::EthUsdt],
            interval_ms: 60_000,
            dry_run: true,
            base_position_size: Decimal::new(1, 2),
            max_concurrent_trades: 2,
            enabled: true,
            exchange_timeout_ms: 5_000,
            candle_granularity: Granularity::FifteenMinutes,
            candle_limit: 100,
            depth_limit: 5,
        }
    }
}

impl LoopConfig {
    /// Clamps soft bounds and rejects invalid values
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        let mut unique = Vec::with_capacity(self.symbols.len());
        for symbol in self.symbols {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }
        self.symbols = unique;
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptySymbols);
        }

        if self.base_position_size <= Decimal::ZERO {
            return Err(ConfigError::InvalidPositionSize {
                value: self.base_position_size.to_string(),
            });
        }

        if self.interval_ms < MIN_INTERVAL_MS {
            warn!(
                "LoopConfig: interval {}ms below floor, using {}ms",
                self.interval_ms, MIN_INTERVAL_MS
            );
            self.interval_ms = MIN_INTERVAL_MS;
        }

        self.max_concurrent_trades = self
            .max_concurrent_trades
            .clamp(1, MAX_CONCURRENT_TRADES_LIMIT);

        if self.exchange_timeout_ms == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "exchange_timeout_ms".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.candle_limit < MIN_CANDLES {
            return Err(ConfigError::InvalidParameter {
                name: "candle_limit".to_string(),
                reason: format!("need at least {} candles, got {}", MIN_CANDLES, self.candle_limit),
            });
        }
        if self.depth_limit == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "depth_limit".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(self)
    }

    /// Returns the updated config, or the first error with `self` untouched
    pub fn apply(&self, update: LoopConfigUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(symbols) = update.symbols {
            next.symbols = TradingPair::parse_list(&symbols)?;
        }
        if let Some(interval_ms) = update.interval_ms {
            next.interval_ms = interval_ms;
        }
        if let Some(dry_run) = update.dry_run {
            next.dry_run = dry_run;
        }
        if let Some(size) = update.base_position_size {
            next.base_position_size = size;
        }
        if let Some(max) = update.max_concurrent_trades {
            next.max_concurrent_trades = max;
        }
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        next.normalized()
    }
}

/// Partial configuration change. Symbols arrive as raw strings and are validated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopConfigUpdate {
    pub symbols: Option<Vec<String>>,
    pub interval_ms: Option<u64>,
    pub dry_run: Option<bool>,
    pub base_position_size: Option<Decimal>,
    pub max_concurrent_trades: Option<usize>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoopConfig::default().normalized().unwrap();
        assert_eq!(config, LoopConfig::default());
    }

    #[test]
    fn test_interval_floor_and_concurrency_clamp() {
        let config = LoopConfig::default()
            .apply(LoopConfigUpdate {
                interval_ms: Some(500),
                max_concurrent_trades: Some(12),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.interval_ms, MIN_INTERVAL_MS);
        assert_eq!(config.max_concurrent_trades, 5);

        let config = LoopConfig::default()
            .apply(LoopConfigUpdate {
                max_concurrent_trades: Some(0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.max_concurrent_trades, 1);
    }

    #[test]
    fn test_unsupported_symbol_rejected() {
        let err = LoopConfig::default()
            .apply(LoopConfigUpdate {
                symbols: Some(vec!["BTCUSDT".to_string(), "PEPEUSDT".to_string()]),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedSymbol { .. }));
    }

    #[test]
    fn test_symbols_deduplicated() {
        let config = LoopConfig::default()
            .apply(LoopConfigUpdate {
                symbols: Some(vec!["SOLUSDT".into(), "sol/usdt".into(), "BTCUSDT".into()]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.symbols, vec![TradingPair::SolUsdt, TradingPair::BtcUsdt]);
    }

    #[test]
    fn test_non_positive_base_size_rejected() {
        for size in [dec!(0), dec!(-1)] {
            let err = LoopConfig::default()
                .apply(LoopConfigUpdate {
                    base_position_size: Some(size),
                    ..Default::default()
                })
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPositionSize { .. }));
        }
    }

    #[test]
    fn test_empty_symbols_rejected() {
        let err = LoopConfig::default()
            .apply(LoopConfigUpdate {
                symbols: Some(vec![]),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptySymbols);
    }
}
