use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    TrendFollowing,
    MeanReversion,
    NoTrade,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::TrendFollowing => write!(f, "TREND_FOLLOWING"),
            StrategyKind::MeanReversion => write!(f, "MEAN_REVERSION"),
            StrategyKind::NoTrade => write!(f, "NO_TRADE"),
        }
    }
}

/// Raw strategy output, before the risk gate is applied.
///
/// `size` is a fraction of the configured base position size in [0, 1].
/// A `NoTrade` signal has no side and zero size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeSignal {
    pub symbol: TradingPair,
    pub side: Option<OrderSide>,
    pub strategy: StrategyKind,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub size: Decimal,
    pub confidence: f64,
    pub reason: String,
    pub timestamp: i64,
}

impl TradeSignal {
    pub fn no_trade(
        symbol: TradingPair,
        last_price: Decimal,
        reason: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol,
            side: None,
            strategy: StrategyKind::NoTrade,
            entry_price: last_price,
            stop_loss: last_price,
            take_profit: last_price,
            size: Decimal::ZERO,
            confidence: 0.0,
            reason: reason.into(),
            timestamp,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.strategy != StrategyKind::NoTrade && self.side.is_some() && self.size > Decimal::ZERO
    }
}
