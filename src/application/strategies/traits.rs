use crate::domain::market::indicators::TechnicalIndicators;
use crate::domain::market::market_regime::RegimeClassification;
use crate::domain::trading::signal::StrategyKind;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;

/// Inputs visible to an entry strategy for one symbol and one cycle
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub symbol: TradingPair,
    pub regime: &'a RegimeClassification,
    pub indicators: &'a TechnicalIndicators,
    pub last_price: Decimal,
    pub timestamp: i64,
}

/// Qualifying setup found by a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub side: OrderSide,
    /// How strongly the indicators back the setup, 0.0 to 1.0
    pub strength: f64,
    pub reason: String,
}

impl Signal {
    pub fn buy(reason: impl Into<String>) -> Self {
        Self {
            side: OrderSide::Buy,
            strength: 0.5,
            reason: reason.into(),
        }
    }

    pub fn sell(reason: impl Into<String>) -> Self {
        Self {
            side: OrderSide::Sell,
            strength: 0.5,
            reason: reason.into(),
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = if strength.is_nan() {
            0.0
        } else {
            strength.clamp(0.0, 1.0)
        };
        self
    }
}

pub trait TradingStrategy: Send + Sync {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Option<Signal>;
    fn kind(&self) -> StrategyKind;
    /// (stop, target) distances in ATR units
    fn exit_atr_multiples(&self) -> (f64, f64);
}
