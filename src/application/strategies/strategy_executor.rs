use super::mean_reversion::MeanReversionStrategy;
use super::traits::{AnalysisContext, TradingStrategy};
use super::trend_following::TrendFollowingStrategy;
use crate::domain::market::indicators::TechnicalIndicators;
use crate::domain::market::market_regime::{Regime, RegimeClassification};
use crate::domain::market::strategy_config::StrategyConfig;
use crate::domain::trading::signal::TradeSignal;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Picks the strategy for the current regime and turns its setup into a priced signal.
pub struct StrategyExecutor {
    trend: Box<dyn TradingStrategy>,
    reversion: Box<dyn TradingStrategy>,
}

impl StrategyExecutor {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            trend: Box::new(TrendFollowingStrategy::new(config)),
            reversion: Box::new(MeanReversionStrategy::new(config)),
        }
    }

    pub fn generate(
        &self,
        symbol: TradingPair,
        regime: &RegimeClassification,
        indicators: &TechnicalIndicators,
        last_price: Decimal,
        timestamp: i64,
    ) -> TradeSignal {
        let strategy = match regime.regime {
            Regime::HighVolatility => {
                return TradeSignal::no_trade(
                    symbol,
                    last_price,
                    "High volatility regime: standing aside",
                    timestamp,
                );
            }
            Regime::Trending => self.trend.as_ref(),
            Regime::RangeBound => self.reversion.as_ref(),
        };

        let ctx = AnalysisContext {
            symbol,
            regime,
            indicators,
            last_price,
            timestamp,
        };

        let Some(setup) = strategy.analyze(&ctx) else {
            return TradeSignal::no_trade(
                symbol,
                last_price,
                format!("{} regime: no qualifying {} setup", regime.regime, strategy.kind()),
                timestamp,
            );
        };

        let (stop_mult, target_mult) = strategy.exit_atr_multiples();
        let (Some(stop_distance), Some(target_distance)) = (
            Decimal::from_f64(indicators.atr * stop_mult),
            Decimal::from_f64(indicators.atr * target_mult),
        ) else {
            return TradeSignal::no_trade(
                symbol,
                last_price,
                format!("ATR {} not representable", indicators.atr),
                timestamp,
            );
        };

        let (stop_loss, take_profit) = match setup.side {
            OrderSide::Buy => (last_price - stop_distance, last_price + target_distance),
            OrderSide::Sell => (last_price + stop_distance, last_price - target_distance),
        };
        if stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO || stop_distance <= Decimal::ZERO {
            return TradeSignal::no_trade(
                symbol,
                last_price,
                format!(
                    "Degenerate exits for {} (stop {}, target {})",
                    setup.side, stop_loss, take_profit
                ),
                timestamp,
            );
        }

        let confidence = (0.5 * regime.confidence + 0.5 * setup.strength).clamp(0.0, 1.0);
        let size = Decimal::from_f64(confidence)
            .unwrap_or(Decimal::ZERO)
            .round_dp(4);

        TradeSignal {
            symbol,
            side: Some(setup.side),
            strategy: strategy.kind(),
            entry_price: last_price,
            stop_loss: stop_loss.round_dp(8),
            take_profit: take_profit.round_dp(8),
            size,
            confidence,
            reason: setup.reason,
            timestamp,
        }
    }
}
