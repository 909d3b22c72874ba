use super::traits::{AnalysisContext, Signal, TradingStrategy};
use crate::domain::market::strategy_config::StrategyConfig;
use crate::domain::trading::signal::StrategyKind;

/// Trend Following Strategy
///
/// Trades in the direction of the EMA9/EMA21 crossover:
/// - Buy when EMA9 is above EMA21, unless RSI is already overextended
/// - Sell when EMA9 is below EMA21, unless RSI is already washed out
#[derive(Debug, Clone)]
pub struct TrendFollowingStrategy {
    rsi_ceiling: f64,
    rsi_floor: f64,
    full_scale: f64,
    stop_atr: f64,
    target_atr: f64,
}

impl TrendFollowingStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            rsi_ceiling: config.trend_rsi_ceiling,
            rsi_floor: config.trend_rsi_floor,
            full_scale: config.trend_strength_full_scale,
            stop_atr: config.trend_stop_atr,
            target_atr: config.trend_target_atr,
        }
    }

    fn strength(&self, trend_strength: f64, momentum_agrees: bool) -> f64 {
        let base = (trend_strength / self.full_scale).min(1.0);
        // Momentum against the crossover halves conviction
        if momentum_agrees { base } else { base * 0.5 }
    }
}

impl TradingStrategy for TrendFollowingStrategy {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Option<Signal> {
        let ind = ctx.indicators;

        if ind.ema9 > ind.ema21 {
            if ind.rsi > self.rsi_ceiling {
                return None;
            }
            return Some(
                Signal::buy(format!(
                    "TrendFollowing: EMA9 {:.2} > EMA21 {:.2} (divergence {:.2}%, RSI {:.1})",
                    ind.ema9, ind.ema21, ind.trend_strength, ind.rsi
                ))
                .with_strength(self.strength(ind.trend_strength, ind.momentum >= 0.0)),
            );
        }

        if ind.ema9 < ind.ema21 {
            if ind.rsi < self.rsi_floor {
                return None;
            }
            return Some(
                Signal::sell(format!(
                    "TrendFollowing: EMA9 {:.2} < EMA21 {:.2} (divergence {:.2}%, RSI {:.1})",
                    ind.ema9, ind.ema21, ind.trend_strength, ind.rsi
                ))
                .with_strength(self.strength(ind.trend_strength, ind.momentum <= 0.0)),
            );
        }

        None
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendFollowing
    }

    fn exit_atr_multiples(&self) -> (f64, f64) {
        (self.stop_atr, self.target_atr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::indicators::TechnicalIndicators;
    use crate::domain::market::market_regime::{Regime, RegimeClassification, RegimeFeatures};
    use crate::domain::trading::trading_pair::TradingPair;
    use crate::domain::trading::types::OrderSide;
    use rust_decimal_macros::dec;

    fn indicators(ema9: f64, ema21: f64, rsi: f64, momentum: f64) -> TechnicalIndicators {
        TechnicalIndicators {
            atr: 100.0,
            ema9,
            ema21,
            rsi,
            volatility: 0.5,
            momentum,
            trend_strength: (ema9 - ema21).abs() / ema21 * 100.0,
        }
    }

    fn analyze(ind: &TechnicalIndicators) -> Option<Signal> {
        let regime = RegimeClassification {
            regime: Regime::Trending,
            confidence: 0.8,
            features: RegimeFeatures {
                momentum: ind.momentum,
                volatility: ind.volatility,
                trend_strength: ind.trend_strength,
            },
            timestamp: 0,
        };
        TrendFollowingStrategy::new(&StrategyConfig::default()).analyze(&AnalysisContext {
            symbol: TradingPair::BtcUsdt,
            regime: &regime,
            indicators: ind,
            last_price: dec!(30000),
            timestamp: 0,
        })
    }

    #[test]
    fn test_buy_on_bullish_divergence() {
        let signal = analyze(&indicators(30300.0, 30000.0, 55.0, 2.0)).unwrap();
        assert_eq!(signal.side, OrderSide::Buy);
        assert!((signal.strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sell_on_bearish_divergence() {
        let signal = analyze(&indicators(29850.0, 30000.0, 45.0, -1.0)).unwrap();
        assert_eq!(signal.side, OrderSide::Sell);
        assert!((signal.strength - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_overextended_rsi_skips_entry() {
        assert!(analyze(&indicators(30300.0, 30000.0, 85.0, 2.0)).is_none());
        assert!(analyze(&indicators(29700.0, 30000.0, 15.0, -2.0)).is_none());
    }

    #[test]
    fn test_opposing_momentum_halves_strength() {
        let signal = analyze(&indicators(30300.0, 30000.0, 55.0, -0.5)).unwrap();
        assert!((signal.strength - 0.5).abs() < 1e-9);
    }
}
