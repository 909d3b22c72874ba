use super::traits::{AnalysisContext, Signal, TradingStrategy};
use crate::domain::market::strategy_config::StrategyConfig;
use crate::domain::trading::signal::StrategyKind;

/// Mean Reversion Strategy
///
/// Fades RSI extremes in a range-bound market.
/// - Buy: RSI is oversold (< 30)
/// - Sell: RSI is overbought (> 70)
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    oversold: f64,
    overbought: f64,
    stop_atr: f64,
    target_atr: f64,
}

impl MeanReversionStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            oversold: config.rsi_oversold,
            overbought: config.rsi_overbought,
            stop_atr: config.reversion_stop_atr,
            target_atr: config.reversion_target_atr,
        }
    }
}

impl TradingStrategy for MeanReversionStrategy {
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Option<Signal> {
        let rsi = ctx.indicators.rsi;

        if rsi < self.oversold {
            return Some(
                Signal::buy(format!("MeanReversion: RSI {:.1} < {}", rsi, self.oversold))
                    .with_strength((self.oversold - rsi) / self.oversold),
            );
        }

        if rsi > self.overbought {
            return Some(
                Signal::sell(format!("MeanReversion: RSI {:.1} > {}", rsi, self.overbought))
                    .with_strength((rsi - self.overbought) / (100.0 - self.overbought)),
            );
        }

        None
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn exit_atr_multiples(&self) -> (f64, f64) {
        (self.stop_atr, self.target_atr)
    }
}
