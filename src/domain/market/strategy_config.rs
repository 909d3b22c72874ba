use crate::domain::errors::ConfigError;

/// Entry rules and ATR-scaled exits for regime strategies
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Trend entries are skipped when RSI is already this stretched
    pub trend_rsi_ceiling: f64,
    pub trend_rsi_floor: f64,
    /// Trend strength (%) mapped to full indicator strength
    pub trend_strength_full_scale: f64,
    pub trend_stop_atr: f64,
    pub trend_target_atr: f64,
    pub reversion_stop_atr: f64,
    pub reversion_target_atr: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            trend_rsi_ceiling: 80.0,
            trend_rsi_floor: 20.0,
            trend_strength_full_scale: 1.0,
            trend_stop_atr: 1.5,
            trend_target_atr: 3.0,
            reversion_stop_atr: 1.0,
            reversion_target_atr: 1.5,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 < self.rsi_oversold && self.rsi_oversold < self.rsi_overbought && self.rsi_overbought < 100.0) {
            return Err(ConfigError::InvalidParameter {
                name: "rsi bounds".to_string(),
                reason: format!(
                    "need 0 < oversold ({}) < overbought ({}) < 100",
                    self.rsi_oversold, self.rsi_overbought
                ),
            });
        }
        for (name, value) in [
            ("trend_strength_full_scale", self.trend_strength_full_scale),
            ("trend_stop_atr", self.trend_stop_atr),
            ("trend_target_atr", self.trend_target_atr),
            ("reversion_stop_atr", self.reversion_stop_atr),
            ("reversion_target_atr", self.reversion_target_atr),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("must be > 0, got {}", value),
                });
            }
        }
        Ok(())
    }
}
