use crate::domain::errors::ConfigError;
use rust_decimal::Decimal;

/// Risk engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub max_daily_loss_pct: f64, // % of day-start equity (e.g., 5.0 = 5%)
    pub max_drawdown_pct: f64,   // % drop from the intraday PnL peak
    pub consecutive_loss_limit: usize, // Losses tolerated before cooldown
    pub trade_cooldown_seconds: i64,
    pub high_confidence_threshold: f64,
    pub high_volatility_size_multiplier: f64,
    pub neutral_size_multiplier: f64,
    /// Spread above which entries are skipped
    pub max_spread_bps: Decimal,
    /// Open notional / equity above which no new exposure is added
    pub max_exposure_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: 5.0,
            max_drawdown_pct: 10.0,
            consecutive_loss_limit: 3,
            trade_cooldown_seconds: 300,
            high_confidence_threshold: 0.7,
            high_volatility_size_multiplier: 0.5,
            neutral_size_multiplier: 0.75,
            max_spread_bps: Decimal::from(25),
            max_exposure_ratio: 3.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, value: String| ConfigError::InvalidParameter {
            name: name.to_string(),
            reason: format!("out of range: {}", value),
        };

        if !(self.max_daily_loss_pct > 0.0 && self.max_daily_loss_pct <= 100.0) {
            return Err(invalid("max_daily_loss_pct", self.max_daily_loss_pct.to_string()));
        }
        if !(self.max_drawdown_pct > 0.0 && self.max_drawdown_pct <= 100.0) {
            return Err(invalid("max_drawdown_pct", self.max_drawdown_pct.to_string()));
        }
        if self.consecutive_loss_limit == 0 {
            return Err(invalid("consecutive_loss_limit", "0".to_string()));
        }
        if self.trade_cooldown_seconds < 0 {
            return Err(invalid(
                "trade_cooldown_seconds",
                self.trade_cooldown_seconds.to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.high_confidence_threshold) {
            return Err(invalid(
                "high_confidence_threshold",
                self.high_confidence_threshold.to_string(),
            ));
        }
        for (name, value) in [
            ("high_volatility_size_multiplier", self.high_volatility_size_multiplier),
            ("neutral_size_multiplier", self.neutral_size_multiplier),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, value.to_string()));
            }
        }
        if self.max_spread_bps <= Decimal::ZERO {
            return Err(invalid("max_spread_bps", self.max_spread_bps.to_string()));
        }
        if !(self.max_exposure_ratio > 0.0) {
            return Err(invalid("max_exposure_ratio", self.max_exposure_ratio.to_string()));
        }
        Ok(())
    }
}
