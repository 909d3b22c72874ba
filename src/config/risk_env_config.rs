//! Risk engine configuration parsing from environment variables.

use super::env::EnvReader;
use crate::domain::risk::risk_config::RiskConfig;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskEnvConfig {
    pub risk: RiskConfig,
}

impl RiskEnvConfig {
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let d = RiskConfig::default();
        Ok(Self {
            risk: RiskConfig {
                max_daily_loss_pct: env.parse("MAX_DAILY_LOSS_PCT", d.max_daily_loss_pct)?,
                max_drawdown_pct: env.parse("MAX_DRAWDOWN_PCT", d.max_drawdown_pct)?,
                consecutive_loss_limit: env
                    .parse("CONSECUTIVE_LOSS_LIMIT", d.consecutive_loss_limit)?,
                trade_cooldown_seconds: env
                    .parse("TRADE_COOLDOWN_SECONDS", d.trade_cooldown_seconds)?,
                high_confidence_threshold: env
                    .parse("HIGH_CONFIDENCE_THRESHOLD", d.high_confidence_threshold)?,
                high_volatility_size_multiplier: env.parse(
                    "HIGH_VOLATILITY_SIZE_MULTIPLIER",
                    d.high_volatility_size_multiplier,
                )?,
                neutral_size_multiplier: env
                    .parse("NEUTRAL_SIZE_MULTIPLIER", d.neutral_size_multiplier)?,
                max_spread_bps: env.parse("MAX_SPREAD_BPS", d.max_spread_bps)?,
                max_exposure_ratio: env.parse("MAX_EXPOSURE_RATIO", d.max_exposure_ratio)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_risk_config_defaults() {
        let config = RiskEnvConfig::from_reader(&EnvReader::from_map::<&str, &str>([])).unwrap();
        assert_eq!(config.risk, RiskConfig::default());
    }

    #[test]
    fn test_risk_overrides() {
        let env = EnvReader::from_map([("MAX_DAILY_LOSS_PCT", "2.5"), ("MAX_SPREAD_BPS", "10")]);
        let config = RiskEnvConfig::from_reader(&env).unwrap();
        assert_eq!(config.risk.max_daily_loss_pct, 2.5);
        assert_eq!(config.risk.max_spread_bps, dec!(10));
    }
}
