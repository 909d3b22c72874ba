//! Regime, strategy and volatility-guard parameters from environment variables.

use super::env::EnvReader;
use crate::domain::market::market_regime::RegimeConfig;
use crate::domain::market::strategy_config::StrategyConfig;
use crate::domain::risk::volatility_guard::{KillSwitchPolicy, VolatilityGuardConfig};
use anyhow::{Result, anyhow};

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEnvConfig {
    pub regime: RegimeConfig,
    pub strategy: StrategyConfig,
    pub volatility_guard: VolatilityGuardConfig,
}

impl StrategyEnvConfig {
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let r = RegimeConfig::default();
        let s = StrategyConfig::default();
        let g = VolatilityGuardConfig::default();

        let policy = match env.string("KILL_SWITCH_POLICY") {
            Some(raw) => parse_kill_switch_policy(&raw)?,
            None => g.policy,
        };

        Ok(Self {
            regime: RegimeConfig {
                trend_strength_threshold: env
                    .parse("TREND_STRENGTH_THRESHOLD", r.trend_strength_threshold)?,
                volatility_threshold: env.parse("VOLATILITY_THRESHOLD", r.volatility_threshold)?,
            },
            strategy: StrategyConfig {
                rsi_oversold: env.parse("RSI_OVERSOLD", s.rsi_oversold)?,
                rsi_overbought: env.parse("RSI_OVERBOUGHT", s.rsi_overbought)?,
                trend_rsi_ceiling: env.parse("TREND_RSI_CEILING", s.trend_rsi_ceiling)?,
                trend_rsi_floor: env.parse("TREND_RSI_FLOOR", s.trend_rsi_floor)?,
                trend_strength_full_scale: env
                    .parse("TREND_STRENGTH_FULL_SCALE", s.trend_strength_full_scale)?,
                trend_stop_atr: env.parse("TREND_STOP_ATR", s.trend_stop_atr)?,
                trend_target_atr: env.parse("TREND_TARGET_ATR", s.trend_target_atr)?,
                reversion_stop_atr: env.parse("REVERSION_STOP_ATR", s.reversion_stop_atr)?,
                reversion_target_atr: env.parse("REVERSION_TARGET_ATR", s.reversion_target_atr)?,
            },
            volatility_guard: VolatilityGuardConfig {
                window_size: env.parse("VOLATILITY_WINDOW", g.window_size)?,
                spike_k: env.parse("VOLATILITY_SPIKE_K", g.spike_k)?,
                kill_switch_spikes: env.parse("KILL_SWITCH_SPIKES", g.kill_switch_spikes)?,
                policy,
                ..g
            },
        })
    }
}

/// `manual` or `auto:<calm cycles>`
pub fn parse_kill_switch_policy(raw: &str) -> Result<KillSwitchPolicy> {
    let raw = raw.trim().to_lowercase();
    if raw == "manual" {
        return Ok(KillSwitchPolicy::ManualReset);
    }
    if let Some(cycles) = raw.strip_prefix("auto:") {
        let calm_cycles = cycles
            .parse::<usize>()
            .map_err(|e| anyhow!("Invalid KILL_SWITCH_POLICY {:?}: {}", raw, e))?;
        if calm_cycles == 0 {
            anyhow::bail!("KILL_SWITCH_POLICY auto reset needs at least one calm cycle");
        }
        return Ok(KillSwitchPolicy::AutoReset { calm_cycles });
    }
    anyhow::bail!(
        "Invalid KILL_SWITCH_POLICY: {}. Must be 'manual' or 'auto:<cycles>'",
        raw
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_switch_policy_parsing() {
        assert_eq!(
            parse_kill_switch_policy("manual").unwrap(),
            KillSwitchPolicy::ManualReset
        );
        assert_eq!(
            parse_kill_switch_policy("AUTO:4").unwrap(),
            KillSwitchPolicy::AutoReset { calm_cycles: 4 }
        );
        assert!(parse_kill_switch_policy("auto:0").is_err());
        assert!(parse_kill_switch_policy("auto:x").is_err());
        assert!(parse_kill_switch_policy("sometimes").is_err());
    }

    #[test]
    fn test_guard_overrides_keep_other_defaults() {
        let env = EnvReader::from_map([
            ("VOLATILITY_WINDOW", "30"),
            ("KILL_SWITCH_POLICY", "auto:3"),
            ("VOLATILITY_THRESHOLD", "3.0"),
        ]);
        let config = StrategyEnvConfig::from_reader(&env).unwrap();
        assert_eq!(config.volatility_guard.window_size, 30);
        assert_eq!(
            config.volatility_guard.policy,
            KillSwitchPolicy::AutoReset { calm_cycles: 3 }
        );
        assert_eq!(
            config.volatility_guard.min_samples,
            VolatilityGuardConfig::default().min_samples
        );
        assert_eq!(config.regime.volatility_threshold, 3.0);
        assert_eq!(config.strategy, StrategyConfig::default());
    }
}
