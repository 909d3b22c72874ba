//! Priority-ordered risk rules.
//!
//! The engine is a pure function over its inputs. It never talks to the
//! exchange and never touches loop state; the trading loop feeds it the
//! freshly fetched account view plus the rolling metrics it owns.

use crate::domain::market::market_regime::{Regime, RegimeClassification};
use crate::domain::risk::risk_config::RiskConfig;
use crate::domain::risk::state::RiskMetrics;
use crate::domain::trading::types::{AccountBalance, Position};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopLossAdjustment {
    Normal,
    Tightened,
    Widened,
}

impl StopLossAdjustment {
    /// Factor applied to the strategy's stop distance
    pub fn distance_factor(&self) -> Decimal {
        match self {
            StopLossAdjustment::Normal => Decimal::ONE,
            StopLossAdjustment::Tightened => Decimal::new(75, 2),
            StopLossAdjustment::Widened => Decimal::new(15, 1),
        }
    }
}

impl fmt::Display for StopLossAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopLossAdjustment::Normal => write!(f, "NORMAL"),
            StopLossAdjustment::Tightened => write!(f, "TIGHTENED"),
            StopLossAdjustment::Widened => write!(f, "WIDENED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub position_size_multiplier: f64, // 0.0 to 1.0
    pub stop_loss_adjustment: StopLossAdjustment,
    pub trade_cooldown_active: bool,
    pub trade_suspended: bool,
    pub risk_level: RiskLevel,
    pub explanation: String,
    pub timestamp: i64,
}

/// Everything the engine looks at for one symbol and one cycle
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub regime: &'a RegimeClassification,
    pub current_volatility: f64,
    pub positions: &'a [Position],
    pub balance: &'a AccountBalance,
    pub metrics: &'a RiskMetrics,
    /// Milliseconds since epoch
    pub now: i64,
}

#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn assess(&self, input: &RiskInput<'_>) -> RiskDecision {
        let mut decision = self.select_rule(input);
        self.apply_exposure_cap(input, &mut decision);

        if decision.trade_suspended {
            decision.position_size_multiplier = 0.0;
        }
        decision.position_size_multiplier = clamp_unit(decision.position_size_multiplier);
        decision
    }

    /// First matching rule wins.
    fn select_rule(&self, input: &RiskInput<'_>) -> RiskDecision {
        let cfg = &self.config;
        let metrics = input.metrics;
        let regime = input.regime;

        let decision = |multiplier: f64,
                        stop: StopLossAdjustment,
                        cooldown: bool,
                        suspended: bool,
                        level: RiskLevel,
                        explanation: String| RiskDecision {
            position_size_multiplier: multiplier,
            stop_loss_adjustment: stop,
            trade_cooldown_active: cooldown,
            trade_suspended: suspended,
            risk_level: level,
            explanation,
            timestamp: input.now,
        };

        // 1. Hard loss caps
        if metrics.daily_loss_percent > cfg.max_daily_loss_pct {
            return decision(
                0.0,
                StopLossAdjustment::Tightened,
                false,
                true,
                RiskLevel::Critical,
                format!(
                    "Trading suspended: daily loss {:.2}% exceeds cap of {:.2}%",
                    metrics.daily_loss_percent, cfg.max_daily_loss_pct
                ),
            );
        }
        if metrics.recent_drawdown > cfg.max_drawdown_pct {
            return decision(
                0.0,
                StopLossAdjustment::Tightened,
                false,
                true,
                RiskLevel::Critical,
                format!(
                    "Trading suspended: drawdown {:.2}% exceeds cap of {:.2}%",
                    metrics.recent_drawdown, cfg.max_drawdown_pct
                ),
            );
        }

        // 2. Cooldown
        let loss_streak = metrics.consecutive_losses > cfg.consecutive_loss_limit;
        let since_last_trade_ms = metrics.last_trade_time.map(|t| input.now.saturating_sub(t));
        let recent_trade = since_last_trade_ms
            .is_some_and(|elapsed| elapsed >= 0 && elapsed < cfg.trade_cooldown_seconds * 1000);

        if loss_streak || recent_trade {
            let mut multiplier: f64 = 1.0;
            let mut reasons = Vec::new();
            if loss_streak {
                multiplier = multiplier
                    .min(cfg.consecutive_loss_limit as f64 / metrics.consecutive_losses as f64);
                reasons.push(format!(
                    "{} consecutive losses exceed limit of {}",
                    metrics.consecutive_losses, cfg.consecutive_loss_limit
                ));
            }
            if recent_trade {
                multiplier = multiplier.min(0.5);
                reasons.push(format!(
                    "last trade {}s ago is inside the {}s cooldown",
                    since_last_trade_ms.unwrap_or_default() / 1000,
                    cfg.trade_cooldown_seconds
                ));
            }
            return decision(
                multiplier,
                StopLossAdjustment::Normal,
                true,
                false,
                RiskLevel::High,
                format!(
                    "Cooldown active: {}; size multiplier reduced to {:.2}",
                    reasons.join(" and "),
                    multiplier
                ),
            );
        }

        // 3. Volatile market
        if regime.regime == Regime::HighVolatility {
            return decision(
                cfg.high_volatility_size_multiplier,
                StopLossAdjustment::Tightened,
                false,
                false,
                RiskLevel::High,
                format!(
                    "High volatility regime (volatility {:.3}%, confidence {:.2}): size reduced to {:.2}, stops tightened",
                    input.current_volatility, regime.confidence, cfg.high_volatility_size_multiplier
                ),
            );
        }

        // 4. Confident trend
        if regime.regime == Regime::Trending && regime.confidence >= cfg.high_confidence_threshold
        {
            let multiplier = (0.75 + 0.25 * regime.confidence).min(1.0);
            return decision(
                multiplier,
                StopLossAdjustment::Normal,
                false,
                false,
                RiskLevel::Low,
                format!(
                    "Trending regime with high confidence {:.2}: size multiplier {:.2}",
                    regime.confidence, multiplier
                ),
            );
        }

        // 5. Neutral
        let low_confidence = regime.confidence < cfg.high_confidence_threshold;
        decision(
            cfg.neutral_size_multiplier,
            StopLossAdjustment::Normal,
            false,
            false,
            if low_confidence {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            },
            format!(
                "{} regime with confidence {:.2}{}: neutral size multiplier {:.2}",
                regime.regime,
                regime.confidence,
                if low_confidence { " (low)" } else { "" },
                cfg.neutral_size_multiplier
            ),
        )
    }

    fn apply_exposure_cap(&self, input: &RiskInput<'_>, decision: &mut RiskDecision) {
        if decision.trade_suspended {
            return;
        }

        let equity = input.balance.equity.to_f64().unwrap_or(0.0);
        if equity <= 0.0 {
            decision.position_size_multiplier = 0.0;
            decision.risk_level = decision.risk_level.max(RiskLevel::High);
            decision
                .explanation
                .push_str("; account equity is not positive, no new exposure");
            return;
        }

        let notional: Decimal = input.positions.iter().map(Position::notional).sum();
        let ratio = notional.to_f64().unwrap_or(f64::INFINITY) / equity;
        if ratio > self.config.max_exposure_ratio {
            decision.position_size_multiplier = 0.0;
            decision.risk_level = decision.risk_level.max(RiskLevel::High);
            decision.explanation.push_str(&format!(
                "; open exposure {:.2}x equity exceeds {:.2}x cap, no new exposure",
                ratio, self.config.max_exposure_ratio
            ));
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::market_regime::RegimeFeatures;
    use crate::domain::trading::trading_pair::TradingPair;
    use crate::domain::trading::types::PositionSide;
    use rust_decimal_macros::dec;

    fn regime(regime: Regime, confidence: f64) -> RegimeClassification {
        RegimeClassification {
            regime,
            confidence,
            features: RegimeFeatures {
                momentum: 0.0,
                volatility: 1.0,
                trend_strength: 0.2,
            },
            timestamp: 0,
        }
    }

    fn balance() -> AccountBalance {
        AccountBalance {
            equity: dec!(10000),
            available: dec!(10000),
            currency: "USDT".to_string(),
        }
    }

    fn assess(
        engine: &RiskEngine,
        regime: &RegimeClassification,
        metrics: &RiskMetrics,
        positions: &[Position],
    ) -> RiskDecision {
        let balance = balance();
        engine.assess(&RiskInput {
            regime,
            current_volatility: regime.features.volatility,
            positions,
            balance: &balance,
            metrics,
            now: 1_000_000_000,
        })
    }

    #[test]
    fn test_daily_loss_suspends_regardless_of_regime() {
        let engine = RiskEngine::new(RiskConfig::default());
        let metrics = RiskMetrics {
            daily_loss_percent: 5.01,
            consecutive_losses: 10,
            ..Default::default()
        };
        for r in [Regime::Trending, Regime::RangeBound, Regime::HighVolatility] {
            for conf in [0.0, 0.5, 1.0] {
                let d = assess(&engine, &regime(r, conf), &metrics, &[]);
                assert!(d.trade_suspended);
                assert_eq!(d.risk_level, RiskLevel::Critical);
                assert_eq!(d.position_size_multiplier, 0.0);
                assert!(d.explanation.contains("daily loss"));
            }
        }
    }

    #[test]
    fn test_drawdown_suspends() {
        let engine = RiskEngine::new(RiskConfig::default());
        let metrics = RiskMetrics {
            recent_drawdown: 12.0,
            ..Default::default()
        };
        let d = assess(&engine, &regime(Regime::Trending, 0.9), &metrics, &[]);
        assert!(d.trade_suspended);
        assert_eq!(d.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_loss_streak_reduces_size_proportionally() {
        let engine = RiskEngine::new(RiskConfig::default());
        let metrics = RiskMetrics {
            consecutive_losses: 6,
            ..Default::default()
        };
        let d = assess(&engine, &regime(Regime::Trending, 0.9), &metrics, &[]);
        assert!(d.trade_cooldown_active);
        assert!(!d.trade_suspended);
        assert!((d.position_size_multiplier - 0.5).abs() < 1e-12);
        assert_eq!(d.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_recent_trade_triggers_cooldown() {
        let engine = RiskEngine::new(RiskConfig::default());
        let metrics = RiskMetrics {
            last_trade_time: Some(1_000_000_000 - 60_000),
            ..Default::default()
        };
        let d = assess(&engine, &regime(Regime::RangeBound, 0.9), &metrics, &[]);
        assert!(d.trade_cooldown_active);
        assert_eq!(d.position_size_multiplier, 0.5);

        let metrics = RiskMetrics {
            last_trade_time: Some(1_000_000_000 - 301_000),
            ..Default::default()
        };
        let d = assess(&engine, &regime(Regime::RangeBound, 0.9), &metrics, &[]);
        assert!(!d.trade_cooldown_active);
    }

    #[test]
    fn test_high_volatility_tightens() {
        let engine = RiskEngine::new(RiskConfig::default());
        let d = assess(
            &engine,
            &regime(Regime::HighVolatility, 0.8),
            &RiskMetrics::default(),
            &[],
        );
        assert_eq!(d.stop_loss_adjustment, StopLossAdjustment::Tightened);
        assert_eq!(d.position_size_multiplier, 0.5);
    }

    #[test]
    fn test_confident_trend_is_bounded_at_one() {
        let engine = RiskEngine::new(RiskConfig::default());
        let d = assess(&engine, &regime(Regime::Trending, 1.0), &RiskMetrics::default(), &[]);
        assert_eq!(d.position_size_multiplier, 1.0);
        assert_eq!(d.stop_loss_adjustment, StopLossAdjustment::Normal);
        assert_eq!(d.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_low_confidence_trend_is_neutral() {
        let engine = RiskEngine::new(RiskConfig::default());
        let d = assess(&engine, &regime(Regime::Trending, 0.55), &RiskMetrics::default(), &[]);
        assert_eq!(d.position_size_multiplier, 0.75);
        assert_eq!(d.risk_level, RiskLevel::Medium);
        assert!(!d.explanation.is_empty());
    }

    #[test]
    fn test_exposure_cap_blocks_new_size() {
        let engine = RiskEngine::new(RiskConfig::default());
        let positions = vec![Position {
            symbol: TradingPair::BtcUsdt,
            side: PositionSide::Long,
            size: dec!(1),
            entry_price: dec!(40000),
            unrealized_pnl: dec!(0),
        }];
        let d = assess(
            &engine,
            &regime(Regime::Trending, 0.9),
            &RiskMetrics::default(),
            &positions,
        );
        assert_eq!(d.position_size_multiplier, 0.0);
        assert!(!d.trade_suspended);
        assert!(d.explanation.contains("exposure"));
    }

    #[test]
    fn test_every_branch_explains() {
        let engine = RiskEngine::new(RiskConfig::default());
        for r in [Regime::Trending, Regime::RangeBound, Regime::HighVolatility] {
            let d = assess(&engine, &regime(r, 0.6), &RiskMetrics::default(), &[]);
            assert!(!d.explanation.is_empty());
            assert!((0.0..=1.0).contains(&d.position_size_multiplier));
        }
    }
}
