use crate::domain::errors::ConfigError;
use crate::domain::market::indicators::TechnicalIndicators;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market behavior mode used to select strategy and risk posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trending,
    RangeBound,
    HighVolatility,
}

impl Regime {
    /// Numeric code exported on the regime gauge
    pub fn code(&self) -> f64 {
        match self {
            Regime::RangeBound => 0.0,
            Regime::Trending => 1.0,
            Regime::HighVolatility => 2.0,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Trending => write!(f, "TRENDING"),
            Regime::RangeBound => write!(f, "RANGE_BOUND"),
            Regime::HighVolatility => write!(f, "HIGH_VOLATILITY"),
        }
    }
}

/// Features the classification was based on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeFeatures {
    pub momentum: f64,
    pub volatility: f64,
    pub trend_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassification {
    pub regime: Regime,
    pub confidence: f64, // 0.0 to 1.0
    pub features: RegimeFeatures,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    /// Trend strength (% EMA divergence) above which the market is trending
    pub trend_strength_threshold: f64,
    /// Per-candle realized volatility (%) above which the market is high-volatility
    pub volatility_threshold: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            trend_strength_threshold: 0.5,
            volatility_threshold: 2.5,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.trend_strength_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "trend_strength_threshold".to_string(),
                reason: format!("must be > 0, got {}", self.trend_strength_threshold),
            });
        }
        if !(self.volatility_threshold > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "volatility_threshold".to_string(),
                reason: format!("must be > 0, got {}", self.volatility_threshold),
            });
        }
        Ok(())
    }
}

/// Threshold-rule regime classifier.
///
/// HIGH_VOLATILITY is checked first and wins over TRENDING when both
/// thresholds are exceeded.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    pub fn classify(&self, indicators: &TechnicalIndicators, timestamp: i64) -> RegimeClassification {
        let features = RegimeFeatures {
            momentum: indicators.momentum,
            volatility: indicators.volatility,
            trend_strength: indicators.trend_strength,
        };

        let vol_t = self.config.volatility_threshold;
        let trend_t = self.config.trend_strength_threshold;

        let (regime, confidence) = if features.volatility > vol_t {
            (
                Regime::HighVolatility,
                excess_confidence(features.volatility, vol_t),
            )
        } else if features.trend_strength > trend_t {
            (
                Regime::Trending,
                excess_confidence(features.trend_strength, trend_t),
            )
        } else {
            // Distance below the nearest threshold
            let trend_room = 1.0 - features.trend_strength / trend_t;
            let vol_room = 1.0 - features.volatility / vol_t;
            (Regime::RangeBound, 0.5 + 0.5 * trend_room.min(vol_room))
        };

        RegimeClassification {
            regime,
            confidence: clip_unit(confidence),
            features,
            timestamp,
        }
    }
}

/// 0.5 at the threshold, 1.0 once the value is twice the threshold
fn excess_confidence(value: f64, threshold: f64) -> f64 {
    0.5 + 0.5 * ((value - threshold) / threshold).min(1.0)
}

fn clip_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
