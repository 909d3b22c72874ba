//! Technical indicators computed from a candle window.
//!
//! Everything here is recomputed from scratch every cycle; nothing is carried
//! between calls.

use crate::domain::errors::IndicatorError;
use crate::domain::trading::types::Candle;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use ta::Next;
use ta::indicators::{AverageTrueRange, ExponentialMovingAverage, RelativeStrengthIndex};

pub const ATR_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;
pub const EMA_FAST_PERIOD: usize = 9;
pub const EMA_SLOW_PERIOD: usize = 21;
pub const VOLATILITY_WINDOW: usize = 20;
pub const MOMENTUM_LOOKBACK: usize = 10;

/// EMA21 needs a full seed window plus one update.
pub const MIN_CANDLES: usize = EMA_SLOW_PERIOD + 1;

/// Indicator snapshot for one symbol and one cycle.
///
/// `volatility`, `momentum` and `trend_strength` are percentages:
/// - volatility: standard deviation of per-candle log returns over the last 20 candles
/// - momentum: close-to-close change over the last 10 candles
/// - trend_strength: |EMA9 - EMA21| relative to EMA21
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub atr: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub rsi: f64,
    pub volatility: f64,
    pub momentum: f64,
    pub trend_strength: f64,
}

impl TechnicalIndicators {
    pub fn is_bullish_crossover(&self) -> bool {
        self.ema9 > self.ema21
    }
}

struct Bar {
    high: f64,
    low: f64,
    close: f64,
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

fn to_bars(candles: &[Candle]) -> Result<Vec<Bar>, IndicatorError> {
    candles
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let malformed = |reason: &str| IndicatorError::MalformedCandle {
                index,
                reason: reason.to_string(),
            };
            let high = c.high.to_f64().ok_or_else(|| malformed("high not representable"))?;
            let low = c.low.to_f64().ok_or_else(|| malformed("low not representable"))?;
            let close = c.close.to_f64().ok_or_else(|| malformed("close not representable"))?;
            if close <= 0.0 || low <= 0.0 {
                return Err(malformed("non-positive price"));
            }
            if high < low {
                return Err(malformed("high below low"));
            }
            Ok(Bar { high, low, close })
        })
        .collect()
}

/// Computes the indicator snapshot for an oldest-first candle window.
///
/// Returns `InsufficientData` when fewer than [`MIN_CANDLES`] candles are supplied;
/// callers skip the symbol for this cycle.
pub fn compute_indicators(candles: &[Candle]) -> Result<TechnicalIndicators, IndicatorError> {
    if candles.len() < MIN_CANDLES {
        return Err(IndicatorError::InsufficientData {
            required: MIN_CANDLES,
            available: candles.len(),
        });
    }

    let bars = to_bars(candles)?;

    let mut atr = AverageTrueRange::new(ATR_PERIOD).expect("ATR_PERIOD is non-zero");
    let mut ema9 = ExponentialMovingAverage::new(EMA_FAST_PERIOD).expect("EMA_FAST_PERIOD is non-zero");
    let mut ema21 = ExponentialMovingAverage::new(EMA_SLOW_PERIOD).expect("EMA_SLOW_PERIOD is non-zero");
    let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).expect("RSI_PERIOD is non-zero");

    let (mut atr_val, mut ema9_val, mut ema21_val, mut rsi_val) = (0.0, 0.0, 0.0, 50.0);
    for bar in &bars {
        atr_val = atr.next(bar);
        ema9_val = ema9.next(bar.close);
        ema21_val = ema21.next(bar.close);
        rsi_val = rsi.next(bar.close);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let window = &closes[closes.len() - (VOLATILITY_WINDOW + 1)..];
    let volatility = realized_volatility(window, 1.0).unwrap_or(0.0) * 100.0;

    let last = closes[closes.len() - 1];
    let past = closes[closes.len() - 1 - MOMENTUM_LOOKBACK];
    let momentum = (last - past) / past * 100.0;

    let trend_strength = if ema21_val > 0.0 {
        (ema9_val - ema21_val).abs() / ema21_val * 100.0
    } else {
        0.0
    };

    Ok(TechnicalIndicators {
        atr: atr_val,
        ema9: ema9_val,
        ema21: ema21_val,
        rsi: rsi_val,
        volatility,
        momentum,
        trend_strength,
    })
}

/// Standard deviation of log returns, scaled by `sqrt(periods_per_year)`.
///
/// Pass `1.0` for per-period volatility.
pub fn realized_volatility(prices: &[f64], periods_per_year: f64) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect();

    if returns.is_empty() {
        return None;
    }

    let std_dev = returns.iter().population_std_dev();
    if !std_dev.is_finite() {
        return None;
    }
    Some(std_dev * periods_per_year.sqrt())
}
