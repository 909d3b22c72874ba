use crate::domain::trading::types::OrderSide;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::time::Duration;

/// How simulated market orders fill: adverse slippage and network latency.
#[derive(Debug, Clone, PartialEq)]
pub struct FillModel {
    /// Maximum slippage in basis points; fills are biased against the trader
    pub slippage_bps: f64,
    pub latency_base_ms: u64,
    pub latency_jitter_ms: u64,
}

impl Default for FillModel {
    fn default() -> Self {
        Self {
            slippage_bps: 5.0,
            latency_base_ms: 40,
            latency_jitter_ms: 20,
        }
    }
}

impl FillModel {
    /// Perfect execution, used for deterministic runs
    pub fn instant() -> Self {
        Self {
            slippage_bps: 0.0,
            latency_base_ms: 0,
            latency_jitter_ms: 0,
        }
    }

    pub fn execution_price(&self, price: Decimal, side: OrderSide, rng: &mut impl Rng) -> Decimal {
        if self.slippage_bps <= 0.0 {
            return price;
        }
        let factor = self.slippage_bps / 10_000.0;
        // a fixed impact cost plus symmetric noise
        let impact = factor * 0.2;
        let noise = rng.random_range(-factor..=factor);
        let pct_change = match side {
            OrderSide::Buy => impact + noise,
            OrderSide::Sell => -(impact + noise),
        };

        let filled = price.to_f64().unwrap_or(0.0) * (1.0 + pct_change);
        Decimal::from_f64(filled)
            .filter(|p| *p > Decimal::ZERO)
            .map(|p| p.round_dp(price.scale().max(2)))
            .unwrap_or(price)
    }

    pub fn latency(&self, rng: &mut impl Rng) -> Duration {
        let jitter = self.latency_jitter_ms as i64;
        let offset = if jitter > 0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0
        };
        Duration::from_millis((self.latency_base_ms as i64 + offset).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    #[test]
    fn test_latency_stays_within_jitter() {
        let model = FillModel {
            slippage_bps: 0.0,
            latency_base_ms: 50,
            latency_jitter_ms: 10,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let ms = model.latency(&mut rng).as_millis() as u64;
            assert!((40..=60).contains(&ms), "latency {} out of bounds", ms);
        }
    }

    #[test]
    fn test_slippage_bounded_by_model() {
        let model = FillModel {
            slippage_bps: 10.0,
            ..FillModel::instant()
        };
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let fill = model.execution_price(dec!(1000.00), OrderSide::Buy, &mut rng);
            // impact 0.2 x 10bps plus up to 10bps noise
            assert!(fill >= dec!(998.80) && fill <= dec!(1001.20), "fill {}", fill);
        }
    }

    #[test]
    fn test_instant_model_fills_at_quote() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = FillModel::instant();
        assert_eq!(model.execution_price(dec!(42.5), OrderSide::Sell, &mut rng), dec!(42.5));
        assert_eq!(model.latency(&mut rng), Duration::ZERO);
    }
}
