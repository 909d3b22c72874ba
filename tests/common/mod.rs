#![allow(dead_code)]

use regime_pilot::application::trading_loop::{TradingLoop, TradingLoopSettings};
use regime_pilot::domain::trading::trading_pair::TradingPair;
use regime_pilot::domain::trading::types::Candle;
use regime_pilot::infrastructure::InMemoryAuditLog;
use regime_pilot::infrastructure::mock::MockExchangeClient;
use regime_pilot::infrastructure::observability::Metrics;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;

pub const CANDLES: usize = 100;
const BAR_MS: i64 = 900_000;
const T0: i64 = 1_700_000_000_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn candle(timestamp: i64, open: f64, close: f64) -> Candle {
    let d = |v: f64| Decimal::from_f64(v).unwrap().round_dp(2);
    Candle {
        timestamp,
        open: d(open),
        high: d(open.max(close) * 1.001),
        low: d(open.min(close) * 0.999),
        close: d(close),
        volume: Decimal::from(100),
    }
}

/// Alternating up/down steps with a net drift of 50 per bar.
///
/// `amplitude` scales the swing: 1.0 gives +150/-50, which reads as a clean
/// uptrend with ~0.3% per-candle volatility. The last step is always down.
pub fn zigzag(start: f64, amplitude: f64) -> Vec<Candle> {
    let up = 50.0 + 100.0 * amplitude;
    let down = 100.0 * amplitude - 50.0;
    let mut close = start;
    let mut candles = vec![candle(T0, start, start)];
    for i in 1..CANDLES {
        let open = close;
        close = if i % 2 == 0 { close + up } else { close - down };
        candles.push(candle(T0 + i as i64 * BAR_MS, open, close));
    }
    candles
}

pub fn uptrend(start: f64) -> Vec<Candle> {
    zigzag(start, 1.0)
}

/// Mirror of `uptrend`: steady drift down
pub fn downtrend(start: f64) -> Vec<Candle> {
    let mut close = start;
    let mut candles = vec![candle(T0, start, start)];
    for i in 1..CANDLES {
        let open = close;
        close = if i % 2 == 0 { close - 150.0 } else { close + 50.0 };
        candles.push(candle(T0 + i as i64 * BAR_MS, open, close));
    }
    candles
}

pub fn flat(price: f64) -> Vec<Candle> {
    (0..CANDLES)
        .map(|i| candle(T0 + i as i64 * BAR_MS, price, price))
        .collect()
}

pub struct Harness {
    pub trading_loop: Arc<TradingLoop>,
    pub exchange: MockExchangeClient,
    pub audit: InMemoryAuditLog,
}

pub fn settings(symbols: &[TradingPair]) -> TradingLoopSettings {
    let mut settings = TradingLoopSettings::default();
    settings.loop_config.symbols = symbols.to_vec();
    settings
}

pub fn harness(settings: TradingLoopSettings) -> Harness {
    harness_with(MockExchangeClient::new(), settings)
}

pub fn harness_with(exchange: MockExchangeClient, settings: TradingLoopSettings) -> Harness {
    init_tracing();
    let audit = InMemoryAuditLog::new();
    let trading_loop = TradingLoop::new(
        Arc::new(exchange.clone()),
        Arc::new(audit.clone()),
        Metrics::default(),
        settings,
    )
    .expect("valid settings");
    Harness {
        trading_loop,
        exchange,
        audit,
    }
}
