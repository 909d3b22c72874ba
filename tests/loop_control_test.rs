mod common;

use common::{harness, harness_with, settings, uptrend};
use regime_pilot::application::trading_loop::config::{MAX_CONCURRENT_TRADES_LIMIT, MIN_INTERVAL_MS};
use regime_pilot::application::trading_loop::{LoopConfigUpdate, LoopStatus};
use regime_pilot::domain::errors::{ConfigError, LoopControlError};
use regime_pilot::domain::trading::trading_pair::TradingPair;
use regime_pilot::infrastructure::mock::MockExchangeClient;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const ALL_FIVE: [TradingPair; 5] = [
    TradingPair::BtcUsdt,
    TradingPair::EthUsdt,
    TradingPair::SolUsdt,
    TradingPair::XrpUsdt,
    TradingPair::BnbUsdt,
];

#[tokio::test]
async fn test_start_stop_state_machine() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));
    h.exchange.set_candles(TradingPair::BtcUsdt, uptrend(30000.0));

    assert!(!h.trading_loop.stop().await, "stop while stopped is a no-op");

    assert_ok!(h.trading_loop.start().await);
    assert!(h.trading_loop.is_running().await);
    assert_eq!(h.trading_loop.get_state().await.status, LoopStatus::Running);
    assert_eq!(
        h.trading_loop.start().await,
        Err(LoopControlError::AlreadyRunning)
    );

    // The first pass runs without waiting a full interval
    let mut completed = 0;
    for _ in 0..50 {
        completed = h.trading_loop.get_state().await.cycles_completed;
        if completed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(completed > 0, "timer pass never ran");

    assert!(h.trading_loop.stop().await);
    assert!(!h.trading_loop.is_running().await);
    assert_eq!(h.trading_loop.get_state().await.status, LoopStatus::Stopped);
    assert!(!h.trading_loop.stop().await);

    // And it can be started again
    assert_ok!(h.trading_loop.start().await);
    assert!(h.trading_loop.stop().await);
}

#[tokio::test]
async fn test_stop_lets_in_flight_order_finish() {
    let exchange = MockExchangeClient::new();
    exchange.set_candles(TradingPair::BtcUsdt, uptrend(30000.0));
    exchange.set_order_delay(Duration::from_millis(300));

    let mut s = settings(&[TradingPair::BtcUsdt]);
    s.loop_config.dry_run = false;
    let h = harness_with(exchange, s);

    assert_ok!(h.trading_loop.start().await);
    let mut submitting = false;
    for _ in 0..100 {
        if h.exchange.orders_in_flight() > 0 {
            submitting = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(submitting, "first pass never reached order submission");
    assert!(h.exchange.orders().is_empty());

    assert!(h.trading_loop.stop().await);

    // The order completed before stop returned
    assert_eq!(h.exchange.orders_in_flight(), 0);
    assert_eq!(h.exchange.orders().len(), 1);
    let state = h.trading_loop.get_state().await;
    assert_eq!(state.status, LoopStatus::Stopped);
    assert_eq!(state.cycles_completed, 1);

    // Nothing else runs once stopped
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.exchange.orders().len(), 1);
}

#[tokio::test]
async fn test_disabled_loop_refuses_to_start() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));
    h.trading_loop
        .configure(LoopConfigUpdate {
            enabled: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(h.trading_loop.start().await, Err(LoopControlError::Disabled));
    assert!(!h.trading_loop.is_running().await);
}

#[tokio::test]
async fn test_configure_rejects_invalid_updates_atomically() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));
    let before = h.trading_loop.get_config().await;

    let err = h
        .trading_loop
        .configure(LoopConfigUpdate {
            symbols: Some(vec!["BTCUSDT".to_string(), "FOOUSDT".to_string()]),
            interval_ms: Some(120_000),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedSymbol { .. }));

    let err = assert_err!(
        h.trading_loop
            .configure(LoopConfigUpdate {
                symbols: Some(vec![]),
                ..Default::default()
            })
            .await
    );
    assert_eq!(err, ConfigError::EmptySymbols);

    for size in [dec!(0), dec!(-0.5)] {
        let err = h
            .trading_loop
            .configure(LoopConfigUpdate {
                base_position_size: Some(size),
                dry_run: Some(false),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPositionSize { .. }));
    }

    assert_eq!(h.trading_loop.get_config().await, before);
}

#[tokio::test]
async fn test_configure_clamps_soft_bounds() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));

    let config = h
        .trading_loop
        .configure(LoopConfigUpdate {
            symbols: Some(vec!["eth/usdt".to_string(), "ETHUSDT".to_string(), "SOL-USDT".to_string()]),
            interval_ms: Some(1_000),
            max_concurrent_trades: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(config.symbols, vec![TradingPair::EthUsdt, TradingPair::SolUsdt]);
    assert_eq!(config.interval_ms, MIN_INTERVAL_MS);
    assert_eq!(config.max_concurrent_trades, MAX_CONCURRENT_TRADES_LIMIT);
    assert_eq!(h.trading_loop.get_config().await, config);

    let config = h
        .trading_loop
        .configure(LoopConfigUpdate {
            max_concurrent_trades: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(config.max_concurrent_trades, 1);
}

#[tokio::test]
async fn test_manual_cycle_runs_while_disabled() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));
    h.exchange.set_candles(TradingPair::BtcUsdt, uptrend(30000.0));
    h.trading_loop
        .configure(LoopConfigUpdate {
            enabled: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = h.trading_loop.run_single_cycle().await;
    assert!(report.decision(TradingPair::BtcUsdt).is_some());
    assert!(!h.trading_loop.is_running().await);
}

#[tokio::test]
async fn test_order_concurrency_is_bounded() {
    let exchange = MockExchangeClient::new();
    for (i, symbol) in ALL_FIVE.iter().enumerate() {
        exchange.set_candles(*symbol, uptrend(30000.0 + 1000.0 * i as f64));
    }
    exchange.set_order_delay(Duration::from_millis(50));

    let mut s = settings(&ALL_FIVE);
    s.loop_config.dry_run = false;
    s.loop_config.max_concurrent_trades = 2;
    // Large enough that every instrument's precision keeps a non-zero size
    s.loop_config.base_position_size = dec!(10);
    let h = harness_with(exchange, s);

    let report = h.trading_loop.run_single_cycle().await;
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(h.exchange.orders().len(), ALL_FIVE.len());
    assert_eq!(h.exchange.max_concurrent_orders(), 2);

    // Report order follows configuration order
    let symbols: Vec<TradingPair> = report.decisions.iter().map(|d| d.symbol).collect();
    assert_eq!(symbols, ALL_FIVE.to_vec());
}

#[tokio::test]
async fn test_overlapping_passes_skip_busy_symbols() {
    let exchange = MockExchangeClient::new();
    exchange.set_candles(TradingPair::BtcUsdt, uptrend(30000.0));
    exchange.set_order_delay(Duration::from_millis(300));

    let mut s = settings(&[TradingPair::BtcUsdt]);
    s.loop_config.dry_run = false;
    let h = harness_with(exchange, s);

    let slow = h.trading_loop.run_single_cycle();
    let fast = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.trading_loop.run_single_cycle().await
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(slow.decisions.len(), 1);
    assert_eq!(fast.skipped, vec![TradingPair::BtcUsdt]);
    assert!(fast.decisions.is_empty());
    assert_eq!(h.exchange.orders().len(), 1);
}

#[tokio::test]
async fn test_cycle_metrics_are_exported() {
    let h = harness(settings(&[TradingPair::BtcUsdt]));
    h.exchange.set_candles(TradingPair::BtcUsdt, uptrend(30000.0));

    h.trading_loop.run_single_cycle().await;

    let text = h.trading_loop.metrics().render();
    assert!(text.contains("regime_pilot_cycles_total"));
    assert!(text.contains("BTCUSDT"));
}
