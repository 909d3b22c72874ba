use crate::domain::errors::ExchangeError;
use crate::domain::ports::ExchangeClient;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::{
    AccountBalance, Candle, Granularity, OrderAck, OrderBookDepth, OrderOptions, Position, Ticker,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Injected failure for one symbol
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    /// Never answers; the caller's timeout fires
    Hang,
    Transport(String),
    Reject { code: String, reason: String },
}

impl MockFailure {
    async fn raise<T>(&self, operation: &str) -> Result<T, ExchangeError> {
        match self {
            MockFailure::Hang => futures::future::pending().await,
            MockFailure::Transport(reason) => Err(ExchangeError::transport(operation, reason.clone())),
            MockFailure::Reject { code, reason } => {
                Err(ExchangeError::rejected(code.clone(), reason.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockOrder {
    pub order_id: String,
    pub operation: &'static str,
    pub symbol: TradingPair,
    pub size: Decimal,
    pub options: OrderOptions,
}

#[derive(Debug, Clone)]
struct MockMarket {
    candles: Vec<Candle>,
    ticker: Ticker,
    depth: OrderBookDepth,
}

#[derive(Debug, Default)]
struct MockBook {
    markets: HashMap<TradingPair, MockMarket>,
    positions: Vec<Position>,
    balance: Option<AccountBalance>,
    market_failures: HashMap<TradingPair, MockFailure>,
    order_failures: HashMap<TradingPair, MockFailure>,
    orders: Vec<MockOrder>,
    server_time_offset_ms: i64,
    order_delay: Duration,
}

/// Scriptable in-memory exchange for tests
#[derive(Clone, Default)]
pub struct MockExchangeClient {
    book: Arc<RwLock<MockBook>>,
    orders_in_flight: Arc<AtomicUsize>,
    max_orders_in_flight: Arc<AtomicUsize>,
    market_calls: Arc<AtomicUsize>,
}

impl MockExchangeClient {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_balance(Decimal::from(10_000));
        mock
    }

    /// Sets candles for `symbol`; ticker and a tight book are derived from the last close
    pub fn set_candles(&self, symbol: TradingPair, candles: Vec<Candle>) {
        let last = candles.last().map(|c| c.close).unwrap_or(Decimal::ONE);
        let half_spread = last * Decimal::new(1, 4);
        let market = MockMarket {
            ticker: Ticker {
                symbol,
                last_price: last,
                best_bid: last - half_spread,
                best_ask: last + half_spread,
                timestamp: candles.last().map(|c| c.timestamp).unwrap_or_default(),
            },
            depth: OrderBookDepth {
                bids: vec![(last - half_spread, Decimal::from(5))],
                asks: vec![(last + half_spread, Decimal::from(5))],
            },
            candles,
        };
        self.book.write().markets.insert(symbol, market);
    }

    pub fn set_depth(&self, symbol: TradingPair, depth: OrderBookDepth) {
        if let Some(market) = self.book.write().markets.get_mut(&symbol) {
            market.depth = depth;
        }
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        self.book.write().positions = positions;
    }

    pub fn set_balance(&self, equity: Decimal) {
        self.book.write().balance = Some(AccountBalance {
            equity,
            available: equity,
            currency: "USDT".to_string(),
        });
    }

    /// Fails every market-data call for `symbol`
    pub fn fail_market_data(&self, symbol: TradingPair, failure: MockFailure) {
        self.book.write().market_failures.insert(symbol, failure);
    }

    pub fn fail_orders(&self, symbol: TradingPair, failure: MockFailure) {
        self.book.write().order_failures.insert(symbol, failure);
    }

    pub fn clear_failures(&self) {
        let mut book = self.book.write();
        book.market_failures.clear();
        book.order_failures.clear();
    }

    pub fn set_server_time_offset(&self, offset_ms: i64) {
        self.book.write().server_time_offset_ms = offset_ms;
    }

    /// Every order call sleeps this long before answering
    pub fn set_order_delay(&self, delay: Duration) {
        self.book.write().order_delay = delay;
    }

    pub fn orders(&self) -> Vec<MockOrder> {
        self.book.read().orders.clone()
    }

    /// Highest number of order calls observed running at once
    pub fn max_concurrent_orders(&self) -> usize {
        self.max_orders_in_flight.load(Ordering::SeqCst)
    }

    /// Order calls currently waiting on the configured delay
    pub fn orders_in_flight(&self) -> usize {
        self.orders_in_flight.load(Ordering::SeqCst)
    }

    pub fn market_data_calls(&self) -> usize {
        self.market_calls.load(Ordering::SeqCst)
    }

    async fn market_data<T>(
        &self,
        symbol: TradingPair,
        operation: &str,
        read: impl FnOnce(&MockMarket) -> T,
    ) -> Result<T, ExchangeError> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.book.read().market_failures.get(&symbol).cloned();
        if let Some(failure) = failure {
            return failure.raise(operation).await;
        }
        let book = self.book.read();
        book.markets
            .get(&symbol)
            .map(read)
            .ok_or_else(|| ExchangeError::rejected("40034", format!("{} has no market data", symbol)))
    }

    async fn place(
        &self,
        operation: &'static str,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        let current = self.orders_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_orders_in_flight.fetch_max(current, Ordering::SeqCst);

        let (delay, failure) = {
            let book = self.book.read();
            (book.order_delay, book.order_failures.get(&symbol).cloned())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match failure {
            Some(failure) => failure.raise(operation).await,
            None => {
                let order_id = Uuid::new_v4().to_string();
                info!("MockExchange: {} {} {} -> {}", operation, symbol, size, order_id);
                self.book.write().orders.push(MockOrder {
                    order_id: order_id.clone(),
                    operation,
                    symbol,
                    size,
                    options,
                });
                Ok(OrderAck { order_id })
            }
        };

        self.orders_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    async fn get_server_time(&self) -> Result<i64, ExchangeError> {
        let offset = self.book.read().server_time_offset_ms;
        Ok(chrono::Utc::now().timestamp_millis() + offset)
    }

    async fn get_ticker(&self, symbol: TradingPair) -> Result<Ticker, ExchangeError> {
        self.market_data(symbol, "get_ticker", |m| m.ticker.clone()).await
    }

    async fn get_candles(
        &self,
        symbol: TradingPair,
        _granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.market_data(symbol, "get_candles", |m| {
            let skip = m.candles.len().saturating_sub(limit);
            m.candles[skip..].to_vec()
        })
        .await
    }

    async fn get_order_book_depth(
        &self,
        symbol: TradingPair,
        limit: usize,
    ) -> Result<OrderBookDepth, ExchangeError> {
        self.market_data(symbol, "get_order_book_depth", |m| OrderBookDepth {
            bids: m.depth.bids.iter().take(limit).cloned().collect(),
            asks: m.depth.asks.iter().take(limit).cloned().collect(),
        })
        .await
    }

    async fn get_account_balance(&self) -> Result<AccountBalance, ExchangeError> {
        self.book
            .read()
            .balance
            .clone()
            .ok_or_else(|| ExchangeError::transport("get_account_balance", "no balance configured"))
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        Ok(self.book.read().positions.clone())
    }

    async fn open_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.place("open_long", symbol, size, options).await
    }

    async fn open_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.place("open_short", symbol, size, options).await
    }

    async fn close_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.place("close_long", symbol, size, options).await
    }

    async fn close_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.place("close_short", symbol, size, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                timestamp: i as i64,
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100),
                volume: dec!(1),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_candle_limit_returns_latest() {
        let mock = MockExchangeClient::new();
        mock.set_candles(TradingPair::BtcUsdt, candles(50));
        let got = mock
            .get_candles(TradingPair::BtcUsdt, Granularity::FifteenMinutes, 10)
            .await
            .unwrap();
        assert_eq!(got.len(), 10);
        assert_eq!(got[0].timestamp, 40);
    }

    #[tokio::test]
    async fn test_injected_rejection() {
        let mock = MockExchangeClient::new();
        mock.fail_orders(
            TradingPair::EthUsdt,
            MockFailure::Reject {
                code: "40762".into(),
                reason: "balance not enough".into(),
            },
        );
        let err = mock
            .open_long(TradingPair::EthUsdt, dec!(1), OrderOptions::market())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected { .. }));
        assert!(mock.orders().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_rejected() {
        let mock = MockExchangeClient::new();
        let err = mock.get_ticker(TradingPair::LtcUsdt).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Rejected { .. }));
    }
}
