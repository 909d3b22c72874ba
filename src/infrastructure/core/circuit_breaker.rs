use crate::domain::errors::ExchangeError;
use crate::domain::ports::ExchangeClient;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::{
    AccountBalance, Candle, Granularity, OrderAck, OrderBookDepth, OrderOptions, Position, Ticker,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // requests pass through
    Open,     // failing fast
    HalfOpen, // probing recovery
}

/// Opens after consecutive transport failures, probes again after `cooldown`
pub struct CircuitBreaker {
    state: RwLock<BreakerState>,
    failure_threshold: usize,
    success_threshold: usize,
    cooldown: Duration,
    name: String,
}

struct BreakerState {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// * `failure_threshold` - consecutive failures before opening
    /// * `success_threshold` - consecutive HalfOpen successes before closing
    /// * `cooldown` - time spent Open before the first probe
    pub fn new(
        name: impl Into<String>,
        failure_threshold: usize,
        success_threshold: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            state: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            cooldown,
            name: name.into(),
        }
    }

    /// Runs `f` unless the circuit is open. Only errors for which
    /// `counts_as_failure` holds move the breaker towards Open.
    pub async fn call<F, T, E>(
        &self,
        f: F,
        counts_as_failure: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        {
            let mut state = self.state.write().await;
            if state.state == CircuitState::Open
                && let Some(opened_at) = state.opened_at
            {
                if opened_at.elapsed() >= self.cooldown {
                    info!(
                        "CircuitBreaker [{}]: Transitioning Open -> HalfOpen (cooldown elapsed)",
                        self.name
                    );
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                } else {
                    return Err(CircuitBreakerError::Open {
                        name: self.name.clone(),
                        retry_in: self.cooldown.saturating_sub(opened_at.elapsed()),
                    });
                }
            }
        }

        match f.await {
            Ok(result) => {
                self.on_success().await;
                Ok(result)
            }
            Err(e) => {
                if counts_as_failure(&e) {
                    self.on_failure().await;
                } else {
                    self.on_success().await;
                }
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.success_threshold {
                    info!(
                        "CircuitBreaker [{}]: Transitioning HalfOpen -> Closed ({} successes)",
                        self.name, state.success_count
                    );
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.success_count = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.failure_count = 0,
            // a call admitted before the circuit opened finished late
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.failure_count += 1;

        match state.state {
            CircuitState::Closed if state.failure_count >= self.failure_threshold => {
                error!(
                    "CircuitBreaker [{}]: Transitioning Closed -> Open ({} failures)",
                    self.name, state.failure_count
                );
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!(
                    "CircuitBreaker [{}]: Transitioning HalfOpen -> Open (failure during recovery)",
                    self.name
                );
                state.state = CircuitState::Open;
                state.success_count = 0;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker [{name}] is open, retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    #[error(transparent)]
    Inner(E),
}

/// Wraps an exchange client so a dead venue fails fast instead of
/// consuming a full timeout on every call.
///
/// Rejections are business answers and never trip the breaker.
pub struct CircuitBreakingExchange {
    inner: Arc<dyn ExchangeClient>,
    breaker: CircuitBreaker,
}

impl CircuitBreakingExchange {
    pub fn new(inner: Arc<dyn ExchangeClient>, breaker: CircuitBreaker) -> Self {
        Self { inner, breaker }
    }

    pub async fn state(&self) -> CircuitState {
        self.breaker.state().await
    }

    async fn guarded<T>(
        &self,
        operation: &str,
        f: impl Future<Output = Result<T, ExchangeError>>,
    ) -> Result<T, ExchangeError> {
        self.breaker
            .call(f, |e| !matches!(e, ExchangeError::Rejected { .. }))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Inner(e) => e,
                open @ CircuitBreakerError::Open { .. } => {
                    ExchangeError::transport(operation, open.to_string())
                }
            })
    }
}

#[async_trait]
impl ExchangeClient for CircuitBreakingExchange {
    async fn get_server_time(&self) -> Result<i64, ExchangeError> {
        self.guarded("get_server_time", self.inner.get_server_time())
            .await
    }

    async fn get_ticker(&self, symbol: TradingPair) -> Result<Ticker, ExchangeError> {
        self.guarded("get_ticker", self.inner.get_ticker(symbol)).await
    }

    async fn get_candles(
        &self,
        symbol: TradingPair,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.guarded(
            "get_candles",
            self.inner.get_candles(symbol, granularity, limit),
        )
        .await
    }

    async fn get_order_book_depth(
        &self,
        symbol: TradingPair,
        limit: usize,
    ) -> Result<OrderBookDepth, ExchangeError> {
        self.guarded(
            "get_order_book_depth",
            self.inner.get_order_book_depth(symbol, limit),
        )
        .await
    }

    async fn get_account_balance(&self) -> Result<AccountBalance, ExchangeError> {
        self.guarded("get_account_balance", self.inner.get_account_balance())
            .await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.guarded("get_positions", self.inner.get_positions())
            .await
    }

    async fn open_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.guarded("open_long", self.inner.open_long(symbol, size, options))
            .await
    }

    async fn open_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.guarded("open_short", self.inner.open_short(symbol, size, options))
            .await
    }

    async fn close_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.guarded("close_long", self.inner.close_long(symbol, size, options))
            .await
    }

    async fn close_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.guarded("close_short", self.inner.close_short(symbol, size, options))
            .await
    }
}
