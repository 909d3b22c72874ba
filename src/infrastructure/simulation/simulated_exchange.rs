//! Paper exchange driven by a seeded random walk.
//!
//! Each candle request advances that symbol's market by one bar, so a demo
//! run sees fresh prices every cycle regardless of the candle granularity.
//! Market orders fill against the simulated book and positions, equity and
//! unrealized PnL are tracked locally.

use super::fill_model::FillModel;
use crate::domain::errors::ExchangeError;
use crate::domain::ports::ExchangeClient;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::{
    AccountBalance, Candle, Granularity, OrderAck, OrderBookDepth, OrderOptions, OrderSide,
    Position, PositionSide, Ticker,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::{HashMap, VecDeque};
use tracing::info;
use uuid::Uuid;

const HISTORY_LEN: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// `None` seeds from the OS
    pub seed: Option<u64>,
    pub starting_equity: Decimal,
    /// Per-bar drift in basis points
    pub drift_bps: f64,
    /// Per-bar return amplitude in basis points
    pub volatility_bps: f64,
    pub spread_bps: f64,
    pub fill: FillModel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            starting_equity: Decimal::from(10_000),
            drift_bps: 2.0,
            volatility_bps: 40.0,
            spread_bps: 2.0,
            fill: FillModel::default(),
        }
    }
}

fn seed_price(symbol: TradingPair) -> f64 {
    match symbol {
        TradingPair::BtcUsdt => 60_000.0,
        TradingPair::EthUsdt => 3_000.0,
        TradingPair::SolUsdt => 150.0,
        TradingPair::XrpUsdt => 0.6,
        TradingPair::DogeUsdt => 0.15,
        TradingPair::AdaUsdt => 0.45,
        TradingPair::BnbUsdt => 550.0,
        TradingPair::LtcUsdt => 80.0,
    }
}

fn price_scale(symbol: TradingPair) -> u32 {
    match symbol {
        TradingPair::XrpUsdt | TradingPair::DogeUsdt | TradingPair::AdaUsdt => 5,
        _ => 2,
    }
}

fn to_price(value: f64, symbol: TradingPair) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ONE)
        .round_dp(price_scale(symbol))
}

struct SimMarket {
    candles: VecDeque<Candle>,
    bar_seconds: i64,
}

struct SimAccount {
    cash: Decimal,
    positions: HashMap<TradingPair, Position>,
}

struct SimState {
    rng: StdRng,
    markets: HashMap<TradingPair, SimMarket>,
    account: SimAccount,
}

pub struct SimulatedExchange {
    config: SimulationConfig,
    state: Mutex<SimState>,
}

impl SimulatedExchange {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        info!(
            "SimulatedExchange: starting equity {} (seed: {:?})",
            config.starting_equity, config.seed
        );
        Self {
            state: Mutex::new(SimState {
                rng,
                markets: HashMap::new(),
                account: SimAccount {
                    cash: config.starting_equity,
                    positions: HashMap::new(),
                },
            }),
            config,
        }
    }

    fn ensure_market(&self, state: &mut SimState, symbol: TradingPair, granularity: Granularity) {
        if state.markets.contains_key(&symbol) {
            return;
        }
        let bar_seconds = granularity.seconds();
        let now = chrono::Utc::now().timestamp_millis();
        let mut market = SimMarket {
            candles: VecDeque::with_capacity(HISTORY_LEN + 1),
            bar_seconds,
        };
        let mut price = seed_price(symbol);
        for i in 0..HISTORY_LEN {
            let ts = now - (HISTORY_LEN - i) as i64 * bar_seconds * 1000;
            let candle = self.next_bar(&mut state.rng, symbol, price, ts);
            price = candle.close.to_f64().unwrap_or(price);
            market.candles.push_back(candle);
        }
        state.markets.insert(symbol, market);
    }

    fn next_bar(&self, rng: &mut StdRng, symbol: TradingPair, open: f64, timestamp: i64) -> Candle {
        let amplitude = self.config.volatility_bps / 10_000.0;
        let drift = self.config.drift_bps / 10_000.0;
        let ret = drift + rng.random_range(-amplitude..=amplitude);
        let close = (open * (1.0 + ret)).max(f64::EPSILON);
        let wick = open.max(close) * rng.random_range(0.0..=amplitude / 2.0);
        let high = open.max(close) + wick;
        let low = (open.min(close) - wick).max(f64::EPSILON);
        Candle {
            timestamp,
            open: to_price(open, symbol),
            high: to_price(high, symbol),
            low: to_price(low, symbol),
            close: to_price(close, symbol),
            volume: Decimal::from(rng.random_range(10u32..1_000)),
        }
    }

    fn advance(&self, state: &mut SimState, symbol: TradingPair) {
        let Some(market) = state.markets.get(&symbol) else {
            return;
        };
        let Some(last) = market.candles.back() else {
            return;
        };
        let open = last.close.to_f64().unwrap_or_else(|| seed_price(symbol));
        let ts = last.timestamp + market.bar_seconds * 1000;
        let candle = self.next_bar(&mut state.rng, symbol, open, ts);
        if let Some(market) = state.markets.get_mut(&symbol) {
            market.candles.push_back(candle);
            while market.candles.len() > HISTORY_LEN {
                market.candles.pop_front();
            }
        }
    }

    fn last_price(state: &SimState, symbol: TradingPair) -> Option<Decimal> {
        state
            .markets
            .get(&symbol)
            .and_then(|m| m.candles.back())
            .map(|c| c.close)
    }

    fn half_spread(&self, price: Decimal) -> Decimal {
        let spread = Decimal::from_f64(self.config.spread_bps / 20_000.0).unwrap_or_default();
        price * spread
    }

    fn quote(&self, state: &mut SimState, symbol: TradingPair) -> Decimal {
        if !state.markets.contains_key(&symbol) {
            self.ensure_market(state, symbol, Granularity::FifteenMinutes);
        }
        Self::last_price(state, symbol).unwrap_or(Decimal::ONE)
    }

    fn mark_to_market(state: &SimState) -> Vec<Position> {
        let mut positions: Vec<Position> = state
            .account
            .positions
            .values()
            .map(|p| {
                let mark = Self::last_price(state, p.symbol).unwrap_or(p.entry_price);
                let pnl = match p.side {
                    PositionSide::Long => (mark - p.entry_price) * p.size,
                    PositionSide::Short => (p.entry_price - mark) * p.size,
                };
                Position {
                    unrealized_pnl: pnl,
                    ..p.clone()
                }
            })
            .collect();
        positions.sort_by_key(|p| p.symbol);
        positions
    }

    async fn fill(
        &self,
        symbol: TradingPair,
        side: PositionSide,
        closing: bool,
        size: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        if size <= Decimal::ZERO {
            return Err(ExchangeError::rejected("40019", "order size must be positive"));
        }

        let latency = self.config.fill.latency(&mut self.state.lock().rng);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let quote = self.quote(&mut state, symbol);
        let order_side = if closing {
            side.entry_side().opposite()
        } else {
            side.entry_side()
        };
        let touch = match order_side {
            OrderSide::Buy => quote + self.half_spread(quote),
            OrderSide::Sell => quote - self.half_spread(quote),
        };
        let price = self.config.fill.execution_price(touch, order_side, &mut state.rng);

        if closing {
            let Some(position) = state.account.positions.get(&symbol).cloned() else {
                return Err(ExchangeError::rejected("22002", format!("no open position on {}", symbol)));
            };
            if position.side != side {
                return Err(ExchangeError::rejected(
                    "22002",
                    format!("open position on {} is {:?}", symbol, position.side),
                ));
            }
            let closed = size.min(position.size);
            let pnl = match side {
                PositionSide::Long => (price - position.entry_price) * closed,
                PositionSide::Short => (position.entry_price - price) * closed,
            };
            state.account.cash += pnl;
            if closed >= position.size {
                state.account.positions.remove(&symbol);
            } else if let Some(p) = state.account.positions.get_mut(&symbol) {
                p.size -= closed;
            }
            info!(
                "SimulatedExchange: closed {} {} {:?} at {} (pnl {})",
                closed, symbol, side, price, pnl.round_dp(2)
            );
        } else {
            match state.account.positions.get_mut(&symbol) {
                Some(p) if p.side != side => {
                    return Err(ExchangeError::rejected(
                        "40774",
                        format!("opposite position open on {}", symbol),
                    ));
                }
                Some(p) => {
                    let total = p.size + size;
                    p.entry_price = ((p.entry_price * p.size + price * size) / total)
                        .round_dp(price_scale(symbol));
                    p.size = total;
                }
                None => {
                    state.account.positions.insert(
                        symbol,
                        Position {
                            symbol,
                            side,
                            size,
                            entry_price: price,
                            unrealized_pnl: Decimal::ZERO,
                        },
                    );
                }
            }
            info!("SimulatedExchange: opened {} {} {:?} at {}", size, symbol, side, price);
        }

        Ok(OrderAck {
            order_id: Uuid::new_v4().to_string(),
        })
    }
}

#[async_trait]
impl ExchangeClient for SimulatedExchange {
    async fn get_server_time(&self) -> Result<i64, ExchangeError> {
        Ok(chrono::Utc::now().timestamp_millis())
    }

    async fn get_ticker(&self, symbol: TradingPair) -> Result<Ticker, ExchangeError> {
        let mut state = self.state.lock();
        let last = self.quote(&mut state, symbol);
        let half = self.half_spread(last);
        Ok(Ticker {
            symbol,
            last_price: last,
            best_bid: last - half,
            best_ask: last + half,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    async fn get_candles(
        &self,
        symbol: TradingPair,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let mut state = self.state.lock();
        self.ensure_market(&mut state, symbol, granularity);
        self.advance(&mut state, symbol);
        let candles = state
            .markets
            .get(&symbol)
            .map(|m| {
                let skip = m.candles.len().saturating_sub(limit);
                m.candles.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default();
        Ok(candles)
    }

    async fn get_order_book_depth(
        &self,
        symbol: TradingPair,
        limit: usize,
    ) -> Result<OrderBookDepth, ExchangeError> {
        let mut state = self.state.lock();
        let mid = self.quote(&mut state, symbol);
        let half = self.half_spread(mid);
        let tick = (half * Decimal::TWO).max(Decimal::new(1, price_scale(symbol)));
        let levels = limit.max(1);
        let mut depth = OrderBookDepth::default();
        for i in 0..levels {
            let offset = tick * Decimal::from(i as u64);
            let size = Decimal::from(state.rng.random_range(1u32..50));
            depth.bids.push(((mid - half - offset).round_dp(price_scale(symbol)), size));
            depth.asks.push(((mid + half + offset).round_dp(price_scale(symbol)), size));
        }
        Ok(depth)
    }

    async fn get_account_balance(&self) -> Result<AccountBalance, ExchangeError> {
        let state = self.state.lock();
        let unrealized: Decimal = Self::mark_to_market(&state)
            .iter()
            .map(|p| p.unrealized_pnl)
            .sum();
        Ok(AccountBalance {
            equity: state.account.cash + unrealized,
            available: state.account.cash,
            currency: "USDT".to_string(),
        })
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        Ok(Self::mark_to_market(&self.state.lock()))
    }

    async fn open_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        _options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.fill(symbol, PositionSide::Long, false, size).await
    }

    async fn open_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        _options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.fill(symbol, PositionSide::Short, false, size).await
    }

    async fn close_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        _options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.fill(symbol, PositionSide::Long, true, size).await
    }

    async fn close_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        _options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError> {
        self.fill(symbol, PositionSide::Short, true, size).await
    }
}
