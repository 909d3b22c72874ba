use crate::domain::trading::trading_pair::TradingPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Direction of an open derivatives position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side of the order that opened this position
    pub fn entry_side(self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }
}

/// OHLCV bar. Sequences are ordered oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Candle interval requested from the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::OneHour => "1H",
            Granularity::FourHours => "4H",
            Granularity::OneDay => "1D",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::FifteenMinutes => 900,
            Granularity::OneHour => 3_600,
            Granularity::FourHours => 14_400,
            Granularity::OneDay => 86_400,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Granularity::OneMinute),
            "5m" => Ok(Granularity::FiveMinutes),
            "15m" => Ok(Granularity::FifteenMinutes),
            "1h" => Ok(Granularity::OneHour),
            "4h" => Ok(Granularity::FourHours),
            "1d" => Ok(Granularity::OneDay),
            _ => anyhow::bail!(
                "Invalid granularity: {}. Must be one of 1m, 5m, 15m, 1h, 4h, 1d",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticker {
    pub symbol: TradingPair,
    pub last_price: Decimal,
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    pub timestamp: i64,
}

/// One price level: (price, size)
pub type DepthLevel = (Decimal, Decimal);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderBookDepth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl OrderBookDepth {
    /// Top-of-book spread in basis points of the mid price.
    /// `None` when either side of the book is empty.
    pub fn spread_bps(&self) -> Option<Decimal> {
        let (bid, _) = self.bids.first()?;
        let (ask, _) = self.asks.first()?;
        let mid = (*bid + *ask) / Decimal::TWO;
        if mid <= Decimal::ZERO {
            return None;
        }
        Some((*ask - *bid) / mid * Decimal::from(10_000))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBalance {
    pub equity: Decimal,
    pub available: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: TradingPair,
    pub side: PositionSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
}

impl Position {
    pub fn notional(&self) -> Decimal {
        self.size * self.entry_price
    }
}

/// Order parameters accepted by open/close operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderOptions {
    pub is_market: bool,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
}

impl OrderOptions {
    pub fn market() -> Self {
        Self {
            is_market: true,
            stop_loss_price: None,
            take_profit_price: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
}
