use crate::domain::audit::{RegimeAuditRecord, RiskAuditRecord, TradeAuditRecord, VolatilityAuditRecord};
use crate::domain::errors::ExchangeError;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::{
    AccountBalance, Candle, Granularity, OrderAck, OrderBookDepth, OrderOptions, Position, Ticker,
};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Typed access to the derivatives exchange.
///
/// Transport, signing and rate limiting live behind this trait.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange clock in milliseconds since epoch
    async fn get_server_time(&self) -> Result<i64, ExchangeError>;
    async fn get_ticker(&self, symbol: TradingPair) -> Result<Ticker, ExchangeError>;
    /// Oldest-first
    async fn get_candles(
        &self,
        symbol: TradingPair,
        granularity: Granularity,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;
    async fn get_order_book_depth(
        &self,
        symbol: TradingPair,
        limit: usize,
    ) -> Result<OrderBookDepth, ExchangeError>;
    async fn get_account_balance(&self) -> Result<AccountBalance, ExchangeError>;
    /// All open positions on the account
    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError>;

    async fn open_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError>;
    async fn open_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError>;
    async fn close_long(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError>;
    async fn close_short(
        &self,
        symbol: TradingPair,
        size: Decimal,
        options: OrderOptions,
    ) -> Result<OrderAck, ExchangeError>;
}

/// Compliance sink for decision explanations
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log_regime(&self, record: RegimeAuditRecord) -> Result<()>;
    async fn log_risk(&self, record: RiskAuditRecord) -> Result<()>;
    async fn log_trade(&self, record: TradeAuditRecord) -> Result<()>;
    async fn log_volatility(&self, record: VolatilityAuditRecord) -> Result<()>;
}
