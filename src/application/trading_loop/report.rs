use crate::domain::audit::TradeAction;
use crate::domain::errors::CycleError;
use crate::domain::market::indicators::TechnicalIndicators;
use crate::domain::market::market_regime::RegimeClassification;
use crate::domain::risk::risk_engine::RiskDecision;
use crate::domain::risk::volatility_guard::VolatilityGuardStatus;
use crate::domain::trading::signal::TradeSignal;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Sub-phases of one symbol cycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Fetch,
    Classify,
    RiskCheck,
    Signal,
    Gate,
    Execute,
    Log,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Fetch => "FETCH",
            CyclePhase::Classify => "CLASSIFY",
            CyclePhase::RiskCheck => "RISK_CHECK",
            CyclePhase::Signal => "SIGNAL",
            CyclePhase::Gate => "GATE",
            CyclePhase::Execute => "EXECUTE",
            CyclePhase::Log => "LOG",
        };
        f.write_str(name)
    }
}

/// A failed symbol cycle. Other symbols are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolError {
    pub symbol: TradingPair,
    pub phase: CyclePhase,
    #[serde(skip)]
    pub error: CycleError,
    pub message: String,
}

impl SymbolError {
    pub fn new(symbol: TradingPair, phase: CyclePhase, error: impl Into<CycleError>) -> Self {
        let error = error.into();
        Self {
            symbol,
            phase,
            message: error.to_string(),
            error,
        }
    }
}

/// Order the gate let through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedOrder {
    pub action: TradeAction,
    pub side: OrderSide,
    pub size: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Deliberately nothing to do
    NoOp { reason: String },
    /// Would have submitted `order`
    DryRun { order: PlannedOrder },
    Submitted { order_id: String, order: PlannedOrder },
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::NoOp { .. } => "no_op",
            CycleOutcome::DryRun { .. } => "dry_run",
            CycleOutcome::Submitted { .. } => "submitted",
        }
    }

    pub fn order(&self) -> Option<&PlannedOrder> {
        match self {
            CycleOutcome::NoOp { .. } => None,
            CycleOutcome::DryRun { order } | CycleOutcome::Submitted { order, .. } => Some(order),
        }
    }
}

/// Full decision trail for one symbol cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleDecision {
    pub symbol: TradingPair,
    pub timestamp: i64,
    pub last_price: Decimal,
    pub indicators: TechnicalIndicators,
    pub regime: RegimeClassification,
    pub volatility: VolatilityGuardStatus,
    pub risk: RiskDecision,
    pub signal: TradeSignal,
    /// Risk multiplier after suspension and kill-switch overrides
    pub effective_multiplier: f64,
    /// raw size x base size x effective multiplier, before exchange rounding
    pub final_size: Decimal,
    /// `final_size` rounded down to the pair's size precision
    pub order_size: Decimal,
    pub outcome: CycleOutcome,
}

/// Result of one pass over the configured symbols
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: i64,
    pub finished_at: i64,
    pub decisions: Vec<CycleDecision>,
    pub errors: Vec<SymbolError>,
    /// Symbols whose previous cycle was still in flight
    pub skipped: Vec<TradingPair>,
}

impl CycleReport {
    pub fn decision(&self, symbol: TradingPair) -> Option<&CycleDecision> {
        self.decisions.iter().find(|d| d.symbol == symbol)
    }

    pub fn error(&self, symbol: TradingPair) -> Option<&SymbolError> {
        self.errors.iter().find(|e| e.symbol == symbol)
    }
}
