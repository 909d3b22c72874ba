//! Compliance records, one per decision type.

use crate::domain::market::indicators::TechnicalIndicators;
use crate::domain::market::market_regime::{Regime, RegimeClassification};
use crate::domain::risk::risk_engine::RiskDecision;
use crate::domain::risk::state::RiskMetrics;
use crate::domain::risk::volatility_guard::VolatilityGuardStatus;
use crate::domain::trading::signal::StrategyKind;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MAX_EXPLANATION_CHARS: usize = 1000;

/// Cuts on a char boundary so multi-byte text never splits
pub fn truncate_explanation(explanation: &str) -> String {
    match explanation.char_indices().nth(MAX_EXPLANATION_CHARS) {
        Some((idx, _)) => explanation[..idx].to_string(),
        None => explanation.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAuditRecord {
    pub symbol: TradingPair,
    pub classification: RegimeClassification,
    pub indicators: TechnicalIndicators,
    pub explanation: String,
    pub timestamp: i64,
}

impl RegimeAuditRecord {
    pub fn new(
        symbol: TradingPair,
        classification: RegimeClassification,
        indicators: TechnicalIndicators,
        explanation: &str,
    ) -> Self {
        Self {
            symbol,
            timestamp: classification.timestamp,
            classification,
            indicators,
            explanation: truncate_explanation(explanation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAuditRecord {
    pub symbol: TradingPair,
    pub regime: Regime,
    pub metrics: RiskMetrics,
    pub decision: RiskDecision,
    pub explanation: String,
    pub timestamp: i64,
}

impl RiskAuditRecord {
    pub fn new(symbol: TradingPair, regime: Regime, metrics: RiskMetrics, decision: RiskDecision) -> Self {
        Self {
            symbol,
            regime,
            metrics,
            explanation: truncate_explanation(&decision.explanation),
            timestamp: decision.timestamp,
            decision,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Open,
    Close,
}

/// Only written for orders the exchange acknowledged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAuditRecord {
    pub symbol: TradingPair,
    pub order_id: String,
    pub action: TradeAction,
    pub side: OrderSide,
    pub strategy: StrategyKind,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub explanation: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityAuditRecord {
    pub symbol: TradingPair,
    pub status: VolatilityGuardStatus,
    pub explanation: String,
    pub timestamp: i64,
}

impl VolatilityAuditRecord {
    pub fn new(symbol: TradingPair, status: VolatilityGuardStatus) -> Self {
        let explanation = if status.kill_switch_active {
            format!(
                "Kill-switch active: volatility {:.3}% vs threshold {}; new entries suspended",
                status.current_volatility,
                format_threshold(status.volatility_threshold)
            )
        } else if status.spike_detected {
            format!(
                "Volatility spike: {:.3}% above threshold {} ({} consecutive)",
                status.current_volatility,
                format_threshold(status.volatility_threshold),
                status.consecutive_spikes
            )
        } else {
            format!(
                "Volatility normal: {:.3}% (threshold {})",
                status.current_volatility,
                format_threshold(status.volatility_threshold)
            )
        };
        Self {
            symbol,
            timestamp: status.timestamp,
            status,
            explanation: truncate_explanation(&explanation),
        }
    }
}

fn format_threshold(threshold: Option<f64>) -> String {
    threshold.map_or_else(|| "n/a (warming up)".to_string(), |t| format!("{:.3}%", t))
}

/// Any record, as stored by audit sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEntry {
    Regime(RegimeAuditRecord),
    Risk(RiskAuditRecord),
    Trade(TradeAuditRecord),
    Volatility(VolatilityAuditRecord),
}

impl AuditEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEntry::Regime(_) => "regime",
            AuditEntry::Risk(_) => "risk",
            AuditEntry::Trade(_) => "trade",
            AuditEntry::Volatility(_) => "volatility",
        }
    }

    pub fn symbol(&self) -> TradingPair {
        match self {
            AuditEntry::Regime(r) => r.symbol,
            AuditEntry::Risk(r) => r.symbol,
            AuditEntry::Trade(r) => r.symbol,
            AuditEntry::Volatility(r) => r.symbol,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            AuditEntry::Regime(r) => &r.explanation,
            AuditEntry::Risk(r) => &r.explanation,
            AuditEntry::Trade(r) => &r.explanation,
            AuditEntry::Volatility(r) => &r.explanation,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            AuditEntry::Regime(r) => r.timestamp,
            AuditEntry::Risk(r) => r.timestamp,
            AuditEntry::Trade(r) => r.timestamp,
            AuditEntry::Volatility(r) => r.timestamp,
        }
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            AuditEntry::Trade(r) => Some(&r.order_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_explanation_respects_char_boundaries() {
        let long = "é".repeat(MAX_EXPLANATION_CHARS + 10);
        let cut = truncate_explanation(&long);
        assert_eq!(cut.chars().count(), MAX_EXPLANATION_CHARS);

        assert_eq!(truncate_explanation("short"), "short");
    }

    #[test]
    fn test_volatility_record_explains_kill_switch() {
        let record = VolatilityAuditRecord::new(
            TradingPair::BtcUsdt,
            VolatilityGuardStatus {
                spike_detected: true,
                anomaly_detected: true,
                kill_switch_active: true,
                current_volatility: 5.0,
                volatility_threshold: Some(1.5),
                consecutive_spikes: 3,
                timestamp: 7,
            },
        );
        assert!(record.explanation.starts_with("Kill-switch active"));
        assert_eq!(record.timestamp, 7);
        assert_eq!(AuditEntry::Volatility(record).kind(), "volatility");
    }
}
