//! In-memory audit sink
//!
//! Keeps every record in arrival order behind an `Arc<RwLock>`. Data is lost
//! on restart; use the SQLite sink when records must survive the process.

use crate::domain::audit::{
    AuditEntry, RegimeAuditRecord, RiskAuditRecord, TradeAuditRecord, VolatilityAuditRecord,
};
use crate::domain::ports::AuditLogger;
use crate::domain::trading::trading_pair::TradingPair;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Entries of one kind (`regime`, `risk`, `trade`, `volatility`)
    pub async fn entries_of_kind(&self, kind: &str) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub async fn entries_for(&self, symbol: TradingPair) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.symbol() == symbol)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn push(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLog {
    async fn log_regime(&self, record: RegimeAuditRecord) -> Result<()> {
        self.push(AuditEntry::Regime(record)).await
    }

    async fn log_risk(&self, record: RiskAuditRecord) -> Result<()> {
        self.push(AuditEntry::Risk(record)).await
    }

    async fn log_trade(&self, record: TradeAuditRecord) -> Result<()> {
        self.push(AuditEntry::Trade(record)).await
    }

    async fn log_volatility(&self, record: VolatilityAuditRecord) -> Result<()> {
        self.push(AuditEntry::Volatility(record)).await
    }
}
