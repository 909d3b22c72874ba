use crate::domain::audit::{
    AuditEntry, RegimeAuditRecord, RiskAuditRecord, TradeAuditRecord, VolatilityAuditRecord,
};
use crate::domain::ports::AuditLogger;
use crate::domain::trading::trading_pair::TradingPair;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Append-only audit sink backed by the `audit_log` table.
///
/// The full record is stored as JSON next to indexed columns, so entries
/// read back exactly as written.
pub struct SqliteAuditLogger {
    pool: SqlitePool,
}

impl SqliteAuditLogger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn save(&self, entry: &AuditEntry) -> Result<()> {
        let payload = serde_json::to_string(entry).context("Failed to serialize audit record")?;

        sqlx::query(
            r#"
            INSERT INTO audit_log (kind, symbol, explanation, payload_json, order_id, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.kind())
        .bind(entry.symbol().as_str())
        .bind(entry.explanation())
        .bind(payload)
        .bind(entry.order_id())
        .bind(entry.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to save audit record")?;

        debug!("Persisted {} audit record for {}", entry.kind(), entry.symbol());
        Ok(())
    }

    pub async fn find_by_symbol(&self, symbol: TradingPair) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT payload_json FROM audit_log WHERE symbol = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(symbol.as_str())
        .fetch_all(&self.pool)
        .await?;
        Self::map_rows(rows)
    }

    pub async fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT payload_json FROM audit_log ORDER BY id DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Self::map_rows(rows)
    }

    pub async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM audit_log")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }

    fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<AuditEntry>> {
        rows.into_iter()
            .map(|row| {
                let payload: String = row.try_get("payload_json")?;
                serde_json::from_str(&payload).context("Corrupt audit payload")
            })
            .collect()
    }
}

#[async_trait]
impl AuditLogger for SqliteAuditLogger {
    async fn log_regime(&self, record: RegimeAuditRecord) -> Result<()> {
        self.save(&AuditEntry::Regime(record)).await
    }

    async fn log_risk(&self, record: RiskAuditRecord) -> Result<()> {
        self.save(&AuditEntry::Risk(record)).await
    }

    async fn log_trade(&self, record: TradeAuditRecord) -> Result<()> {
        self.save(&AuditEntry::Trade(record)).await
    }

    async fn log_volatility(&self, record: VolatilityAuditRecord) -> Result<()> {
        self.save(&AuditEntry::Volatility(record)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::TradeAction;
    use crate::domain::trading::signal::StrategyKind;
    use crate::domain::trading::types::OrderSide;
    use crate::infrastructure::persistence::database::Database;
    use rust_decimal_macros::dec;

    fn trade(ts: i64) -> TradeAuditRecord {
        TradeAuditRecord {
            symbol: TradingPair::BtcUsdt,
            order_id: format!("ord-{}", ts),
            action: TradeAction::Open,
            side: OrderSide::Buy,
            strategy: StrategyKind::TrendFollowing,
            size: dec!(0.005),
            entry_price: dec!(35000),
            stop_loss: Some(dec!(34500)),
            take_profit: Some(dec!(36000)),
            explanation: "Trend following long".to_string(),
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn test_trade_record_round_trips_through_sqlite() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let logger = SqliteAuditLogger::new(db.pool.clone());

        logger.log_trade(trade(1)).await.unwrap();
        logger.log_trade(trade(2)).await.unwrap();

        assert_eq!(logger.count().await.unwrap(), 2);
        let entries = logger.find_by_symbol(TradingPair::BtcUsdt).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], AuditEntry::Trade(trade(1)));
        assert_eq!(entries[1].order_id(), Some("ord-2"));

        let recent = logger.find_recent(1).await.unwrap();
        assert_eq!(recent[0].timestamp(), 2);
        assert!(logger.find_by_symbol(TradingPair::EthUsdt).await.unwrap().is_empty());
    }
}
