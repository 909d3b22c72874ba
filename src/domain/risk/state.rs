use serde::{Deserialize, Serialize};

/// Trailing per-symbol risk metrics fed into the risk engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Drop from the intraday PnL peak, % of day-start equity
    pub recent_drawdown: f64,

    /// Millisecond timestamp of the last submitted order
    pub last_trade_time: Option<i64>,

    /// Today's loss, % of day-start equity (0 when in profit)
    pub daily_loss_percent: f64,

    /// Closed positions in a row with negative PnL
    pub consecutive_losses: usize,
}
