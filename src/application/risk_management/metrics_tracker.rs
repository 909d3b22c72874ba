use crate::domain::risk::state::RiskMetrics;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::Position;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SymbolLedger {
    realized_pnl: Decimal,
    /// Unrealized PnL of the open position at the last observation
    open_pnl: Option<Decimal>,
    /// Unrealized PnL carried in from the previous UTC day
    day_start_open_pnl: Decimal,
    peak_pnl: Decimal,
    metrics: RiskMetrics,
}

/// Rolls per-symbol risk metrics forward from freshly fetched account state.
///
/// Daily figures are anchored to the equity seen at the first observation of
/// each UTC day. Closed-position PnL is taken from the last unrealized PnL
/// observed before the position disappeared. A position held across midnight
/// only contributes the PnL it made since the day began.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetricsTracker {
    day: Option<NaiveDate>,
    day_start_equity: Decimal,
    ledgers: HashMap<TradingPair, SymbolLedger>,
}

impl RiskMetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day_start_equity(&self) -> Decimal {
        self.day_start_equity
    }

    pub fn metrics(&self, symbol: TradingPair) -> RiskMetrics {
        self.ledgers
            .get(&symbol)
            .map(|l| l.metrics.clone())
            .unwrap_or_default()
    }

    /// Update with this cycle's view of the symbol. `positions` may include other symbols.
    pub fn observe(
        &mut self,
        symbol: TradingPair,
        positions: &[Position],
        equity: Decimal,
        now_ms: i64,
    ) -> RiskMetrics {
        self.roll_day(equity, now_ms);

        let day_start_equity = self.day_start_equity;
        let ledger = self.ledgers.entry(symbol).or_default();

        let mut has_position = false;
        let mut unrealized = Decimal::ZERO;
        for p in positions.iter().filter(|p| p.symbol == symbol) {
            has_position = true;
            unrealized += p.unrealized_pnl;
        }

        match (has_position, ledger.open_pnl) {
            (true, _) => ledger.open_pnl = Some(unrealized),
            (false, Some(closed_pnl)) => {
                ledger.realized_pnl += closed_pnl - ledger.day_start_open_pnl;
                ledger.open_pnl = None;
                ledger.day_start_open_pnl = Decimal::ZERO;
                if closed_pnl < Decimal::ZERO {
                    ledger.metrics.consecutive_losses += 1;
                    info!(
                        "RiskMetrics: {} position closed at a loss ({}), {} in a row",
                        symbol, closed_pnl, ledger.metrics.consecutive_losses
                    );
                } else {
                    ledger.metrics.consecutive_losses = 0;
                }
            }
            (false, None) => {}
        }

        let open_today = if has_position {
            unrealized - ledger.day_start_open_pnl
        } else {
            Decimal::ZERO
        };
        let daily_pnl = ledger.realized_pnl + open_today;
        ledger.peak_pnl = ledger.peak_pnl.max(daily_pnl);

        let pct_of_equity = |amount: Decimal| -> f64 {
            if day_start_equity <= Decimal::ZERO {
                return 0.0;
            }
            (amount / day_start_equity * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
        };

        ledger.metrics.daily_loss_percent = pct_of_equity((-daily_pnl).max(Decimal::ZERO));
        ledger.metrics.recent_drawdown = pct_of_equity(ledger.peak_pnl - daily_pnl);
        ledger.metrics.clone()
    }

    pub fn record_trade(&mut self, symbol: TradingPair, now_ms: i64) {
        self.ledgers.entry(symbol).or_default().metrics.last_trade_time = Some(now_ms);
    }

    fn roll_day(&mut self, equity: Decimal, now_ms: i64) {
        let Some(today) = DateTime::from_timestamp_millis(now_ms).map(|t| t.date_naive()) else {
            return;
        };
        if self.day == Some(today) {
            return;
        }
        if self.day.is_some() {
            info!(
                "RiskMetrics: New trading day {} detected. Resetting daily metrics (start equity {}).",
                today, equity
            );
        }
        self.day = Some(today);
        self.day_start_equity = equity;
        for ledger in self.ledgers.values_mut() {
            ledger.realized_pnl = Decimal::ZERO;
            ledger.day_start_open_pnl = ledger.open_pnl.unwrap_or(Decimal::ZERO);
            ledger.peak_pnl = Decimal::ZERO;
            ledger.metrics.daily_loss_percent = 0.0;
            ledger.metrics.recent_drawdown = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::PositionSide;
    use rust_decimal_macros::dec;

    const DAY_MS: i64 = 86_400_000;
    const T0: i64 = 1_700_000_000_000;

    fn position(pnl: Decimal) -> Position {
        Position {
            symbol: TradingPair::BtcUsdt,
            side: PositionSide::Long,
            size: dec!(0.1),
            entry_price: dec!(30000),
            unrealized_pnl: pnl,
        }
    }

    #[test]
    fn test_unrealized_loss_counts_toward_daily_loss() {
        let mut tracker = RiskMetricsTracker::new();
        let m = tracker.observe(TradingPair::BtcUsdt, &[position(dec!(-200))], dec!(10000), T0);
        assert!((m.daily_loss_percent - 2.0).abs() < 1e-9);
        assert!((m.recent_drawdown - 2.0).abs() < 1e-9);
        assert_eq!(m.consecutive_losses, 0);
    }

    #[test]
    fn test_closed_losses_accumulate_and_count() {
        let mut tracker = RiskMetricsTracker::new();
        let btc = TradingPair::BtcUsdt;

        tracker.observe(btc, &[position(dec!(-300))], dec!(10000), T0);
        let m = tracker.observe(btc, &[], dec!(9700), T0 + 1);
        assert_eq!(m.consecutive_losses, 1);
        assert!((m.daily_loss_percent - 3.0).abs() < 1e-9);

        tracker.observe(btc, &[position(dec!(-300))], dec!(9700), T0 + 2);
        let m = tracker.observe(btc, &[], dec!(9400), T0 + 3);
        assert_eq!(m.consecutive_losses, 2);
        assert!((m.daily_loss_percent - 6.0).abs() < 1e-9);

        // A winner resets the streak
        tracker.observe(btc, &[position(dec!(50))], dec!(9400), T0 + 4);
        let m = tracker.observe(btc, &[], dec!(9450), T0 + 5);
        assert_eq!(m.consecutive_losses, 0);
    }

    #[test]
    fn test_drawdown_from_intraday_peak() {
        let mut tracker = RiskMetricsTracker::new();
        let btc = TradingPair::BtcUsdt;
        tracker.observe(btc, &[position(dec!(500))], dec!(10000), T0);
        let m = tracker.observe(btc, &[position(dec!(100))], dec!(10000), T0 + 1);
        assert_eq!(m.daily_loss_percent, 0.0);
        assert!((m.recent_drawdown - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_day_resets_daily_figures_but_not_streak() {
        let mut tracker = RiskMetricsTracker::new();
        let btc = TradingPair::BtcUsdt;
        tracker.observe(btc, &[position(dec!(-400))], dec!(10000), T0);
        tracker.observe(btc, &[], dec!(9600), T0 + 1);

        let m = tracker.observe(btc, &[], dec!(9600), T0 + DAY_MS);
        assert_eq!(m.daily_loss_percent, 0.0);
        assert_eq!(m.recent_drawdown, 0.0);
        assert_eq!(m.consecutive_losses, 1);
        assert_eq!(tracker.day_start_equity(), dec!(9600));
    }

    #[test]
    fn test_loss_carried_overnight_is_not_todays_loss() {
        let mut tracker = RiskMetricsTracker::new();
        let btc = TradingPair::BtcUsdt;
        let m = tracker.observe(btc, &[position(dec!(-600))], dec!(10000), T0);
        assert!((m.daily_loss_percent - 6.0).abs() < 1e-9);

        // No movement since midnight
        let m = tracker.observe(btc, &[position(dec!(-600))], dec!(9400), T0 + DAY_MS);
        assert_eq!(m.daily_loss_percent, 0.0);
        assert_eq!(m.recent_drawdown, 0.0);

        // Only the further 94 lost today counts
        let m = tracker.observe(btc, &[position(dec!(-694))], dec!(9306), T0 + DAY_MS + 1);
        assert!((m.daily_loss_percent - 1.0).abs() < 1e-9);

        // Closing books today's part only, the streak sees the whole trade
        let m = tracker.observe(btc, &[], dec!(9306), T0 + DAY_MS + 2);
        assert!((m.daily_loss_percent - 1.0).abs() < 1e-9);
        assert_eq!(m.consecutive_losses, 1);
    }

    #[test]
    fn test_gain_carried_overnight_does_not_hide_giveback() {
        let mut tracker = RiskMetricsTracker::new();
        let btc = TradingPair::BtcUsdt;
        tracker.observe(btc, &[position(dec!(500))], dec!(10000), T0);

        let m = tracker.observe(btc, &[position(dec!(500))], dec!(10500), T0 + DAY_MS);
        assert_eq!(m.daily_loss_percent, 0.0);

        let m = tracker.observe(btc, &[position(dec!(-25))], dec!(9975), T0 + DAY_MS + 1);
        assert!((m.daily_loss_percent - 5.0).abs() < 1e-9);
        assert!((m.recent_drawdown - 5.0).abs() < 1e-9);

        // Closed still in profit overall, but the day lost 525
        let m = tracker.observe(btc, &[], dec!(9975), T0 + DAY_MS + 2);
        assert!((m.daily_loss_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_trade_sets_last_trade_time() {
        let mut tracker = RiskMetricsTracker::new();
        tracker.record_trade(TradingPair::EthUsdt, T0);
        assert_eq!(tracker.metrics(TradingPair::EthUsdt).last_trade_time, Some(T0));
        assert_eq!(tracker.metrics(TradingPair::BtcUsdt), RiskMetrics::default());
    }
}
