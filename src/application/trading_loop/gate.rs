//! Turns a raw strategy signal into an order (or a no-op) under the risk decision.

use super::report::PlannedOrder;
use crate::domain::audit::TradeAction;
use crate::domain::risk::risk_engine::RiskDecision;
use crate::domain::trading::signal::TradeSignal;
use crate::domain::trading::types::{OrderSide, Position, PositionSide};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub signal: &'a TradeSignal,
    pub risk: &'a RiskDecision,
    pub kill_switch_active: bool,
    pub base_position_size: Decimal,
    pub size_precision: u32,
    pub spread_bps: Option<Decimal>,
    pub max_spread_bps: Decimal,
    /// Open position for the signal's symbol, if any
    pub open_position: Option<&'a Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub effective_multiplier: f64,
    pub final_size: Decimal,
    pub order_size: Decimal,
    pub order: Result<PlannedOrder, String>,
}

pub fn apply_gate(input: &GateInput<'_>) -> GateResult {
    let GateInput {
        signal,
        risk,
        kill_switch_active,
        ..
    } = *input;

    let effective_multiplier = if risk.trade_suspended || kill_switch_active {
        0.0
    } else {
        risk.position_size_multiplier.clamp(0.0, 1.0)
    };
    let multiplier = Decimal::from_f64(effective_multiplier).unwrap_or(Decimal::ZERO);
    let final_size = (signal.size * input.base_position_size * multiplier).max(Decimal::ZERO);
    let order_size = final_size.round_dp_with_strategy(input.size_precision, RoundingStrategy::ToZero);

    let result = |order: Result<PlannedOrder, String>| GateResult {
        effective_multiplier,
        final_size,
        order_size,
        order,
    };

    let Some(side) = signal.side.filter(|_| signal.is_actionable()) else {
        return result(Err(format!("No trade: {}", signal.reason)));
    };
    if risk.trade_suspended {
        return result(Err(format!("Trade suspended: {}", risk.explanation)));
    }
    if kill_switch_active {
        return result(Err("Kill-switch active: new entries suspended".to_string()));
    }
    if order_size <= Decimal::ZERO {
        return result(Err(format!(
            "Order size {} rounds to zero at {} decimals",
            final_size, input.size_precision
        )));
    }
    if let Some(spread) = input.spread_bps
        && spread > input.max_spread_bps
    {
        return result(Err(format!(
            "Spread {:.1}bps exceeds max {}bps",
            spread, input.max_spread_bps
        )));
    }

    if let Some(position) = input.open_position {
        if position.side.entry_side() == side {
            return result(Err(format!(
                "Position already open: {:?} {}",
                position.side, position.size
            )));
        }
        let close_side = match position.side {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        };
        return result(Ok(PlannedOrder {
            action: TradeAction::Close,
            side: close_side,
            size: position.size,
            stop_loss: None,
            take_profit: None,
        }));
    }

    result(Ok(PlannedOrder {
        action: TradeAction::Open,
        side,
        size: order_size,
        stop_loss: Some(adjusted_stop(signal, side, risk)),
        take_profit: Some(signal.take_profit),
    }))
}

/// Rescales the stop distance from entry by the risk decision's adjustment
fn adjusted_stop(signal: &TradeSignal, side: OrderSide, risk: &RiskDecision) -> Decimal {
    let distance = (signal.entry_price - signal.stop_loss).abs()
        * risk.stop_loss_adjustment.distance_factor();
    match side {
        OrderSide::Buy => signal.entry_price - distance,
        OrderSide::Sell => signal.entry_price + distance,
    }
}
