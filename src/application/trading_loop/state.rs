use super::report::CycleDecision;
use crate::application::risk_management::metrics_tracker::RiskMetricsTracker;
use crate::domain::risk::volatility_guard::VolatilityGuardState;
use crate::domain::trading::trading_pair::TradingPair;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopStatus {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    pub timestamp: i64,
    pub level: MessageLevel,
    pub message: String,
}

/// Bounded ring buffer; the oldest message is evicted first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageLog {
    capacity: usize,
    entries: VecDeque<LogMessage>,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, timestamp: i64, level: MessageLevel, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogMessage {
            timestamp,
            level,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &VecDeque<LogMessage> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Mutable loop state. Written only by the trading loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopState {
    pub status: LoopStatus,
    pub risk_metrics: RiskMetricsTracker,
    pub volatility: HashMap<TradingPair, VolatilityGuardState>,
    pub messages: MessageLog,
    /// Most recent decision per symbol
    pub last_decisions: HashMap<TradingPair, CycleDecision>,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<i64>,
}

impl LoopState {
    pub fn new(message_capacity: usize) -> Self {
        Self {
            status: LoopStatus::Stopped,
            risk_metrics: RiskMetricsTracker::new(),
            volatility: HashMap::new(),
            messages: MessageLog::new(message_capacity),
            last_decisions: HashMap::new(),
            cycles_completed: 0,
            last_cycle_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == LoopStatus::Running
    }

    pub fn kill_switch_active(&self, symbol: TradingPair) -> bool {
        self.volatility
            .get(&symbol)
            .is_some_and(VolatilityGuardState::kill_switch_active)
    }

    /// Symbols with a tripped kill-switch, sorted
    pub fn tripped_symbols(&self) -> Vec<TradingPair> {
        let mut tripped: Vec<TradingPair> = self
            .volatility
            .iter()
            .filter(|(_, guard)| guard.kill_switch_active())
            .map(|(symbol, _)| *symbol)
            .collect();
        tripped.sort();
        tripped
    }

    /// Clears everything except the run status, which tracks the timer task
    pub fn reset(&mut self) {
        let status = self.status;
        let capacity = self.messages.capacity;
        *self = Self::new(capacity);
        self.status = status;
    }
}
