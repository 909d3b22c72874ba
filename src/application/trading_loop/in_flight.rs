use crate::domain::trading::trading_pair::TradingPair;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// At most one in-flight cycle per symbol, shared by timer and manual passes
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<TradingPair>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if a cycle for `symbol` is already running
    pub fn try_acquire(&self, symbol: TradingPair) -> Option<InFlightToken> {
        if !self.active.lock().insert(symbol) {
            return None;
        }
        Some(InFlightToken {
            active: Arc::clone(&self.active),
            symbol,
        })
    }

    pub fn is_active(&self, symbol: TradingPair) -> bool {
        self.active.lock().contains(&symbol)
    }
}

/// Released on drop
#[derive(Debug)]
pub struct InFlightToken {
    active: Arc<Mutex<HashSet<TradingPair>>>,
    symbol: TradingPair,
}

impl InFlightToken {
    pub fn symbol(&self) -> TradingPair {
        self.symbol
    }
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.active.lock().remove(&self.symbol);
    }
}
