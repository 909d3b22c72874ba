// Risk metrics bookkeeping
pub mod risk_management;

// Regime strategies
pub mod strategies;

// Orchestrator
pub mod trading_loop;
