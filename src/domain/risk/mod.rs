// Risk management domain
pub mod risk_config;
pub mod risk_engine;
pub mod state;
pub mod volatility_guard;
