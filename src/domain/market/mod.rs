// Market analysis domain
pub mod indicators;
pub mod market_regime;
pub mod strategy_config;
