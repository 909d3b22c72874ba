//! Configuration loaded from environment variables, organized by concern:
//! Loop, Risk, Strategy, Simulation and Observability.

mod env;
mod loop_env_config;
mod observability_config;
mod risk_env_config;
mod simulation_config;
mod strategy_config;

pub use env::EnvReader;
pub use loop_env_config::LoopEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use risk_env_config::RiskEnvConfig;
pub use simulation_config::SimulationEnvConfig;
pub use strategy_config::{StrategyEnvConfig, parse_kill_switch_policy};

use crate::application::trading_loop::TradingLoopSettings;
use anyhow::{Context, Result};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub trading_loop: LoopEnvConfig,
    pub risk: RiskEnvConfig,
    pub strategy: StrategyEnvConfig,
    pub simulation: SimulationEnvConfig,
    pub observability: ObservabilityEnvConfig,
    /// SQLite URL for persisted audit records; in-memory when unset
    pub audit_database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_reader(&EnvReader::from_process())
    }

    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        Ok(Self {
            trading_loop: LoopEnvConfig::from_reader(env)?,
            risk: RiskEnvConfig::from_reader(env)?,
            strategy: StrategyEnvConfig::from_reader(env)?,
            simulation: SimulationEnvConfig::from_reader(env)?,
            observability: ObservabilityEnvConfig::from_reader(env)?,
            audit_database_url: env.string("AUDIT_DATABASE_URL"),
        })
    }

    /// Validated engine settings; invalid values fail startup
    pub fn to_settings(&self) -> Result<TradingLoopSettings> {
        let settings = TradingLoopSettings {
            loop_config: self.trading_loop.to_loop_config(),
            regime: self.strategy.regime.clone(),
            volatility_guard: self.strategy.volatility_guard.clone(),
            risk: self.risk.risk.clone(),
            strategy: self.strategy.strategy.clone(),
            message_log_capacity: self.trading_loop.message_log_capacity,
        };
        settings.validate().context("Invalid engine configuration")?;
        settings
            .loop_config
            .clone()
            .normalized()
            .context("Invalid loop configuration")?;
        Ok(settings)
    }
}
