use super::env::EnvReader;
use crate::infrastructure::simulation::{FillModel, SimulationConfig};
use anyhow::Result;
use rust_decimal::Decimal;

/// Paper exchange parameters used by the binary
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEnvConfig {
    pub seed: Option<u64>,
    pub starting_equity: Decimal,
    pub volatility_bps: f64,
    pub latency_base_ms: u64,
    pub latency_jitter_ms: u64,
    pub slippage_bps: f64,
}

impl SimulationEnvConfig {
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let sim = SimulationConfig::default();
        let seed = match env.string("SIMULATION_SEED") {
            Some(_) => Some(env.parse("SIMULATION_SEED", 0u64)?),
            None => None,
        };
        Ok(Self {
            seed,
            starting_equity: env.parse("SIMULATION_STARTING_EQUITY", sim.starting_equity)?,
            volatility_bps: env.parse("SIMULATION_VOLATILITY_BPS", sim.volatility_bps)?,
            latency_base_ms: env.parse("SIMULATION_LATENCY_BASE_MS", sim.fill.latency_base_ms)?,
            latency_jitter_ms: env
                .parse("SIMULATION_LATENCY_JITTER_MS", sim.fill.latency_jitter_ms)?,
            slippage_bps: env.parse("SIMULATION_SLIPPAGE_BPS", sim.fill.slippage_bps)?,
        })
    }

    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            seed: self.seed,
            starting_equity: self.starting_equity,
            volatility_bps: self.volatility_bps,
            fill: FillModel {
                slippage_bps: self.slippage_bps,
                latency_base_ms: self.latency_base_ms,
                latency_jitter_ms: self.latency_jitter_ms,
            },
            ..SimulationConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_optional() {
        let unseeded =
            SimulationEnvConfig::from_reader(&EnvReader::from_map::<&str, &str>([])).unwrap();
        assert_eq!(unseeded.seed, None);

        let seeded = SimulationEnvConfig::from_reader(&EnvReader::from_map([(
            "SIMULATION_SEED",
            "42",
        )]))
        .unwrap();
        assert_eq!(seeded.to_simulation_config().seed, Some(42));
    }
}
