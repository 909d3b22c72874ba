//! Observability configuration parsing from environment variables.

use super::env::EnvReader;
use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    /// Seconds between `METRICS_JSON:` snapshots
    pub interval_seconds: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_reader(env: &EnvReader) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: env.flag("OBSERVABILITY_ENABLED", defaults.enabled)?,
            interval_seconds: env.parse("OBSERVABILITY_INTERVAL", defaults.interval_seconds)?,
        })
    }
}
