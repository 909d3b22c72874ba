use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::{info, warn};

/// How a tripped kill-switch is cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillSwitchPolicy {
    /// Stays tripped until an explicit reset call
    ManualReset,
    /// Re-arms after this many consecutive cycles without a spike
    AutoReset { calm_cycles: usize },
}

/// Per-symbol kill-switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillSwitch {
    Armed,
    Tripped { since: i64, calm_cycles: usize },
}

impl KillSwitch {
    pub fn is_tripped(&self) -> bool {
        matches!(self, KillSwitch::Tripped { .. })
    }
}

/// Configuration for the Volatility Guard
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityGuardConfig {
    /// Number of past readings kept per symbol
    pub window_size: usize,
    /// Readings required before spikes can be detected
    pub min_samples: usize,
    /// Threshold = mean + k * stddev of the trailing window
    pub spike_k: f64,
    /// Threshold never sits below mean * this ratio
    pub min_spike_ratio: f64,
    /// Consecutive spikes that trip the kill-switch
    pub kill_switch_spikes: usize,
    /// Spikes within `anomaly_window` readings that count as an anomaly
    pub anomaly_spike_count: usize,
    pub anomaly_window: usize,
    /// A single reading above mean * this ratio is an anomaly on its own
    pub extreme_ratio: f64,
    pub policy: KillSwitchPolicy,
}

impl Default for VolatilityGuardConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            min_samples: 5,
            spike_k: 2.0,
            min_spike_ratio: 1.5,
            kill_switch_spikes: 3,
            anomaly_spike_count: 2,
            anomaly_window: 5,
            extreme_ratio: 4.0,
            policy: KillSwitchPolicy::ManualReset,
        }
    }
}

impl VolatilityGuardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, reason: String| ConfigError::InvalidParameter {
            name: name.to_string(),
            reason,
        };
        if self.window_size == 0 || self.min_samples == 0 || self.min_samples > self.window_size {
            return Err(invalid(
                "volatility window",
                format!(
                    "need 0 < min_samples ({}) <= window_size ({})",
                    self.min_samples, self.window_size
                ),
            ));
        }
        if self.kill_switch_spikes == 0 {
            return Err(invalid("kill_switch_spikes", "must be > 0".to_string()));
        }
        if self.anomaly_window == 0 || self.anomaly_spike_count == 0 {
            return Err(invalid("anomaly window", "must be > 0".to_string()));
        }
        if !(self.spike_k > 0.0) || !(self.min_spike_ratio >= 1.0) {
            return Err(invalid(
                "spike threshold",
                format!("k={} ratio={}", self.spike_k, self.min_spike_ratio),
            ));
        }
        if let KillSwitchPolicy::AutoReset { calm_cycles: 0 } = self.policy {
            return Err(invalid("kill switch policy", "calm_cycles must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Rolling per-symbol guard state. Owned by the trading loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityGuardState {
    history: VecDeque<f64>,
    recent_spikes: VecDeque<bool>,
    consecutive_spikes: usize,
    kill_switch: KillSwitch,
}

impl Default for VolatilityGuardState {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatilityGuardState {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
            recent_spikes: VecDeque::new(),
            consecutive_spikes: 0,
            kill_switch: KillSwitch::Armed,
        }
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.kill_switch
    }

    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch.is_tripped()
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    /// Clears the kill-switch, spike counters and baseline. Detection resumes
    /// once `min_samples` fresh readings have been collected.
    pub fn reset_kill_switch(&mut self) {
        self.kill_switch = KillSwitch::Armed;
        self.consecutive_spikes = 0;
        self.recent_spikes.clear();
        self.history.clear();
    }
}

/// Guard output for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityGuardStatus {
    pub spike_detected: bool,
    pub anomaly_detected: bool,
    pub kill_switch_active: bool,
    pub current_volatility: f64,
    /// `None` until the trailing window holds enough readings
    pub volatility_threshold: Option<f64>,
    pub consecutive_spikes: usize,
    pub timestamp: i64,
}

/// Detects volatility spikes against a per-symbol trailing window
#[derive(Debug, Clone)]
pub struct VolatilityGuard {
    config: VolatilityGuardConfig,
}

impl VolatilityGuard {
    pub fn new(config: VolatilityGuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VolatilityGuardConfig {
        &self.config
    }

    /// Trailing (mean, population stddev), if the window is usable
    fn baseline(&self, history: &VecDeque<f64>) -> Option<(f64, f64)> {
        if history.len() < self.config.min_samples {
            return None;
        }
        let mean = history.iter().mean();
        let std_dev = history.iter().population_std_dev();
        if !mean.is_finite() || mean <= 0.0 {
            return None;
        }
        Some((mean, if std_dev.is_finite() { std_dev } else { 0.0 }))
    }

    /// Evaluates the current reading against the trailing window, then rolls it in.
    pub fn evaluate(
        &self,
        symbol: &str,
        state: &mut VolatilityGuardState,
        current_volatility: f64,
        timestamp: i64,
    ) -> VolatilityGuardStatus {
        let baseline = self.baseline(&state.history);
        let threshold = baseline.map(|(mean, std_dev)| {
            (mean + self.config.spike_k * std_dev).max(mean * self.config.min_spike_ratio)
        });

        let spike_detected = threshold.is_some_and(|t| current_volatility > t);
        let extreme = baseline
            .is_some_and(|(mean, _)| current_volatility > mean * self.config.extreme_ratio);

        // Spikes stay out of the baseline so a sustained spike keeps registering.
        // Non-positive readings carry no information about it either.
        if !spike_detected && current_volatility.is_finite() && current_volatility > 0.0 {
            state.history.push_back(current_volatility);
            while state.history.len() > self.config.window_size {
                state.history.pop_front();
            }
        }

        state.recent_spikes.push_back(spike_detected);
        while state.recent_spikes.len() > self.config.anomaly_window {
            state.recent_spikes.pop_front();
        }
        let recent_spike_count = state.recent_spikes.iter().filter(|s| **s).count();

        state.consecutive_spikes = if spike_detected {
            state.consecutive_spikes + 1
        } else {
            0
        };

        let anomaly_detected = extreme || recent_spike_count >= self.config.anomaly_spike_count;

        state.kill_switch = match state.kill_switch {
            KillSwitch::Armed if state.consecutive_spikes >= self.config.kill_switch_spikes => {
                warn!(
                    "VolatilityGuard: Kill-switch TRIPPED for {} after {} consecutive spikes (vol={:.3}, threshold={:.3})",
                    symbol,
                    state.consecutive_spikes,
                    current_volatility,
                    threshold.unwrap_or_default()
                );
                KillSwitch::Tripped {
                    since: timestamp,
                    calm_cycles: 0,
                }
            }
            KillSwitch::Armed => KillSwitch::Armed,
            KillSwitch::Tripped { since, calm_cycles } => match self.config.policy {
                KillSwitchPolicy::ManualReset => KillSwitch::Tripped { since, calm_cycles },
                KillSwitchPolicy::AutoReset { calm_cycles: required } => {
                    let calm = if spike_detected { 0 } else { calm_cycles + 1 };
                    if calm >= required {
                        info!(
                            "VolatilityGuard: Kill-switch re-armed for {} after {} calm cycles",
                            symbol, calm
                        );
                        KillSwitch::Armed
                    } else {
                        KillSwitch::Tripped {
                            since,
                            calm_cycles: calm,
                        }
                    }
                }
            },
        };

        VolatilityGuardStatus {
            spike_detected,
            anomaly_detected,
            kill_switch_active: state.kill_switch.is_tripped(),
            current_volatility,
            volatility_threshold: threshold,
            consecutive_spikes: state.consecutive_spikes,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_state(guard: &VolatilityGuard, value: f64, n: usize) -> VolatilityGuardState {
        let mut state = VolatilityGuardState::new();
        for i in 0..n {
            guard.evaluate("TEST", &mut state, value, i as i64);
        }
        state
    }

    #[test]
    fn test_no_detection_without_baseline() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = VolatilityGuardState::new();
        let status = guard.evaluate("TEST", &mut state, 10.0, 0);
        assert!(!status.spike_detected);
        assert!(status.volatility_threshold.is_none());
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_window_is_bounded() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let state = warmed_state(&guard, 1.0, 50);
        assert_eq!(state.history().len(), 20);
    }

    #[test]
    fn test_five_x_spike_trips_on_third_cycle() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 1.0, 20);

        let first = guard.evaluate("TEST", &mut state, 5.0, 100);
        assert!(first.spike_detected);
        assert!(!first.kill_switch_active);

        let second = guard.evaluate("TEST", &mut state, 5.0, 101);
        assert!(second.spike_detected);
        assert!(second.anomaly_detected, "two spikes in a row are an anomaly");
        assert!(!second.kill_switch_active);

        let third = guard.evaluate("TEST", &mut state, 5.0, 102);
        assert!(third.spike_detected);
        assert!(third.kill_switch_active);
        assert_eq!(
            state.kill_switch(),
            KillSwitch::Tripped {
                since: 102,
                calm_cycles: 0
            }
        );
    }

    #[test]
    fn test_manual_policy_keeps_kill_switch_until_reset() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 1.0, 20);
        for t in 0..3 {
            guard.evaluate("TEST", &mut state, 5.0, t);
        }
        assert!(state.kill_switch_active());

        // Volatility subsides for many cycles
        for t in 3..30 {
            let status = guard.evaluate("TEST", &mut state, 1.0, t);
            assert!(status.kill_switch_active, "cycle {} cleared a manual kill-switch", t);
        }

        state.reset_kill_switch();
        let status = guard.evaluate("TEST", &mut state, 1.0, 31);
        assert!(!status.kill_switch_active);
    }

    #[test]
    fn test_auto_reset_policy_rearms_after_calm_cycles() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig {
            policy: KillSwitchPolicy::AutoReset { calm_cycles: 3 },
            ..Default::default()
        });
        let mut state = warmed_state(&guard, 1.0, 20);
        for t in 0..3 {
            guard.evaluate("TEST", &mut state, 5.0, t);
        }
        assert!(state.kill_switch_active());

        // One calm cycle is not enough
        assert!(guard.evaluate("TEST", &mut state, 1.0, 10).kill_switch_active);
        assert!(guard.evaluate("TEST", &mut state, 1.0, 11).kill_switch_active);
        assert!(!guard.evaluate("TEST", &mut state, 1.0, 12).kill_switch_active);
    }

    #[test]
    fn test_sustained_spike_trips_with_short_history() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 1.0, 5);
        for t in 0..3 {
            let status = guard.evaluate("TEST", &mut state, 5.0, t);
            assert!(status.spike_detected, "cycle {} not a spike", t);
            assert_eq!(status.volatility_threshold, Some(1.5));
        }
        assert!(state.kill_switch_active());
        assert_eq!(state.history().len(), 5);
    }

    #[test]
    fn test_reset_rebuilds_baseline() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 1.0, 10);
        for t in 0..3 {
            guard.evaluate("TEST", &mut state, 5.0, t);
        }
        state.reset_kill_switch();
        assert!(state.history().is_empty());

        // The elevated level becomes the new normal
        for t in 10..20 {
            let status = guard.evaluate("TEST", &mut state, 5.0, t);
            assert!(!status.spike_detected);
        }
        assert!(!state.kill_switch_active());
    }

    #[test]
    fn test_isolated_spike_does_not_trip() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 1.0, 20);
        assert!(guard.evaluate("TEST", &mut state, 5.0, 0).spike_detected);
        assert!(!guard.evaluate("TEST", &mut state, 1.0, 1).spike_detected);
        assert!(guard.evaluate("TEST", &mut state, 5.0, 2).spike_detected);
        assert!(!state.kill_switch_active());
    }

    #[test]
    fn test_threshold_floor_on_constant_history() {
        let guard = VolatilityGuard::new(VolatilityGuardConfig::default());
        let mut state = warmed_state(&guard, 2.0, 10);
        let status = guard.evaluate("TEST", &mut state, 2.5, 0);
        assert_eq!(status.volatility_threshold, Some(3.0));
        assert!(!status.spike_detected);
    }

    #[test]
    fn test_validate() {
        assert!(VolatilityGuardConfig::default().validate().is_ok());
        let bad = VolatilityGuardConfig {
            policy: KillSwitchPolicy::AutoReset { calm_cycles: 0 },
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = VolatilityGuardConfig {
            min_samples: 30,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
