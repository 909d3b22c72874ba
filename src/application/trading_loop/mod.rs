//! Trading loop orchestrator.
//!
//! One `TradingLoop` per process owns the loop configuration and state. A
//! timer task and manual `run_single_cycle` calls share the same pass
//! function, and a per-symbol in-flight guard keeps them from overlapping on
//! a symbol.

mod cycle;
pub mod config;
pub mod gate;
pub mod in_flight;
pub mod report;
pub mod state;

pub use config::{LoopConfig, LoopConfigUpdate};
pub use report::{CycleDecision, CycleOutcome, CyclePhase, CycleReport, PlannedOrder, SymbolError};
pub use state::{LoopState, LoopStatus, MessageLevel};

use crate::application::strategies::StrategyExecutor;
use crate::domain::errors::{ConfigError, LoopControlError};
use crate::domain::market::market_regime::{RegimeClassifier, RegimeConfig};
use crate::domain::market::strategy_config::StrategyConfig;
use crate::domain::ports::{AuditLogger, ExchangeClient};
use crate::domain::risk::risk_config::RiskConfig;
use crate::domain::risk::risk_engine::RiskEngine;
use crate::domain::risk::volatility_guard::{VolatilityGuard, VolatilityGuardConfig};
use crate::domain::trading::trading_pair::TradingPair;
use crate::infrastructure::observability::Metrics;
use in_flight::InFlightGuard;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Server clock drift above which a warning is logged on start
pub const MAX_CLOCK_SKEW_MS: i64 = 5_000;

/// Engine parameters fixed for the lifetime of the loop
#[derive(Debug, Clone)]
pub struct TradingLoopSettings {
    pub loop_config: LoopConfig,
    pub regime: RegimeConfig,
    pub volatility_guard: VolatilityGuardConfig,
    pub risk: RiskConfig,
    pub strategy: StrategyConfig,
    pub message_log_capacity: usize,
}

impl Default for TradingLoopSettings {
    fn default() -> Self {
        Self {
            loop_config: LoopConfig::default(),
            regime: RegimeConfig::default(),
            volatility_guard: VolatilityGuardConfig::default(),
            risk: RiskConfig::default(),
            strategy: StrategyConfig::default(),
            message_log_capacity: 200,
        }
    }
}

impl TradingLoopSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.regime.validate()?;
        self.volatility_guard.validate()?;
        self.risk.validate()?;
        self.strategy.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Timer,
    Manual,
}

impl Trigger {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
        }
    }
}

struct TimerTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct TradingLoop {
    config: RwLock<LoopConfig>,
    state: RwLock<LoopState>,
    in_flight: InFlightGuard,
    timer: Mutex<Option<TimerTask>>,
    exchange: Arc<dyn ExchangeClient>,
    audit: Arc<dyn AuditLogger>,
    metrics: Metrics,
    classifier: RegimeClassifier,
    guard: VolatilityGuard,
    risk_engine: RiskEngine,
    executor: StrategyExecutor,
}

impl TradingLoop {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        audit: Arc<dyn AuditLogger>,
        metrics: Metrics,
        settings: TradingLoopSettings,
    ) -> Result<Arc<Self>, ConfigError> {
        settings.validate()?;
        let loop_config = settings.loop_config.normalized()?;

        Ok(Arc::new(Self {
            config: RwLock::new(loop_config),
            state: RwLock::new(LoopState::new(settings.message_log_capacity)),
            in_flight: InFlightGuard::new(),
            timer: Mutex::new(None),
            exchange,
            audit,
            metrics,
            classifier: RegimeClassifier::new(settings.regime),
            guard: VolatilityGuard::new(settings.volatility_guard),
            risk_engine: RiskEngine::new(settings.risk),
            executor: StrategyExecutor::new(&settings.strategy),
        }))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// STOPPED -> RUNNING. Refused when already running or disabled.
    pub async fn start(self: &Arc<Self>) -> Result<(), LoopControlError> {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            warn!("TradingLoop: start refused, already running");
            return Err(LoopControlError::AlreadyRunning);
        }
        if !self.config.read().await.enabled {
            warn!("TradingLoop: start refused, trading is disabled");
            return Err(LoopControlError::Disabled);
        }

        self.check_clock().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_timer(stop_rx).await });
        *timer = Some(TimerTask { stop_tx, handle });

        self.state.write().await.status = LoopStatus::Running;
        self.record(MessageLevel::Info, "Trading loop started").await;
        Ok(())
    }

    /// RUNNING -> STOPPED. Waits for an in-flight pass to finish.
    /// Returns `false` if the loop was not running.
    pub async fn stop(&self) -> bool {
        let Some(task) = self.timer.lock().await.take() else {
            info!("TradingLoop: stop requested but loop was not running");
            return false;
        };

        let _ = task.stop_tx.send(true);
        if let Err(e) = task.handle.await {
            error!("TradingLoop: timer task ended abnormally: {}", e);
        }

        self.state.write().await.status = LoopStatus::Stopped;
        self.record(MessageLevel::Info, "Trading loop stopped").await;
        true
    }

    /// Applies a partial update atomically; on error nothing changes.
    pub async fn configure(&self, update: LoopConfigUpdate) -> Result<LoopConfig, ConfigError> {
        let mut config = self.config.write().await;
        match config.apply(update) {
            Ok(next) => {
                *config = next.clone();
                drop(config);
                self.record(
                    MessageLevel::Info,
                    format!(
                        "Configuration updated: symbols={:?} interval={}ms dry_run={} base_size={} max_concurrent={} enabled={}",
                        next.symbols.iter().map(TradingPair::as_str).collect::<Vec<_>>(),
                        next.interval_ms,
                        next.dry_run,
                        next.base_position_size,
                        next.max_concurrent_trades,
                        next.enabled
                    ),
                )
                .await;
                Ok(next)
            }
            Err(e) => {
                warn!("TradingLoop: configuration rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Clears rolling metrics, volatility history, messages and kill-switches.
    pub async fn reset_state(&self) {
        self.state.write().await.reset();
        for symbol in TradingPair::ALL {
            self.metrics.set_kill_switch(symbol.as_str(), false);
        }
        self.record(MessageLevel::Warn, "Loop state reset").await;
    }

    /// Re-arms one symbol's kill-switch. Returns whether it was tripped.
    pub async fn reset_kill_switch(&self, symbol: TradingPair) -> bool {
        let was_tripped = {
            let mut state = self.state.write().await;
            match state.volatility.get_mut(&symbol) {
                Some(guard) => {
                    let tripped = guard.kill_switch_active();
                    guard.reset_kill_switch();
                    tripped
                }
                None => false,
            }
        };
        self.metrics.set_kill_switch(symbol.as_str(), false);
        if was_tripped {
            self.record(
                MessageLevel::Warn,
                format!("Kill-switch manually reset for {}", symbol),
            )
            .await;
        }
        was_tripped
    }

    /// One FETCH..LOG pass over every configured symbol, independent of the timer.
    pub async fn run_single_cycle(&self) -> CycleReport {
        self.run_pass(Trigger::Manual).await
    }

    pub async fn get_config(&self) -> LoopConfig {
        self.config.read().await.clone()
    }

    pub async fn get_state(&self) -> LoopState {
        self.state.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.timer.lock().await.is_some()
    }

    async fn run_timer(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        info!("TradingLoop: timer task started");
        loop {
            if *stop_rx.borrow() {
                break;
            }

            let (enabled, interval_ms) = {
                let config = self.config.read().await;
                (config.enabled, config.interval_ms)
            };

            if enabled {
                self.run_pass(Trigger::Timer).await;
            } else {
                info!("TradingLoop: tick skipped, trading is disabled");
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                _ = stop_rx.changed() => break,
            }
        }
        info!("TradingLoop: timer task exited");
    }

    async fn check_clock(&self) {
        let timeout_ms = self.config.read().await.exchange_timeout_ms;
        match self
            .timed("get_server_time", timeout_ms, self.exchange.get_server_time())
            .await
        {
            Ok(server_time) => {
                let skew = (server_time - cycle::now_ms()).abs();
                if skew > MAX_CLOCK_SKEW_MS {
                    warn!(
                        "TradingLoop: local clock differs from exchange by {}ms",
                        skew
                    );
                }
            }
            Err(e) => warn!("TradingLoop: server time check failed: {}", e),
        }
    }

    /// Pushes to the bounded message log and mirrors it to tracing
    async fn record(&self, level: MessageLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            MessageLevel::Info => info!("TradingLoop: {}", message),
            MessageLevel::Warn => warn!("TradingLoop: {}", message),
            MessageLevel::Error => error!("TradingLoop: {}", message),
        }
        self.state
            .write()
            .await
            .messages
            .push(cycle::now_ms(), level, message);
    }
}
