//! Prometheus metrics definitions for the trading loop
//!
//! All metrics use the `regime_pilot_` prefix and are read-only.

use prometheus::{
    CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for the trading loop
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Per-symbol cycles by outcome (submitted, dry_run, no_op, error, skipped)
    pub cycles_total: CounterVec,
    /// Orders by side and status
    pub orders_total: CounterVec,
    /// Kill-switch state per symbol (0=armed, 1=tripped)
    pub kill_switch_active: GenericGaugeVec<AtomicF64>,
    /// Regime code per symbol (0=range-bound, 1=trending, 2=high volatility)
    pub regime: GenericGaugeVec<AtomicF64>,
    /// Risk engine size multiplier per symbol
    pub size_multiplier: GenericGaugeVec<AtomicF64>,
    /// Exchange call failures by operation and kind
    pub exchange_errors_total: CounterVec,
    /// Duration of one full pass over all symbols
    pub cycle_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = CounterVec::new(
            Opts::new("regime_pilot_cycles_total", "Symbol cycles by outcome"),
            &["symbol", "outcome"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;

        let orders_total = CounterVec::new(
            Opts::new("regime_pilot_orders_total", "Orders by side and status"),
            &["side", "status"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let kill_switch_active = GaugeVec::new(
            Opts::new(
                "regime_pilot_kill_switch_active",
                "Volatility kill-switch state (0=armed, 1=tripped)",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(kill_switch_active.clone()))?;

        let regime = GaugeVec::new(
            Opts::new(
                "regime_pilot_regime",
                "Classified regime (0=range-bound, 1=trending, 2=high volatility)",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(regime.clone()))?;

        let size_multiplier = GaugeVec::new(
            Opts::new(
                "regime_pilot_size_multiplier",
                "Risk engine position size multiplier",
            ),
            &["symbol"],
        )?;
        registry.register(Box::new(size_multiplier.clone()))?;

        let exchange_errors_total = CounterVec::new(
            Opts::new(
                "regime_pilot_exchange_errors_total",
                "Exchange call failures by operation and kind",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(exchange_errors_total.clone()))?;

        let cycle_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "regime_pilot_cycle_duration_seconds",
                "Duration of one pass over all configured symbols",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["trigger"],
        )?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            cycles_total,
            orders_total,
            kill_switch_active,
            regime,
            size_multiplier,
            exchange_errors_total,
            cycle_duration_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_cycle(&self, symbol: &str, outcome: &str) {
        self.cycles_total.with_label_values(&[symbol, outcome]).inc();
    }

    pub fn inc_orders(&self, side: &str, status: &str) {
        self.orders_total.with_label_values(&[side, status]).inc();
    }

    pub fn inc_exchange_error(&self, operation: &str, kind: &str) {
        self.exchange_errors_total
            .with_label_values(&[operation, kind])
            .inc();
    }

    pub fn set_kill_switch(&self, symbol: &str, active: bool) {
        self.kill_switch_active
            .with_label_values(&[symbol])
            .set(if active { 1.0 } else { 0.0 });
    }

    pub fn set_regime(&self, symbol: &str, code: f64) {
        self.regime.with_label_values(&[symbol]).set(code);
    }

    pub fn set_size_multiplier(&self, symbol: &str, multiplier: f64) {
        self.size_multiplier.with_label_values(&[symbol]).set(multiplier);
    }

    pub fn observe_cycle(&self, trigger: &str, seconds: f64) {
        self.cycle_duration_seconds
            .with_label_values(&[trigger])
            .observe(seconds);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}
