use super::config::LoopConfig;
use super::gate::{GateInput, apply_gate};
use super::report::{CycleDecision, CycleOutcome, CyclePhase, CycleReport, PlannedOrder, SymbolError};
use super::state::MessageLevel;
use super::{TradingLoop, Trigger};
use crate::domain::audit::{
    RegimeAuditRecord, RiskAuditRecord, TradeAction, TradeAuditRecord, VolatilityAuditRecord,
    truncate_explanation,
};
use crate::domain::errors::{CycleError, ExchangeError};
use crate::domain::market::indicators::{TechnicalIndicators, compute_indicators};
use crate::domain::market::market_regime::RegimeClassification;
use crate::domain::risk::risk_engine::{RiskDecision, RiskInput};
use crate::domain::risk::state::RiskMetrics;
use crate::domain::risk::volatility_guard::VolatilityGuardStatus;
use crate::domain::trading::signal::TradeSignal;
use crate::domain::trading::trading_pair::TradingPair;
use crate::domain::trading::types::{
    AccountBalance, Candle, OrderAck, OrderBookDepth, OrderOptions, OrderSide, Position, Ticker,
};
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Everything FETCH pulls from the exchange for one symbol
struct MarketSnapshot {
    candles: Vec<Candle>,
    ticker: Ticker,
    depth: OrderBookDepth,
    positions: Vec<Position>,
    balance: AccountBalance,
}

fn error_kind(error: &ExchangeError) -> &'static str {
    match error {
        ExchangeError::Transport { .. } => "transport",
        ExchangeError::Rejected { .. } => "rejected",
        ExchangeError::Timeout { .. } => "timeout",
    }
}

impl TradingLoop {
    /// Shared by the timer task and `run_single_cycle`.
    pub(crate) async fn run_pass(&self, trigger: Trigger) -> CycleReport {
        let started = Instant::now();
        let started_at = now_ms();
        let config = self.config.read().await.clone();

        let mut tokens = Vec::with_capacity(config.symbols.len());
        let mut skipped = Vec::new();
        for symbol in &config.symbols {
            match self.in_flight.try_acquire(*symbol) {
                Some(token) => tokens.push(token),
                None => {
                    self.metrics.inc_cycle(symbol.as_str(), "skipped");
                    skipped.push(*symbol);
                }
            }
        }
        if !skipped.is_empty() {
            warn!(
                "TradingLoop: {} pass skipped {:?}, previous cycle still in flight",
                trigger.as_str(),
                skipped
            );
        }

        let config_ref = &config;
        let results: Vec<Result<CycleDecision, SymbolError>> = stream::iter(tokens)
            .map(|token| async move {
                let result = self.run_symbol(token.symbol(), config_ref).await;
                drop(token);
                result
            })
            .buffer_unordered(config.max_concurrent_trades)
            .collect()
            .await;

        let mut decisions = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(decision) => decisions.push(decision),
                Err(e) => {
                    self.metrics.inc_cycle(e.symbol.as_str(), "error");
                    self.record(
                        MessageLevel::Error,
                        format!("{} failed in {}: {}", e.symbol, e.phase, e.message),
                    )
                    .await;
                    errors.push(e);
                }
            }
        }

        // Report order follows configuration order
        let position_of = |symbol: TradingPair| {
            config
                .symbols
                .iter()
                .position(|s| *s == symbol)
                .unwrap_or(usize::MAX)
        };
        decisions.sort_by_key(|d| position_of(d.symbol));
        errors.sort_by_key(|e| position_of(e.symbol));

        let finished_at = now_ms();
        {
            let mut state = self.state.write().await;
            state.cycles_completed += 1;
            state.last_cycle_at = Some(finished_at);
        }
        self.metrics
            .observe_cycle(trigger.as_str(), started.elapsed().as_secs_f64());

        info!(
            "TradingLoop: {} pass complete in {}ms ({} decisions, {} errors, {} skipped)",
            trigger.as_str(),
            finished_at - started_at,
            decisions.len(),
            errors.len(),
            skipped.len()
        );

        CycleReport {
            started_at,
            finished_at,
            decisions,
            errors,
            skipped,
        }
    }

    /// FETCH -> CLASSIFY -> RISK_CHECK -> SIGNAL -> GATE -> EXECUTE -> LOG for one symbol
    async fn run_symbol(
        &self,
        symbol: TradingPair,
        config: &LoopConfig,
    ) -> Result<CycleDecision, SymbolError> {
        let fail = move |phase: CyclePhase| move |e: CycleError| SymbolError::new(symbol, phase, e);

        // FETCH
        let market = self
            .fetch(symbol, config)
            .await
            .map_err(fail(CyclePhase::Fetch))?;
        let last_price = market.ticker.last_price;
        if last_price <= Decimal::ZERO {
            return Err(fail(CyclePhase::Fetch)(CycleError::InvalidMarketData {
                reason: format!("non-positive last price {}", last_price),
            }));
        }
        let now = now_ms();

        // CLASSIFY
        let indicators = compute_indicators(&market.candles)
            .map_err(|e| fail(CyclePhase::Classify)(e.into()))?;
        let regime = self.classifier.classify(&indicators, now);
        let volatility = {
            let mut state = self.state.write().await;
            let guard_state = state.volatility.entry(symbol).or_default();
            self.guard
                .evaluate(symbol.as_str(), guard_state, indicators.volatility, now)
        };

        // RISK_CHECK
        let metrics = self.state.write().await.risk_metrics.observe(
            symbol,
            &market.positions,
            market.balance.equity,
            now,
        );
        let risk = self.risk_engine.assess(&RiskInput {
            regime: &regime,
            current_volatility: indicators.volatility,
            positions: &market.positions,
            balance: &market.balance,
            metrics: &metrics,
            now,
        });

        // SIGNAL
        let signal = self
            .executor
            .generate(symbol, &regime, &indicators, last_price, now);

        // GATE
        let gate = apply_gate(&GateInput {
            signal: &signal,
            risk: &risk,
            kill_switch_active: volatility.kill_switch_active,
            base_position_size: config.base_position_size,
            size_precision: symbol.size_precision(),
            spread_bps: market.depth.spread_bps(),
            max_spread_bps: self.risk_engine.config().max_spread_bps,
            open_position: market.positions.iter().find(|p| p.symbol == symbol),
        });

        // EXECUTE
        let execution = match gate.order {
            Err(reason) => Ok(CycleOutcome::NoOp { reason }),
            Ok(order) if config.dry_run => Ok(CycleOutcome::DryRun { order }),
            Ok(order) => match self.execute(symbol, &order, config).await {
                Ok(ack) => Ok(CycleOutcome::Submitted {
                    order_id: ack.order_id,
                    order,
                }),
                Err(e) => {
                    self.metrics.inc_orders(&order.side.to_string(), "rejected");
                    Err(match e {
                        ExchangeError::Rejected { code, reason } => CycleError::OrderRejected {
                            reason: format!("{} (code {})", reason, code),
                        },
                        other => CycleError::Exchange(other),
                    })
                }
            },
        };

        // LOG
        self.audit_cycle(symbol, &regime, &indicators, &metrics, &risk, &volatility, &signal, &execution, now)
            .await;

        self.metrics.set_regime(symbol.as_str(), regime.regime.code());
        self.metrics
            .set_kill_switch(symbol.as_str(), volatility.kill_switch_active);
        self.metrics
            .set_size_multiplier(symbol.as_str(), gate.effective_multiplier);

        let outcome = execution.map_err(fail(CyclePhase::Execute))?;

        let decision = CycleDecision {
            symbol,
            timestamp: now,
            last_price,
            indicators,
            regime,
            volatility,
            risk,
            signal,
            effective_multiplier: gate.effective_multiplier,
            final_size: gate.final_size,
            order_size: gate.order_size,
            outcome,
        };

        self.metrics.inc_cycle(symbol.as_str(), decision.outcome.label());
        let summary = match &decision.outcome {
            CycleOutcome::NoOp { reason } => format!("{} no-op: {}", symbol, reason),
            CycleOutcome::DryRun { order } => format!(
                "{} dry run: would {:?} {} {} (regime {}, risk {})",
                symbol, order.action, order.side, order.size, decision.regime.regime, decision.risk.risk_level
            ),
            CycleOutcome::Submitted { order_id, order } => {
                self.metrics.inc_orders(&order.side.to_string(), "submitted");
                format!(
                    "{} submitted {:?} {} {} as order {}",
                    symbol, order.action, order.side, order.size, order_id
                )
            }
        };
        debug!("TradingLoop: {}", summary);

        {
            let mut state = self.state.write().await;
            if matches!(decision.outcome, CycleOutcome::Submitted { .. }) {
                state.risk_metrics.record_trade(symbol, now);
            }
            state.last_decisions.insert(symbol, decision.clone());
            state.messages.push(now, MessageLevel::Info, summary);
        }

        Ok(decision)
    }

    async fn fetch(&self, symbol: TradingPair, config: &LoopConfig) -> Result<MarketSnapshot, CycleError> {
        let timeout_ms = config.exchange_timeout_ms;
        let (candles, ticker, depth, positions, balance) = tokio::try_join!(
            self.timed(
                "get_candles",
                timeout_ms,
                self.exchange
                    .get_candles(symbol, config.candle_granularity, config.candle_limit),
            ),
            self.timed("get_ticker", timeout_ms, self.exchange.get_ticker(symbol)),
            self.timed(
                "get_order_book_depth",
                timeout_ms,
                self.exchange.get_order_book_depth(symbol, config.depth_limit),
            ),
            self.timed("get_positions", timeout_ms, self.exchange.get_positions()),
            self.timed("get_account_balance", timeout_ms, self.exchange.get_account_balance()),
        )?;

        Ok(MarketSnapshot {
            candles,
            ticker,
            depth,
            positions,
            balance,
        })
    }

    async fn execute(
        &self,
        symbol: TradingPair,
        order: &PlannedOrder,
        config: &LoopConfig,
    ) -> Result<OrderAck, ExchangeError> {
        let options = OrderOptions {
            is_market: true,
            stop_loss_price: order.stop_loss,
            take_profit_price: order.take_profit,
        };
        let timeout_ms = config.exchange_timeout_ms;
        let size = order.size;

        match (order.action, order.side) {
            (TradeAction::Open, OrderSide::Buy) => {
                self.timed("open_long", timeout_ms, self.exchange.open_long(symbol, size, options))
                    .await
            }
            (TradeAction::Open, OrderSide::Sell) => {
                self.timed("open_short", timeout_ms, self.exchange.open_short(symbol, size, options))
                    .await
            }
            (TradeAction::Close, OrderSide::Sell) => {
                self.timed("close_long", timeout_ms, self.exchange.close_long(symbol, size, options))
                    .await
            }
            (TradeAction::Close, OrderSide::Buy) => {
                self.timed("close_short", timeout_ms, self.exchange.close_short(symbol, size, options))
                    .await
            }
        }
    }

    /// Bounds an exchange call; a timeout becomes `ExchangeError::Timeout`.
    pub(crate) async fn timed<T, F>(
        &self,
        operation: &'static str,
        timeout_ms: u64,
        call: F,
    ) -> Result<T, ExchangeError>
    where
        F: Future<Output = Result<T, ExchangeError>>,
    {
        let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            }),
        };
        if let Err(e) = &result {
            self.metrics.inc_exchange_error(operation, error_kind(e));
        }
        result
    }

    /// Audit sink failures are logged and never fail the cycle.
    #[allow(clippy::too_many_arguments)]
    async fn audit_cycle(
        &self,
        symbol: TradingPair,
        regime: &RegimeClassification,
        indicators: &TechnicalIndicators,
        metrics: &RiskMetrics,
        risk: &RiskDecision,
        volatility: &VolatilityGuardStatus,
        signal: &TradeSignal,
        execution: &Result<CycleOutcome, CycleError>,
        now: i64,
    ) {
        let regime_explanation = format!(
            "{} with confidence {:.2}: trend strength {:.3}%, volatility {:.3}%, momentum {:.2}%",
            regime.regime,
            regime.confidence,
            regime.features.trend_strength,
            regime.features.volatility,
            regime.features.momentum
        );
        if let Err(e) = self
            .audit
            .log_regime(RegimeAuditRecord::new(symbol, regime.clone(), *indicators, &regime_explanation))
            .await
        {
            warn!("TradingLoop: regime audit failed for {}: {}", symbol, e);
        }

        if let Err(e) = self
            .audit
            .log_risk(RiskAuditRecord::new(symbol, regime.regime, metrics.clone(), risk.clone()))
            .await
        {
            warn!("TradingLoop: risk audit failed for {}: {}", symbol, e);
        }

        if let Err(e) = self
            .audit
            .log_volatility(VolatilityAuditRecord::new(symbol, volatility.clone()))
            .await
        {
            warn!("TradingLoop: volatility audit failed for {}: {}", symbol, e);
        }

        if let Ok(CycleOutcome::Submitted { order_id, order }) = execution {
            let explanation = format!("{} | {}", signal.reason, risk.explanation);
            let record = TradeAuditRecord {
                symbol,
                order_id: order_id.clone(),
                action: order.action,
                side: order.side,
                strategy: signal.strategy,
                size: order.size,
                entry_price: signal.entry_price,
                stop_loss: order.stop_loss,
                take_profit: order.take_profit,
                explanation: truncate_explanation(&explanation),
                timestamp: now,
            };
            if let Err(e) = self.audit.log_trade(record).await {
                warn!("TradingLoop: trade audit failed for {} order {}: {}", symbol, order_id, e);
            }
        }
    }
}
