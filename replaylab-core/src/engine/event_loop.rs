//! The dispatcher: one FIFO queue, one thread, strict causal order.
//!
//! For each Market event pulled from the cursor the queue is drained
//! completely before the next one is pulled:
//!
//! - Market → portfolio marks to market, strategy emits signals
//! - Signal → portfolio gates and sizes an order
//! - Order  → execution fills or refuses it
//! - Fill   → portfolio reconciles cash and positions
//!
//! Collaborators never touch the queue; they hand events back by return
//! value and the engine appends them.

use super::error::EngineError;
use super::state::{EngineState, EngineStats, EngineStatus, EventRecord, RunResult};
use crate::data::{DataCursor, DataView};
use crate::domain::{Event, MarketEvent, SignalEvent};
use crate::execution::ExecutionSimulator;
use crate::portfolio::Portfolio;
use crate::strategy::Strategy;
use std::collections::VecDeque;
use tracing::{debug, error, info};

/// Dispatched events between progress log lines.
const PROGRESS_INTERVAL: u64 = 100;

pub struct Engine<S> {
    cursor: DataCursor,
    strategy: S,
    portfolio: Portfolio,
    execution: ExecutionSimulator,
    queue: VecDeque<Event>,
    state: EngineState,
    stats: EngineStats,
    trace_events: bool,
    trace: Vec<EventRecord>,
}

impl<S: Strategy> Engine<S> {
    pub fn new(
        cursor: DataCursor,
        strategy: S,
        mut portfolio: Portfolio,
        execution: ExecutionSimulator,
    ) -> Self {
        portfolio.set_trade_costs(execution.config().trade_costs());
        Self {
            cursor,
            strategy,
            portfolio,
            execution,
            queue: VecDeque::new(),
            state: EngineState::Idle,
            stats: EngineStats::default(),
            trace_events: false,
            trace: Vec::new(),
        }
    }

    /// Record every dispatched event in `RunResult::event_trace`.
    pub fn with_event_trace(mut self, enabled: bool) -> Self {
        self.trace_events = enabled;
        self
    }

    /// Replays the whole timeline. Callable once per engine.
    pub fn run(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Idle {
            return Err(EngineError::AlreadyStarted { state: self.state });
        }
        self.state = EngineState::Running;
        info!(
            strategy = self.strategy.name(),
            instruments = self.cursor.symbols().len(),
            ticks = self.cursor.timeline().len(),
            "backtest started"
        );

        while let Some(market) = self.cursor.advance() {
            self.queue.push_back(Event::Market(market));
            if let Err(err) = self.drain() {
                self.state = EngineState::Failed;
                self.queue.clear();
                error!(component = %err.component(), "backtest aborted: {err}");
                return Err(err);
            }
        }

        self.state = EngineState::Drained;
        info!(
            events = self.stats.total_events,
            fills = self.stats.fill_events,
            final_equity = %self.portfolio.total_equity(),
            "backtest finished"
        );
        Ok(())
    }

    fn drain(&mut self) -> Result<(), EngineError> {
        while let Some(event) = self.queue.pop_front() {
            self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), EngineError> {
        self.stats.record(event.kind());
        if self.trace_events {
            self.trace.push(EventRecord::from(&event));
        }
        if self.stats.total_events % PROGRESS_INTERVAL == 0 {
            debug!(
                events = self.stats.total_events,
                tick = self.cursor.tick_index(),
                ticks = self.cursor.timeline().len(),
                "progress"
            );
        }

        match event {
            Event::Market(market) => self.on_market(market),
            Event::Signal(signal) => {
                let window = self.portfolio.config().sizing.history_window();
                let history = self.cursor.latest_n(&signal.symbol, window);
                if let Some(order) = self.portfolio.process_signal(&signal, history) {
                    self.queue.push_back(Event::Order(order));
                }
                Ok(())
            }
            Event::Order(order) => {
                match self.execution.execute_order(&order, &self.cursor) {
                    Some(fill) => self.queue.push_back(Event::Fill(fill)),
                    None => self.portfolio.release_pending(&order),
                }
                Ok(())
            }
            Event::Fill(fill) => {
                self.portfolio
                    .update_on_fill(&fill)
                    .map_err(|source| EngineError::Accounting {
                        timestamp: fill.timestamp,
                        event: Box::new(Event::Fill(fill.clone())),
                        source,
                    })
            }
        }
    }

    fn on_market(&mut self, market: MarketEvent) -> Result<(), EngineError> {
        self.portfolio.update_on_market(&market.bar);

        let signals = self
            .strategy
            .on_market(&market, &self.cursor)
            .map_err(|source| EngineError::Strategy {
                strategy: self.strategy.name().to_string(),
                timestamp: market.timestamp(),
                event: Box::new(Event::Market(market.clone())),
                source,
            })?;

        for signal in signals {
            if let Some(reason) = self.contract_violation(&market, &signal) {
                return Err(EngineError::ContractViolation {
                    strategy: self.strategy.name().to_string(),
                    timestamp: market.timestamp(),
                    event: Box::new(Event::Signal(signal)),
                    reason,
                });
            }
            self.queue.push_back(Event::Signal(signal));
        }
        Ok(())
    }

    fn contract_violation(&self, market: &MarketEvent, signal: &SignalEvent) -> Option<String> {
        if !signal.has_valid_strength() {
            return Some(format!("strength {} outside [0, 1]", signal.strength));
        }
        if !self.cursor.has_symbol(&signal.symbol) {
            return Some(format!("unknown instrument {}", signal.symbol));
        }
        if signal.timestamp > market.timestamp() {
            return Some(format!(
                "signal dated {} is after the current event",
                signal.timestamp
            ));
        }
        None
    }

    // ── Accessors ──

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn execution(&self) -> &ExecutionSimulator {
        &self.execution
    }

    pub fn cursor(&self) -> &DataCursor {
        &self.cursor
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            current_time: self.cursor.current_time(),
            tick_index: self.cursor.tick_index(),
            timeline_len: self.cursor.timeline().len(),
            stats: self.stats,
            cash: self.portfolio.cash(),
            total_equity: self.portfolio.total_equity(),
            open_positions: self.portfolio.positions().len(),
        }
    }

    /// Consumes the engine and assembles the reporting record.
    pub fn finish(self) -> RunResult {
        let timeline = self.cursor.timeline();
        let start = timeline.first().copied();
        let end = timeline.last().copied();
        let timeline_len = timeline.len();
        let strategy = self.strategy.name().to_string();
        let initial_capital = self.portfolio.config().initial_capital;
        let final_cash = self.portfolio.cash();
        let final_equity = self.portfolio.total_equity();
        let final_positions = self
            .portfolio
            .positions()
            .iter()
            .map(|(symbol, pos)| (symbol.clone(), pos.volume))
            .collect();
        let portfolio_stats = self.portfolio.stats().clone();
        let execution_stats = self.execution.stats().clone();
        let (snapshots, fills, rejections) = self.portfolio.into_ledgers();

        RunResult {
            strategy,
            state: self.state,
            initial_capital,
            final_cash,
            final_equity,
            final_positions,
            timeline_len,
            start,
            end,
            engine_stats: self.stats,
            portfolio_stats,
            execution_stats,
            snapshots,
            fills,
            rejections,
            event_trace: self.trace,
        }
    }

    /// `run()` then `finish()`.
    pub fn run_to_completion(mut self) -> Result<RunResult, EngineError> {
        self.run()?;
        Ok(self.finish())
    }
}
