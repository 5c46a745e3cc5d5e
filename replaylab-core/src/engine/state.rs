//! Engine lifecycle, counters, and run result types.

use crate::domain::{Event, EventKind, FillEvent};
use crate::execution::ExecutionStats;
use crate::portfolio::{PortfolioSnapshot, PortfolioStats, RejectedSignal};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Idle → Running → Drained | Failed. Both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Running,
    Drained,
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Running => write!(f, "running"),
            EngineState::Drained => write!(f, "drained"),
            EngineState::Failed => write!(f, "failed"),
        }
    }
}

/// Dispatched event counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_events: u64,
    pub market_events: u64,
    pub signal_events: u64,
    pub order_events: u64,
    pub fill_events: u64,
}

impl EngineStats {
    pub(crate) fn record(&mut self, kind: EventKind) {
        self.total_events += 1;
        match kind {
            EventKind::Market => self.market_events += 1,
            EventKind::Signal => self.signal_events += 1,
            EventKind::Order => self.order_events += 1,
            EventKind::Fill => self.fill_events += 1,
        }
    }
}

/// One dispatched event, as recorded by the optional trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: EventKind,
    pub symbol: String,
    pub timestamp: NaiveDateTime,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            kind: event.kind(),
            symbol: event.symbol().to_string(),
            timestamp: event.timestamp(),
        }
    }
}

/// Point-in-time view of a running or finished engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub current_time: Option<NaiveDateTime>,
    pub tick_index: usize,
    pub timeline_len: usize,
    pub stats: EngineStats,
    pub cash: Decimal,
    pub total_equity: Decimal,
    pub open_positions: usize,
}

/// Everything a finished run hands to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub state: EngineState,
    pub initial_capital: Decimal,
    pub final_cash: Decimal,
    pub final_equity: Decimal,
    pub final_positions: BTreeMap<String, u64>,
    pub timeline_len: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub engine_stats: EngineStats,
    pub portfolio_stats: PortfolioStats,
    pub execution_stats: ExecutionStats,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub fills: Vec<FillEvent>,
    pub rejections: Vec<RejectedSignal>,
    pub event_trace: Vec<EventRecord>,
}

impl RunResult {
    /// `final_equity - initial_capital`.
    pub fn net_pnl(&self) -> Decimal {
        self.final_equity - self.initial_capital
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_by_kind() {
        let mut stats = EngineStats::default();
        stats.record(EventKind::Market);
        stats.record(EventKind::Market);
        stats.record(EventKind::Signal);
        stats.record(EventKind::Fill);
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.market_events, 2);
        assert_eq!(stats.signal_events, 1);
        assert_eq!(stats.order_events, 0);
        assert_eq!(stats.fill_events, 1);
    }

    #[test]
    fn state_display() {
        assert_eq!(EngineState::Drained.to_string(), "drained");
        assert_eq!(EngineState::Failed.to_string(), "failed");
    }
}
