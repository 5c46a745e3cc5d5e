//! Time-aligned multi-instrument cursor.
//!
//! The cursor owns every loaded bar and replays them along one timeline: the
//! sorted union of all instruments' timestamps. For each timeline entry it
//! emits one Market event per instrument that actually has a bar there, in
//! configured symbol order. Instruments without a bar are skipped; nothing
//! is gap-filled.
//!
//! The "current view" of an instrument is the prefix of its series that has
//! already been emitted, so `latest`/`latest_n` cannot reach a future bar.

use super::source::{BarSource, DataError, DateRange};
use super::view::DataView;
use crate::domain::{Bar, BarError, MarketEvent};
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("no instruments configured")]
    EmptyUniverse,

    #[error("no bars fall inside {start}..={end} for any instrument")]
    EmptyTimeline {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("instrument {0} listed more than once")]
    DuplicateSymbol(String),

    #[error("{symbol}: bar {index} at {current} does not follow {previous}")]
    Unsorted {
        symbol: String,
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("series for {expected} contains a bar for {found} at index {index}")]
    SymbolMismatch {
        expected: String,
        found: String,
        index: usize,
    },

    #[error("invalid bar: {0}")]
    InvalidBar(#[from] BarError),

    #[error("data source: {0}")]
    Source(#[from] DataError),
}

/// Forward-only replay over a fixed set of instrument series.
#[derive(Debug, Clone)]
pub struct DataCursor {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
    series: Vec<Vec<Bar>>,
    /// Number of bars already emitted per series (parallel to `series`).
    visible: Vec<usize>,
    timeline: Vec<NaiveDateTime>,
    tick: usize,
    slot: usize,
    current_time: Option<NaiveDateTime>,
    emitted: usize,
}

impl DataCursor {
    /// Builds the cursor from per-instrument series, keeping bars in `range`.
    ///
    /// Series order fixes the emission order of instruments sharing a
    /// timestamp. Every series must be strictly ascending and consist of
    /// valid bars for its own symbol.
    pub fn new(input: Vec<(String, Vec<Bar>)>, range: DateRange) -> Result<Self, CursorError> {
        if input.is_empty() {
            return Err(CursorError::EmptyUniverse);
        }

        let mut symbols = Vec::with_capacity(input.len());
        let mut index = HashMap::with_capacity(input.len());
        let mut series = Vec::with_capacity(input.len());
        let mut stamps = BTreeSet::new();

        for (symbol, bars) in input {
            if index.contains_key(&symbol) {
                return Err(CursorError::DuplicateSymbol(symbol));
            }
            check_series(&symbol, &bars)?;

            let kept: Vec<Bar> = bars.into_iter().filter(|b| range.contains(b)).collect();
            if kept.is_empty() {
                warn!(symbol = %symbol, "no bars inside the requested range");
            }
            stamps.extend(kept.iter().map(|b| b.timestamp));

            index.insert(symbol.clone(), symbols.len());
            symbols.push(symbol);
            series.push(kept);
        }

        if stamps.is_empty() {
            return Err(CursorError::EmptyTimeline {
                start: range.start,
                end: range.end,
            });
        }

        let timeline: Vec<NaiveDateTime> = stamps.into_iter().collect();
        debug!(
            instruments = symbols.len(),
            ticks = timeline.len(),
            "timeline built"
        );

        Ok(Self {
            visible: vec![0; series.len()],
            symbols,
            index,
            series,
            timeline,
            tick: 0,
            slot: 0,
            current_time: None,
            emitted: 0,
        })
    }

    /// Loads each symbol from `source` and builds the cursor.
    pub fn from_source(
        source: &dyn BarSource,
        symbols: &[String],
        range: DateRange,
    ) -> Result<Self, CursorError> {
        let mut input = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let bars = source.load(symbol, &range)?;
            debug!(symbol = %symbol, bars = bars.len(), source = source.name(), "series loaded");
            input.push((symbol.clone(), bars));
        }
        Self::new(input, range)
    }

    /// Emits the next Market event, or `None` once the timeline is exhausted.
    pub fn advance(&mut self) -> Option<MarketEvent> {
        while self.tick < self.timeline.len() {
            let now = self.timeline[self.tick];
            while self.slot < self.series.len() {
                let i = self.slot;
                self.slot += 1;
                let Some(bar) = self.series[i].get(self.visible[i]) else {
                    continue;
                };
                if bar.timestamp == now {
                    let bar = bar.clone();
                    self.visible[i] += 1;
                    self.current_time = Some(now);
                    self.emitted += 1;
                    return Some(MarketEvent { bar });
                }
            }
            self.tick += 1;
            self.slot = 0;
        }
        None
    }

    pub fn is_exhausted(&self) -> bool {
        self.tick >= self.timeline.len()
    }

    /// The full replay timeline, ascending and de-duplicated.
    pub fn timeline(&self) -> &[NaiveDateTime] {
        &self.timeline
    }

    /// Index into `timeline()` of the tick currently being replayed.
    pub fn tick_index(&self) -> usize {
        self.tick
    }

    /// Market events emitted so far.
    pub fn events_emitted(&self) -> usize {
        self.emitted
    }

    /// Total Market events this cursor will emit.
    pub fn total_events(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }

    fn view_of(&self, symbol: &str) -> &[Bar] {
        match self.index.get(symbol) {
            Some(&i) => &self.series[i][..self.visible[i]],
            None => &[],
        }
    }
}

impl DataView for DataCursor {
    fn latest(&self, symbol: &str) -> Option<&Bar> {
        self.view_of(symbol).last()
    }

    fn latest_n(&self, symbol: &str, n: usize) -> &[Bar] {
        let view = self.view_of(symbol);
        &view[view.len().saturating_sub(n)..]
    }

    fn current_time(&self) -> Option<NaiveDateTime> {
        self.current_time
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn has_symbol(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }
}

impl Iterator for DataCursor {
    type Item = MarketEvent;

    fn next(&mut self) -> Option<MarketEvent> {
        self.advance()
    }
}

fn check_series(symbol: &str, bars: &[Bar]) -> Result<(), CursorError> {
    for (i, bar) in bars.iter().enumerate() {
        if bar.symbol != symbol {
            return Err(CursorError::SymbolMismatch {
                expected: symbol.to_string(),
                found: bar.symbol.clone(),
                index: i,
            });
        }
        bar.validate()?;
        if i > 0 && bars[i - 1].timestamp >= bar.timestamp {
            return Err(CursorError::Unsorted {
                symbol: symbol.to_string(),
                index: i,
                previous: bars[i - 1].timestamp,
                current: bar.timestamp,
            });
        }
    }
    Ok(())
}
