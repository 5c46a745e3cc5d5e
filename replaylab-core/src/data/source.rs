//! Bar source trait and structured error types.
//!
//! The BarSource trait abstracts over where bars come from (CSV files,
//! synthetic generators, in-memory fixtures) so the cursor never touches
//! I/O directly and tests can hand it prepared series.

use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Inclusive calendar range `[start, end]` used to select bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if start > end {
            return Err(DataError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range that admits every bar.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, bar: &Bar) -> bool {
        let day = bar.timestamp.date();
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("I/O error reading {symbol}: {message}")]
    Io { symbol: String, message: String },

    #[error("parse error in {symbol} at row {row}: {message}")]
    Parse {
        symbol: String,
        row: usize,
        message: String,
    },
}

/// Supplies one instrument's bars for a date range, ascending by timestamp.
///
/// Implementations must not re-sort or repair data: the cursor treats an
/// out-of-order series as a contract violation.
pub trait BarSource: Send + Sync {
    fn load(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, DataError>;

    /// Name of this source, for logs.
    fn name(&self) -> &str;
}

/// Bars held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    series: HashMap<String, Vec<Bar>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.series.insert(symbol.into(), bars);
    }

    pub fn with_series(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }
}

impl BarSource for InMemorySource {
    fn load(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        Ok(bars.iter().filter(|b| range.contains(b)).cloned().collect())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
