//! Bar sources for the runner.
//!
//! - `CsvBarSource`: one `<SYMBOL>.csv` per instrument in a directory
//! - `SyntheticSource`: seeded random walk on weekdays
//!
//! Both return bars inside the requested range in file/generation order.
//! Nothing is sorted or repaired here; the cursor rejects bad series.

use crate::config::DataConfig;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use replaylab_core::data::{BarSource, DataError, DateRange};
use replaylab_core::domain::Bar;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Builds the source a config asks for.
pub fn build_source(config: &DataConfig) -> Box<dyn BarSource> {
    match config {
        DataConfig::Csv { dir } => Box::new(CsvBarSource::new(dir)),
        DataConfig::Synthetic { seed, start_price } => {
            Box::new(SyntheticSource::new(*seed, *start_price))
        }
    }
}

/// Loads every symbol in order. Fails on the first symbol that cannot be read.
pub fn load_series(
    source: &dyn BarSource,
    symbols: &[String],
    range: &DateRange,
) -> Result<Vec<(String, Vec<Bar>)>, DataError> {
    symbols
        .iter()
        .map(|symbol| {
            let bars = source.load(symbol, range)?;
            debug!(symbol = %symbol, bars = bars.len(), source = source.name(), "series loaded");
            Ok((symbol.clone(), bars))
        })
        .collect()
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Reads `<dir>/<SYMBOL>.csv`.
///
/// Required columns: `timestamp` (or `date`/`datetime`), `open`, `high`,
/// `low`, `close`, `volume`. Optional: `turnover`, `pre_close`, `limit_up`,
/// `limit_down`. Prices are parsed as exact decimals.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "datetime")]
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
    #[serde(default)]
    turnover: Option<String>,
    #[serde(default)]
    pre_close: Option<String>,
    #[serde(default)]
    limit_up: Option<String>,
    #[serde(default)]
    limit_down: Option<String>,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvBarSource {
    fn load(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::Io {
                symbol: symbol.to_string(),
                message: format!("{}: {e}", path.display()),
            })?;

        let mut bars = Vec::new();
        for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
            // Header is line 1; first data row is line 2.
            let row = i + 2;
            let record = record.map_err(|e| parse_error(symbol, row, e.to_string()))?;
            let bar = record
                .into_bar(symbol)
                .map_err(|message| parse_error(symbol, row, message))?;
            if range.contains(&bar) {
                bars.push(bar);
            }
        }
        if bars.is_empty() {
            warn!(symbol, path = %path.display(), "no rows inside the requested range");
        }
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

fn parse_error(symbol: &str, row: usize, message: String) -> DataError {
    DataError::Parse {
        symbol: symbol.to_string(),
        row,
        message,
    }
}

impl CsvRow {
    fn into_bar(self, symbol: &str) -> Result<Bar, String> {
        let volume = decimal("volume", &self.volume)?;
        if volume < Decimal::ZERO || !volume.fract().is_zero() {
            return Err(format!("volume must be a non-negative integer, got {volume}"));
        }
        let mut bar = Bar::new(
            symbol,
            parse_timestamp(&self.timestamp)?,
            decimal("open", &self.open)?,
            decimal("high", &self.high)?,
            decimal("low", &self.low)?,
            decimal("close", &self.close)?,
            volume
                .to_u64()
                .ok_or_else(|| format!("volume out of range: {volume}"))?,
        );
        bar.turnover = optional("turnover", self.turnover.as_deref())?.unwrap_or_default();
        bar.pre_close = optional("pre_close", self.pre_close.as_deref())?;
        bar.limit_up = optional("limit_up", self.limit_up.as_deref())?;
        bar.limit_down = optional("limit_down", self.limit_down.as_deref())?;
        Ok(bar)
    }
}

fn decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|e| format!("{field}: cannot parse '{raw}': {e}"))
}

fn optional(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, String> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => decimal(field, s).map(Some),
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Accepts date-times, or plain dates (taken at midnight).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(raw, fmt) {
            return day
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("invalid date '{raw}'"));
        }
    }
    Err(format!("unrecognised timestamp '{raw}'"))
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Longest range the synthetic walk will fill.
const MAX_SYNTHETIC_DAYS: i64 = 366 * 50;

/// Deterministic random walk: same seed and symbol give the same bars.
///
/// One bar per weekday at 15:00, daily move within ±3%, prices in cents.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    start_price: Decimal,
}

impl SyntheticSource {
    pub fn new(seed: u64, start_price: Decimal) -> Self {
        Self { seed, start_price }
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }
}

impl BarSource for SyntheticSource {
    fn load(&self, symbol: &str, range: &DateRange) -> Result<Vec<Bar>, DataError> {
        if (range.end - range.start).num_days() > MAX_SYNTHETIC_DAYS {
            return Err(DataError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        let mut rng = self.rng_for(symbol);
        let mut price = self.start_price.to_f64().unwrap_or(10.0);
        let mut bars = Vec::new();

        for day in range.start.iter_days().take_while(|d| *d <= range.end) {
            if matches!(day.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
                continue;
            }
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = cents(price);
            let close = cents(price * (1.0 + daily_return));
            let high = cents(price.max(price * (1.0 + daily_return)) * (1.0 + rng.gen_range(0.0..0.01)))
                .max(open.max(close));
            let low = cents(price.min(price * (1.0 + daily_return)) * (1.0 - rng.gen_range(0.0..0.01)))
                .min(open.min(close));
            let volume = rng.gen_range(100_000..5_000_000u64);

            let Some(timestamp) = day.and_hms_opt(15, 0, 0) else {
                continue;
            };
            let mut bar = Bar::new(symbol, timestamp, open, high, low, close, volume);
            bar.turnover = (close * Decimal::from(volume)).round_dp(2);
            bars.push(bar);

            price = close.to_f64().unwrap_or(price);
        }
        Ok(bars)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Rounds to cents with a one-cent floor.
fn cents(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ONE)
        .round_dp(2)
        .max(Decimal::new(1, 2))
}
