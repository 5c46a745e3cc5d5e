//! Serializable backtest configuration.
//!
//! A config file captures everything needed to reproduce a run:
//! - Universe and date range
//! - Where bars come from (CSV directory or seeded synthetic walk)
//! - Strategy and its parameters
//! - Portfolio risk settings and execution frictions
//!
//! ```toml
//! [backtest]
//! symbols = ["600000", "000001"]
//! start_date = "2024-01-02"
//! end_date = "2024-06-28"
//!
//! [data]
//! type = "CSV"
//! dir = "data"
//!
//! [strategy]
//! type = "MA_CROSSOVER"
//! fast = 5
//! slow = 20
//!
//! [portfolio]
//! initial_capital = 100000
//!
//! [execution]
//! commission_rate = 0.0003
//! ```

use chrono::NaiveDate;
use replaylab_core::data::DateRange;
use replaylab_core::execution::{ExecutionConfig, ExecutionError};
use replaylab_core::fingerprint::{hash_json, Fingerprint};
use replaylab_core::portfolio::{PortfolioConfig, PortfolioError};
use replaylab_core::strategy::{
    MomentumStrategy, MovingAverageCross, NullStrategy, Strategy, StrategyError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub data: DataConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// Instruments in replay order.
    pub symbols: Vec<String>,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    /// Record every dispatched event in the report.
    #[serde(default)]
    pub event_trace: bool,
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataConfig {
    /// One `<SYMBOL>.csv` per instrument under `dir`.
    Csv { dir: PathBuf },

    /// Seeded random walk on weekdays; for demos and tests only.
    Synthetic {
        #[serde(default)]
        seed: u64,
        #[serde(default = "default_start_price")]
        start_price: Decimal,
    },
}

fn default_start_price() -> Decimal {
    Decimal::from(10)
}

impl DataConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            DataConfig::Csv { .. } => "csv",
            DataConfig::Synthetic { .. } => "synthetic",
        }
    }
}

/// Strategy selection (serializable enum).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Never trades.
    #[default]
    Null,

    /// Intrabar move beyond `threshold_pct` percent.
    Momentum {
        #[serde(default = "default_momentum_threshold")]
        threshold_pct: Decimal,
        #[serde(default = "default_momentum_strength")]
        strength: f64,
    },

    /// Fast SMA crossing the slow SMA.
    MaCrossover { fast: usize, slow: usize },
}

fn default_momentum_threshold() -> Decimal {
    Decimal::new(3, 1)
}

fn default_momentum_strength() -> f64 {
    0.8
}

impl StrategyConfig {
    /// Instantiates the configured strategy, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match self {
            StrategyConfig::Null => Box::new(NullStrategy),
            StrategyConfig::Momentum {
                threshold_pct,
                strength,
            } => Box::new(MomentumStrategy::new(*threshold_pct, *strength)?),
            StrategyConfig::MaCrossover { fast, slow } => {
                Box::new(MovingAverageCross::new(*fast, *slow)?)
            }
        })
    }
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Checks every section, including strategy parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let symbols = &self.backtest.symbols;
        if symbols.is_empty() {
            return Err(ConfigError::Invalid("backtest.symbols is empty".into()));
        }
        let mut seen = HashSet::new();
        for symbol in symbols {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("blank symbol in backtest.symbols".into()));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate symbol {symbol}")));
            }
        }
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                self.backtest.start_date, self.backtest.end_date
            )));
        }

        self.portfolio.validate()?;
        self.execution.validate()?;
        if self.portfolio.lot_size % self.execution.lot_size != 0 {
            return Err(ConfigError::Invalid(format!(
                "portfolio lot_size {} is not a multiple of execution lot_size {}",
                self.portfolio.lot_size, self.execution.lot_size
            )));
        }
        if let DataConfig::Synthetic { start_price, .. } = &self.data {
            if *start_price <= Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "synthetic start_price must be positive, got {start_price}"
                )));
            }
        }
        self.strategy.build()?;
        Ok(())
    }

    pub fn date_range(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.backtest.start_date, self.backtest.end_date)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Content-addressed id: equal configs give equal ids.
    pub fn run_id(&self) -> Result<Fingerprint, ConfigError> {
        Ok(hash_json(self)?)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaylab_core::execution::SlippageConfig;
    use replaylab_core::portfolio::SizingPolicy;

    const FULL: &str = r#"
[backtest]
symbols = ["600000", "000001"]
start_date = "2024-01-02"
end_date = "2024-06-28"
event_trace = true

[data]
type = "SYNTHETIC"
seed = 42
start_price = 12.5

[strategy]
type = "MA_CROSSOVER"
fast = 5
slow = 20

[portfolio]
initial_capital = 50000
capital_fraction = 0.5
lot_size = 100

[portfolio.sizing]
type = "EQUAL_WEIGHT"
max_positions = 4

[execution]
commission_rate = 0.0005
min_commission = 1
lot_size = 100
enforce_price_limits = true

[execution.slippage]
type = "FIXED"
amount = 0.01
"#;

    const MINIMAL: &str = r#"
[backtest]
symbols = ["X"]
start_date = "2024-01-02"
end_date = "2024-01-31"

[data]
type = "CSV"
dir = "data"
"#;

    #[test]
    fn parses_full_config() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.backtest.symbols, vec!["600000", "000001"]);
        assert!(config.backtest.event_trace);
        assert_eq!(
            config.data,
            DataConfig::Synthetic {
                seed: 42,
                start_price: Decimal::new(125, 1)
            }
        );
        assert_eq!(config.strategy, StrategyConfig::MaCrossover { fast: 5, slow: 20 });
        assert_eq!(config.portfolio.initial_capital, Decimal::from(50_000));
        assert_eq!(config.portfolio.capital_fraction, Decimal::new(5, 1));
        assert_eq!(
            config.portfolio.sizing,
            SizingPolicy::EqualWeight { max_positions: 4 }
        );
        assert_eq!(config.execution.commission_rate, Decimal::new(5, 4));
        assert!(config.execution.enforce_price_limits);
        assert_eq!(
            config.execution.slippage,
            SlippageConfig::Fixed {
                amount: Decimal::new(1, 2)
            }
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BacktestConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.strategy, StrategyConfig::Null);
        assert_eq!(config.portfolio, PortfolioConfig::default());
        assert_eq!(config.execution, ExecutionConfig::default());
        assert!(!config.backtest.event_trace);
        assert_eq!(config.data.kind(), "csv");
    }

    #[test]
    fn momentum_defaults() {
        let toml_str = MINIMAL.to_string() + "\n[strategy]\ntype = \"MOMENTUM\"\n";
        let config = BacktestConfig::from_toml(&toml_str).unwrap();
        assert_eq!(
            config.strategy,
            StrategyConfig::Momentum {
                threshold_pct: Decimal::new(3, 1),
                strength: 0.8
            }
        );
    }

    #[test]
    fn rejects_reversed_dates() {
        let toml_str = MINIMAL.replace("2024-01-31", "2023-12-31");
        let err = BacktestConfig::from_toml(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let toml_str = MINIMAL.replace(r#"["X"]"#, r#"["X", "X"]"#);
        assert!(BacktestConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn rejects_bad_strategy_parameters() {
        let toml_str = MINIMAL.to_string() + "\n[strategy]\ntype = \"MA_CROSSOVER\"\nfast = 20\nslow = 5\n";
        let err = BacktestConfig::from_toml(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Strategy(_)));
    }

    #[test]
    fn rejects_out_of_range_capital_fraction() {
        let toml_str = MINIMAL.to_string() + "\n[portfolio]\ncapital_fraction = 1.5\n";
        let err = BacktestConfig::from_toml(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Portfolio(_)));
    }

    #[test]
    fn parses_atr_sizing_with_full_capital_fraction() {
        let toml_str = MINIMAL.to_string()
            + "\n[portfolio]\ncapital_fraction = 1\n\n[portfolio.sizing]\ntype = \"ATR\"\nperiod = 14\n";
        let config = BacktestConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config.portfolio.capital_fraction, Decimal::ONE);
        assert_eq!(
            config.portfolio.sizing,
            SizingPolicy::Atr {
                period: 14,
                base_risk_amount: Decimal::from(10_000),
                risk_per_unit: Decimal::new(1, 2),
            }
        );
    }

    #[test]
    fn rejects_atr_period_below_two() {
        let toml_str = MINIMAL.to_string() + "\n[portfolio.sizing]\ntype = \"ATR\"\nperiod = 1\n";
        let err = BacktestConfig::from_toml(&toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Portfolio(_)));
    }

    #[test]
    fn rejects_mismatched_lots() {
        let toml_str = MINIMAL.to_string()
            + "\n[portfolio]\nlot_size = 150\n\n[execution]\nlot_size = 100\n";
        assert!(BacktestConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn rejects_unknown_strategy_type() {
        let toml_str = MINIMAL.to_string() + "\n[strategy]\ntype = \"MAGIC\"\n";
        assert!(matches!(
            BacktestConfig::from_toml(&toml_str),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_is_deterministic_and_sensitive() {
        let a = BacktestConfig::from_toml(FULL).unwrap();
        let b = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());

        let mut c = a.clone();
        c.strategy = StrategyConfig::MaCrossover { fast: 10, slow: 20 };
        assert_ne!(a.run_id().unwrap(), c.run_id().unwrap());
    }

    #[test]
    fn toml_round_trip() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        let again = BacktestConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/replay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
