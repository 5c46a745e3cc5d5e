//! Content fingerprints: BLAKE3 over canonical JSON.
//!
//! - `dataset_hash`: identity of the loaded bars, independent of input order.
//! - `result_hash`: identity of a run's ledgers; equal inputs must give equal
//!   hashes, which is how determinism is checked.

use crate::domain::Bar;
use crate::engine::RunResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hex-encoded BLAKE3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for filenames and logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes the canonical JSON encoding of `value`.
///
/// Maps must be `BTreeMap` (not `HashMap`) for the encoding to be canonical.
pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, value)?;
    Ok(Fingerprint(hasher.finalize().to_hex().to_string()))
}

/// Hash of every bar, keyed by symbol so input order does not matter.
pub fn dataset_hash(series: &[(String, Vec<Bar>)]) -> Result<Fingerprint, serde_json::Error> {
    let canonical: BTreeMap<&str, &[Bar]> = series
        .iter()
        .map(|(symbol, bars)| (symbol.as_str(), bars.as_slice()))
        .collect();
    hash_json(&canonical)
}

/// Hash of the state trajectory and fills of a run.
pub fn result_hash(result: &RunResult) -> Result<Fingerprint, serde_json::Error> {
    hash_json(&(
        &result.snapshots,
        &result.fills,
        &result.rejections,
        &result.final_cash,
        &result.final_positions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bars(symbol: &str, close: rust_decimal::Decimal) -> Vec<Bar> {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        vec![Bar::new(symbol, ts, close, close, close, close, 100)]
    }

    #[test]
    fn hashing_is_deterministic() {
        let a = hash_json(&vec![1, 2, 3]).unwrap();
        let b = hash_json(&vec![1, 2, 3]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn dataset_hash_ignores_series_order() {
        let xy = vec![("X".to_string(), bars("X", dec!(1))), ("Y".to_string(), bars("Y", dec!(2)))];
        let yx = vec![("Y".to_string(), bars("Y", dec!(2))), ("X".to_string(), bars("X", dec!(1)))];
        assert_eq!(dataset_hash(&xy).unwrap(), dataset_hash(&yx).unwrap());
    }

    #[test]
    fn dataset_hash_sees_price_changes() {
        let a = vec![("X".to_string(), bars("X", dec!(1)))];
        let b = vec![("X".to_string(), bars("X", dec!(1.01)))];
        assert_ne!(dataset_hash(&a).unwrap(), dataset_hash(&b).unwrap());
    }
}
