//! PriceMatrix: the immutable (timestamp × asset) price table.
//!
//! Prices are stored column-major: one contiguous `Vec<f64>` per asset, so
//! per-leg valuation walks a single slice. A missing cell is `NaN`.

use super::Timestamp;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while constructing a [`PriceMatrix`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceMatrixError {
    #[error("price matrix has no timestamps")]
    NoTimestamps,

    #[error("price matrix has no assets")]
    NoAssets,

    #[error("duplicate asset '{0}'")]
    DuplicateAsset(String),

    #[error("timestamps must be strictly increasing: {previous} is followed by {next}")]
    NonIncreasingTimestamps { previous: Timestamp, next: Timestamp },

    #[error("column for '{asset}' has {actual} rows, expected {expected}")]
    ColumnLength {
        asset: String,
        expected: usize,
        actual: usize,
    },

    #[error("price for '{asset}' at {timestamp} is not finite ({value})")]
    NonFinitePrice {
        asset: String,
        timestamp: Timestamp,
        value: f64,
    },

    #[error("asset '{0}' has no available price at any timestamp")]
    AllMissing(String),
}

/// Immutable table of historical prices indexed by (timestamp, asset).
///
/// Built once from a data provider and shared read-only with the executor
/// and the engine. `NaN` marks a price that is not available.
#[derive(Debug, Clone)]
pub struct PriceMatrix {
    timestamps: Vec<Timestamp>,
    assets: Vec<String>,
    columns: Vec<Vec<f64>>,
    asset_lookup: HashMap<String, usize>,
}

impl PartialEq for PriceMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.timestamps == other.timestamps
            && self.assets == other.assets
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_cell(*x, *y)))
    }
}

fn same_cell(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

impl PriceMatrix {
    /// Build a matrix from a timestamp axis and one price column per asset.
    ///
    /// Columns are given in asset order and must have one entry per timestamp.
    pub fn new(
        timestamps: Vec<Timestamp>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, PriceMatrixError> {
        if timestamps.is_empty() {
            return Err(PriceMatrixError::NoTimestamps);
        }
        if columns.is_empty() {
            return Err(PriceMatrixError::NoAssets);
        }
        for pair in timestamps.windows(2) {
            if pair[1] <= pair[0] {
                return Err(PriceMatrixError::NonIncreasingTimestamps {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        let mut assets = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        let mut asset_lookup = HashMap::with_capacity(columns.len());

        for (asset, column) in columns {
            if asset_lookup.contains_key(&asset) {
                return Err(PriceMatrixError::DuplicateAsset(asset));
            }
            if column.len() != timestamps.len() {
                return Err(PriceMatrixError::ColumnLength {
                    asset,
                    expected: timestamps.len(),
                    actual: column.len(),
                });
            }
            if let Some(i) = column.iter().position(|p| p.is_infinite()) {
                return Err(PriceMatrixError::NonFinitePrice {
                    asset,
                    timestamp: timestamps[i],
                    value: column[i],
                });
            }
            if column.iter().all(|p| p.is_nan()) {
                return Err(PriceMatrixError::AllMissing(asset));
            }
            asset_lookup.insert(asset.clone(), assets.len());
            assets.push(asset);
            data.push(column);
        }

        Ok(Self {
            timestamps,
            assets,
            columns: data,
            asset_lookup,
        })
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of timestamps (rows).
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn first_timestamp(&self) -> Timestamp {
        self.timestamps[0]
    }

    pub fn last_timestamp(&self) -> Timestamp {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Column position of an asset.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.asset_lookup.get(asset).copied()
    }

    /// Row position of a timestamp (binary search over the sorted axis).
    pub fn timestamp_index(&self, timestamp: Timestamp) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    /// Contiguous price column for an asset.
    pub fn column(&self, asset: &str) -> Option<&[f64]> {
        self.asset_index(asset).map(|i| self.columns[i].as_slice())
    }

    /// Column by position. Panics if `asset_idx` is out of range.
    pub fn column_at(&self, asset_idx: usize) -> &[f64] {
        &self.columns[asset_idx]
    }

    /// Price of `asset` at row `row`, or `None` when not available.
    pub fn price(&self, asset: &str, row: usize) -> Option<f64> {
        let col = self.column(asset)?;
        col.get(row).copied().filter(|p| !p.is_nan())
    }

    /// Fraction of missing cells per asset.
    pub fn missing_rates(&self) -> Vec<(String, f64)> {
        self.assets
            .iter()
            .zip(&self.columns)
            .map(|(asset, col)| {
                let missing = col.iter().filter(|p| p.is_nan()).count();
                (asset.clone(), missing as f64 / col.len() as f64)
            })
            .collect()
    }

    /// Deterministic BLAKE3 hash of the table contents.
    ///
    /// Missing cells hash as a canonical NaN so two matrices with the same
    /// gaps produce the same digest.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for ts in &self.timestamps {
            hasher.update(&ts.to_le_bytes());
        }
        for (asset, col) in self.assets.iter().zip(&self.columns) {
            hasher.update(asset.as_bytes());
            hasher.update(&[0]);
            for p in col {
                let bits = if p.is_nan() { f64::NAN.to_bits() } else { p.to_bits() };
                hasher.update(&bits.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> PriceMatrix {
        PriceMatrix::new(
            vec![1, 2, 3],
            vec![
                ("A".into(), vec![10.0, 12.0, 9.0]),
                ("B".into(), vec![5.0, f64::NAN, 6.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookups() {
        let m = abc();
        assert_eq!(m.len(), 3);
        assert_eq!(m.n_assets(), 2);
        assert_eq!(m.asset_index("B"), Some(1));
        assert_eq!(m.asset_index("C"), None);
        assert_eq!(m.timestamp_index(2), Some(1));
        assert_eq!(m.timestamp_index(4), None);
        assert_eq!(m.price("A", 1), Some(12.0));
        assert_eq!(m.price("B", 1), None);
        assert_eq!(m.last_timestamp(), 3);
    }

    #[test]
    fn rejects_unsorted_axis() {
        let err = PriceMatrix::new(vec![1, 3, 3], vec![("A".into(), vec![1.0, 2.0, 3.0])])
            .unwrap_err();
        assert_eq!(
            err,
            PriceMatrixError::NonIncreasingTimestamps {
                previous: 3,
                next: 3
            }
        );
    }

    #[test]
    fn rejects_duplicate_assets() {
        let err = PriceMatrix::new(
            vec![1],
            vec![("A".into(), vec![1.0]), ("A".into(), vec![2.0])],
        )
        .unwrap_err();
        assert_eq!(err, PriceMatrixError::DuplicateAsset("A".into()));
    }

    #[test]
    fn rejects_infinite_and_all_missing() {
        let err = PriceMatrix::new(vec![1, 2], vec![("A".into(), vec![1.0, f64::INFINITY])])
            .unwrap_err();
        assert!(matches!(err, PriceMatrixError::NonFinitePrice { timestamp: 2, .. }));

        let err = PriceMatrix::new(vec![1, 2], vec![("A".into(), vec![f64::NAN, f64::NAN])])
            .unwrap_err();
        assert_eq!(err, PriceMatrixError::AllMissing("A".into()));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = PriceMatrix::new(vec![1, 2], vec![("A".into(), vec![1.0])]).unwrap_err();
        assert!(matches!(err, PriceMatrixError::ColumnLength { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn content_hash_is_stable_and_sensitive() {
        let m = abc();
        assert_eq!(m.content_hash(), abc().content_hash());

        let other = PriceMatrix::new(
            vec![1, 2, 3],
            vec![
                ("A".into(), vec![10.0, 12.0, 9.5]),
                ("B".into(), vec![5.0, f64::NAN, 6.0]),
            ],
        )
        .unwrap();
        assert_ne!(m.content_hash(), other.content_hash());
    }

    #[test]
    fn missing_rates_per_asset() {
        let rates = abc().missing_rates();
        assert_eq!(rates[0], ("A".to_string(), 0.0));
        assert!((rates[1].1 - 1.0 / 3.0).abs() < 1e-12);
    }
}
