//! Price loading for the runner.
//!
//! Resolves a [`DataConfig`] into a [`PriceMatrix`]:
//! 1. `csv` → read the wide CSV file
//! 2. `csv` unreadable and `synthetic_fallback` → generate a random-walk
//!    universe (tagged as synthetic)
//! 3. `random_walk` → generate the configured universe
//!
//! CSV layout: a `timestamp` (or `date`) column followed by one column per
//! asset. Timestamps are integers, or `YYYY-MM-DD` dates stored as UNIX
//! seconds at UTC midnight. Empty, `NaN`, `NA` and `N/A` cells are missing
//! prices.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use tradelab_core::data::{align_series, make_randomwalk, RandomWalkParams};
use tradelab_core::domain::{PriceMatrix, PriceMatrixError, Timestamp};

use crate::config::DataConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("first CSV column must be 'timestamp' or 'date', found '{0}'")]
    MissingTimestampColumn(String),

    #[error("CSV has no asset columns")]
    NoAssetColumns,

    #[error("row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse price '{value}' for '{asset}'")]
    BadPrice {
        row: usize,
        asset: String,
        value: String,
    },

    #[error("price matrix error: {0}")]
    Matrix(#[from] PriceMatrixError),
}

/// Where the loaded prices came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    RandomWalk { seed: u64 },
}

/// Loaded prices plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub matrix: PriceMatrix,
    pub source: DataSource,
    /// BLAKE3 hash over the matrix contents.
    pub dataset_hash: String,
    /// Whether the prices were generated rather than read.
    pub has_synthetic: bool,
}

impl LoadedData {
    fn new(matrix: PriceMatrix, source: DataSource) -> Self {
        let has_synthetic = matches!(source, DataSource::RandomWalk { .. });
        Self {
            dataset_hash: matrix.content_hash(),
            matrix,
            source,
            has_synthetic,
        }
    }
}

/// Resolve a data config into a price matrix.
pub fn load_prices(config: &DataConfig) -> Result<LoadedData, LoadError> {
    let loaded = match config {
        DataConfig::Csv {
            path,
            synthetic_fallback,
        } => match read_price_file(path) {
            Ok(matrix) => LoadedData::new(matrix, DataSource::Csv { path: path.clone() }),
            Err(LoadError::Io { path, source }) if *synthetic_fallback => {
                warn!(
                    path = %path.display(),
                    error = %source,
                    "price file unavailable, generating synthetic data; results will be tagged as synthetic"
                );
                synthetic(&RandomWalkParams::default())?
            }
            Err(e) => return Err(e),
        },
        DataConfig::RandomWalk(params) => synthetic(params)?,
    };

    let missing: f64 = loaded.matrix.missing_rates().iter().map(|(_, r)| r).sum::<f64>()
        / loaded.matrix.n_assets() as f64;
    info!(
        timestamps = loaded.matrix.len(),
        assets = loaded.matrix.n_assets(),
        missing_rate = missing,
        synthetic = loaded.has_synthetic,
        "loaded prices"
    );
    Ok(loaded)
}

fn synthetic(params: &RandomWalkParams) -> Result<LoadedData, LoadError> {
    let matrix = make_randomwalk(params)?;
    Ok(LoadedData::new(
        matrix,
        DataSource::RandomWalk { seed: params.seed },
    ))
}

/// Read a wide price CSV from disk.
pub fn read_price_file(path: &Path) -> Result<PriceMatrix, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_price_csv(file)
}

/// Read a wide price CSV. Rows need not be sorted; a repeated timestamp
/// keeps its last row.
pub fn read_price_csv<R: Read>(reader: R) -> Result<PriceMatrix, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let first = headers.get(0).unwrap_or_default();
    if !matches!(first.to_ascii_lowercase().as_str(), "timestamp" | "date") {
        return Err(LoadError::MissingTimestampColumn(first.to_string()));
    }
    let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    if assets.is_empty() {
        return Err(LoadError::NoAssetColumns);
    }

    let mut series: Vec<(String, Vec<(Timestamp, f64)>)> =
        assets.into_iter().map(|a| (a, Vec::new())).collect();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;
        let raw_ts = record.get(0).unwrap_or_default();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        for (j, (asset, points)) in series.iter_mut().enumerate() {
            let cell = record.get(j + 1).unwrap_or_default();
            let price = parse_price(cell).ok_or_else(|| LoadError::BadPrice {
                row,
                asset: asset.clone(),
                value: cell.to_string(),
            })?;
            points.push((ts, price));
        }
    }

    Ok(align_series(series)?)
}

/// Integer timestamps pass through; `YYYY-MM-DD` dates become UNIX seconds
/// at UTC midnight.
fn parse_timestamp(s: &str) -> Option<Timestamp> {
    if let Ok(ts) = s.parse::<i64>() {
        return Some(ts);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Missing markers map to NaN.
fn parse_price(s: &str) -> Option<f64> {
    match s {
        "" | "NaN" | "nan" | "NA" | "N/A" | "null" => Some(f64::NAN),
        _ => s.parse::<f64>().ok(),
    }
}
