//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! source = "csv"
//! path = "prices.csv"
//! synthetic_fallback = true
//!
//! [strategy]
//! type = "buy_and_hold"
//! lot = 2.0
//!
//! [engine]
//! parallel = true
//!
//! [cost]
//! model = "proportional"
//! commission_bps = 5.0
//!
//! [output]
//! dir = "runs"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradelab_core::data::RandomWalkParams;
use tradelab_core::domain::Trade;

/// Unique identifier for a run (content-addressable hash of its config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
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

    /// Deterministic BLAKE3 hash of the config's JSON form.
    ///
    /// Two runs with identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Reject parameter values no run could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let DataConfig::RandomWalk(params) = &self.data {
            validate_random_walk(params)?;
        }

        match &self.strategy {
            StrategyConfig::BuyAndHold { lot, .. } => require_lot(*lot)?,
            StrategyConfig::Random { n_trades, lot, .. } => {
                require_lot(*lot)?;
                if *n_trades == 0 {
                    return Err(invalid("random strategy needs n_trades > 0"));
                }
            }
            // Other per-trade problems are left to the engine, which reports
            // each bad trade instead of failing the run. Non-finite numbers
            // cannot be written back into a report, so they stop the run here.
            StrategyConfig::Trades { trades } => {
                for (i, trade) in trades.iter().enumerate() {
                    if let Some((asset, q)) = trade.quantities.iter().find(|(_, q)| !q.is_finite()) {
                        return Err(invalid(format!(
                            "trade {i}: quantity for {asset} must be finite, got {q}"
                        )));
                    }
                    for (name, value) in [("take", trade.take), ("stop", trade.stop)] {
                        if let Some(v) = value.filter(|v| !v.is_finite()) {
                            return Err(invalid(format!("trade {i}: {name} must be finite, got {v}")));
                        }
                    }
                }
            }
        }

        match self.cost {
            CostConfig::None => {}
            CostConfig::PerUnit { per_unit } => require_non_negative("per_unit", per_unit)?,
            CostConfig::Proportional { commission_bps } => {
                require_non_negative("commission_bps", commission_bps)?
            }
        }

        Ok(())
    }
}

/// Where prices come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    /// Wide CSV: a `timestamp` column followed by one column per asset.
    Csv {
        path: PathBuf,
        /// Generate a random-walk universe if the file cannot be read.
        #[serde(default)]
        synthetic_fallback: bool,
    },

    /// Synthetic geometric-Brownian-motion universe.
    RandomWalk(RandomWalkParams),
}

/// Strategy selection (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// One long trade per asset held to the horizon.
    BuyAndHold {
        /// Empty means every asset.
        #[serde(default)]
        assets: Vec<String>,
        #[serde(default = "default_lot")]
        lot: f64,
    },

    /// An explicit trade list.
    Trades { trades: Vec<Trade> },

    /// Seeded random single-asset trades.
    Random {
        #[serde(default = "default_n_trades")]
        n_trades: usize,
        #[serde(default = "default_max_holding")]
        max_holding: usize,
        #[serde(default = "default_lot")]
        lot: f64,
        #[serde(default = "default_true")]
        allow_short: bool,
        #[serde(default)]
        seed: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Cost hook selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CostConfig {
    /// Frictionless
    #[default]
    None,

    /// Fixed charge per unit traded, per side.
    PerUnit { per_unit: f64 },

    /// Basis points of traded notional, per side.
    Proportional { commission_bps: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_lot() -> f64 {
    1.0
}

fn default_n_trades() -> usize {
    100
}

fn default_max_holding() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn require_lot(lot: f64) -> Result<(), ConfigError> {
    if !lot.is_finite() || lot == 0.0 {
        return Err(invalid(format!("lot must be finite and non-zero, got {lot}")));
    }
    Ok(())
}

fn require_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{name} must be finite and >= 0, got {value}")));
    }
    Ok(())
}

fn validate_random_walk(p: &RandomWalkParams) -> Result<(), ConfigError> {
    if p.n_bars == 0 || p.n_assets == 0 {
        return Err(invalid("random walk needs n_bars > 0 and n_assets > 0"));
    }
    if !(p.init_value.is_finite() && p.init_value > 0.0) {
        return Err(invalid(format!("init_value must be positive, got {}", p.init_value)));
    }
    if !(p.dt.is_finite() && p.dt > 0.0) {
        return Err(invalid(format!("dt must be positive, got {}", p.dt)));
    }
    require_non_negative("volatility", p.volatility)?;
    if !p.drift.is_finite() {
        return Err(invalid("drift must be finite"));
    }
    Ok(())
}
