//! Backtest runner: wires together configuration, data loading and the engine.
//!
//! Two entry points:
//! - `run_from_config()`: loads prices from the configured source, then runs.
//! - `run_on_data()`: takes pre-loaded prices. Used when several configs
//!   share one dataset.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use tradelab_core::domain::Timestamp;
use tradelab_core::engine::{
    BacktestEngine, BpsCost, CostModel, EngineConfig, NoCost, PerUnitCost, ResultSet,
};
use tradelab_core::error::BacktestError;
use tradelab_core::strategy::{BuyAndHold, DeterminedTrades, RandomTrader, Strategy};

use crate::config::{CostConfig, RunConfig, RunId, StrategyConfig};
use crate::data_loader::{load_prices, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,
    pub strategy: String,
    pub cost_model: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub n_timestamps: usize,
    pub n_assets: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub result: ResultSet,
}

/// Default schema version for older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a backtest from a config, loading prices from its data source.
pub fn run_from_config(config: &RunConfig) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let loaded = load_prices(&config.data)?;
    run_on_data(config, &loaded)
}

/// Run a backtest on pre-loaded prices, no I/O.
pub fn run_on_data(config: &RunConfig, loaded: &LoadedData) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let strategy = build_strategy(&config.strategy);
    let engine = build_engine(config);

    info!(
        run_id = %run_id,
        strategy = strategy.name(),
        cost_model = engine.config().cost_model.name(),
        "running backtest"
    );

    let matrix = &loaded.matrix;
    let result = engine.run_strategy(matrix, strategy.as_ref())?;

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        strategy: strategy.name().to_string(),
        cost_model: engine.config().cost_model.name().to_string(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        n_timestamps: matrix.len(),
        n_assets: matrix.n_assets(),
        start: matrix.first_timestamp(),
        end: matrix.last_timestamp(),
        result,
    })
}

/// Construct the strategy a config names.
pub fn build_strategy(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config {
        StrategyConfig::BuyAndHold { assets, lot } => Box::new(BuyAndHold {
            assets: assets.clone(),
            lot: *lot,
        }),
        StrategyConfig::Trades { trades } => Box::new(DeterminedTrades::new(trades.clone())),
        StrategyConfig::Random {
            n_trades,
            max_holding,
            lot,
            allow_short,
            seed,
        } => Box::new(RandomTrader {
            n_trades: *n_trades,
            max_holding: *max_holding,
            lot: *lot,
            allow_short: *allow_short,
            seed: *seed,
        }),
    }
}

pub fn build_cost_model(config: &CostConfig) -> Arc<dyn CostModel> {
    match *config {
        CostConfig::None => Arc::new(NoCost),
        CostConfig::PerUnit { per_unit } => Arc::new(PerUnitCost::new(per_unit)),
        CostConfig::Proportional { commission_bps } => Arc::new(BpsCost::new(commission_bps)),
    }
}

pub fn build_engine(config: &RunConfig) -> BacktestEngine {
    let engine_config = EngineConfig {
        parallel: config.engine.parallel,
        cost_model: build_cost_model(&config.cost),
    };
    BacktestEngine::new(engine_config)
}
