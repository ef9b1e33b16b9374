//! TradeLab Runner: run configuration, price ingestion, reports and artifacts.
//!
//! This crate builds on `tradelab-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - Price loading from wide CSV files with a synthetic random-walk fallback
//! - Single-run entry point producing a schema-versioned report
//! - JSON, CSV and Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, CostConfig, DataConfig, RunConfig, RunId, StrategyConfig};
pub use data_loader::{load_prices, read_price_csv, DataSource, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use runner::{run_from_config, run_on_data, BacktestReport, RunError, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<BacktestReport>();
        assert_sync::<BacktestReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
