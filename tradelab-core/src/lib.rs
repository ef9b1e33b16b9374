//! TradeLab Core: price matrix, trades, trade execution, portfolio aggregation.
//!
//! This crate contains the backtesting engine:
//! - Domain types (price matrix, trades, per-trade valuations)
//! - Trade executor: validation, mark-to-market, profit-take / stop-loss exits
//! - Engine: parallel or sequential valuation, failure collection, aggregation
//! - Result set with portfolio, wealth and exposure series plus summary scalars
//! - Strategy trait with a few reference strategies
//! - Order-level history table and per-bar transaction table
//! - Data helpers: multi-series alignment, random-walk universes

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod strategy;
pub mod transaction;

pub use domain::{
    ExitReason, LegValuation, Mark, Pnl, PriceMatrix, PriceMatrixError, Timestamp, Trade,
    TradeValuation,
};
pub use engine::{BacktestEngine, CancelToken, CostModel, EngineConfig, ResultSet, Summary};
pub use error::{BacktestError, InvalidTrade, TradeError, TradeFailure};
pub use history::{History, HistoryRow};
pub use strategy::{BuyAndHold, DeterminedTrades, RandomTrader, Strategy};
pub use transaction::{Transaction, TransactionRow};
