//! Error types shared by the executor and the engine.

use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a trade cannot be evaluated against a price matrix.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidTrade {
    #[error("trade has no legs")]
    NoLegs,

    #[error("quantity for '{asset}' is zero")]
    ZeroQuantity { asset: String },

    #[error("quantity for '{asset}' is not finite")]
    NonFiniteQuantity { asset: String },

    #[error("asset '{asset}' is not in the price matrix")]
    UnknownAsset { asset: String },

    #[error("open timestamp {timestamp} is not in the price matrix")]
    UnknownOpen { timestamp: Timestamp },

    #[error("close timestamp {timestamp} is not in the price matrix")]
    UnknownClose { timestamp: Timestamp },

    #[error("close {close} is before open {open}")]
    CloseBeforeOpen { open: Timestamp, close: Timestamp },

    /// Payload-free so a failure always serializes to valid JSON.
    #[error("profit-take or stop-loss threshold is not finite")]
    NonFiniteThreshold,

    #[error("profit-take threshold must be positive, got {take}")]
    NonPositiveTake { take: f64 },

    #[error("stop-loss threshold must be negative, got {stop}")]
    NonNegativeStop { stop: f64 },
}

/// Failure to value a single trade.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeError {
    #[error("invalid trade: {source}")]
    Invalid {
        #[from]
        source: InvalidTrade,
    },

    #[error("no price for '{asset}' at open timestamp {timestamp}")]
    MissingPrice { asset: String, timestamp: Timestamp },
}

/// A trade excluded from aggregation, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFailure {
    pub trade_index: usize,
    pub error: TradeError,
}

/// Run-level failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// No trade survived validation and evaluation. Carries every failure.
    #[error("no valid trades to aggregate ({} rejected)", .failures.len())]
    Empty { failures: Vec<TradeFailure> },

    #[error("backtest cancelled after {evaluated} trade evaluations")]
    Cancelled { evaluated: usize },
}
