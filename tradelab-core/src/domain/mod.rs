//! Domain types for TradeLab

pub mod price_matrix;
pub mod trade;
pub mod valuation;

pub use price_matrix::{PriceMatrix, PriceMatrixError};
pub use trade::Trade;
pub use valuation::{ExitReason, LegValuation, Mark, Pnl, TradeValuation};

/// Position on the time axis. Bar numbers and UNIX seconds both fit.
pub type Timestamp = i64;

/// Asset identifier type alias
pub type Asset = String;
