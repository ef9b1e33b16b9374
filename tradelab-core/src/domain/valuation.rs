//! TradeValuation: the executor's mark-to-market record for one trade.

use super::Timestamp;
use serde::{Deserialize, Serialize};

/// P&L of a trade, tagged by whether it has actually been closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Pnl {
    /// The trade reached its close (scheduled, profit-take or stop-loss).
    Realized(f64),
    /// The trade is still open at the end of history.
    Unrealized(f64),
}

impl Pnl {
    pub fn value(&self) -> f64 {
        match self {
            Pnl::Realized(v) | Pnl::Unrealized(v) => *v,
        }
    }

    pub fn realized(&self) -> Option<f64> {
        match self {
            Pnl::Realized(v) => Some(*v),
            Pnl::Unrealized(_) => None,
        }
    }

    pub fn is_realized(&self) -> bool {
        matches!(self, Pnl::Realized(_))
    }
}

/// Why the valuation ended where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Closed at the trade's own close timestamp.
    Scheduled,
    /// Closed early because value reached the profit-take threshold.
    TakeProfit,
    /// Closed early because value reached the stop-loss threshold.
    StopLoss,
    /// No close; still open at the last timestamp of the matrix.
    Horizon,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Scheduled => "scheduled",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Horizon => "horizon",
        }
    }
}

/// One point of a trade's value path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub timestamp: Timestamp,
    /// Signed P&L relative to entry prices.
    pub value: f64,
    /// Σ quantity × price (signed notional).
    pub net_exposure: f64,
    /// Σ |quantity × price|.
    pub gross_exposure: f64,
}

/// Entry/exit record for one asset leg of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegValuation {
    pub asset: String,
    pub quantity: f64,
    pub open_price: f64,
    /// Last known price at the effective close (forward-filled).
    pub close_price: f64,
    pub pnl: f64,
}

/// Mark-to-market valuation of a single trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeValuation {
    /// Position of the trade in the engine's input sequence.
    pub trade_index: usize,
    pub open: Timestamp,
    /// Effective close: scheduled close, early exit, or last timestamp.
    pub close: Timestamp,
    pub exit_reason: ExitReason,
    pub marks: Vec<Mark>,
    pub legs: Vec<LegValuation>,
    pub pnl: Pnl,
    /// Cost charged by the cost model. Never folded into `marks`.
    pub cost: f64,
    /// Maximum adverse excursion (lowest value reached, ≤ 0).
    pub mae: f64,
    /// Maximum favourable excursion (highest value reached, ≥ 0).
    pub mfe: f64,
    /// Rows of the price matrix between open and close.
    pub bars_held: usize,
}

impl TradeValuation {
    /// `(timestamp, value)` pairs from open to close.
    pub fn value_series(&self) -> Vec<(Timestamp, f64)> {
        self.marks.iter().map(|m| (m.timestamp, m.value)).collect()
    }

    /// Final P&L after costs.
    pub fn net_pnl(&self) -> f64 {
        self.pnl.value() - self.cost
    }

    pub fn is_closed(&self) -> bool {
        self.pnl.is_realized()
    }

    pub fn final_value(&self) -> f64 {
        self.marks.last().map(|m| m.value).unwrap_or(0.0)
    }
}
