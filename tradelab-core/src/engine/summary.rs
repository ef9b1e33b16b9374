//! Summary statistics: pure functions over valuations and series.
//!
//! Trade-level statistics use net P&L (gross minus the cost hook's charge).
//! With the default frictionless model that is exactly the realized P&L.

use serde::{Deserialize, Serialize};

use crate::domain::TradeValuation;

/// Scalar summary of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Final value of the portfolio series.
    pub total_return: f64,
    /// Σ net P&L over every valued trade (closed and open).
    pub total_pnl: f64,
    /// Fraction of closed trades with positive P&L.
    pub win_rate: f64,
    /// Worst closed-trade P&L, or 0.0 when no closed trade lost money.
    pub max_trade_loss: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of the wealth series (≤ 0, P&L units).
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub closed_count: usize,
    pub open_count: usize,
    pub failed_count: usize,
    pub avg_bars_held: f64,
}

impl Summary {
    pub fn compute(
        valuations: &[TradeValuation],
        portfolio_values: &[f64],
        wealth: &[f64],
        failed_count: usize,
    ) -> Self {
        let closed_count = valuations.iter().filter(|v| v.is_closed()).count();
        Self {
            total_return: portfolio_values.last().copied().unwrap_or(0.0),
            total_pnl: total_pnl(valuations),
            win_rate: win_rate(valuations),
            max_trade_loss: max_trade_loss(valuations),
            profit_factor: profit_factor(valuations),
            max_drawdown: max_drawdown(wealth),
            trade_count: valuations.len(),
            closed_count,
            open_count: valuations.len() - closed_count,
            failed_count,
            avg_bars_held: avg_bars_held(valuations),
        }
    }
}

pub fn total_pnl(valuations: &[TradeValuation]) -> f64 {
    valuations.iter().map(|v| v.net_pnl()).sum()
}

/// Winners / closed trades. Open trades do not count either way.
pub fn win_rate(valuations: &[TradeValuation]) -> f64 {
    let closed: Vec<f64> = closed_pnls(valuations).collect();
    if closed.is_empty() {
        return 0.0;
    }
    let winners = closed.iter().filter(|&&p| p > 0.0).count();
    winners as f64 / closed.len() as f64
}

pub fn max_trade_loss(valuations: &[TradeValuation]) -> f64 {
    closed_pnls(valuations).fold(0.0_f64, f64::min)
}

/// Gross profits / gross losses over closed trades.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(valuations: &[TradeValuation]) -> f64 {
    let (profit, loss) = closed_pnls(valuations).fold((0.0, 0.0), |(p, l), pnl| {
        if pnl > 0.0 {
            (p + pnl, l)
        } else {
            (p, l - pnl)
        }
    });
    if loss < 1e-10 {
        return if profit > 0.0 { 100.0 } else { 0.0 };
    }
    (profit / loss).min(100.0)
}

/// Maximum drawdown of a cumulative P&L series, in P&L units (≤ 0).
pub fn max_drawdown(wealth: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &w in wealth {
        peak = peak.max(w);
        max_dd = max_dd.min(w - peak);
    }
    max_dd
}

pub fn avg_bars_held(valuations: &[TradeValuation]) -> f64 {
    if valuations.is_empty() {
        return 0.0;
    }
    valuations.iter().map(|v| v.bars_held as f64).sum::<f64>() / valuations.len() as f64
}

fn closed_pnls(valuations: &[TradeValuation]) -> impl Iterator<Item = f64> + '_ {
    valuations
        .iter()
        .filter(|v| v.is_closed())
        .map(|v| v.net_pnl())
}
