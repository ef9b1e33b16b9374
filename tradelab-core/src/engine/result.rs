//! ResultSet: immutable output of one backtest run, and the aggregation
//! that builds it from per-trade valuations.

use serde::{Deserialize, Serialize};

use crate::domain::{Pnl, Timestamp, TradeValuation};
use crate::error::TradeFailure;

use super::summary::Summary;

/// Portfolio state at one axis timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub timestamp: Timestamp,
    /// Σ mark-to-market value of the trades open at this timestamp.
    pub value: f64,
    /// Cumulative P&L: closed trades' final values plus `value`.
    pub wealth: f64,
    pub net_exposure: f64,
    pub gross_exposure: f64,
    pub open_trades: usize,
}

/// Output of [`BacktestEngine::run`](super::BacktestEngine::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// One valuation per valid trade, in input order.
    pub valuations: Vec<TradeValuation>,
    /// Portfolio series over the sorted union of valuation timestamps.
    pub portfolio: Vec<PortfolioPoint>,
    pub summary: Summary,
    /// Every excluded trade, in input order.
    pub failures: Vec<TradeFailure>,
}

impl ResultSet {
    /// Aggregate valuations into a result set. `valuations` must be non-empty
    /// and sorted by `trade_index`.
    pub(crate) fn aggregate(valuations: Vec<TradeValuation>, failures: Vec<TradeFailure>) -> Self {
        let portfolio = aggregate_portfolio(&valuations);
        let values: Vec<f64> = portfolio.iter().map(|p| p.value).collect();
        let wealth: Vec<f64> = portfolio.iter().map(|p| p.wealth).collect();
        let summary = Summary::compute(&valuations, &values, &wealth, failures.len());
        Self {
            valuations,
            portfolio,
            summary,
            failures,
        }
    }

    /// `(timestamp, value)` pairs of the portfolio series.
    pub fn portfolio_series(&self) -> Vec<(Timestamp, f64)> {
        self.portfolio.iter().map(|p| (p.timestamp, p.value)).collect()
    }

    /// `(timestamp, cumulative P&L)` pairs.
    pub fn wealth_series(&self) -> Vec<(Timestamp, f64)> {
        self.portfolio.iter().map(|p| (p.timestamp, p.wealth)).collect()
    }

    /// `(timestamp, net, gross)` exposure triples.
    pub fn exposure_series(&self) -> Vec<(Timestamp, f64, f64)> {
        self.portfolio
            .iter()
            .map(|p| (p.timestamp, p.net_exposure, p.gross_exposure))
            .collect()
    }

    /// Per-trade P&L in input order, tagged realized/unrealized.
    pub fn trade_pnls(&self) -> Vec<(usize, Pnl)> {
        self.valuations
            .iter()
            .map(|v| (v.trade_index, v.pnl))
            .collect()
    }

    /// Portfolio value at `timestamp`, holding the last axis value for
    /// timestamps between axis points. `None` before the first axis point.
    pub fn value_at(&self, timestamp: Timestamp) -> Option<f64> {
        let idx = self.portfolio.partition_point(|p| p.timestamp <= timestamp);
        idx.checked_sub(1).map(|i| self.portfolio[i].value)
    }

    pub fn valuation(&self, trade_index: usize) -> Option<&TradeValuation> {
        self.valuations
            .binary_search_by_key(&trade_index, |v| v.trade_index)
            .ok()
            .map(|i| &self.valuations[i])
    }
}

/// Build the portfolio series.
///
/// Each trade contributes its value on `[open, close]`, held at its last mark
/// for axis points it was not evaluated at, and its final value to `wealth`
/// from the next axis point after its close onwards. Per-point sums are
/// accumulated in trade input order so results are reproducible.
fn aggregate_portfolio(valuations: &[TradeValuation]) -> Vec<PortfolioPoint> {
    let mut axis: Vec<Timestamp> = valuations
        .iter()
        .flat_map(|v| v.marks.iter().map(|m| m.timestamp))
        .collect();
    axis.sort_unstable();
    axis.dedup();

    let mut points: Vec<PortfolioPoint> = axis
        .iter()
        .map(|&timestamp| PortfolioPoint {
            timestamp,
            value: 0.0,
            wealth: 0.0,
            net_exposure: 0.0,
            gross_exposure: 0.0,
            open_trades: 0,
        })
        .collect();
    let mut realized_from = vec![0.0; axis.len() + 1];

    for v in valuations {
        if v.marks.is_empty() {
            continue;
        }
        let start = axis.partition_point(|&t| t < v.open);
        let end = axis.partition_point(|&t| t <= v.close);
        let mut cursor = 0;

        for point in &mut points[start..end] {
            while cursor + 1 < v.marks.len() && v.marks[cursor + 1].timestamp <= point.timestamp {
                cursor += 1;
            }
            let mark = &v.marks[cursor];
            point.value += mark.value;
            point.net_exposure += mark.net_exposure;
            point.gross_exposure += mark.gross_exposure;
            point.open_trades += 1;
        }

        realized_from[end] += v.final_value();
    }

    let mut realized = 0.0;
    for (i, point) in points.iter_mut().enumerate() {
        realized += realized_from[i];
        point.wealth = realized + point.value;
    }

    points
}
