//! Order-level history: one row per (trade, asset leg).

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Timestamp};
use crate::engine::ResultSet;

/// One asset leg of one valued trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub trade_index: usize,
    /// Running index over every leg of every trade in the run.
    pub order_index: usize,
    pub asset: String,
    pub lot: f64,
    pub open: Timestamp,
    pub close: Timestamp,
    /// `close - open` in timestamp units.
    pub duration: i64,
    pub bars_held: usize,
    pub open_price: f64,
    pub close_price: f64,
    pub gain: f64,
    pub exit_reason: ExitReason,
    pub realized: bool,
}

/// Flat table of every leg in a result set, in trade input order and leg
/// (asset name) order within each trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub rows: Vec<HistoryRow>,
}

impl History {
    pub fn from_result(result: &ResultSet) -> Self {
        let rows = result
            .valuations
            .iter()
            .flat_map(|v| v.legs.iter().map(move |leg| (v, leg)))
            .enumerate()
            .map(|(order_index, (v, leg))| HistoryRow {
                trade_index: v.trade_index,
                order_index,
                asset: leg.asset.clone(),
                lot: leg.quantity,
                open: v.open,
                close: v.close,
                duration: v.close - v.open,
                bars_held: v.bars_held,
                open_price: leg.open_price,
                close_price: leg.close_price,
                gain: leg.pnl,
                exit_reason: v.exit_reason,
                realized: v.is_closed(),
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to one trade.
    pub fn for_trade(&self, trade_index: usize) -> impl Iterator<Item = &HistoryRow> {
        self.rows.iter().filter(move |r| r.trade_index == trade_index)
    }

    /// Σ leg gains. Equals the gross P&L of every valued trade.
    pub fn total_gain(&self) -> f64 {
        self.rows.iter().map(|r| r.gain).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceMatrix, Trade};
    use crate::engine::BacktestEngine;

    #[test]
    fn one_row_per_leg() {
        let m = PriceMatrix::new(
            vec![10, 20, 30],
            vec![
                ("A".into(), vec![1.0, 2.0, 3.0]),
                ("B".into(), vec![5.0, 4.0, 6.0]),
            ],
        )
        .unwrap();
        let trades = vec![
            Trade::single("A", 2.0, 10).close_at(20),
            Trade::new(20).with_leg("A", 1.0).with_leg("B", -1.0),
        ];
        let rs = BacktestEngine::default().run(&m, &trades).unwrap();
        let history = History::from_result(&rs);

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.rows.iter().map(|r| r.order_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let first = &history.rows[0];
        assert_eq!(first.asset, "A");
        assert_eq!(first.duration, 10);
        assert_eq!(first.gain, 2.0);
        assert!(first.realized);

        let legs: Vec<_> = history.for_trade(1).collect();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[1].asset, "B");
        assert_eq!(legs[1].lot, -1.0);
        assert_eq!(legs[1].gain, -2.0);
        assert_eq!(legs[1].exit_reason, ExitReason::Horizon);
        assert!(!legs[1].realized);

        assert_eq!(history.total_gain(), 2.0 + 1.0 - 2.0);
    }
}
