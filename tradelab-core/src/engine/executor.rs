//! Trade executor: values one trade against the price matrix.
//!
//! Pure function of its inputs: trade + matrix → mark-to-market path.
//! Missing prices after the open are held at the last observation; a missing
//! price at the open is a hard failure.

use std::sync::Arc;

use crate::domain::{
    ExitReason, LegValuation, Mark, Pnl, PriceMatrix, Trade, TradeValuation,
};
use crate::error::{InvalidTrade, TradeError};

use super::cost::{CostModel, NoCost};

/// A trade whose assets and timestamps have been resolved to matrix positions.
#[derive(Debug, Clone)]
pub struct ResolvedTrade<'t> {
    /// (asset name, column index, quantity), in the trade's leg order.
    pub legs: Vec<(&'t str, usize, f64)>,
    pub open_row: usize,
    pub close_row: Option<usize>,
}

/// Values trades against a [`PriceMatrix`].
#[derive(Debug, Clone)]
pub struct TradeExecutor {
    cost_model: Arc<dyn CostModel>,
}

impl Default for TradeExecutor {
    fn default() -> Self {
        Self::new(Arc::new(NoCost))
    }
}

impl TradeExecutor {
    pub fn new(cost_model: Arc<dyn CostModel>) -> Self {
        Self { cost_model }
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost_model.as_ref()
    }

    /// Check a trade against the matrix and resolve it to row/column positions.
    pub fn validate<'t>(
        &self,
        trade: &'t Trade,
        matrix: &PriceMatrix,
    ) -> Result<ResolvedTrade<'t>, InvalidTrade> {
        if trade.quantities.is_empty() {
            return Err(InvalidTrade::NoLegs);
        }

        let mut legs = Vec::with_capacity(trade.quantities.len());
        for (asset, &quantity) in &trade.quantities {
            if !quantity.is_finite() {
                return Err(InvalidTrade::NonFiniteQuantity {
                    asset: asset.clone(),
                });
            }
            if quantity == 0.0 {
                return Err(InvalidTrade::ZeroQuantity {
                    asset: asset.clone(),
                });
            }
            let col = matrix
                .asset_index(asset)
                .ok_or_else(|| InvalidTrade::UnknownAsset {
                    asset: asset.clone(),
                })?;
            legs.push((asset.as_str(), col, quantity));
        }

        let open_row = matrix
            .timestamp_index(trade.open)
            .ok_or(InvalidTrade::UnknownOpen {
                timestamp: trade.open,
            })?;

        let close_row = match trade.close {
            Some(close) => {
                if close < trade.open {
                    return Err(InvalidTrade::CloseBeforeOpen {
                        open: trade.open,
                        close,
                    });
                }
                Some(
                    matrix
                        .timestamp_index(close)
                        .ok_or(InvalidTrade::UnknownClose { timestamp: close })?,
                )
            }
            None => None,
        };

        if trade.take.into_iter().chain(trade.stop).any(|x| !x.is_finite()) {
            return Err(InvalidTrade::NonFiniteThreshold);
        }
        if let Some(take) = trade.take {
            if take <= 0.0 {
                return Err(InvalidTrade::NonPositiveTake { take });
            }
        }
        if let Some(stop) = trade.stop {
            if stop >= 0.0 {
                return Err(InvalidTrade::NonNegativeStop { stop });
            }
        }

        Ok(ResolvedTrade {
            legs,
            open_row,
            close_row,
        })
    }

    /// Value a trade on its own (trade index 0).
    pub fn evaluate(&self, trade: &Trade, matrix: &PriceMatrix) -> Result<TradeValuation, TradeError> {
        self.evaluate_indexed(0, trade, matrix)
    }

    /// Value a trade, tagging the result with its position in the input sequence.
    pub fn evaluate_indexed(
        &self,
        trade_index: usize,
        trade: &Trade,
        matrix: &PriceMatrix,
    ) -> Result<TradeValuation, TradeError> {
        let resolved = self.validate(trade, matrix)?;
        self.evaluate_resolved(trade_index, trade, &resolved, matrix)
    }

    /// Value an already-validated trade.
    pub fn evaluate_resolved(
        &self,
        trade_index: usize,
        trade: &Trade,
        resolved: &ResolvedTrade<'_>,
        matrix: &PriceMatrix,
    ) -> Result<TradeValuation, TradeError> {
        let open_row = resolved.open_row;
        let scheduled_end = resolved.close_row.unwrap_or(matrix.len() - 1);

        let mut entry = Vec::with_capacity(resolved.legs.len());
        for &(asset, col, _) in &resolved.legs {
            let price = matrix.column_at(col)[open_row];
            if price.is_nan() {
                return Err(TradeError::MissingPrice {
                    asset: asset.to_string(),
                    timestamp: trade.open,
                });
            }
            entry.push(price);
        }

        let timestamps = matrix.timestamps();
        let mut last = entry.clone();
        let mut marks = Vec::with_capacity(scheduled_end - open_row + 1);
        let mut early_exit = None;

        for row in open_row..=scheduled_end {
            let mut value = 0.0;
            let mut net_exposure = 0.0;
            let mut gross_exposure = 0.0;

            for (i, &(_, col, quantity)) in resolved.legs.iter().enumerate() {
                let price = matrix.column_at(col)[row];
                if !price.is_nan() {
                    last[i] = price;
                }
                value += quantity * (last[i] - entry[i]);
                let notional = quantity * last[i];
                net_exposure += notional;
                gross_exposure += notional.abs();
            }

            marks.push(Mark {
                timestamp: timestamps[row],
                value,
                net_exposure,
                gross_exposure,
            });

            if row > open_row {
                if trade.take.is_some_and(|take| value >= take) {
                    early_exit = Some(ExitReason::TakeProfit);
                    break;
                }
                if trade.stop.is_some_and(|stop| value <= stop) {
                    early_exit = Some(ExitReason::StopLoss);
                    break;
                }
            }
        }

        let exit_reason = match (early_exit, resolved.close_row) {
            (Some(reason), _) => reason,
            (None, Some(_)) => ExitReason::Scheduled,
            (None, None) => ExitReason::Horizon,
        };

        // Loop always pushes at least the open mark.
        let final_mark = marks[marks.len() - 1];
        let pnl = match exit_reason {
            ExitReason::Horizon => Pnl::Unrealized(final_mark.value),
            _ => Pnl::Realized(final_mark.value),
        };

        let legs: Vec<LegValuation> = resolved
            .legs
            .iter()
            .enumerate()
            .map(|(i, &(asset, _, quantity))| LegValuation {
                asset: asset.to_string(),
                quantity,
                open_price: entry[i],
                close_price: last[i],
                pnl: quantity * (last[i] - entry[i]),
            })
            .collect();

        let (mae, mfe) = marks.iter().fold((0.0_f64, 0.0_f64), |(lo, hi), m| {
            (lo.min(m.value), hi.max(m.value))
        });

        let cost = self.cost_model.cost(&legs, pnl.is_realized());

        Ok(TradeValuation {
            trade_index,
            open: trade.open,
            close: final_mark.timestamp,
            exit_reason,
            bars_held: marks.len() - 1,
            marks,
            legs,
            pnl,
            cost,
            mae,
            mfe,
        })
    }
}
