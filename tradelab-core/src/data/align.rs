//! Multi-asset time alignment.
//!
//! Given one `(timestamp, price)` series per asset, build a price matrix on
//! the union of all timestamps. Missing cells stay NaN: no forward-fill of
//! price data happens at ingestion, only during valuation.

use std::collections::{BTreeSet, HashMap};

use crate::domain::{PriceMatrix, PriceMatrixError, Timestamp};

/// Align per-asset series into a [`PriceMatrix`].
///
/// Assets keep the order they are given in. Series need not be sorted; if a
/// series repeats a timestamp, the later observation wins.
pub fn align_series(
    series: Vec<(String, Vec<(Timestamp, f64)>)>,
) -> Result<PriceMatrix, PriceMatrixError> {
    let axis: Vec<Timestamp> = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|&(t, _)| t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let row_of: HashMap<Timestamp, usize> =
        axis.iter().enumerate().map(|(i, &t)| (t, i)).collect();

    let columns = series
        .into_iter()
        .map(|(asset, points)| {
            let mut column = vec![f64::NAN; axis.len()];
            for (t, price) in points {
                column[row_of[&t]] = price;
            }
            (asset, column)
        })
        .collect();

    PriceMatrix::new(axis, columns)
}
