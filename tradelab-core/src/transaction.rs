//! Transaction table: net lot traded per (timestamp, asset).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Timestamp;
use crate::engine::ResultSet;

/// Net signed lot bought (+) or sold (-) of one asset at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub timestamp: Timestamp,
    pub asset: String,
    pub lot: f64,
}

/// Every position change a run makes, netted per (timestamp, asset) and
/// sorted by timestamp, then asset name. Rows netting to exactly zero are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub rows: Vec<TransactionRow>,
}

impl Transaction {
    /// Each leg buys its quantity at the trade's open and, if the trade was
    /// closed, sells it back at the effective close.
    pub fn from_result(result: &ResultSet) -> Self {
        let mut net: BTreeMap<(Timestamp, &str), f64> = BTreeMap::new();
        for v in &result.valuations {
            for leg in &v.legs {
                *net.entry((v.open, leg.asset.as_str())).or_default() += leg.quantity;
                if v.is_closed() {
                    *net.entry((v.close, leg.asset.as_str())).or_default() -= leg.quantity;
                }
            }
        }

        let rows = net
            .into_iter()
            .filter(|(_, lot)| *lot != 0.0)
            .map(|((timestamp, asset), lot)| TransactionRow {
                timestamp,
                asset: asset.to_string(),
                lot,
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

    /// Position held in each asset after every transaction up to and
    /// including `timestamp`. Flat assets are omitted.
    pub fn positions_at(&self, timestamp: Timestamp) -> BTreeMap<String, f64> {
        let mut positions: BTreeMap<String, f64> = BTreeMap::new();
        for row in self.rows.iter().take_while(|r| r.timestamp <= timestamp) {
            *positions.entry(row.asset.clone()).or_default() += row.lot;
        }
        positions.retain(|_, lot| *lot != 0.0);
        positions
    }

    /// Positions still open once every transaction has been applied.
    pub fn open_positions(&self) -> BTreeMap<String, f64> {
        self.positions_at(Timestamp::MAX)
    }
}
