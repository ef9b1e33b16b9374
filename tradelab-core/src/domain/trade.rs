//! Trade: one position across one or more assets.

use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Neg;

/// A single trade instruction: signed quantities per asset, an open
/// timestamp and an optional close timestamp.
///
/// Positive quantity is long, negative is short. A trade with no `close`
/// is held through the end of history. `take` and `stop` are optional P&L
/// thresholds that close the trade early once its mark-to-market value
/// reaches them.
///
/// Legs are kept in a `BTreeMap` so iteration order (and therefore every
/// derived float sum) is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub quantities: BTreeMap<String, f64>,
    pub open: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,
}

impl Trade {
    /// An empty trade opening at `open`. Add legs with [`Trade::with_leg`].
    pub fn new(open: Timestamp) -> Self {
        Self {
            quantities: BTreeMap::new(),
            open,
            close: None,
            take: None,
            stop: None,
        }
    }

    /// Single-asset trade.
    pub fn single(asset: impl Into<String>, quantity: f64, open: Timestamp) -> Self {
        Self::new(open).with_leg(asset, quantity)
    }

    /// Add a leg. Repeating an asset accumulates its quantity.
    pub fn with_leg(mut self, asset: impl Into<String>, quantity: f64) -> Self {
        *self.quantities.entry(asset.into()).or_insert(0.0) += quantity;
        self
    }

    pub fn close_at(mut self, close: Timestamp) -> Self {
        self.close = Some(close);
        self
    }

    /// Close the trade once its value reaches `take` (must be positive).
    pub fn take_profit(mut self, take: f64) -> Self {
        self.take = Some(take);
        self
    }

    /// Close the trade once its value falls to `stop` (must be negative).
    pub fn stop_loss(mut self, stop: f64) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Multiply every leg by `factor`. Thresholds are left unchanged.
    pub fn scaled(mut self, factor: f64) -> Self {
        for q in self.quantities.values_mut() {
            *q *= factor;
        }
        self
    }

    /// Number of asset legs.
    pub fn n_legs(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(|a| a.as_str())
    }
}

impl Neg for Trade {
    type Output = Trade;

    /// Flip every leg: long becomes short and vice versa.
    fn neg(self) -> Trade {
        self.scaled(-1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_repeated_assets() {
        let t = Trade::new(1).with_leg("A", 2.0).with_leg("B", -1.0).with_leg("A", 1.0);
        assert_eq!(t.n_legs(), 2);
        assert_eq!(t.quantities["A"], 3.0);
        assert_eq!(t.quantities["B"], -1.0);
        assert!(!t.is_closed());
    }

    #[test]
    fn negation_flips_all_legs() {
        let t = -Trade::new(1).with_leg("A", 2.0).with_leg("B", -3.0).close_at(5);
        assert_eq!(t.quantities["A"], -2.0);
        assert_eq!(t.quantities["B"], 3.0);
        assert_eq!(t.close, Some(5));
    }

    #[test]
    fn scaling_keeps_thresholds() {
        let t = Trade::single("A", 1.5, 0).take_profit(10.0).stop_loss(-5.0).scaled(2.0);
        assert_eq!(t.quantities["A"], 3.0);
        assert_eq!(t.take, Some(10.0));
        assert_eq!(t.stop, Some(-5.0));
    }

    #[test]
    fn serde_omits_absent_optionals() {
        let t = Trade::single("A", 1.0, 3);
        let json = serde_json::to_string(&t).unwrap();
        assert!(!json.contains("close"));
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
