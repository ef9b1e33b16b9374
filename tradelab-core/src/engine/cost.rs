//! Cost hook: transaction cost charged per trade round trip.
//!
//! Costs never alter a trade's value path; they are reported separately and
//! subtracted only by `TradeValuation::net_pnl`. A closed trade pays on entry
//! and exit, a trade still open at the horizon pays on entry only.

use crate::domain::LegValuation;
use std::fmt::Debug;

/// Pluggable transaction-cost model.
pub trait CostModel: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Cost of one trade given its valued legs.
    fn cost(&self, legs: &[LegValuation], closed: bool) -> f64;
}

/// Frictionless: every trade costs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCost;

impl CostModel for NoCost {
    fn name(&self) -> &str {
        "no_cost"
    }

    fn cost(&self, _legs: &[LegValuation], _closed: bool) -> f64 {
        0.0
    }
}

/// Commission in basis points of traded notional, per side.
#[derive(Debug, Clone, Copy)]
pub struct BpsCost {
    pub commission_bps: f64,
}

impl BpsCost {
    pub fn new(commission_bps: f64) -> Self {
        Self { commission_bps }
    }
}

impl CostModel for BpsCost {
    fn name(&self) -> &str {
        "bps"
    }

    fn cost(&self, legs: &[LegValuation], closed: bool) -> f64 {
        let rate = self.commission_bps / 10_000.0;
        legs.iter()
            .map(|leg| {
                let entry = (leg.quantity * leg.open_price).abs();
                let exit = if closed {
                    (leg.quantity * leg.close_price).abs()
                } else {
                    0.0
                };
                (entry + exit) * rate
            })
            .sum()
    }
}

/// Fixed charge per unit traded, per side.
#[derive(Debug, Clone, Copy)]
pub struct PerUnitCost {
    pub per_unit: f64,
}

impl PerUnitCost {
    pub fn new(per_unit: f64) -> Self {
        Self { per_unit }
    }
}

impl CostModel for PerUnitCost {
    fn name(&self) -> &str {
        "per_unit"
    }

    fn cost(&self, legs: &[LegValuation], closed: bool) -> f64 {
        let sides = if closed { 2.0 } else { 1.0 };
        legs.iter()
            .map(|leg| leg.quantity.abs() * self.per_unit * sides)
            .sum()
    }
}
