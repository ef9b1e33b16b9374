//! Strategy: the pluggable policy that turns a price matrix into trades.
//!
//! The engine only consumes a strategy's output. Lookahead is NOT enforced:
//! a strategy receives the whole matrix, and it is the strategy author's
//! responsibility not to base a trade opened at `t` on prices after `t`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{PriceMatrix, Trade};

/// A trading policy.
///
/// `propose` must treat the matrix as read-only and return trades in the
/// order the policy decided them. The order need not be chronological.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn propose(&self, matrix: &PriceMatrix) -> Vec<Trade>;
}

/// Yields a fixed list of trades regardless of the data.
#[derive(Debug, Clone, Default)]
pub struct DeterminedTrades {
    trades: Vec<Trade>,
}

impl DeterminedTrades {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self { trades }
    }
}

impl Strategy for DeterminedTrades {
    fn name(&self) -> &str {
        "determined_trades"
    }

    fn propose(&self, _matrix: &PriceMatrix) -> Vec<Trade> {
        self.trades.clone()
    }
}

/// One long trade per asset, held from the asset's first available price
/// through the end of history.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    /// Assets to hold; empty means every asset in the matrix.
    pub assets: Vec<String>,
    pub lot: f64,
}

impl Default for BuyAndHold {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            lot: 1.0,
        }
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn propose(&self, matrix: &PriceMatrix) -> Vec<Trade> {
        let assets: Vec<&str> = if self.assets.is_empty() {
            matrix.assets().iter().map(|a| a.as_str()).collect()
        } else {
            self.assets.iter().map(|a| a.as_str()).collect()
        };

        assets
            .into_iter()
            .filter_map(|asset| {
                // Unknown assets fall back to the first timestamp so the
                // engine reports them instead of silently dropping them.
                let open = match matrix.column(asset) {
                    Some(col) => {
                        let row = col.iter().position(|p| !p.is_nan())?;
                        matrix.timestamps()[row]
                    }
                    None => matrix.first_timestamp(),
                };
                Some(Trade::single(asset, self.lot, open))
            })
            .collect()
    }
}

/// Seeded random single-asset trades, for smoke and scale testing.
#[derive(Debug, Clone)]
pub struct RandomTrader {
    pub n_trades: usize,
    /// Maximum holding period in rows.
    pub max_holding: usize,
    pub lot: f64,
    pub allow_short: bool,
    pub seed: u64,
}

impl Default for RandomTrader {
    fn default() -> Self {
        Self {
            n_trades: 100,
            max_holding: 20,
            lot: 1.0,
            allow_short: true,
            seed: 42,
        }
    }
}

impl Strategy for RandomTrader {
    fn name(&self) -> &str {
        "random_trader"
    }

    fn propose(&self, matrix: &PriceMatrix) -> Vec<Trade> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let timestamps = matrix.timestamps();
        let n_rows = timestamps.len();
        let mut trades = Vec::with_capacity(self.n_trades);

        for _ in 0..self.n_trades {
            let asset_idx = rng.gen_range(0..matrix.n_assets());
            let col = matrix.column_at(asset_idx);
            let start = rng.gen_range(0..n_rows);
            let Some(open_row) = (start..n_rows).find(|&r| !col[r].is_nan()) else {
                continue;
            };
            let hold = rng.gen_range(0..=self.max_holding);
            let close_row = (open_row + hold).min(n_rows - 1);
            let sign = if self.allow_short && rng.gen_bool(0.5) {
                -1.0
            } else {
                1.0
            };

            trades.push(
                Trade::single(&matrix.assets()[asset_idx], sign * self.lot, timestamps[open_row])
                    .close_at(timestamps[close_row]),
            );
        }

        trades
    }
}
