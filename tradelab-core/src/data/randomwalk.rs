//! Random-walk universe: geometric Brownian motion price paths.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::{PriceMatrix, PriceMatrixError};

/// Parameters of a synthetic random-walk universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkParams {
    pub n_bars: usize,
    pub n_assets: usize,
    pub volatility: f64,
    pub drift: f64,
    pub dt: f64,
    pub init_value: f64,
    pub seed: u64,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            n_bars: 1000,
            n_assets: 10,
            volatility: 0.01,
            drift: 0.0,
            dt: 1.0,
            init_value: 1.0,
            seed: 42,
        }
    }
}

/// Build a universe whose prices follow independent geometric Brownian
/// motions. Timestamps are bar numbers `0..n_bars`; assets are named
/// `"0"`, `"1"`, … Every path starts at `init_value`.
pub fn make_randomwalk(params: &RandomWalkParams) -> Result<PriceMatrix, PriceMatrixError> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let step_drift = (params.drift - 0.5 * params.volatility * params.volatility) * params.dt;
    let step_vol = params.volatility * params.dt.sqrt();

    let columns = (0..params.n_assets)
        .map(|asset| {
            let mut column = Vec::with_capacity(params.n_bars);
            let mut log_price = params.init_value.ln();
            for bar in 0..params.n_bars {
                if bar > 0 {
                    log_price += step_drift + step_vol * standard_normal(&mut rng);
                }
                column.push(log_price.exp());
            }
            (asset.to_string(), column)
        })
        .collect();

    PriceMatrix::new((0..params.n_bars as i64).collect(), columns)
}

/// Box-Muller transform for a standard normal draw.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // 1 - U keeps u1 in (0, 1] so ln never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
