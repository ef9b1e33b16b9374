//! Price data construction: multi-series alignment and synthetic universes.

pub mod align;
pub mod randomwalk;

pub use align::align_series;
pub use randomwalk::{make_randomwalk, RandomWalkParams};
