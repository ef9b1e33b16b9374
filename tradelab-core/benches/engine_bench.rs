//! Criterion benchmarks for TradeLab hot paths.
//!
//! Benchmarks:
//! 1. Full engine run, parallel vs sequential, across trade counts
//! 2. Single-trade valuation over long holding periods
//! 3. Portfolio aggregation over many overlapping trades

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tradelab_core::data::{make_randomwalk, RandomWalkParams};
use tradelab_core::domain::{PriceMatrix, Trade};
use tradelab_core::engine::{BacktestEngine, EngineConfig, TradeExecutor};
use tradelab_core::strategy::{RandomTrader, Strategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn universe(n_bars: usize, n_assets: usize) -> PriceMatrix {
    make_randomwalk(&RandomWalkParams {
        n_bars,
        n_assets,
        init_value: 100.0,
        ..RandomWalkParams::default()
    })
    .unwrap()
}

fn random_trades(matrix: &PriceMatrix, n_trades: usize, max_holding: usize) -> Vec<Trade> {
    RandomTrader {
        n_trades,
        max_holding,
        ..RandomTrader::default()
    }
    .propose(matrix)
}

// ── 1. Engine run ────────────────────────────────────────────────────

fn bench_engine_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_run");
    let matrix = universe(2520, 20);

    for &n_trades in &[100, 1_000, 10_000] {
        let trades = random_trades(&matrix, n_trades, 60);

        group.bench_with_input(BenchmarkId::new("parallel", n_trades), &n_trades, |b, _| {
            let engine = BacktestEngine::default();
            b.iter(|| engine.run(black_box(&matrix), black_box(&trades)));
        });

        group.bench_with_input(
            BenchmarkId::new("sequential", n_trades),
            &n_trades,
            |b, _| {
                let engine = BacktestEngine::new(EngineConfig::sequential());
                b.iter(|| engine.run(black_box(&matrix), black_box(&trades)));
            },
        );
    }

    group.finish();
}

// ── 2. Single-trade valuation ────────────────────────────────────────

fn bench_trade_valuation(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_valuation");
    let executor = TradeExecutor::default();

    for &n_bars in &[252, 2520, 25_200] {
        let matrix = universe(n_bars, 5);
        let basket = matrix
            .assets()
            .iter()
            .fold(Trade::new(0), |t, a| t.with_leg(a.clone(), 1.0));

        group.bench_with_input(BenchmarkId::new("5_leg_basket", n_bars), &n_bars, |b, _| {
            b.iter(|| executor.evaluate(black_box(&basket), black_box(&matrix)));
        });
    }

    group.finish();
}

// ── 3. Aggregation-heavy run ─────────────────────────────────────────

fn bench_overlapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let matrix = universe(1260, 10);
    let trades = random_trades(&matrix, 5_000, 500);
    let engine = BacktestEngine::new(EngineConfig::sequential());

    group.bench_function("5000_long_holds", |b| {
        b.iter(|| engine.run(black_box(&matrix), black_box(&trades)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_engine_run,
    bench_trade_valuation,
    bench_overlapping,
);
criterion_main!(benches);
