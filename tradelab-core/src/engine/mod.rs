//! Backtesting engine: validates trades, values them, aggregates the results.
//!
//! A run has three phases:
//!
//! 1. Validate every trade against the price matrix, collecting failures
//! 2. Value each valid trade (optionally in parallel with rayon)
//! 3. Merge valuations into the portfolio series and summary (sequential)

pub mod cancel;
pub mod cost;
pub mod executor;
pub mod result;
pub mod summary;

pub use cancel::CancelToken;
pub use cost::{BpsCost, CostModel, NoCost, PerUnitCost};
pub use executor::{ResolvedTrade, TradeExecutor};
pub use result::{PortfolioPoint, ResultSet};
pub use summary::Summary;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{PriceMatrix, Trade, TradeValuation};
use crate::error::{BacktestError, TradeFailure};
use crate::strategy::Strategy;

/// Engine settings. The engine itself holds no run state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Value trades on the rayon pool instead of the calling thread.
    pub parallel: bool,
    pub cost_model: Arc<dyn CostModel>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            cost_model: Arc::new(NoCost),
        }
    }
}

impl EngineConfig {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn with_cost_model(mut self, cost_model: Arc<dyn CostModel>) -> Self {
        self.cost_model = cost_model;
        self
    }
}

/// Stateless backtest orchestrator: safe to reuse for independent runs.
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: EngineConfig,
    executor: TradeExecutor,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Self {
        let executor = TradeExecutor::new(Arc::clone(&config.cost_model));
        Self { config, executor }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &TradeExecutor {
        &self.executor
    }

    /// Run a backtest over `trades`.
    ///
    /// Malformed trades are excluded and listed in [`ResultSet::failures`];
    /// the run only fails when no trade can be valued.
    pub fn run(&self, matrix: &PriceMatrix, trades: &[Trade]) -> Result<ResultSet, BacktestError> {
        self.run_with_cancel(matrix, trades, &CancelToken::new())
    }

    /// Ask `strategy` for trades, then run them.
    pub fn run_strategy(
        &self,
        matrix: &PriceMatrix,
        strategy: &dyn Strategy,
    ) -> Result<ResultSet, BacktestError> {
        let trades = strategy.propose(matrix);
        info!(
            strategy = strategy.name(),
            trades = trades.len(),
            "strategy proposed trades"
        );
        self.run(matrix, &trades)
    }

    /// Like [`run`](Self::run), checking `cancel` once per trade evaluation.
    pub fn run_with_cancel(
        &self,
        matrix: &PriceMatrix,
        trades: &[Trade],
        cancel: &CancelToken,
    ) -> Result<ResultSet, BacktestError> {
        info!(
            trades = trades.len(),
            assets = matrix.n_assets(),
            timestamps = matrix.len(),
            parallel = self.config.parallel,
            "starting backtest"
        );

        let evaluated = AtomicUsize::new(0);
        let evaluate = |(index, trade): (usize, &Trade)| -> Result<Result<TradeValuation, TradeFailure>, BacktestError> {
            if cancel.is_cancelled() {
                return Err(BacktestError::Cancelled {
                    evaluated: evaluated.load(Ordering::Relaxed),
                });
            }
            let outcome = self
                .executor
                .evaluate_indexed(index, trade, matrix)
                .map_err(|error| TradeFailure {
                    trade_index: index,
                    error,
                });
            evaluated.fetch_add(1, Ordering::Relaxed);
            Ok(outcome)
        };

        let outcomes: Vec<Result<TradeValuation, TradeFailure>> = if self.config.parallel {
            trades
                .par_iter()
                .enumerate()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            trades
                .iter()
                .enumerate()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut valuations = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(valuation) => {
                    debug!(
                        trade = valuation.trade_index,
                        open = valuation.open,
                        close = valuation.close,
                        pnl = valuation.pnl.value(),
                        exit = valuation.exit_reason.as_str(),
                        "valued trade"
                    );
                    valuations.push(valuation);
                }
                Err(failure) => {
                    warn!(trade = failure.trade_index, error = %failure.error, "excluding trade");
                    failures.push(failure);
                }
            }
        }

        if valuations.is_empty() {
            return Err(BacktestError::Empty { failures });
        }

        let result = ResultSet::aggregate(valuations, failures);
        info!(
            valued = result.summary.trade_count,
            failed = result.summary.failed_count,
            total_return = result.summary.total_return,
            total_pnl = result.summary.total_pnl,
            "backtest finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pnl;
    use crate::error::{InvalidTrade, TradeError};

    fn matrix() -> PriceMatrix {
        PriceMatrix::new(
            vec![1, 2, 3, 4],
            vec![
                ("A".into(), vec![10.0, 12.0, 9.0, 11.0]),
                ("B".into(), vec![f64::NAN, 4.0, 5.0, 3.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn collects_every_failure_and_keeps_valid_trades() {
        let trades = vec![
            Trade::single("Z", 1.0, 1),
            Trade::single("A", 2.0, 1).close_at(3),
            Trade::single("B", 1.0, 1),
            Trade::single("A", 1.0, 4).close_at(2),
        ];
        let rs = BacktestEngine::default().run(&matrix(), &trades).unwrap();

        assert_eq!(rs.valuations.len(), 1);
        assert_eq!(rs.valuations[0].trade_index, 1);
        assert_eq!(
            rs.failures.iter().map(|f| f.trade_index).collect::<Vec<_>>(),
            vec![0, 2, 3]
        );
        assert!(matches!(rs.failures[1].error, TradeError::MissingPrice { .. }));
        assert_eq!(
            rs.failures[2].error,
            TradeError::from(InvalidTrade::CloseBeforeOpen { open: 4, close: 2 })
        );
        assert_eq!(rs.summary.failed_count, 3);
    }

    #[test]
    fn all_invalid_is_empty_error_with_failures() {
        let trades = vec![Trade::new(1), Trade::single("A", 0.0, 1)];
        let err = BacktestEngine::default().run(&matrix(), &trades).unwrap_err();
        match err {
            BacktestError::Empty { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_trades_is_empty_error() {
        let err = BacktestEngine::default().run(&matrix(), &[]).unwrap_err();
        assert_eq!(err, BacktestError::Empty { failures: vec![] });
    }

    #[test]
    fn unsorted_input_keeps_input_order() {
        let trades = vec![
            Trade::single("A", 1.0, 3).close_at(4),
            Trade::single("A", 1.0, 1).close_at(2),
        ];
        let rs = BacktestEngine::default().run(&matrix(), &trades).unwrap();
        assert_eq!(rs.valuations[0].open, 3);
        assert_eq!(rs.valuations[1].open, 1);
        assert_eq!(
            rs.portfolio_series(),
            vec![(1, 0.0), (2, 2.0), (3, 0.0), (4, 2.0)]
        );
    }

    #[test]
    fn summary_scalars() {
        let trades = vec![
            Trade::single("A", 1.0, 1).close_at(2),  // +2
            Trade::single("A", 1.0, 2).close_at(3),  // -3
            Trade::single("B", -1.0, 2).close_at(4), // +1
            Trade::single("A", 1.0, 3),              // open: +2
        ];
        let rs = BacktestEngine::default().run(&matrix(), &trades).unwrap();
        let s = &rs.summary;
        assert_eq!(s.closed_count, 3);
        assert_eq!(s.open_count, 1);
        assert!((s.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.max_trade_loss, -3.0);
        assert_eq!(s.total_pnl, 2.0);
        assert_eq!(rs.valuations[3].pnl, Pnl::Unrealized(2.0));
        // At t=4 the short B and the open A trade are active.
        assert_eq!(s.total_return, 3.0);
    }

    #[test]
    fn cancelled_token_stops_run() {
        let token = CancelToken::new();
        token.cancel();
        let err = BacktestEngine::new(EngineConfig::sequential())
            .run_with_cancel(&matrix(), &[Trade::single("A", 1.0, 1)], &token)
            .unwrap_err();
        assert_eq!(err, BacktestError::Cancelled { evaluated: 0 });
    }

    #[test]
    fn cancelled_token_stops_parallel_run() {
        let token = CancelToken::new();
        token.cancel();
        let trades: Vec<Trade> = (0..64).map(|_| Trade::single("A", 1.0, 1)).collect();
        let err = BacktestEngine::default()
            .run_with_cancel(&matrix(), &trades, &token)
            .unwrap_err();
        match err {
            BacktestError::Cancelled { evaluated } => assert!(evaluated <= trades.len()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn identical_same_asset_trades_double_the_portfolio() {
        let single = BacktestEngine::default()
            .run(&matrix(), &[Trade::single("A", 1.0, 1).close_at(4)])
            .unwrap();
        assert_eq!(
            single.portfolio_series(),
            vec![(1, 0.0), (2, 2.0), (3, -1.0), (4, 1.0)]
        );

        let trade = Trade::single("A", 1.0, 1).close_at(4);
        let pair = BacktestEngine::default()
            .run(&matrix(), &[trade.clone(), trade])
            .unwrap();
        assert_eq!(
            pair.portfolio_series(),
            vec![(1, 0.0), (2, 4.0), (3, -2.0), (4, 2.0)]
        );
        for (p, s) in pair.portfolio.iter().zip(&single.portfolio) {
            assert_eq!(p.net_exposure, 2.0 * s.net_exposure);
        }
        assert_eq!(pair.summary.total_return, 2.0 * single.summary.total_return);
    }
}
