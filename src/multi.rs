//! Running several strategies on the same market.
//!
//! `MultiBacktest` owns one independent `Backtest` per signal source. Runs
//! share the market data and the configuration but no state, so with the
//! `parallel` feature they execute on the rayon pool.

use std::cmp::Ordering;
use std::fmt::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::engine::{Backtest, BacktestConfig, MarketData, SignalRegistry, SignalSource};
use crate::metrics::PerformanceMetrics;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One row of a strategy comparison.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyComparison {
    pub strategy: String,
    pub total_return_percent: f64,
    pub annualized_return: f64,
    pub max_drawdown_percent: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    #[cfg_attr(feature = "serde", serde(with = "crate::metrics::ratio"))]
    pub profit_factor: f64,
    pub total_trades: usize,
}

impl StrategyComparison {
    fn new(strategy: &str, metrics: &PerformanceMetrics) -> Self {
        Self {
            strategy: strategy.to_string(),
            total_return_percent: metrics.total_return_percent,
            annualized_return: metrics.annualized_return,
            max_drawdown_percent: metrics.max_drawdown_percent,
            sharpe_ratio: metrics.sharpe_ratio,
            win_rate: metrics.win_rate,
            profit_factor: metrics.profit_factor,
            total_trades: metrics.total_trades,
        }
    }
}

/// Independent backtests of several strategies.
#[derive(Debug, Clone)]
pub struct MultiBacktest {
    config: BacktestConfig,
    backtests: Vec<Backtest>,
    results: Vec<(String, PerformanceMetrics)>,
}

impl MultiBacktest {
    /// Creates one backtest per source, in the given order.
    pub fn new(sources: Vec<Arc<dyn SignalSource>>, config: BacktestConfig) -> Self {
        Self {
            config,
            backtests: sources.into_iter().map(|source| Backtest::new(source, config)).collect(),
            results: Vec::new(),
        }
    }

    /// Creates one backtest per registered name.
    ///
    /// Names missing from `registry` are logged and skipped.
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use daybt::prelude::*;
    ///
    /// struct Idle;
    ///
    /// impl SignalSource for Idle {
    ///     fn name(&self) -> &str {
    ///         "idle"
    ///     }
    ///
    ///     fn generate_signal(&self, _history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
    ///         Ok(None)
    ///     }
    /// }
    ///
    /// let registry = SignalRegistry::new().with(Arc::new(Idle));
    /// let multi = MultiBacktest::from_registry(&registry, &["idle", "unknown"], BacktestConfig::default());
    /// assert_eq!(multi.strategies().collect::<Vec<_>>(), vec!["idle"]);
    /// ```
    pub fn from_registry(registry: &SignalRegistry, names: &[&str], config: BacktestConfig) -> Self {
        let sources = names
            .iter()
            .filter_map(|name| match registry.get(name) {
                Ok(source) => Some(source),
                Err(e) => {
                    error!(strategy = name, error = %e, "strategy skipped");
                    None
                }
            })
            .collect();
        Self::new(sources, config)
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Strategy names in run order.
    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.backtests.iter().map(Backtest::strategy_name)
    }

    pub fn backtests(&self) -> &[Backtest] {
        &self.backtests
    }

    /// The backtest of `strategy`, once created.
    pub fn get(&self, strategy: &str) -> Option<&Backtest> {
        self.backtests.iter().find(|bt| bt.strategy_name() == strategy)
    }

    /// Runs every strategy over `data` within `[start, end]`.
    ///
    /// # Returns
    /// `(strategy, metrics)` pairs in strategy order.
    pub fn run(
        &mut self,
        data: &MarketData,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> &[(String, PerformanceMetrics)] {
        info!(strategies = self.backtests.len(), "multi-strategy run started");

        #[cfg(feature = "parallel")]
        let iter = self.backtests.par_iter_mut();
        #[cfg(not(feature = "parallel"))]
        let iter = self.backtests.iter_mut();

        self.results = iter
            .map(|backtest| {
                let metrics = backtest.run_between(data, start, end);
                (backtest.strategy_name().to_string(), metrics)
            })
            .collect();

        &self.results
    }

    /// Results of the last run, in strategy order.
    pub fn results(&self) -> &[(String, PerformanceMetrics)] {
        &self.results
    }

    /// Results ranked by total return, best first. Ties keep strategy order.
    pub fn compare(&self) -> Vec<StrategyComparison> {
        let mut rows = self
            .results
            .iter()
            .map(|(strategy, metrics)| StrategyComparison::new(strategy, metrics))
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            b.total_return_percent
                .partial_cmp(&a.total_return_percent)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    /// Text table of [`MultiBacktest::compare`].
    pub fn comparison_report(&self) -> String {
        let rows = self.compare();
        let width = rows.iter().map(|r| r.strategy.len()).max().unwrap_or(0).max(8);

        let mut report = String::new();
        let _ = writeln!(report, "=== Strategy Comparison ===");
        let _ = writeln!(
            report,
            "{:<width$} {:>10} {:>10} {:>9} {:>7} {:>8} {:>8} {:>6}",
            "Strategy", "Return %", "Annual %", "MDD %", "Sharpe", "Win %", "PF", "Trades"
        );
        for row in rows {
            let _ = writeln!(
                report,
                "{:<width$} {:>10.2} {:>10.2} {:>9.2} {:>7.2} {:>8.1} {:>8.2} {:>6}",
                row.strategy,
                row.total_return_percent,
                row.annualized_return,
                row.max_drawdown_percent,
                row.sharpe_ratio,
                row.win_rate,
                row.profit_factor,
                row.total_trades
            );
        }
        report
    }
}
