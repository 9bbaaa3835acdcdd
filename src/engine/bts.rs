use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::engine::*;
use crate::errors::Result;
use crate::metrics::PerformanceMetrics;

/// Bars of history an asset needs, the current one included, before its
/// signal source is consulted.
pub const MIN_HISTORY_BARS: usize = 10;

/// Daily backtesting engine for one signal source over many assets.
///
/// Every simulated day runs exits before entries:
/// 1. open positions with a bar on the day are marked to its close, then
///    closed at their stop-loss (`low <= stop`) or take-profit
///    (`high >= target`) level, stop-loss first;
/// 2. every asset without a position, with a bar on the day and at least
///    [`MIN_HISTORY_BARS`] bars of history, is offered to the signal source;
///    buy signals open at the day's close;
/// 3. one [`EquitySnapshot`] is recorded.
///
/// Positions still open after the last day are closed at their mark price.
#[derive(Clone)]
pub struct Backtest {
    config: BacktestConfig,
    source: Arc<dyn SignalSource>,
    ledger: Ledger,
    journal: TradeJournal,
    tracker: EquityTracker,
    metrics: PerformanceMetrics,
}

impl std::fmt::Debug for Backtest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtest")
            .field("strategy", &self.source.name())
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("trades", &self.journal.len())
            .field("snapshots", &self.tracker.len())
            .finish()
    }
}

impl Backtest {
    /// Creates a new backtest for `source`.
    ///
    /// ### Example
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
    /// let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let data = MarketData::new()
    ///     .with_asset("A", generate_series(1, 30, 100.0, start).unwrap())
    ///     .unwrap();
    ///
    /// let mut backtest = Backtest::new(Arc::new(Idle), BacktestConfig::default());
    /// let metrics = backtest.run(&data);
    /// assert_eq!(metrics.total_trades, 0);
    /// assert_eq!(metrics.total_return, 0.0);
    /// assert_eq!(backtest.equity_curve().len(), 30);
    /// ```
    pub fn new(source: Arc<dyn SignalSource>, config: BacktestConfig) -> Self {
        Self {
            ledger: Ledger::new(config, source.name()),
            journal: TradeJournal::default(),
            tracker: EquityTracker::default(),
            metrics: PerformanceMetrics::default(),
            config,
            source,
        }
    }

    /// Creates a new backtest for the source registered under `name`.
    ///
    /// ### Returns
    /// [`crate::errors::Error::UnknownStrategy`] when `name` is not registered.
    pub fn from_registry(registry: &SignalRegistry, name: &str, config: BacktestConfig) -> Result<Self> {
        Ok(Self::new(registry.get(name)?, config))
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &str {
        self.source.name()
    }

    /// Cash and positions; empty once a run has finished.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Closed trades in close order.
    pub fn trades(&self) -> &[Trade] {
        self.journal.trades()
    }

    /// One snapshot per simulated day.
    pub fn equity_curve(&self) -> &[EquitySnapshot] {
        self.tracker.snapshots()
    }

    /// Metrics of the last run.
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Replays every date of `data`.
    pub fn run(&mut self, data: &MarketData) -> PerformanceMetrics {
        self.run_between(data, None, None)
    }

    /// Replays the dates of `data` within `[start, end]`.
    ///
    /// The state of a previous run is discarded first. Empty data or an
    /// empty date range yields default metrics.
    pub fn run_between(
        &mut self,
        data: &MarketData,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PerformanceMetrics {
        self.reset();

        if data.is_empty() {
            error!(strategy = self.strategy_name(), "no market data to backtest");
            return self.metrics.clone();
        }

        let dates = data.dates(start, end);
        let Some(&last_date) = dates.last() else {
            error!(strategy = self.strategy_name(), ?start, ?end, "no trading dates in range");
            return self.metrics.clone();
        };

        let started = Instant::now();
        info!(
            strategy = self.strategy_name(),
            assets = data.len(),
            days = dates.len(),
            "backtest started"
        );

        for &date in &dates {
            self.process_day(data, date);
        }
        self.close_all(last_date);

        self.metrics = PerformanceMetrics::from(&*self);

        info!(
            strategy = self.strategy_name(),
            trades = self.journal.len(),
            total_return_percent = self.metrics.total_return_percent,
            elapsed = ?started.elapsed(),
            "backtest finished"
        );
        self.metrics.clone()
    }

    fn process_day(&mut self, data: &MarketData, date: NaiveDate) {
        let mut exits = Vec::new();
        let mut marks = Vec::new();
        for position in self.ledger.positions() {
            let Some(bar) = data.get(position.asset()).and_then(|series| series.bar_on(date)) else {
                continue;
            };
            marks.push((position.asset().to_string(), bar.close()));
            if let Some((price, reason)) = exit_trigger(&self.config, position, bar) {
                exits.push((position.asset().to_string(), price, reason));
            }
        }

        for (asset, close) in marks {
            self.ledger.mark(&asset, close);
        }
        for (asset, price, reason) in exits {
            if let Some(trade) = self.ledger.close(&asset, price, date, reason) {
                self.journal.record(trade);
            }
        }

        let candidates = data
            .iter()
            .filter(|(asset, _)| !self.ledger.is_open(asset))
            .filter_map(|(asset, series)| {
                let bar = series.bar_on(date)?;
                let history = series.window_until(date);
                (history.len() >= MIN_HISTORY_BARS).then_some((asset, bar, history))
            })
            .collect::<Vec<_>>();

        let signals = self.collect_signals(date, &candidates);
        for ((asset, bar, _), signal) in candidates.iter().zip(signals) {
            match signal {
                Some(signal) if signal.is_buy() => {
                    self.ledger.open(asset, &signal, bar.close(), date);
                }
                _ => {}
            }
        }

        self.tracker.record(EquitySnapshot::from((date, &self.ledger)));
    }

    /// Evaluates the signal source for each candidate, keeping candidate order.
    fn collect_signals(&self, date: NaiveDate, candidates: &[(&str, &Bar, &[Bar])]) -> Vec<Option<Signal>> {
        let evaluate = |(asset, _, history): &(&str, &Bar, &[Bar])| match self.source.generate_signal(history, asset) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(%date, asset, error = %e, "signal generation failed");
                None
            }
        };

        #[cfg(feature = "parallel")]
        let signals = {
            use rayon::prelude::*;
            candidates.par_iter().map(evaluate).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let signals = candidates.iter().map(evaluate).collect();

        signals
    }

    /// Closes every open position at its mark price.
    fn close_all(&mut self, date: NaiveDate) {
        let open = self
            .ledger
            .positions()
            .map(|p| (p.asset().to_string(), p.mark_price()))
            .collect::<Vec<_>>();

        for (asset, price) in open {
            if let Some(trade) = self.ledger.close(&asset, price, date, ExitReason::EndOfRun) {
                self.journal.record(trade);
            }
        }
    }

    /// Results of the last run.
    pub fn report(&self) -> BacktestReport {
        BacktestReport {
            strategy: self.strategy_name().to_string(),
            config: self.config,
            metrics: self.metrics.clone(),
            trades: self.journal.trades().to_vec(),
            equity_curve: self.tracker.snapshots().to_vec(),
        }
    }

    /// Text report of the last run, recomputed from its trades and snapshots.
    pub fn generate_report(&self) -> String {
        PerformanceMetrics::from(self).to_string()
    }

    /// Restores the initial capital and drops trades, snapshots and metrics.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.journal.clear();
        self.tracker.clear();
        self.metrics = PerformanceMetrics::default();
    }
}

/// Runs `source` once with the default costs and limits.
///
/// ### Arguments
/// * `initial_capital` - Starting cash; must be positive.
/// * `start`, `end` - Inclusive date bounds, unbounded when `None`.
///
/// ### Returns
/// The metrics and the text report of the run.
pub fn run_backtest(
    source: Arc<dyn SignalSource>,
    data: &MarketData,
    initial_capital: f64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(PerformanceMetrics, String)> {
    let config = BacktestConfig::builder().initial_capital(initial_capital).build()?;
    let mut backtest = Backtest::new(source, config);
    let metrics = backtest.run_between(data, start, end);
    Ok((metrics, backtest.generate_report()))
}

/// Exit level and reason hit by `bar`, stop-loss first.
fn exit_trigger(config: &BacktestConfig, position: &Position, bar: &Bar) -> Option<(f64, ExitReason)> {
    if config.use_stop_loss()
        && let Some(stop) = position.stop_loss()
        && bar.low() <= stop
    {
        return Some((stop, ExitReason::StopLoss));
    }
    if config.use_take_profit()
        && let Some(target) = position.take_profit()
        && bar.high() >= target
    {
        return Some((target, ExitReason::TakeProfit));
    }
    None
}

/// Everything a finished run produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub strategy: String,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquitySnapshot>,
}

#[cfg(feature = "serde")]
impl BacktestReport {
    /// Pretty-printed JSON. Infinite ratios are written as `"inf"`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes [`BacktestReport::to_json`] to `path`.
    pub fn write_json(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{generate_series, testing::*};

    fn frictionless(capital: f64) -> BacktestConfig {
        BacktestConfig::builder()
            .initial_capital(capital)
            .commission_rate(0.0)
            .slippage_rate(0.0)
            .max_position_size(0.1)
            .build()
            .unwrap()
    }

    fn single(asset: &str, series: PriceSeries) -> MarketData {
        MarketData::new().with_asset(asset, series).unwrap()
    }

    fn random_market() -> MarketData {
        let mut data = MarketData::new();
        for (i, asset) in ["A", "B", "C", "D"].into_iter().enumerate() {
            // later assets start later to leave gaps in the date union
            let series = generate_series(i as u64 + 1, 120, 100.0 * (i + 1) as f64, day(5 * i as i64)).unwrap();
            data.add(asset, series).unwrap();
        }
        data
    }

    #[test]
    fn scenario_idle_source() {
        let data = single("A", generate_series(3, 20, 50.0, day(0)).unwrap());
        let mut backtest = Backtest::new(Arc::new(Idle), frictionless(1_000_000.0));
        let metrics = backtest.run(&data);

        assert_eq!(backtest.equity_curve().len(), 20);
        assert!(backtest.equity_curve().iter().all(|s| s.equity == 1_000_000.0));
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn scenario_stop_loss_exit() {
        let mut quotes = vec![(10_000.0, 10_000.0, 10_000.0); 10];
        quotes.push((9_800.0, 9_900.0, 9_650.0));
        let data = single("A", series_from(0, quotes));

        let signal = Signal::buy(10_000.0).with_stop_loss(9_700.0).with_take_profit(11_000.0);
        let source = Scripted::default().at("A", day(9), signal);
        let config = BacktestConfig::builder().slippage_rate(0.001).build().unwrap();
        let mut backtest = Backtest::new(Arc::new(source), config);
        backtest.run(&data);

        let trades = backtest.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(trades[0].exit_date, day(10));
        assert!((trades[0].exit_price - 9_700.0 * 0.999).abs() < 1e-9);
        assert!(trades[0].is_loss());
    }

    #[test]
    fn scenario_take_profit_exit() {
        let mut quotes = vec![(100.0, 100.0, 100.0); 10];
        quotes.push((104.0, 106.0, 99.0));
        quotes.push((110.0, 112.0, 103.0));
        let data = single("A", series_from(0, quotes));

        let signal = Signal::buy(100.0).with_stop_loss(95.0).with_take_profit(108.0);
        let source = Scripted::default().at("A", day(9), signal);
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        backtest.run(&data);

        let trades = backtest.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(trades[0].exit_date, day(11));
        assert_eq!(trades[0].exit_price, 108.0);
        assert_eq!(trades[0].holding_days, 2);
        assert_eq!(trades[0].pnl, 100.0 * 8.0);
    }

    #[test]
    fn scenario_stop_loss_wins_ties() {
        let mut quotes = vec![(100.0, 100.0, 100.0); 10];
        quotes.push((100.0, 120.0, 80.0));
        let data = single("A", series_from(0, quotes));

        let signal = Signal::buy(100.0).with_stop_loss(90.0).with_take_profit(110.0);
        let source = Scripted::default().at("A", day(9), signal);
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        backtest.run(&data);

        assert_eq!(backtest.trades()[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(backtest.trades()[0].exit_price, 90.0);
    }

    #[test]
    fn scenario_exit_rules_disabled() {
        let mut quotes = vec![(100.0, 100.0, 100.0); 10];
        quotes.push((100.0, 120.0, 80.0));
        let data = single("A", series_from(0, quotes));

        let signal = Signal::buy(100.0).with_stop_loss(90.0).with_take_profit(110.0);
        let source = Scripted::default().at("A", day(9), signal);
        let config = BacktestConfig::builder()
            .use_stop_loss(false)
            .use_take_profit(false)
            .build()
            .unwrap();
        let mut backtest = Backtest::new(Arc::new(source), config);
        backtest.run(&data);

        assert_eq!(backtest.trades().len(), 1);
        assert_eq!(backtest.trades()[0].exit_reason, ExitReason::EndOfRun);
    }

    #[test]
    fn scenario_position_sizing() {
        let data = single("A", flat_series(&[10_000.0; 12]));
        let source = Scripted::default().at("A", day(9), Signal::buy(10_000.0));
        let mut backtest = Backtest::new(Arc::new(source), frictionless(1_000_000.0));
        backtest.run(&data);

        let snapshot = backtest.equity_curve()[9];
        assert_eq!(snapshot.cash, 900_000.0);
        assert_eq!(snapshot.position_value, 100_000.0);
        assert_eq!(snapshot.open_positions, 1);
        assert_eq!(backtest.trades()[0].quantity, 10);
    }

    #[test]
    fn scenario_position_limit() {
        let data = MarketData::new()
            .with_asset("A", flat_series(&[100.0; 12]))
            .unwrap()
            .with_asset("B", flat_series(&[100.0; 12]))
            .unwrap();
        let source = Scripted::default()
            .at("A", day(9), Signal::buy(100.0))
            .at("B", day(9), Signal::buy(100.0));
        let config = BacktestConfig::builder().max_positions(1).build().unwrap();
        let mut backtest = Backtest::new(Arc::new(source), config);
        backtest.run(&data);

        assert_eq!(backtest.trades().len(), 1);
        assert_eq!(backtest.trades()[0].asset, "A");
        assert!(backtest.equity_curve().iter().all(|s| s.open_positions <= 1));
    }

    #[test]
    fn scenario_buy_on_final_day_is_closed() {
        let data = single("A", flat_series(&[100.0; 10]));
        let source = Scripted::default().at("A", day(9), Signal::buy(100.0).with_name("Alpha"));
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        let metrics = backtest.run(&data);

        let trades = backtest.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfRun);
        assert_eq!(trades[0].entry_date, day(9));
        assert_eq!(trades[0].exit_date, day(9));
        assert_eq!(trades[0].holding_days, 1);
        assert_eq!(trades[0].name, "Alpha");
        assert_eq!(metrics.total_trades, 1);
        assert!(backtest.ledger().is_empty());
    }

    #[test]
    fn scenario_short_history_is_skipped() {
        let data = single("A", flat_series(&[100.0; 9]));
        let source = FailsOn("none");
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        let metrics = backtest.run(&data);
        assert_eq!(metrics.total_trades, 0);
    }

    #[test]
    fn scenario_failing_source_skips_asset() {
        let data = MarketData::new()
            .with_asset("BAD", flat_series(&[100.0; 12]))
            .unwrap()
            .with_asset("GOOD", flat_series(&[100.0; 12]))
            .unwrap();
        let mut backtest = Backtest::new(Arc::new(FailsOn("BAD")), frictionless(100_000.0));
        backtest.run(&data);

        assert_eq!(backtest.trades().len(), 1);
        assert_eq!(backtest.trades()[0].asset, "GOOD");
    }

    #[test]
    fn scenario_missing_bar_keeps_mark() {
        let a = flat_series(&[100.0; 12]);
        // B trades on days 0..=9 and 11, not on day 10
        let mut quotes = vec![(50.0, 50.0, 50.0); 10];
        quotes.push((40.0, 40.0, 40.0));
        let mut bars = series_from(0, quotes).bars().to_vec();
        bars[10] = Bar::new(day(11), 40.0, 40.0, 40.0, 40.0, 1_000.0).unwrap();
        let b = PriceSeries::new(bars).unwrap();

        let data = MarketData::new().with_asset("A", a).unwrap().with_asset("B", b).unwrap();
        let source = Scripted::default().at("B", day(9), Signal::buy(50.0));
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        backtest.run(&data);

        let curve = backtest.equity_curve();
        assert_eq!(curve.len(), 12);
        // 200 shares; no bar on day 10, still valued at the day 9 close
        assert_eq!(curve[9].position_value, 10_000.0);
        assert_eq!(curve[10].position_value, 10_000.0);
        assert_eq!(curve[11].position_value, 8_000.0);
        assert_eq!(backtest.trades()[0].exit_price, 40.0);
        assert_eq!(backtest.trades()[0].exit_date, day(11));
    }

    #[test]
    fn scenario_missing_bar_blocks_entry() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // buys B the second time it is asked about B
        struct SecondCall(AtomicUsize);
        impl SignalSource for SecondCall {
            fn name(&self) -> &str {
                "second-call"
            }

            fn generate_signal(&self, history: &[Bar], asset: &str) -> Result<Option<Signal>> {
                if asset != "B" {
                    return Ok(None);
                }
                let calls = self.0.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(history.last().filter(|_| calls == 2).map(|bar| Signal::buy(bar.close())))
            }
        }

        let a = flat_series(&[100.0; 13]);
        // B trades on days 0..=9 and 11, not on day 10
        let mut bars = flat_series(&[50.0; 12]).bars().to_vec();
        bars.remove(10);
        let b = PriceSeries::new(bars).unwrap();

        let data = MarketData::new().with_asset("A", a).unwrap().with_asset("B", b).unwrap();
        let mut backtest = Backtest::new(Arc::new(SecondCall(AtomicUsize::new(0))), frictionless(100_000.0));
        backtest.run(&data);

        let curve = backtest.equity_curve();
        assert_eq!(curve.len(), 13);
        assert_eq!(curve[9].open_positions, 0);
        assert_eq!(curve[10].open_positions, 0);
        assert_eq!(curve[11].open_positions, 1);

        let trades = backtest.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_date, day(11));
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfRun);
    }

    #[test]
    fn scenario_bounded_run() {
        let data = single("A", flat_series(&[100.0; 30]));
        let mut backtest = Backtest::new(Arc::new(Idle), frictionless(100_000.0));
        let metrics = backtest.run_between(&data, Some(day(5)), Some(day(14)));

        assert_eq!(backtest.equity_curve().len(), 10);
        assert_eq!(metrics.start_date, Some(day(5)));
        assert_eq!(metrics.end_date, Some(day(14)));

        let metrics = backtest.run_between(&data, Some(day(40)), None);
        assert_eq!(metrics, PerformanceMetrics::default());
        assert!(backtest.equity_curve().is_empty());
    }

    #[test]
    fn scenario_empty_market() {
        let mut backtest = Backtest::new(Arc::new(Idle), BacktestConfig::default());
        assert_eq!(backtest.run(&MarketData::new()), PerformanceMetrics::default());
    }

    #[test]
    fn scenario_from_registry() {
        let registry = SignalRegistry::new().with(Arc::new(Idle));
        let backtest = Backtest::from_registry(&registry, "idle", BacktestConfig::default()).unwrap();
        assert_eq!(backtest.strategy_name(), "idle");
        assert!(Backtest::from_registry(&registry, "missing", BacktestConfig::default()).is_err());
    }

    #[test]
    fn moving_average_run_invariants() {
        let data = random_market();
        let config = BacktestConfig::builder().max_positions(3).build().unwrap();
        let mut backtest = Backtest::new(Arc::new(SmaCross::new(3, 8)), config);
        let metrics = backtest.run(&data);

        let curve = backtest.equity_curve();
        assert_eq!(curve.len(), data.dates(None, None).len());
        for snapshot in curve {
            assert!((snapshot.equity - (snapshot.cash + snapshot.position_value)).abs() < 1e-6);
            assert!(snapshot.open_positions <= 3);
            assert!(snapshot.cash >= 0.0);
        }
        assert!(backtest.trades().iter().all(|t| t.holding_days >= 1));
        assert!(backtest.trades().iter().all(|t| t.strategy == "sma-3-8"));
        assert!(backtest.ledger().is_empty());

        assert_eq!(metrics, PerformanceMetrics::calculate(curve, backtest.trades()));
        assert_eq!(&metrics, backtest.metrics());
    }

    #[test]
    fn moving_average_run_is_deterministic() {
        let data = random_market();
        let mut first = Backtest::new(Arc::new(SmaCross::new(3, 8)), BacktestConfig::default());
        let mut second = first.clone();

        let metrics = first.run(&data);
        assert_eq!(metrics, second.run(&data));
        assert_eq!(first.trades(), second.trades());
        assert_eq!(first.equity_curve(), second.equity_curve());

        // rerunning the same engine starts from scratch
        assert_eq!(metrics, first.run(&data));
        assert_eq!(first.trades(), second.trades());
    }

    #[test]
    fn generate_report_matches_metrics() {
        let data = random_market();
        let mut backtest = Backtest::new(Arc::new(SmaCross::new(3, 8)), BacktestConfig::default());
        let metrics = backtest.run(&data);

        assert_eq!(backtest.generate_report(), metrics.to_string());
        let report = backtest.report();
        assert_eq!(report.strategy, "sma-3-8");
        assert_eq!(report.trades.len(), metrics.total_trades);
        assert_eq!(report.equity_curve.len(), metrics.trading_days);

        backtest.reset();
        assert!(backtest.trades().is_empty());
        assert_eq!(backtest.ledger().cash(), BacktestConfig::default().initial_capital());
    }

    #[test]
    fn run_backtest_helper() {
        let data = random_market();
        let (metrics, report) = run_backtest(Arc::new(SmaCross::new(3, 8)), &data, 5_000_000.0, None, Some(day(60))).unwrap();

        let config = BacktestConfig::builder().initial_capital(5_000_000.0).build().unwrap();
        let mut backtest = Backtest::new(Arc::new(SmaCross::new(3, 8)), config);
        assert_eq!(backtest.run_between(&data, None, Some(day(60))), metrics);
        assert_eq!(report, metrics.to_string());

        assert!(run_backtest(Arc::new(Idle), &data, 0.0, None, None).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn report_to_json() {
        let data = single("A", flat_series(&[100.0; 12]));
        let source = Scripted::default().at("A", day(9), Signal::buy(100.0));
        let mut backtest = Backtest::new(Arc::new(source), frictionless(100_000.0));
        backtest.run(&data);

        let json = backtest.report().to_json().unwrap();
        let value = serde_json::from_str::<serde_json::Value>(&json).unwrap();
        assert_eq!(value["strategy"], "scripted");
        assert_eq!(value["trades"].as_array().unwrap().len(), 1);
        assert_eq!(value["equity_curve"].as_array().unwrap().len(), 12);
        assert_eq!(serde_json::from_str::<BacktestReport>(&json).unwrap(), backtest.report());
    }
}
