//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate:
//! - Total and annualized return
//! - Max drawdown (amount, fraction and duration)
//! - Sharpe, Sortino and Calmar ratios
//! - Profit factor, win rate and per-trade statistics
//!
//! The free functions work on raw fractions (`0.05` for 5%). Only
//! [`PerformanceMetrics`] scales some fields by 100 for display, and ratios
//! are always derived from the raw fractions.

use std::fmt;

use chrono::NaiveDate;

use crate::engine::{Backtest, EquitySnapshot, Trade};

/// Trading days per year used to annualize daily figures.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annual risk-free rate used by the Sharpe and Sortino ratios.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Simple returns `e[t] / e[t-1] - 1`, one less than the observations.
pub fn simple_returns(equity: &[f64]) -> Vec<f64> {
    equity.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Arithmetic mean, `0.0` when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` denominator), `None` below two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// `(last - first) / first`, `0.0` below two observations or from zero.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if equity.len() >= 2 && first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

/// `(1 + total_return)^(252 / periods) - 1`, `0.0` without periods.
pub fn annualized_return(total_return: f64, periods: usize) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / periods as f64) - 1.0
}

/// Largest decline of equity from its running peak.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Drawdown {
    /// Absolute decline.
    pub amount: f64,
    /// Decline as a fraction of the peak.
    pub fraction: f64,
    /// Calendar days from the peak to the trough.
    pub duration_days: i64,
    pub peak_index: usize,
    pub trough_index: usize,
}

/// Computes the maximum drawdown of an equity curve.
///
/// The trough is the first observation with the lowest `equity - peak`;
/// the peak is the latest observation before it where equity equalled the
/// running maximum.
///
/// ### Example
/// ```rust
/// use daybt::prelude::*;
/// use chrono::{Duration, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let curve = [100.0, 110.0, 90.0, 120.0]
///     .iter()
///     .enumerate()
///     .map(|(i, equity)| EquitySnapshot::new(start + Duration::days(i as i64), *equity, 0.0, 0))
///     .collect::<Vec<_>>();
///
/// let drawdown = max_drawdown(&curve);
/// assert_eq!(drawdown.amount, 20.0);
/// assert_eq!(drawdown.fraction, 20.0 / 110.0);
/// assert_eq!((drawdown.peak_index, drawdown.trough_index), (1, 2));
/// ```
pub fn max_drawdown(curve: &[EquitySnapshot]) -> Drawdown {
    let Some(first) = curve.first() else {
        return Drawdown::default();
    };
    if curve.len() < 2 {
        return Drawdown::default();
    }

    let mut peak = first.equity;
    let mut peak_index = 0;
    let mut worst = Drawdown::default();
    let mut worst_drawdown = 0.0;
    let mut worst_peak = peak;

    for (idx, snapshot) in curve.iter().enumerate() {
        if snapshot.equity >= peak {
            peak = snapshot.equity;
            peak_index = idx;
        }
        let drawdown = snapshot.equity - peak;
        if drawdown < worst_drawdown {
            worst_drawdown = drawdown;
            worst_peak = peak;
            worst.peak_index = peak_index;
            worst.trough_index = idx;
        }
    }

    worst.amount = worst_drawdown.abs();
    worst.fraction = if worst_peak != 0.0 {
        (worst_drawdown / worst_peak).abs()
    } else {
        0.0
    };
    worst.duration_days = (curve[worst.trough_index].date - curve[worst.peak_index].date).num_days();
    worst
}

fn excess_returns(returns: &[f64], risk_free_rate: f64) -> Vec<f64> {
    let daily_rate = risk_free_rate / TRADING_DAYS_PER_YEAR;
    returns.iter().map(|r| r - daily_rate).collect()
}

/// Annualized Sharpe ratio of daily returns.
///
/// `0.0` below two returns or when returns do not vary.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    match std_dev(returns) {
        Some(std) if std != 0.0 => {}
        _ => return 0.0,
    }

    let excess = excess_returns(returns, risk_free_rate);
    match std_dev(&excess) {
        Some(std) if std != 0.0 => TRADING_DAYS_PER_YEAR.sqrt() * mean(&excess) / std,
        _ => 0.0,
    }
}

/// Annualized Sortino ratio: Sharpe numerator over the deviation of the
/// negative excess returns only.
///
/// With no negative excess return, `+∞` when the mean excess return is
/// positive and `0.0` otherwise. A downside whose deviation is undefined or
/// zero gives `0.0`.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let excess = excess_returns(returns, risk_free_rate);
    let mean_excess = mean(&excess);
    let downside = excess.iter().copied().filter(|r| *r < 0.0).collect::<Vec<_>>();

    if downside.is_empty() {
        return if mean_excess > 0.0 { f64::INFINITY } else { 0.0 };
    }
    match std_dev(&downside) {
        Some(std) if std != 0.0 => TRADING_DAYS_PER_YEAR.sqrt() * mean_excess / std,
        _ => 0.0,
    }
}

/// Annualized return over max drawdown, both raw fractions.
pub fn calmar_ratio(annualized_return: f64, max_drawdown_fraction: f64) -> f64 {
    if max_drawdown_fraction == 0.0 {
        return if annualized_return > 0.0 { f64::INFINITY } else { 0.0 };
    }
    annualized_return / max_drawdown_fraction.abs()
}

/// Gross profit over gross loss.
///
/// `+∞` with profits and no loss, `0.0` with neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let total_profit = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum::<f64>();
    let total_loss = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl.abs()).sum::<f64>();

    if total_loss == 0.0 {
        return if total_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    total_profit / total_loss
}

/// Fraction of trades with a positive P&L.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_win()).count() as f64 / trades.len() as f64
}

/// Per-trade averages and extremes. Each field is `0.0` when its subset is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeStats {
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub avg_profit_percent: f64,
    pub avg_loss_percent: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_trade: f64,
    pub avg_holding_days: f64,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let select = |keep: fn(&Trade) -> bool, value: fn(&Trade) -> f64| {
            trades.iter().filter(|t| keep(t)).map(value).collect::<Vec<_>>()
        };

        let profits = select(|t| t.pnl > 0.0, |t| t.pnl);
        let losses = select(|t| t.pnl < 0.0, |t| t.pnl);
        let profit_percents = select(|t| t.pnl_percent > 0.0, |t| t.pnl_percent);
        let loss_percents = select(|t| t.pnl_percent < 0.0, |t| t.pnl_percent);
        let pnls = select(|_| true, |t| t.pnl);
        let holding_days = select(|_| true, |t| t.holding_days as f64);

        Self {
            avg_profit: mean(&profits),
            avg_loss: mean(&losses),
            avg_profit_percent: mean(&profit_percents),
            avg_loss_percent: mean(&loss_percents),
            best_trade: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: pnls.iter().copied().fold(f64::INFINITY, f64::min),
            avg_trade: mean(&pnls),
            avg_holding_days: mean(&holding_days),
        }
    }
}

/// Performance of one run, derived once from its equity curve and trades.
///
/// Fields suffixed `_percent`, plus `annualized_return`, `win_rate` and
/// `std_returns`, are scaled by 100.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    // returns
    pub total_return: f64,
    pub total_return_percent: f64,
    pub annualized_return: f64,

    // trades
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    // p&l
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub avg_profit_percent: f64,
    pub avg_loss_percent: f64,
    #[cfg_attr(feature = "serde", serde(with = "ratio"))]
    pub profit_factor: f64,
    pub avg_holding_days: f64,

    // risk
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub max_drawdown_duration: i64,
    pub sharpe_ratio: f64,
    #[cfg_attr(feature = "serde", serde(with = "ratio"))]
    pub sortino_ratio: f64,
    #[cfg_attr(feature = "serde", serde(with = "ratio"))]
    pub calmar_ratio: f64,

    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_trade: f64,
    pub std_returns: f64,

    // period
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub trading_days: usize,
}

/// Ratios that may be infinite. JSON has no infinity, so non finite values
/// are written as the strings `"inf"`, `"-inf"` and `"NaN"`.
#[cfg(feature = "serde")]
pub(crate) mod ratio {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        match *value {
            v if v.is_finite() => serializer.serialize_f64(v),
            v if v.is_nan() => serializer.serialize_str("NaN"),
            v if v > 0.0 => serializer.serialize_str("inf"),
            _ => serializer.serialize_str("-inf"),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(de::Error::custom(format!("invalid ratio {other:?}"))),
            },
        }
    }
}

impl From<&Backtest> for PerformanceMetrics {
    fn from(value: &Backtest) -> Self {
        Self::calculate(value.equity_curve(), value.trades())
    }
}

impl PerformanceMetrics {
    /// Computes every metric.
    ///
    /// Returns the default (all zeros) below two equity observations.
    pub fn calculate(curve: &[EquitySnapshot], trades: &[Trade]) -> Self {
        let mut metrics = Self::default();
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return metrics;
        };
        if curve.len() < 2 {
            return metrics;
        }

        metrics.start_date = Some(first.date);
        metrics.end_date = Some(last.date);
        metrics.trading_days = curve.len();

        let equity = curve.iter().map(|s| s.equity).collect::<Vec<_>>();
        let returns = simple_returns(&equity);
        let total = total_return(&equity);
        let annualized = annualized_return(total, curve.len());

        metrics.total_return = last.equity - first.equity;
        metrics.total_return_percent = total * 100.0;
        metrics.annualized_return = annualized * 100.0;

        let drawdown = max_drawdown(curve);
        metrics.max_drawdown = drawdown.amount;
        metrics.max_drawdown_percent = drawdown.fraction * 100.0;
        metrics.max_drawdown_duration = drawdown.duration_days;

        metrics.sharpe_ratio = sharpe_ratio(&returns, RISK_FREE_RATE);
        metrics.sortino_ratio = sortino_ratio(&returns, RISK_FREE_RATE);
        metrics.calmar_ratio = calmar_ratio(annualized, drawdown.fraction);
        metrics.std_returns = std_dev(&returns).map_or(0.0, |std| std * 100.0);

        if !trades.is_empty() {
            metrics.total_trades = trades.len();
            metrics.winning_trades = trades.iter().filter(|t| t.is_win()).count();
            metrics.losing_trades = trades.iter().filter(|t| t.is_loss()).count();
            metrics.win_rate = win_rate(trades) * 100.0;
            metrics.profit_factor = profit_factor(trades);

            let stats = TradeStats::from_trades(trades);
            metrics.avg_profit = stats.avg_profit;
            metrics.avg_loss = stats.avg_loss;
            metrics.avg_profit_percent = stats.avg_profit_percent;
            metrics.avg_loss_percent = stats.avg_loss_percent;
            metrics.best_trade = stats.best_trade;
            metrics.worst_trade = stats.worst_trade;
            metrics.avg_trade = stats.avg_trade;
            metrics.avg_holding_days = stats.avg_holding_days;
        }

        metrics
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Report ===")?;
        writeln!(f)?;
        writeln!(f, "[Returns]")?;
        writeln!(f, "  Total Return: {:.0}", self.total_return)?;
        writeln!(f, "  Total Return (%): {:.2}%", self.total_return_percent)?;
        writeln!(f, "  Annualized Return: {:.2}%", self.annualized_return)?;
        writeln!(f)?;
        writeln!(f, "[Risk]")?;
        writeln!(f, "  Max Drawdown: {:.0} ({:.2}%)", self.max_drawdown, self.max_drawdown_percent)?;
        writeln!(f, "  Max Drawdown Duration: {} days", self.max_drawdown_duration)?;
        writeln!(f, "  Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        writeln!(f, "  Sortino Ratio: {:.2}", self.sortino_ratio)?;
        writeln!(f, "  Calmar Ratio: {:.2}", self.calmar_ratio)?;
        writeln!(f, "  Return Std Dev: {:.2}%", self.std_returns)?;
        writeln!(f)?;
        writeln!(f, "[Trade Statistics]")?;
        writeln!(f, "  Total Trades: {}", self.total_trades)?;
        writeln!(f, "  Wins / Losses: {} / {}", self.winning_trades, self.losing_trades)?;
        writeln!(f, "  Win Rate: {:.1}%", self.win_rate)?;
        writeln!(f, "  Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f, "  Avg Holding Days: {:.1}", self.avg_holding_days)?;
        writeln!(f)?;
        writeln!(f, "[P&L Statistics]")?;
        writeln!(f, "  Avg Winning Trade: {:.0} ({:.2}%)", self.avg_profit, self.avg_profit_percent)?;
        writeln!(f, "  Avg Losing Trade: {:.0} ({:.2}%)", self.avg_loss, self.avg_loss_percent)?;
        writeln!(f, "  Best Trade: {:.0}", self.best_trade)?;
        writeln!(f, "  Worst Trade: {:.0}", self.worst_trade)?;
        writeln!(f, "  Avg Trade: {:.0}", self.avg_trade)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            writeln!(f)?;
            writeln!(f, "[Period]")?;
            writeln!(f, "  Start: {start}")?;
            writeln!(f, "  End: {end}")?;
            writeln!(f, "  Trading Days: {}", self.trading_days)?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn curve(values: &[f64]) -> Vec<EquitySnapshot> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, equity)| EquitySnapshot::new(start + chrono::Duration::days(i as i64), *equity, 0.0, 0))
        .collect()
}

#[cfg(test)]
// Helper function to create a closed trade with the given P&L
fn create_trade(pnl: f64, pnl_percent: f64, holding_days: i64) -> Trade {
    use crate::engine::{ExitReason, PositionSide};

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    Trade {
        asset: "A".into(),
        name: "A".into(),
        strategy: "test".into(),
        entry_date: date,
        entry_price: 100.0,
        exit_date: date + chrono::Duration::days(holding_days),
        exit_price: 100.0,
        quantity: 1,
        side: PositionSide::Long,
        stop_loss: None,
        take_profit: None,
        exit_reason: ExitReason::EndOfRun,
        pnl,
        pnl_percent,
        holding_days,
    }
}

#[cfg(test)]
#[test]
fn returns_and_total_return() {
    let returns = simple_returns(&[100.0, 110.0, 99.0]);
    assert_eq!(returns.len(), 2);
    assert!((returns[0] - 0.1).abs() < 1e-12);
    assert!((returns[1] + 0.1).abs() < 1e-12);

    assert!((total_return(&[100.0, 110.0, 99.0]) + 0.01).abs() < 1e-12);
    assert_eq!(total_return(&[100.0]), 0.0);
    assert_eq!(total_return(&[0.0, 10.0]), 0.0);
}

#[cfg(test)]
#[test]
fn annualized_return_convention() {
    assert!((annualized_return(0.10, 252) - 0.10).abs() < 1e-12);
    assert!((annualized_return(0.21, 504) - 0.10).abs() < 1e-9);
    assert_eq!(annualized_return(0.5, 0), 0.0);
}

#[cfg(test)]
#[test]
fn max_drawdown_scenario() {
    let drawdown = max_drawdown(&curve(&[100.0, 110.0, 90.0, 120.0]));
    assert_eq!(drawdown.amount, 20.0);
    assert_eq!(drawdown.fraction, 20.0 / 110.0);
    assert_eq!(drawdown.peak_index, 1);
    assert_eq!(drawdown.trough_index, 2);
    assert_eq!(drawdown.duration_days, 1);
}

#[cfg(test)]
#[test]
fn max_drawdown_latest_peak() {
    // peak 110 is touched again on day 3 before the trough on day 5
    let drawdown = max_drawdown(&curve(&[100.0, 110.0, 105.0, 110.0, 100.0, 80.0, 90.0]));
    assert_eq!(drawdown.amount, 30.0);
    assert_eq!(drawdown.peak_index, 3);
    assert_eq!(drawdown.trough_index, 5);
    assert_eq!(drawdown.duration_days, 2);
}

#[cfg(test)]
#[test]
fn max_drawdown_none() {
    assert_eq!(max_drawdown(&curve(&[100.0, 101.0, 102.0])), Drawdown::default());
    assert_eq!(max_drawdown(&curve(&[100.0])), Drawdown::default());
    assert_eq!(max_drawdown(&[]), Drawdown::default());
}

#[cfg(test)]
#[test]
fn sharpe_ratio_formula() {
    let returns = [0.01, -0.005, 0.02, 0.0];
    let daily = RISK_FREE_RATE / 252.0;
    let excess = returns.iter().map(|r| r - daily).collect::<Vec<_>>();
    let expected = 252f64.sqrt() * mean(&excess) / std_dev(&excess).unwrap();
    assert!((sharpe_ratio(&returns, RISK_FREE_RATE) - expected).abs() < 1e-12);
}

#[cfg(test)]
#[test]
fn sharpe_ratio_degenerate() {
    assert_eq!(sharpe_ratio(&[], RISK_FREE_RATE), 0.0);
    assert_eq!(sharpe_ratio(&[0.01], RISK_FREE_RATE), 0.0);
    assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], RISK_FREE_RATE), 0.0);
}

#[cfg(test)]
#[test]
fn sortino_ratio_formula() {
    let returns = [0.02, -0.01, 0.03, -0.02];
    let daily = RISK_FREE_RATE / 252.0;
    let excess = returns.iter().map(|r| r - daily).collect::<Vec<_>>();
    let downside = excess.iter().copied().filter(|r| *r < 0.0).collect::<Vec<_>>();
    let expected = 252f64.sqrt() * mean(&excess) / std_dev(&downside).unwrap();
    assert!((sortino_ratio(&returns, RISK_FREE_RATE) - expected).abs() < 1e-12);
}

#[cfg(test)]
#[test]
fn sortino_ratio_without_downside() {
    assert_eq!(sortino_ratio(&[0.01, 0.02], RISK_FREE_RATE), f64::INFINITY);
    assert_eq!(sortino_ratio(&[0.0, 0.0], RISK_FREE_RATE), 0.0);
    assert_eq!(sortino_ratio(&[0.01], RISK_FREE_RATE), 0.0);
}

#[cfg(test)]
#[test]
fn sortino_ratio_with_a_single_loss() {
    // one negative excess return has no sample deviation
    assert_eq!(sortino_ratio(&[0.05, 0.04, -0.01], RISK_FREE_RATE), 0.0);

    let metrics = PerformanceMetrics::calculate(&curve(&[100.0, 105.0, 109.2, 108.108]), &[]);
    assert_eq!(metrics.sortino_ratio, 0.0);
    assert!(metrics.sharpe_ratio.is_finite());
}

#[cfg(test)]
#[test]
fn calmar_ratio_fallbacks() {
    assert_eq!(calmar_ratio(0.2, 0.1), 2.0);
    assert_eq!(calmar_ratio(0.2, -0.1), 2.0);
    assert_eq!(calmar_ratio(0.2, 0.0), f64::INFINITY);
    assert_eq!(calmar_ratio(-0.2, 0.0), 0.0);
}

#[cfg(test)]
#[test]
fn profit_factor_and_win_rate() {
    let trades = vec![create_trade(20.0, 2.0, 3), create_trade(-10.0, -1.0, 5)];
    assert_eq!(profit_factor(&trades), 2.0);
    assert_eq!(win_rate(&trades), 0.5);

    let winners = vec![create_trade(20.0, 2.0, 3)];
    assert_eq!(profit_factor(&winners), f64::INFINITY);
    assert_eq!(win_rate(&winners), 1.0);

    assert_eq!(profit_factor(&[]), 0.0);
    assert_eq!(win_rate(&[]), 0.0);
    assert_eq!(profit_factor(&[create_trade(0.0, 0.0, 1)]), 0.0);
}

#[cfg(test)]
#[test]
fn trade_stats_subsets() {
    let trades = vec![
        create_trade(700.0, 10.0, 10),
        create_trade(-250.0, -3.85, 5),
        create_trade(900.0, 15.0, 19),
    ];
    let stats = TradeStats::from_trades(&trades);
    assert_eq!(stats.avg_profit, 800.0);
    assert_eq!(stats.avg_loss, -250.0);
    assert_eq!(stats.avg_profit_percent, 12.5);
    assert_eq!(stats.avg_loss_percent, -3.85);
    assert_eq!(stats.best_trade, 900.0);
    assert_eq!(stats.worst_trade, -250.0);
    assert!((stats.avg_trade - 450.0).abs() < 1e-12);
    assert!((stats.avg_holding_days - 34.0 / 3.0).abs() < 1e-12);

    let stats = TradeStats::from_trades(&[create_trade(50.0, 5.0, 2)]);
    assert_eq!(stats.avg_loss, 0.0);
    assert_eq!(stats.avg_loss_percent, 0.0);
    assert_eq!(TradeStats::from_trades(&[]), TradeStats::default());
}

#[cfg(test)]
#[test]
fn calculate_all_metrics() {
    let trades = vec![create_trade(20.0, 2.0, 3), create_trade(-10.0, -1.0, 5)];
    let metrics = PerformanceMetrics::calculate(&curve(&[100.0, 110.0, 90.0, 120.0]), &trades);

    assert_eq!(metrics.total_return, 20.0);
    assert!((metrics.total_return_percent - 20.0).abs() < 1e-9);
    let annualized = annualized_return(0.2, 4);
    assert!((metrics.annualized_return - annualized * 100.0).abs() < 1e-6);
    assert_eq!(metrics.max_drawdown, 20.0);
    assert!((metrics.max_drawdown_percent - 2000.0 / 110.0).abs() < 1e-9);
    assert_eq!(metrics.calmar_ratio, annualized / (20.0 / 110.0));
    assert_eq!(metrics.total_trades, 2);
    assert_eq!(metrics.winning_trades, 1);
    assert_eq!(metrics.losing_trades, 1);
    assert_eq!(metrics.win_rate, 50.0);
    assert_eq!(metrics.profit_factor, 2.0);
    assert_eq!(metrics.avg_holding_days, 4.0);
    assert_eq!(metrics.trading_days, 4);
    assert_eq!(metrics.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(metrics.end_date, NaiveDate::from_ymd_opt(2024, 1, 4));
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn infinite_ratios_survive_json() {
    let trades = vec![create_trade(20.0, 2.0, 3)];
    let metrics = PerformanceMetrics::calculate(&curve(&[100.0, 105.0, 110.0]), &trades);
    assert_eq!(metrics.profit_factor, f64::INFINITY);
    assert_eq!(metrics.sortino_ratio, f64::INFINITY);
    assert_eq!(metrics.calmar_ratio, f64::INFINITY);

    let json = serde_json::to_string(&metrics).unwrap();
    assert!(json.contains(r#""profit_factor":"inf""#));
    assert_eq!(serde_json::from_str::<PerformanceMetrics>(&json).unwrap(), metrics);
}

#[cfg(test)]
#[test]
fn calculate_needs_two_observations() {
    let trades = vec![create_trade(20.0, 2.0, 3)];
    assert_eq!(PerformanceMetrics::calculate(&curve(&[100.0]), &trades), PerformanceMetrics::default());
    assert_eq!(PerformanceMetrics::calculate(&[], &[]), PerformanceMetrics::default());
}

#[cfg(test)]
#[test]
fn report_sections_in_order() {
    let metrics = PerformanceMetrics::calculate(&curve(&[100.0, 110.0]), &[]);
    let report = metrics.to_string();
    let positions = ["[Returns]", "[Risk]", "[Trade Statistics]", "[P&L Statistics]", "[Period]"]
        .map(|section| report.find(section).expect("section should be rendered"));
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let empty = PerformanceMetrics::default().to_string();
    assert!(!empty.contains("[Period]"));
}
