//! # daybt: daily multi-asset backtesting
//!
//! **daybt** replays daily OHLCV bars of many assets against a rule-based
//! signal source and reports how the strategy would have performed.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`MarketData`** | Daily bars per asset, in the order entries are scanned.                                     |
//! | **`SignalSource`** | The strategy: turns a history window into an optional `Signal`.                          |
//! | **`Ledger`** | Cash and open positions, sized from the available cash.                                        |
//! | **`TradeJournal`** | Closed trades with P&L and holding period.                                               |
//! | **`EquityTracker`** | One equity snapshot per simulated day.                                                  |
//! | **`PerformanceMetrics`** | Returns, drawdown, Sharpe, Sortino, Calmar, win rate and more.                     |
//! | **`Backtest`** | The engine that replays the days: exits first, then entries.                                 |
//! | **`MultiBacktest`** | Independent runs of several strategies, ranked by total return.                         |
//!
//! ## Execution Model
//! | Rule                     | Behavior                                                                                       |
//! |--------------------------|------------------------------------------------------------------------------------------------|
//! | **Entry**                | Buy signals fill at the day's close plus slippage.                                            |
//! | **Stop-Loss**            | Fills at the stop level when the day's low reaches it. Wins same-day ties.                    |
//! | **Take-Profit**          | Fills at the target level when the day's high reaches it.                                     |
//! | **End of run**           | Open positions are closed at their last known close.                                          |
//! | **Costs**                | Commission on both legs, slippage against the trader.                                         |
//!
//! ## Getting Started
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use daybt::prelude::*;
//!
//! /// Buys after three rising closes.
//! struct Momentum;
//!
//! impl SignalSource for Momentum {
//!     fn name(&self) -> &str {
//!         "momentum"
//!     }
//!
//!     fn generate_signal(&self, history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
//!         let [.., a, b, c] = history else {
//!             return Ok(None);
//!         };
//!         if a.close() < b.close() && b.close() < c.close() {
//!             let close = c.close();
//!             let signal = Signal::buy(close)
//!                 .with_stop_loss(close.subpercent(5.0))
//!                 .with_take_profit(close.addpercent(10.0));
//!             return Ok(Some(signal));
//!         }
//!         Ok(None)
//!     }
//! }
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let data = MarketData::new()
//!     .with_asset("AAA", generate_series(1, 250, 100.0, start).unwrap())
//!     .unwrap()
//!     .with_asset("BBB", generate_series(2, 250, 50.0, start).unwrap())
//!     .unwrap();
//!
//! let mut backtest = Backtest::new(Arc::new(Momentum), BacktestConfig::default());
//! let metrics = backtest.run(&data);
//!
//! assert_eq!(metrics.trading_days, 250);
//! assert_eq!(metrics.total_trades, backtest.trades().len());
//! println!("{metrics}");
//! ```
//!
//! ## Features
//! | Feature     | Purpose                                                                                     |
//! |-------------|---------------------------------------------------------------------------------------------|
//! | `parallel`  | [`rayon`](https://crates.io/crates/rayon): signals of one day and strategy runs in parallel. |
//! | `serde`     | [`serde`](https://crates.io/crates/serde): serialize the data model and JSON reports.      |
//! | `draws`     | [`plotters`](https://crates.io/crates/plotters): equity curve and drawdown charts.          |
//!
//! ## Logging
//! The engine emits [`tracing`](https://crates.io/crates/tracing) events and
//! never installs a subscriber.
//!
//! ## License
//! MIT

/// Core backtesting components: market data, signals, ledger and engine.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Performance metrics: drawdown, Sharpe ratio, win rate, etc.
pub mod metrics;

/// Several strategies on the same market, ranked.
pub mod multi;

/// Synthetic data helpers.
pub mod utils;

/// Draw equity charts to png or svg.
#[cfg(feature = "draws")]
pub mod draws;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;
    pub use crate::multi::*;
    pub use crate::utils::*;

    #[cfg(feature = "draws")]
    pub use crate::draws::*;
}

use std::ops::{Add, Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
///
/// This trait provides methods to add, subtract, and calculate percentages
/// for numeric types, enabling common financial calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Adds a percentage to the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to add (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value increased by the given percentage.
    fn addpercent(self, rhs: Rhs) -> Self;

    /// Subtracts a percentage from the value.
    ///
    /// ### Arguments
    /// * `rhs` - The percentage to subtract (e.g., 10.0 for 10%).
    ///
    /// ### Returns
    /// The value decreased by the given percentage.
    fn subpercent(self, rhs: Rhs) -> Self;

    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from this value to `new`.
    fn change(self, new: Self) -> Self;
}

impl PercentCalculus for f64 {
    fn addpercent(self, percent: Self) -> Self {
        self.add(self.mul(percent.div(100.0)))
    }

    fn subpercent(self, percent: Self) -> Self {
        self.sub(self.mul(percent.div(100.0)))
    }

    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}
