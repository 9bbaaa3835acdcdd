//! Core backtesting engine components.
//!
//! This module provides the fundamental types for backtesting:
//! - `Bar`, `PriceSeries`, `MarketData`: daily OHLCV input per asset.
//! - `Signal`, `SignalSource`, `SignalRegistry`: the strategy contract.
//! - `BacktestConfig`: capital, costs and position limits.
//! - `Ledger`: cash and open positions.
//! - `Trade`, `TradeJournal`, `EquityTracker`: what a run records.
//! - `Backtest`: the day-by-day replay.

mod bar;
mod bts;
mod config;
mod journal;
mod ledger;
mod position;
mod signal;

pub use bar::*;
pub use bts::*;
pub use config::*;
pub use journal::*;
pub use ledger::*;
pub use position::*;
pub use signal::*;
