use std::fmt;

use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents the side of a position.
///
/// Short selling is not simulated, so every position is long.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
}

/// An open holding of one asset.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub(crate) asset: String,
    pub(crate) name: String,
    pub(crate) strategy: String,
    pub(crate) entry_date: NaiveDate,
    pub(crate) entry_price: f64,
    pub(crate) quantity: u64,
    pub(crate) side: PositionSide,
    pub(crate) stop_loss: Option<f64>,
    pub(crate) take_profit: Option<f64>,
    pub(crate) mark_price: f64,
}

impl Position {
    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    /// Fill price, slippage included.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit
    }

    /// Latest known close.
    pub fn mark_price(&self) -> f64 {
        self.mark_price
    }

    /// Amount paid for the shares, commission excluded.
    pub fn cost(&self) -> f64 {
        self.entry_price * self.quantity as f64
    }

    /// Position valued at the mark price.
    pub fn market_value(&self) -> f64 {
        self.mark_price * self.quantity as f64
    }
}

/// Why a trade was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfRun,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop-loss"),
            Self::TakeProfit => write!(f, "take-profit"),
            Self::EndOfRun => write!(f, "end of run"),
        }
    }
}

/// A closed round trip.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub asset: String,
    pub name: String,
    pub strategy: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: u64,
    pub side: PositionSide,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub exit_reason: ExitReason,
    /// Net proceeds minus entry amount.
    pub pnl: f64,
    /// `pnl` in percent of the entry amount.
    pub pnl_percent: f64,
    pub holding_days: i64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

#[cfg(test)]
#[test]
fn position_values() {
    let position = Position {
        asset: "A".into(),
        name: "Alpha".into(),
        strategy: "test".into(),
        entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        entry_price: 100.0,
        quantity: 3,
        side: PositionSide::Long,
        stop_loss: None,
        take_profit: None,
        mark_price: 110.0,
    };
    assert_eq!(position.cost(), 300.0);
    assert_eq!(position.market_value(), 330.0);
}

#[cfg(test)]
#[test]
fn exit_reason_labels() {
    assert_eq!(ExitReason::StopLoss.to_string(), "stop-loss");
    assert_eq!(ExitReason::TakeProfit.to_string(), "take-profit");
    assert_eq!(ExitReason::EndOfRun.to_string(), "end of run");
}
