use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Ledger, Trade};

/// Account state at the end of one simulated day.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    /// Cash plus position value.
    pub equity: f64,
    pub cash: f64,
    pub position_value: f64,
    pub open_positions: usize,
}

impl EquitySnapshot {
    pub fn new(date: NaiveDate, cash: f64, position_value: f64, open_positions: usize) -> Self {
        Self {
            date,
            cash,
            position_value,
            open_positions,
            equity: cash + position_value,
        }
    }
}

impl From<(NaiveDate, &Ledger)> for EquitySnapshot {
    fn from((date, ledger): (NaiveDate, &Ledger)) -> Self {
        Self::new(date, ledger.cash(), ledger.position_value(), ledger.len())
    }
}

/// Closed trades in close order. Append only.
#[derive(Debug, Clone, Default)]
pub struct TradeJournal {
    trades: Vec<Trade>,
}

impl TradeJournal {
    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }
}

/// One snapshot per simulated day, in date order.
#[derive(Debug, Clone, Default)]
pub struct EquityTracker {
    snapshots: Vec<EquitySnapshot>,
}

impl EquityTracker {
    pub fn record(&mut self, snapshot: EquitySnapshot) {
        debug_assert!(self.snapshots.last().is_none_or(|last| last.date < snapshot.date));
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[EquitySnapshot] {
        &self.snapshots
    }

    /// Equity values only.
    pub fn values(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.equity).collect()
    }

    pub fn last(&self) -> Option<&EquitySnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
#[test]
fn snapshot_equity_is_cash_plus_positions() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let snapshot = EquitySnapshot::new(date, 900.0, 150.0, 1);
    assert_eq!(snapshot.equity, 1_050.0);
}

#[cfg(test)]
#[test]
fn tracker_keeps_order() {
    let mut tracker = EquityTracker::default();
    for (d, equity) in [(2, 100.0), (3, 110.0), (4, 90.0)] {
        let date = NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        tracker.record(EquitySnapshot::new(date, equity, 0.0, 0));
    }
    assert_eq!(tracker.values(), vec![100.0, 110.0, 90.0]);
    assert_eq!(tracker.last().unwrap().equity, 90.0);
    tracker.clear();
    assert!(tracker.is_empty());
}
