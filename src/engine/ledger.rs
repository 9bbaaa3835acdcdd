use std::collections::{VecDeque, vec_deque::Iter};

use chrono::NaiveDate;
use tracing::debug;

use crate::PercentCalculus;
use crate::engine::{BacktestConfig, ExitReason, Position, PositionSide, Signal, Trade};

/// Cash and open positions of one run.
///
/// Holds at most one position per asset. Every mutation keeps
/// `cash + Σ mark value == equity`: cash moves in the same call that
/// creates or removes a position.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: BacktestConfig,
    strategy: String,
    cash: f64,
    // open order; exits and the final liquidation follow it
    positions: VecDeque<Position>,
}

impl Ledger {
    pub fn new(config: BacktestConfig, strategy: impl Into<String>) -> Self {
        Self {
            config,
            strategy: strategy.into(),
            cash: config.initial_capital(),
            positions: VecDeque::new(),
        }
    }

    /// Available cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Open positions valued at their mark prices.
    pub fn position_value(&self) -> f64 {
        self.positions.iter().map(Position::market_value).sum()
    }

    /// Cash plus position value.
    pub fn equity(&self) -> f64 {
        self.cash + self.position_value()
    }

    pub fn positions(&self) -> Iter<'_, Position> {
        self.positions.iter()
    }

    pub fn get(&self, asset: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.asset == asset)
    }

    pub fn is_open(&self, asset: &str) -> bool {
        self.get(asset).is_some()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True once `max_positions` positions are open.
    pub fn is_full(&self) -> bool {
        self.positions.len() >= self.config.max_positions()
    }

    /// Opens a long position on `asset` at `price` (slippage applied).
    ///
    /// Returns `false` without touching any state when the asset is already
    /// open, the position limit is reached, or the cash cannot buy a single
    /// share.
    ///
    /// ### Sizing
    /// `floor(cash × max_position_size / entry_price)` shares; when that plus
    /// commission exceeds the cash, `floor((cash − commission) / entry_price)`.
    pub fn open(&mut self, asset: &str, signal: &Signal, price: f64, date: NaiveDate) -> bool {
        if self.is_full() || self.is_open(asset) {
            return false;
        }

        let entry_price = self.config.buy_price(price);
        let mut quantity = (self.cash * self.config.max_position_size() / entry_price).floor();
        if quantity <= 0.0 {
            return false;
        }

        let mut amount = entry_price * quantity;
        let mut commission = self.config.commission(amount);
        if amount + commission > self.cash {
            quantity = ((self.cash - commission) / entry_price).floor();
            if quantity <= 0.0 {
                return false;
            }
            amount = entry_price * quantity;
            commission = self.config.commission(amount);
        }

        let name = if signal.name().is_empty() {
            asset.to_string()
        } else {
            signal.name().to_string()
        };

        self.cash -= amount + commission;
        self.positions.push_back(Position {
            asset: asset.to_string(),
            name,
            strategy: self.strategy.clone(),
            entry_date: date,
            entry_price,
            quantity: quantity as u64,
            side: PositionSide::Long,
            stop_loss: signal.stop_loss().filter(|level| *level > 0.0),
            take_profit: signal.take_profit().filter(|level| *level > 0.0),
            mark_price: price,
        });

        debug!(%date, asset, price = entry_price, quantity, commission, "buy");
        true
    }

    /// Closes the position on `asset` at `price` (slippage applied).
    ///
    /// Returns `None` when no position is open on `asset`.
    pub fn close(&mut self, asset: &str, price: f64, date: NaiveDate, reason: ExitReason) -> Option<Trade> {
        let idx = self.positions.iter().position(|p| p.asset == asset)?;
        let position = self.positions.remove(idx)?;

        let exit_price = self.config.sell_price(price);
        let amount = exit_price * position.quantity as f64;
        let commission = self.config.commission(amount);
        let net_amount = amount - commission;

        let entry_amount = position.cost();
        let pnl = net_amount - entry_amount;
        let pnl_percent = if entry_amount > 0.0 {
            entry_amount.change(net_amount)
        } else {
            0.0
        };
        let holding_days = (date - position.entry_date).num_days().max(1);

        self.cash += net_amount;

        debug!(%date, asset, price = exit_price, quantity = position.quantity, pnl, %reason, "sell");

        Some(Trade {
            asset: position.asset,
            name: position.name,
            strategy: position.strategy,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: date,
            exit_price,
            quantity: position.quantity,
            side: position.side,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            exit_reason: reason,
            pnl,
            pnl_percent,
            holding_days,
        })
    }

    /// Moves the mark price of `asset`; `false` when it is not open.
    pub fn mark(&mut self, asset: &str, price: f64) -> bool {
        match self.positions.iter_mut().find(|p| p.asset == asset) {
            Some(position) => {
                position.mark_price = price;
                true
            }
            None => false,
        }
    }

    /// Drops every position and restores the initial capital.
    pub fn reset(&mut self) {
        self.cash = self.config.initial_capital();
        self.positions = VecDeque::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn frictionless(capital: f64, size: f64, max_positions: usize) -> BacktestConfig {
        BacktestConfig::builder()
            .initial_capital(capital)
            .commission_rate(0.0)
            .slippage_rate(0.0)
            .max_position_size(size)
            .max_positions(max_positions)
            .build()
            .unwrap()
    }

    #[test]
    fn open_sizes_by_fraction_of_cash() {
        let mut ledger = Ledger::new(frictionless(1_000_000.0, 0.1, 10), "test");
        assert!(ledger.open("A", &Signal::buy(10_000.0), 10_000.0, day(2)));

        let position = ledger.get("A").unwrap();
        assert_eq!(position.quantity(), 10);
        assert_eq!(ledger.cash(), 900_000.0);
        assert_eq!(ledger.equity(), 1_000_000.0);
    }

    #[test]
    fn open_rejects_duplicates_and_limits() {
        let mut ledger = Ledger::new(frictionless(1_000_000.0, 0.1, 1), "test");
        assert!(ledger.open("A", &Signal::buy(100.0), 100.0, day(2)));
        assert!(!ledger.open("A", &Signal::buy(100.0), 100.0, day(2)));
        assert!(!ledger.open("B", &Signal::buy(100.0), 100.0, day(2)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.cash(), 900_000.0);
    }

    #[test]
    fn open_rejects_zero_quantity() {
        let mut ledger = Ledger::new(frictionless(1_000.0, 0.1, 10), "test");
        assert!(!ledger.open("A", &Signal::buy(500.0), 500.0, day(2)));
        assert!(ledger.is_empty());
        assert_eq!(ledger.cash(), 1_000.0);
    }

    #[test]
    fn open_resizes_when_commission_exceeds_cash() {
        let config = BacktestConfig::builder()
            .initial_capital(1_000.0)
            .commission_rate(0.01)
            .slippage_rate(0.0)
            .max_position_size(1.0)
            .build()
            .unwrap();
        let mut ledger = Ledger::new(config, "test");
        // 10 shares cost 1000 + 10 commission; resized to floor(990 / 100) = 9
        assert!(ledger.open("A", &Signal::buy(100.0), 100.0, day(2)));
        assert_eq!(ledger.get("A").unwrap().quantity(), 9);
        assert!((ledger.cash() - (1_000.0 - 900.0 - 9.0)).abs() < 1e-9);
        assert!(ledger.cash() >= 0.0);
    }

    #[test]
    fn slippage_and_commission_on_round_trip() {
        let config = BacktestConfig::builder()
            .initial_capital(100_000.0)
            .commission_rate(0.001)
            .slippage_rate(0.01)
            .max_position_size(0.5)
            .build()
            .unwrap();
        let mut ledger = Ledger::new(config, "test");
        assert!(ledger.open("A", &Signal::buy(100.0).with_name("Alpha"), 100.0, day(2)));

        let position = ledger.get("A").unwrap();
        assert!((position.entry_price() - 101.0).abs() < 1e-9);
        assert_eq!(position.quantity(), 495); // floor(50_000 / 101)
        assert_eq!(position.name(), "Alpha");

        let trade = ledger.close("A", 110.0, day(12), ExitReason::TakeProfit).unwrap();
        let exit_price = 110.0 * 0.99;
        let net = exit_price * 495.0 * (1.0 - 0.001);
        let entry = 101.0 * 495.0;
        assert!((trade.exit_price - exit_price).abs() < 1e-9);
        assert!((trade.pnl - (net - entry)).abs() < 1e-6);
        assert!((trade.pnl_percent - (net - entry) / entry * 100.0).abs() < 1e-9);
        assert_eq!(trade.holding_days, 10);
        assert!(ledger.is_empty());
    }

    #[test]
    fn close_unknown_asset_is_none() {
        let mut ledger = Ledger::new(frictionless(1_000.0, 0.5, 10), "test");
        assert!(ledger.close("A", 10.0, day(2), ExitReason::EndOfRun).is_none());
        assert_eq!(ledger.cash(), 1_000.0);
    }

    #[test]
    fn same_day_close_holds_one_day() {
        let mut ledger = Ledger::new(frictionless(1_000.0, 0.5, 10), "test");
        assert!(ledger.open("A", &Signal::buy(10.0), 10.0, day(2)));
        let trade = ledger.close("A", 10.0, day(2), ExitReason::EndOfRun).unwrap();
        assert_eq!(trade.holding_days, 1);
        assert_eq!(trade.pnl, 0.0);
    }

    #[test]
    fn mark_keeps_equity_identity() {
        let mut ledger = Ledger::new(frictionless(10_000.0, 0.5, 10), "test");
        assert!(ledger.open("A", &Signal::buy(100.0), 100.0, day(2)));
        assert!(ledger.mark("A", 120.0));
        assert!(!ledger.mark("B", 120.0));
        assert_eq!(ledger.position_value(), 50.0 * 120.0);
        assert_eq!(ledger.equity(), ledger.cash() + 6_000.0);
    }

    #[test]
    fn zero_levels_are_ignored() {
        let mut ledger = Ledger::new(frictionless(10_000.0, 0.5, 10), "test");
        let signal = Signal::buy(100.0).with_stop_loss(0.0).with_take_profit(110.0);
        assert!(ledger.open("A", &signal, 100.0, day(2)));
        assert_eq!(ledger.get("A").unwrap().stop_loss(), None);
        assert_eq!(ledger.get("A").unwrap().take_profit(), Some(110.0));
    }

    #[test]
    fn reset_ledger() {
        let mut ledger = Ledger::new(frictionless(10_000.0, 0.5, 10), "test");
        assert!(ledger.open("A", &Signal::buy(100.0), 100.0, day(2)));
        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.cash(), 10_000.0);
    }
}
