#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Parameters of one backtest run.
///
/// Built through [`BacktestConfig::builder`], which validates every field;
/// the value is immutable afterwards.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    initial_capital: f64,
    commission_rate: f64,
    slippage_rate: f64,
    max_position_size: f64,
    max_positions: usize,
    use_stop_loss: bool,
    use_take_profit: bool,
    allow_short: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000_000.0,
            commission_rate: 0.00015,
            slippage_rate: 0.001,
            max_position_size: 0.1,
            max_positions: 10,
            use_stop_loss: true,
            use_take_profit: true,
            allow_short: false,
        }
    }
}

impl BacktestConfig {
    /// Starts a builder from the default configuration.
    ///
    /// ### Example
    /// ```rust
    /// use daybt::prelude::*;
    ///
    /// let config = BacktestConfig::builder()
    ///     .initial_capital(1_000_000.0)
    ///     .commission_rate(0.0)
    ///     .slippage_rate(0.0)
    ///     .max_position_size(0.1)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_positions(), 10);
    ///
    /// assert!(BacktestConfig::builder().initial_capital(-1.0).build().is_err());
    /// ```
    pub fn builder() -> BacktestConfigBuilder {
        BacktestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Starting cash.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Fraction of the traded amount charged on every fill.
    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    /// Fraction added to buy prices and removed from sell prices.
    pub fn slippage_rate(&self) -> f64 {
        self.slippage_rate
    }

    /// Maximum fraction of the available cash spent on one position.
    pub fn max_position_size(&self) -> f64 {
        self.max_position_size
    }

    /// Maximum number of positions open at once.
    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    pub fn use_stop_loss(&self) -> bool {
        self.use_stop_loss
    }

    pub fn use_take_profit(&self) -> bool {
        self.use_take_profit
    }

    /// Accepted for compatibility; positions are always long.
    pub fn allow_short(&self) -> bool {
        self.allow_short
    }

    pub(crate) fn buy_price(&self, price: f64) -> f64 {
        price * (1.0 + self.slippage_rate)
    }

    pub(crate) fn sell_price(&self, price: f64) -> f64 {
        price * (1.0 - self.slippage_rate)
    }

    pub(crate) fn commission(&self, amount: f64) -> f64 {
        amount * self.commission_rate
    }

    fn validate(&self) -> Result<()> {
        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(Error::NegZeroBalance(self.initial_capital));
        }
        if self.commission_rate < 0.0 || !self.commission_rate.is_finite() {
            return Err(Error::NegRate("Commission", self.commission_rate));
        }
        if self.slippage_rate < 0.0 || !self.slippage_rate.is_finite() {
            return Err(Error::NegRate("Slippage", self.slippage_rate));
        }
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 || self.max_position_size.is_nan() {
            return Err(Error::InvalidPositionSize(self.max_position_size));
        }
        Ok(())
    }
}

/// Builder for [`BacktestConfig`].
#[derive(Debug, Clone)]
pub struct BacktestConfigBuilder {
    config: BacktestConfig,
}

impl BacktestConfigBuilder {
    pub fn initial_capital(mut self, initial_capital: f64) -> Self {
        self.config.initial_capital = initial_capital;
        self
    }

    pub fn commission_rate(mut self, commission_rate: f64) -> Self {
        self.config.commission_rate = commission_rate;
        self
    }

    pub fn slippage_rate(mut self, slippage_rate: f64) -> Self {
        self.config.slippage_rate = slippage_rate;
        self
    }

    pub fn max_position_size(mut self, max_position_size: f64) -> Self {
        self.config.max_position_size = max_position_size;
        self
    }

    pub fn max_positions(mut self, max_positions: usize) -> Self {
        self.config.max_positions = max_positions;
        self
    }

    pub fn use_stop_loss(mut self, use_stop_loss: bool) -> Self {
        self.config.use_stop_loss = use_stop_loss;
        self
    }

    pub fn use_take_profit(mut self, use_take_profit: bool) -> Self {
        self.config.use_take_profit = use_take_profit;
        self
    }

    pub fn allow_short(mut self, allow_short: bool) -> Self {
        self.config.allow_short = allow_short;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<BacktestConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[test]
fn default_config_is_valid() {
    let config = BacktestConfig::builder().build().unwrap();
    assert_eq!(config, BacktestConfig::default());
    assert_eq!(config.initial_capital(), 10_000_000.0);
    assert!(!config.allow_short());
}

#[cfg(test)]
#[test]
fn invalid_capital() {
    let result = BacktestConfig::builder().initial_capital(0.0).build();
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let result = BacktestConfig::builder().initial_capital(f64::INFINITY).build();
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));
}

#[cfg(test)]
#[test]
fn invalid_rates() {
    let result = BacktestConfig::builder().commission_rate(-0.1).build();
    assert!(matches!(result, Err(Error::NegRate("Commission", _))));

    let result = BacktestConfig::builder().slippage_rate(-0.001).build();
    assert!(matches!(result, Err(Error::NegRate("Slippage", _))));

    let result = BacktestConfig::builder().commission_rate(0.0).slippage_rate(0.0).build();
    assert!(result.is_ok());
}

#[cfg(test)]
#[test]
fn invalid_position_size() {
    let result = BacktestConfig::builder().max_position_size(0.0).build();
    assert!(matches!(result, Err(Error::InvalidPositionSize(_))));

    let result = BacktestConfig::builder().max_position_size(1.5).build();
    assert!(matches!(result, Err(Error::InvalidPositionSize(_))));
}

#[cfg(test)]
#[test]
fn slippage_direction() {
    let config = BacktestConfig::builder().slippage_rate(0.01).build().unwrap();
    assert!(config.buy_price(100.0) > 100.0);
    assert!(config.sell_price(100.0) < 100.0);
}
