use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Bar;
use crate::errors::{Error, Result};

/// Direction suggested by a signal source.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

/// A trading signal produced for one asset on one day.
///
/// Only [`SignalKind::Buy`] signals open positions; the engine exits through
/// the stop-loss and take-profit levels carried here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    kind: SignalKind,
    name: String,
    price: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    reason: String,
    strength: f64,
}

impl Signal {
    /// Creates a signal of the given kind at `price` with full strength.
    pub fn new(kind: SignalKind, price: f64) -> Self {
        Self {
            kind,
            price,
            name: String::new(),
            stop_loss: None,
            take_profit: None,
            reason: String::new(),
            strength: 1.0,
        }
    }

    /// Shortcut for a buy signal.
    pub fn buy(price: f64) -> Self {
        Self::new(SignalKind::Buy, price)
    }

    /// Display name of the asset (used for positions and trades).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the conviction, clamped to `[0, 1]`.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn is_buy(&self) -> bool {
        self.kind == SignalKind::Buy
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Reward over risk, `None` without both levels or with zero risk.
    pub fn risk_reward_ratio(&self) -> Option<f64> {
        let risk = (self.price - self.stop_loss?).abs();
        let reward = (self.take_profit? - self.price).abs();
        if risk == 0.0 {
            return None;
        }
        Some(reward / risk)
    }

    /// Distance to the stop-loss in percent of the price (negative below).
    pub fn stop_loss_percent(&self) -> Option<f64> {
        self.stop_loss.map(|stop| (stop - self.price) / self.price * 100.0)
    }

    /// Distance to the take-profit in percent of the price.
    pub fn take_profit_percent(&self) -> Option<f64> {
        self.take_profit.map(|target| (target - self.price) / self.price * 100.0)
    }
}

/// A trading rule evaluated on a history window.
///
/// `history` holds every bar of `asset` up to and including the simulated
/// day. Implementations must not rely on any state of the engine; the
/// engine may call them from several threads for different assets.
pub trait SignalSource: Send + Sync {
    /// Strategy tag recorded on positions and trades.
    fn name(&self) -> &str;

    /// Evaluates the window and optionally returns a signal.
    ///
    /// An `Err` is logged by the engine and treated as "no signal".
    fn generate_signal(&self, history: &[Bar], asset: &str) -> Result<Option<Signal>>;
}

/// Closed lookup table of signal sources by name.
#[derive(Clone, Default)]
pub struct SignalRegistry {
    sources: BTreeMap<String, Arc<dyn SignalSource>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under its own name, replacing a previous entry.
    pub fn register(&mut self, source: Arc<dyn SignalSource>) {
        self.sources.insert(source.name().to_string(), source);
    }

    /// Builder flavour of [`SignalRegistry::register`].
    pub fn with(mut self, source: Arc<dyn SignalSource>) -> Self {
        self.register(source);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SignalSource>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sources.keys()).finish()
    }
}
