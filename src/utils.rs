//! Synthetic market data.

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::engine::{Bar, PriceSeries};
use crate::errors::Result;

/// Generates a reproducible daily random walk.
///
/// Each close moves at most 3% from the previous one; highs and lows extend
/// up to 2% beyond the body. The same `seed` always yields the same series.
///
/// ### Arguments
/// * `seed` - Seed of the random generator.
/// * `len` - Number of consecutive calendar days.
/// * `base_price` - Open of the first bar.
/// * `start` - Date of the first bar.
///
/// ### Example
/// ```rust
/// use daybt::utils::generate_series;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let series = generate_series(7, 30, 100.0, start).unwrap();
/// assert_eq!(series.len(), 30);
/// assert_eq!(series, generate_series(7, 30, 100.0, start).unwrap());
/// ```
pub fn generate_series(seed: u64, len: usize, base_price: f64, start: NaiveDate) -> Result<PriceSeries> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = base_price;

    let bars = (0..len)
        .map(|i| {
            let open = close;
            close = open * (1.0 + rng.random_range(-0.03..0.03));
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.02));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..0.02));
            let volume = rng.random_range(1_000.0..100_000.0);
            Bar::new(start + Duration::days(i as i64), open, high, low, close, volume)
        })
        .collect::<Result<Vec<_>>>()?;

    PriceSeries::new(bars)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use chrono::{Duration, NaiveDate};
    use ta::{Next, indicators::SimpleMovingAverage};

    use crate::PercentCalculus;
    use crate::engine::{Bar, PriceSeries, Signal, SignalSource};
    use crate::errors::{Error, Result};

    pub fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    /// Bars with `open == high == low == close` on consecutive days from `day(0)`.
    pub fn flat_series(closes: &[f64]) -> PriceSeries {
        series_from(0, closes.iter().map(|c| (*c, *c, *c)).collect())
    }

    /// Bars from `(close, high, low)` triples on consecutive days from `day(first)`.
    pub fn series_from(first: i64, quotes: Vec<(f64, f64, f64)>) -> PriceSeries {
        let bars = quotes
            .into_iter()
            .enumerate()
            .map(|(i, (close, high, low))| Bar::new(day(first + i as i64), close, high, low, close, 1_000.0).unwrap())
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    /// Never signals.
    pub struct Idle;

    impl SignalSource for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn generate_signal(&self, _history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
            Ok(None)
        }
    }

    /// Emits pre-recorded signals keyed by asset and date.
    #[derive(Default)]
    pub struct Scripted {
        signals: HashMap<(String, NaiveDate), Signal>,
    }

    impl Scripted {
        pub fn at(mut self, asset: &str, date: NaiveDate, signal: Signal) -> Self {
            self.signals.insert((asset.to_string(), date), signal);
            self
        }
    }

    impl SignalSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate_signal(&self, history: &[Bar], asset: &str) -> Result<Option<Signal>> {
            let Some(last) = history.last() else {
                return Ok(None);
            };
            Ok(self.signals.get(&(asset.to_string(), last.date())).cloned())
        }
    }

    /// Fails on one asset and buys every other one.
    pub struct FailsOn(pub &'static str);

    impl SignalSource for FailsOn {
        fn name(&self) -> &str {
            "fails-on"
        }

        fn generate_signal(&self, history: &[Bar], asset: &str) -> Result<Option<Signal>> {
            if asset == self.0 {
                return Err(Error::Signal(format!("no model for {asset}")));
            }
            Ok(history.last().map(|bar| Signal::buy(bar.close())))
        }
    }

    /// Buys when the fast moving average crosses above the slow one.
    pub struct SmaCross {
        name: String,
        fast: usize,
        slow: usize,
    }

    impl SmaCross {
        pub fn new(fast: usize, slow: usize) -> Self {
            Self {
                name: format!("sma-{fast}-{slow}"),
                fast,
                slow,
            }
        }
    }

    impl SignalSource for SmaCross {
        fn name(&self) -> &str {
            &self.name
        }

        fn generate_signal(&self, history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
            let mut fast = SimpleMovingAverage::new(self.fast).map_err(|e| Error::Signal(e.to_string()))?;
            let mut slow = SimpleMovingAverage::new(self.slow).map_err(|e| Error::Signal(e.to_string()))?;

            let averages = history
                .iter()
                .map(|bar| (fast.next(bar.close()), slow.next(bar.close())))
                .collect::<Vec<_>>();

            let [.., (prev_fast, prev_slow), (last_fast, last_slow)] = averages.as_slice() else {
                return Ok(None);
            };
            let Some(close) = history.last().map(Bar::close) else {
                return Ok(None);
            };

            if prev_fast <= prev_slow && last_fast > last_slow {
                let signal = Signal::buy(close)
                    .with_stop_loss(close.subpercent(3.0))
                    .with_take_profit(close.addpercent(6.0))
                    .with_reason("moving average cross");
                return Ok(Some(signal));
            }
            Ok(None)
        }
    }
}
