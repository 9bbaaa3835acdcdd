use std::sync::Arc;

use chrono::NaiveDate;
use daybt::prelude::*;
use ta::{Next, indicators::RelativeStrengthIndex};

/// Buys an oversold asset.
struct RsiReversion {
    name: String,
    period: usize,
    oversold: f64,
}

impl SignalSource for RsiReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signal(&self, history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
        let mut rsi = RelativeStrengthIndex::new(self.period).map_err(|e| Error::Signal(e.to_string()))?;
        let value = history.iter().fold(50.0, |_, bar| rsi.next(bar.close()));
        let Some(close) = history.last().map(Bar::close) else {
            return Ok(None);
        };

        if value < self.oversold {
            let signal = Signal::buy(close)
                .with_stop_loss(close.subpercent(5.0))
                .with_take_profit(close.addpercent(5.0))
                .with_strength((self.oversold - value) / self.oversold);
            return Ok(Some(signal));
        }
        Ok(None)
    }
}

/// Buys a new high of the lookback window.
struct Breakout {
    lookback: usize,
}

impl SignalSource for Breakout {
    fn name(&self) -> &str {
        "breakout"
    }

    fn generate_signal(&self, history: &[Bar], _asset: &str) -> Result<Option<Signal>> {
        let Some((bar, previous)) = history.split_last() else {
            return Ok(None);
        };
        let window = &previous[previous.len().saturating_sub(self.lookback)..];
        let high = window.iter().map(Bar::high).fold(f64::NEG_INFINITY, f64::max);

        if window.len() == self.lookback && bar.close() > high {
            let close = bar.close();
            return Ok(Some(Signal::buy(close).with_stop_loss(close.subpercent(3.0))));
        }
        Ok(None)
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).ok_or("invalid start date")?;
    let mut data = MarketData::new();
    for (seed, asset) in ["AAA", "BBB", "CCC", "DDD", "EEE"].into_iter().enumerate() {
        data.add(asset, generate_series(100 + seed as u64, 500, 50.0 + 25.0 * seed as f64, start)?)?;
    }

    let registry = SignalRegistry::new()
        .with(Arc::new(RsiReversion {
            name: "rsi-14".into(),
            period: 14,
            oversold: 30.0,
        }))
        .with(Arc::new(RsiReversion {
            name: "rsi-7".into(),
            period: 7,
            oversold: 25.0,
        }))
        .with(Arc::new(Breakout { lookback: 20 }));

    let mut multi = MultiBacktest::from_registry(&registry, &["rsi-14", "rsi-7", "breakout", "macd"], BacktestConfig::default());
    let end = NaiveDate::from_ymd_opt(2024, 3, 31);
    multi.run(&data, None, end);

    println!("{}", multi.comparison_report());
    Ok(())
}
