use std::sync::Arc;

use chrono::NaiveDate;
use daybt::prelude::*;
use ta::{Next, indicators::ExponentialMovingAverage};

/// Buys when the fast EMA crosses above the slow one.
struct EmaCross {
    fast: usize,
    slow: usize,
}

impl SignalSource for EmaCross {
    fn name(&self) -> &str {
        "ema-cross"
    }

    fn generate_signal(&self, history: &[Bar], asset: &str) -> Result<Option<Signal>> {
        let mut fast = ExponentialMovingAverage::new(self.fast).map_err(|e| Error::Signal(e.to_string()))?;
        let mut slow = ExponentialMovingAverage::new(self.slow).map_err(|e| Error::Signal(e.to_string()))?;

        let spreads = history
            .iter()
            .map(|bar| fast.next(bar.close()) - slow.next(bar.close()))
            .collect::<Vec<_>>();
        let ([.., previous, current], Some(bar)) = (spreads.as_slice(), history.last()) else {
            return Ok(None);
        };

        if *previous <= 0.0 && *current > 0.0 {
            let close = bar.close();
            let signal = Signal::buy(close)
                .with_name(asset.to_lowercase())
                .with_stop_loss(close.subpercent(4.0))
                .with_take_profit(close.addpercent(8.0))
                .with_reason("ema cross up");
            return Ok(Some(signal));
        }
        Ok(None)
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).ok_or("invalid start date")?;
    let mut data = MarketData::new();
    for (seed, (asset, price)) in [("AAPL", 180.0), ("MSFT", 320.0), ("NVDA", 450.0), ("TSLA", 240.0)]
        .into_iter()
        .enumerate()
    {
        data.add(asset, generate_series(seed as u64, 365, price, start)?)?;
    }

    let config = BacktestConfig::builder()
        .initial_capital(100_000.0)
        .commission_rate(0.0005)
        .slippage_rate(0.001)
        .max_position_size(0.2)
        .max_positions(4)
        .build()?;

    let mut backtest = Backtest::new(Arc::new(EmaCross { fast: 5, slow: 20 }), config);
    let metrics = backtest.run(&data);
    println!("{metrics}");

    for trade in backtest.trades().iter().take(10) {
        println!(
            "{} {:<5} {} -> {} qty {:>4} pnl {:>10.2} ({:>6.2}%) {}",
            trade.strategy, trade.name, trade.entry_date, trade.exit_date, trade.quantity, trade.pnl, trade.pnl_percent, trade.exit_reason
        );
    }

    #[cfg(feature = "serde")]
    backtest.report().write_json("single_strategy.json")?;

    #[cfg(feature = "draws")]
    {
        let options = DrawOptions::default()
            .title("EMA cross")
            .draw_output(DrawOutput::Svg("single_strategy.svg"))
            .show_drawdown(true)
            .show_trades(true)
            .show_metrics(true);
        Draw::with_backtest(&backtest).with_options(options).plot()?;
    }

    Ok(())
}
