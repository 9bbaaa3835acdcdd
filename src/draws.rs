//! Module for visualizing the equity curve and drawdown of a backtest.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use plotters::backend::{BitMapBackend, DrawingBackend, SVGBackend};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::WHITE;

use crate::engine::{Backtest, EquitySnapshot};
use crate::errors::{Error, Result};
use crate::metrics::PerformanceMetrics;

/// Aspect ratio for the generated charts.
const ASPECT_RATIO: f64 = 0.5625;
/// Size of the X-axis labels.
const X_LABEL_SIZE: i32 = 20;
/// Size of the Y-axis labels.
const Y_LABEL_SIZE: i32 = 20;

/// Output formats for the generated charts with output filename.
pub enum DrawOutput {
    /// Save to the output SVG file.
    Svg(&'static str),
    /// Save to the output PNG file.
    Png(&'static str),
}

impl Default for DrawOutput {
    fn default() -> Self {
        Self::Svg("equity.svg")
    }
}

/// Configuration options for chart generation.
#[derive(Default)]
pub struct DrawOptions {
    /// Chart title.
    title: Option<String>,
    /// Output format and path.
    output: DrawOutput,
    /// Whether to show the drawdown chart.
    show_drawdown: bool,
    /// Whether to mark trade exits on the equity curve.
    show_trades: bool,
    /// Whether to print the headline metrics over the equity curve.
    show_metrics: bool,
}

impl DrawOptions {
    /// Sets the chart title.
    pub fn title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Sets the output format and path.
    pub fn draw_output(mut self, output: DrawOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables or disables the drawdown chart.
    pub fn show_drawdown(mut self, show: bool) -> Self {
        self.show_drawdown = show;
        self
    }

    /// Enables or disables the trade exit markers.
    pub fn show_trades(mut self, show: bool) -> Self {
        self.show_trades = show;
        self
    }

    /// Enables or disables the metrics caption.
    pub fn show_metrics(mut self, show: bool) -> Self {
        self.show_metrics = show;
        self
    }
}

fn to_datetime(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Chart drawing utility for a finished backtest.
#[derive(Default)]
pub struct Draw<'d> {
    /// Reference to the backtest data.
    backtest: Option<&'d Backtest>,
    /// Drawing options.
    options: DrawOptions,
}

impl<'d> Draw<'d> {
    /// Creates a new `Draw` instance with the given backtest.
    pub fn with_backtest(backtest: &'d Backtest) -> Self {
        Self {
            backtest: Some(backtest),
            options: DrawOptions::default(),
        }
    }

    /// Sets the drawing options.
    pub fn with_options(mut self, options: DrawOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates and saves the chart based on the configured options.
    pub fn plot(&self) -> Result<()> {
        let backtest = self.backtest.ok_or(Error::Msg("No backtest provided".to_string()))?;
        let curve = backtest.equity_curve();
        if curve.len() < 2 {
            return Err(Error::Msg("At least two equity snapshots are needed to draw".to_string()));
        }

        let title = self.options.title.as_deref().unwrap_or(backtest.strategy_name());
        let height_factor = if self.options.show_drawdown { 1.4 } else { 1.0 };
        let width = 1280.max(4 * curve.len() as u32);
        let height = ((width as f64 * ASPECT_RATIO * height_factor) as u32).min(900);

        match self.options.output {
            DrawOutput::Svg(path) => {
                let root = SVGBackend::new(path, (width, height)).into_drawing_area();
                root.fill(&WHITE).map_err(|e| Error::Plotters(e.to_string()))?;
                self.draw_chart(&root, backtest, title)
            }
            DrawOutput::Png(path) => {
                let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
                root.fill(&WHITE).map_err(|e| Error::Plotters(e.to_string()))?;
                self.draw_chart(&root, backtest, title)
            }
        }
    }

    /// Draws the equity chart and, below it, the drawdown chart.
    fn draw_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        backtest: &Backtest,
        title: &str,
    ) -> Result<()> {
        let total_height = drawing_area.dim_in_pixel().1 as f64;
        let (equity_area, drawdown_area) = if self.options.show_drawdown {
            drawing_area.split_vertically((total_height * 0.7) as u32)
        } else {
            (drawing_area.clone(), drawing_area.clone())
        };

        self.draw_equity_chart(&equity_area, backtest, title)?;
        if self.options.show_metrics {
            let caption = Text::new(
                metrics_caption(backtest.metrics()),
                (90, 50),
                ("sans-serif", 18).into_font(),
            );
            equity_area.draw(&caption).map_err(|e| Error::Plotters(e.to_string()))?;
        }
        if self.options.show_drawdown {
            self.draw_drawdown_chart(&drawdown_area, backtest.equity_curve())?;
        }

        drawing_area.present().map_err(|e| Error::Plotters(e.to_string()))
    }

    /// Draws the equity line against the initial capital.
    fn draw_equity_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        backtest: &Backtest,
        title: &str,
    ) -> Result<()> {
        let curve = backtest.equity_curve();
        let first = curve.first().ok_or(Error::Msg("Empty equity curve".to_string()))?;
        let last = curve.last().ok_or(Error::Msg("Empty equity curve".to_string()))?;
        let (first_time, last_time) = (to_datetime(first.date), to_datetime(last.date));

        let initial_capital = backtest.config().initial_capital();
        let min_equity = curve.iter().map(|s| s.equity).fold(initial_capital, f64::min);
        let max_equity = curve.iter().map(|s| s.equity).fold(initial_capital, f64::max);
        let padding = ((max_equity - min_equity) * 0.1).max(initial_capital * 0.01);

        let (top, bottom) = if self.options.show_drawdown { (10, 0) } else { (10, 10) };
        let drawing_area = drawing_area.margin(top, bottom, 70, 70);
        let mut builder = ChartBuilder::on(&drawing_area);
        if !self.options.show_drawdown {
            builder.x_label_area_size(X_LABEL_SIZE);
        }

        let mut chart = builder
            .caption(title, ("sans-serif", 30).into_font())
            .y_label_area_size(Y_LABEL_SIZE * 4)
            .build_cartesian_2d(first_time..last_time, min_equity - padding..max_equity + padding)
            .map_err(|e| Error::Plotters(e.to_string()))?;

        {
            let mut mesh = chart.configure_mesh();
            mesh.y_desc("Equity")
                .y_label_style(("sans-serif", Y_LABEL_SIZE))
                .y_labels(5);

            if self.options.show_drawdown {
                mesh.disable_x_axis();
            } else {
                mesh.x_desc("Date")
                    .x_label_style(("sans-serif", X_LABEL_SIZE))
                    .x_labels(10);
            }

            mesh.draw().map_err(|e| Error::Plotters(e.to_string()))?;
        }

        chart
            .draw_series(LineSeries::new(
                [(first_time, initial_capital), (last_time, initial_capital)],
                BLACK.mix(0.4),
            ))
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(
                curve.iter().map(|s| (to_datetime(s.date), s.equity)),
                BLUE,
            ))
            .map_err(|e| Error::Plotters(e.to_string()))?;

        if self.options.show_trades {
            let exits = backtest.trades().iter().filter_map(|trade| {
                let idx = curve.binary_search_by_key(&trade.exit_date, |s| s.date).ok()?;
                let color = if trade.is_win() { GREEN.filled() } else { RED.filled() };
                Some(Circle::new((to_datetime(trade.exit_date), curve[idx].equity), 3, color))
            });
            chart.draw_series(exits).map_err(|e| Error::Plotters(e.to_string()))?;
        }

        Ok(())
    }

    /// Draws the running drawdown in percent of the peak.
    fn draw_drawdown_chart<DB: DrawingBackend>(
        &self,
        drawing_area: &DrawingArea<DB, Shift>,
        curve: &[EquitySnapshot],
    ) -> Result<()> {
        let drawdowns = drawdown_percents(curve);
        let first_time = drawdowns.first().ok_or(Error::Msg("Empty equity curve".to_string()))?.0;
        let last_time = drawdowns.last().ok_or(Error::Msg("Empty equity curve".to_string()))?.0;
        let deepest = drawdowns.iter().map(|(_, dd)| *dd).fold(0.0, f64::min).min(-1.0);

        let drawing_area = drawing_area.margin(0, 10, 70, 70);
        let mut chart = ChartBuilder::on(&drawing_area)
            .x_label_area_size(X_LABEL_SIZE)
            .y_label_area_size(Y_LABEL_SIZE * 4)
            .build_cartesian_2d(first_time..last_time, deepest * 1.1..0.0)
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Drawdown %")
            .x_label_style(("sans-serif", X_LABEL_SIZE))
            .y_label_style(("sans-serif", Y_LABEL_SIZE))
            .x_labels(10)
            .y_labels(3)
            .draw()
            .map_err(|e| Error::Plotters(e.to_string()))?;

        chart
            .draw_series(AreaSeries::new(drawdowns, 0.0, RED.mix(0.3)).border_style(RED))
            .map(|_| ())
            .map_err(|e| Error::Plotters(e.to_string()))
    }
}

/// `(date, equity / running peak - 1)` in percent for each snapshot.
fn drawdown_percents(curve: &[EquitySnapshot]) -> Vec<(DateTime<Utc>, f64)> {
    let mut peak = f64::NEG_INFINITY;
    curve
        .iter()
        .map(|snapshot| {
            peak = peak.max(snapshot.equity);
            let drawdown = if peak > 0.0 {
                (snapshot.equity / peak - 1.0) * 100.0
            } else {
                0.0
            };
            (to_datetime(snapshot.date), drawdown)
        })
        .collect()
}

/// One-line summary of the headline metrics.
pub fn metrics_caption(metrics: &PerformanceMetrics) -> String {
    format!(
        "Return: {:.2}% | Max Drawdown: {:.2}% | Sharpe Ratio: {:.2} | Win Rate: {:.2}%",
        metrics.total_return_percent, metrics.max_drawdown_percent, metrics.sharpe_ratio, metrics.win_rate
    )
}
