use chrono::NaiveDate;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One daily OHLCV observation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "RawBar"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bar {
    /// Creates a bar, rejecting non finite or non positive prices.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Result<Self> {
        for (label, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidBar(date, format!("{label} price is {price}")));
            }
        }
        if high < low {
            return Err(Error::InvalidBar(date, format!("high {high} is below low {low}")));
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Chronological bars of a single asset.
///
/// Dates are strictly increasing, so lookups by date are binary searches.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "RawSeries"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Creates a series from bars already sorted by date.
    ///
    /// ### Example
    /// ```rust
    /// use daybt::prelude::*;
    /// use chrono::NaiveDate;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    /// let bar = Bar::new(day, 100.0, 105.0, 99.0, 104.0, 1_000.0).unwrap();
    /// let series = PriceSeries::new(vec![bar]).unwrap();
    /// assert_eq!(series.len(), 1);
    /// ```
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(Error::UnsortedSeries(pair[1].date, pair[0].date));
            }
        }
        Ok(Self { bars })
    }

    /// Creates a series from named columns.
    ///
    /// Column names are matched case-insensitively against `open`, `high`,
    /// `low`, `close` and `volume`; extra columns are ignored.
    ///
    /// ### Example
    /// ```rust
    /// use daybt::prelude::*;
    /// use chrono::NaiveDate;
    ///
    /// let dates = vec![
    ///     NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    ///     NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    /// ];
    /// let series = PriceSeries::from_columns(
    ///     dates,
    ///     vec![
    ///         ("Open", vec![10.0, 11.0]),
    ///         ("HIGH", vec![12.0, 12.5]),
    ///         ("low", vec![9.5, 10.5]),
    ///         ("Close", vec![11.0, 12.0]),
    ///         ("Volume", vec![100.0, 120.0]),
    ///     ],
    /// )
    /// .unwrap();
    /// assert_eq!(series.last().unwrap().close(), 12.0);
    /// ```
    pub fn from_columns<S: AsRef<str>>(dates: Vec<NaiveDate>, columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let expected = dates.len();
        let mut lookup = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let name = name.as_ref().to_lowercase();
            if values.len() != expected {
                return Err(Error::ColumnLength(name, values.len(), expected));
            }
            lookup.push((name, values));
        }

        let column = |wanted: &str| -> Result<&Vec<f64>> {
            lookup
                .iter()
                .find(|(name, _)| name == wanted)
                .map(|(_, values)| values)
                .ok_or_else(|| Error::MissingColumn(wanted.to_string()))
        };

        let open = column("open")?;
        let high = column("high")?;
        let low = column("low")?;
        let close = column("close")?;
        let volume = column("volume")?;

        let bars = dates
            .iter()
            .enumerate()
            .map(|(i, date)| Bar::new(*date, open[i], high[i], low[i], close[i], volume[i]))
            .collect::<Result<Vec<_>>>()?;

        Self::new(bars)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Returns the bar dated exactly `date`.
    pub fn bar_on(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .map(|idx| &self.bars[idx])
    }

    /// Returns every bar dated on or before `date`.
    pub fn window_until(&self, date: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|bar| bar.date <= date);
        &self.bars[..end]
    }

    /// Returns the latest close known on `date`.
    pub fn last_close_until(&self, date: NaiveDate) -> Option<f64> {
        self.window_until(date).last().map(Bar::close)
    }
}

/// Per-asset series in the caller's scan order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "RawMarket"))]
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    assets: Vec<(String, PriceSeries)>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an asset; its position in the list is its entry-scan priority.
    pub fn add(&mut self, asset: impl Into<String>, series: PriceSeries) -> Result<()> {
        let asset = asset.into();
        if self.get(&asset).is_some() {
            return Err(Error::DuplicateAsset(asset));
        }
        self.assets.push((asset, series));
        Ok(())
    }

    /// Builder flavour of [`MarketData::add`].
    pub fn with_asset(mut self, asset: impl Into<String>, series: PriceSeries) -> Result<Self> {
        self.add(asset, series)?;
        Ok(self)
    }

    pub fn get(&self, asset: &str) -> Option<&PriceSeries> {
        self.assets.iter().find(|(id, _)| id == asset).map(|(_, series)| series)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceSeries)> {
        self.assets.iter().map(|(id, series)| (id.as_str(), series))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// True when no asset holds a single bar.
    pub fn is_empty(&self) -> bool {
        self.assets.iter().all(|(_, series)| series.is_empty())
    }

    /// Sorted union of every date, bounded by `[start, end]` when given.
    pub fn dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<NaiveDate> {
        let mut dates = self
            .assets
            .iter()
            .flat_map(|(_, series)| series.bars().iter().map(Bar::date))
            .filter(|date| start.is_none_or(|s| *date >= s) && end.is_none_or(|e| *date <= e))
            .collect::<Vec<_>>();
        dates.sort_unstable();
        dates.dedup();
        dates
    }
}

// Deserialized values go through the same checks as the constructors.

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBar> for Bar {
    type Error = Error;

    fn try_from(raw: RawBar) -> Result<Self> {
        Bar::new(raw.date, raw.open, raw.high, raw.low, raw.close, raw.volume)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawSeries {
    bars: Vec<Bar>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSeries> for PriceSeries {
    type Error = Error;

    fn try_from(raw: RawSeries) -> Result<Self> {
        PriceSeries::new(raw.bars)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawMarket {
    assets: Vec<(String, PriceSeries)>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMarket> for MarketData {
    type Error = Error;

    fn try_from(raw: RawMarket) -> Result<Self> {
        raw.assets
            .into_iter()
            .try_fold(MarketData::new(), |data, (asset, series)| data.with_asset(asset, series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> Bar {
        Bar::new(day(d), close, close + 1.0, close - 1.0, close, 10.0).unwrap()
    }

    #[test]
    fn reject_non_positive_price() {
        let result = Bar::new(day(1), 10.0, 11.0, 0.0, 10.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidBar(_, _))));
    }

    #[test]
    fn reject_unsorted_series() {
        let result = PriceSeries::new(vec![bar(2, 10.0), bar(1, 11.0)]);
        assert!(matches!(result, Err(Error::UnsortedSeries(_, _))));

        let result = PriceSeries::new(vec![bar(2, 10.0), bar(2, 11.0)]);
        assert!(matches!(result, Err(Error::UnsortedSeries(_, _))));
    }

    #[test]
    fn columns_are_case_insensitive() {
        let series = PriceSeries::from_columns(
            vec![day(1)],
            vec![
                ("OPEN", vec![10.0]),
                ("High", vec![11.0]),
                ("lOw", vec![9.0]),
                ("close", vec![10.5]),
                ("VOLUME", vec![5.0]),
                ("adj close", vec![10.4]),
            ],
        )
        .unwrap();
        assert_eq!(series.bar_on(day(1)).unwrap().close(), 10.5);
    }

    #[test]
    fn missing_or_ragged_columns() {
        let result = PriceSeries::from_columns(
            vec![day(1)],
            vec![("open", vec![10.0]), ("high", vec![11.0]), ("low", vec![9.0]), ("volume", vec![1.0])],
        );
        assert!(matches!(result, Err(Error::MissingColumn(name)) if name == "close"));

        let result = PriceSeries::from_columns(vec![day(1), day(2)], vec![("open", vec![10.0])]);
        assert!(matches!(result, Err(Error::ColumnLength(_, 1, 2))));
    }

    #[test]
    fn windows_and_lookups() {
        let series = PriceSeries::new(vec![bar(1, 10.0), bar(3, 11.0), bar(5, 12.0)]).unwrap();
        assert!(series.bar_on(day(2)).is_none());
        assert_eq!(series.bar_on(day(3)).unwrap().close(), 11.0);
        assert_eq!(series.window_until(day(4)).len(), 2);
        assert_eq!(series.window_until(day(5)).len(), 3);
        assert!(series.window_until(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()).is_empty());
        assert_eq!(series.last_close_until(day(4)), Some(11.0));
    }

    #[test]
    fn market_dates_union() {
        let a = PriceSeries::new(vec![bar(1, 10.0), bar(3, 11.0)]).unwrap();
        let b = PriceSeries::new(vec![bar(2, 20.0), bar(3, 21.0), bar(4, 22.0)]).unwrap();
        let data = MarketData::new().with_asset("A", a).unwrap().with_asset("B", b).unwrap();

        assert_eq!(data.dates(None, None), vec![day(1), day(2), day(3), day(4)]);
        assert_eq!(data.dates(Some(day(2)), Some(day(3))), vec![day(2), day(3)]);
    }

    #[test]
    fn duplicate_asset() {
        let mut data = MarketData::new();
        data.add("A", PriceSeries::default()).unwrap();
        assert!(matches!(data.add("A", PriceSeries::default()), Err(Error::DuplicateAsset(_))));
        assert!(data.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialization_is_validated() {
        let series = PriceSeries::new(vec![bar(1, 10.0), bar(2, 11.0)]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(serde_json::from_str::<PriceSeries>(&json).unwrap(), series);

        let unsorted = r#"{"bars":[
            {"date":"2024-03-02","open":10.0,"high":11.0,"low":9.0,"close":10.0,"volume":1.0},
            {"date":"2024-03-01","open":10.0,"high":11.0,"low":9.0,"close":10.0,"volume":1.0}
        ]}"#;
        assert!(serde_json::from_str::<PriceSeries>(unsorted).is_err());

        let inverted = r#"{"date":"2024-03-01","open":10.0,"high":9.0,"low":11.0,"close":10.0,"volume":1.0}"#;
        assert!(serde_json::from_str::<Bar>(inverted).is_err());

        let duplicated = format!(r#"{{"assets":[["A",{json}],["A",{json}]]}}"#);
        assert!(serde_json::from_str::<MarketData>(&duplicated).is_err());
    }
}
