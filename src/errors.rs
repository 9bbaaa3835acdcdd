use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The initial capital is not positive. Trading requires a positive balance.
    #[error("Initial capital must be positive (got: {0})")]
    NegZeroBalance(f64),

    /// A commission or slippage rate is negative.
    #[error("{0} rate must be non negative (got: {1})")]
    NegRate(&'static str, f64),

    /// The fraction of capital allowed per position is outside `(0, 1]`.
    #[error("Position size must be in (0, 1] (got: {0})")]
    InvalidPositionSize(f64),

    /// A bar holds a non finite or non positive price.
    #[error("Invalid bar at {0}: {1}")]
    InvalidBar(NaiveDate, String),

    /// Bars are not in strictly increasing date order.
    #[error("Bars must be in strictly increasing date order ({0} follows {1})")]
    UnsortedSeries(NaiveDate, NaiveDate),

    /// A required OHLCV column is missing.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column does not have one value per date.
    #[error("Column {0} has {1} values, expected {2}")]
    ColumnLength(String, usize, usize),

    /// The same asset id was added twice to the market data.
    #[error("Duplicate asset: {0}")]
    DuplicateAsset(String),

    /// No signal source is registered under this name.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A signal source failed to evaluate a history window.
    #[error("Signal error: {0}")]
    Signal(String),

    /// Generic error message.
    #[error("{0}")]
    Msg(String),

    /// Chart rendering failed.
    #[cfg(feature = "draws")]
    #[error("Plotters error: {0}")]
    Plotters(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
