use std::{fmt::Display, io, str::FromStr};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    chart::RenderError, config::ConfigError, http::client::RequestError,
    indicators::IndicatorError,
};

/// Structure representing a candle (OHLCV data) as returned by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: i64,              // Open time, milliseconds since epoch.
    pub open: f64,                   // Opening price.
    pub high: f64,                   // Highest price.
    pub low: f64,                    // Lowest price.
    pub close: f64,                  // Closing price.
    pub volume: f64,                 // Base asset volume.
    pub close_time: i64,             // Close time, milliseconds since epoch.
    pub quote_asset_volume: f64,     // Quote asset volume.
    pub trades: u64,                 // Number of trades.
    pub taker_buy_base_volume: f64,  // Taker buy base asset volume.
    pub taker_buy_quote_volume: f64, // Taker buy quote asset volume.
}

impl Candle {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Checks that candles are strictly ascending by timestamp and carry finite prices.
pub fn check_series(candles: &[Candle]) -> std::result::Result<(), RequestError> {
    for (i, candle) in candles.iter().enumerate() {
        let prices = [candle.open, candle.high, candle.low, candle.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(RequestError::Malformed(format!(
                "non-finite price in candle {} ({})",
                i, candle.timestamp
            )));
        }
        if candle.datetime().is_none() {
            return Err(RequestError::Malformed(format!(
                "timestamp out of range in candle {}: {}",
                i, candle.timestamp
            )));
        }
        if i > 0 && candles[i - 1].timestamp >= candle.timestamp {
            return Err(RequestError::Malformed(format!(
                "candles not strictly ascending at index {}: {} after {}",
                i,
                candle.timestamp,
                candles[i - 1].timestamp
            )));
        }
    }
    Ok(())
}

/// Kline interval, using the exchange's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Second1,
    Minute1,
    Minute3,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour2,
    Hour4,
    Hour6,
    Hour8,
    Hour12,
    Day1,
    Day3,
    Week1,
    Month1,
}

impl Interval {
    pub const ALL: [Interval; 16] = [
        Interval::Second1,
        Interval::Minute1,
        Interval::Minute3,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour4,
        Interval::Hour6,
        Interval::Hour8,
        Interval::Hour12,
        Interval::Day1,
        Interval::Day3,
        Interval::Week1,
        Interval::Month1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Second1 => "1s",
            Interval::Minute1 => "1m",
            Interval::Minute3 => "3m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour2 => "2h",
            Interval::Hour4 => "4h",
            Interval::Hour6 => "6h",
            Interval::Hour8 => "8h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1d",
            Interval::Day3 => "3d",
            Interval::Week1 => "1w",
            Interval::Month1 => "1M",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    // "1M" (month) and "1m" (minute) differ only by case, so matching is exact.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .find(|interval| interval.as_str() == s.trim())
            .copied()
            .ok_or_else(|| {
                let valid: Vec<_> = Interval::ALL.iter().map(|i| i.as_str()).collect();
                format!("unknown interval '{}', expected one of {}", s, valid.join(" "))
            })
    }
}

/// Output image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by an analysis request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to fetch candles: {0}")]
    DataFetch(#[from] RequestError),
    #[error("Insufficient history for {symbol}: got {available} candles, need at least {needed}")]
    InsufficientHistory {
        symbol: String,
        needed: usize,
        available: usize,
    },
    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
