use std::time::Duration;

use serde_json::Value;

use super::response::KlineRow;
use crate::{
    analysis::CandleSource,
    config::Settings,
    constants,
    http::client::{self, RequestError},
    model::{self, Candle, Interval},
};

/// Client for the exchange's public market-data endpoints.
#[derive(Debug, Clone)]
pub struct BinanceClient {
    base_url: String,
    timeout: Duration,
}

impl BinanceClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout: settings.http_timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetches candles for a symbol, oldest first.
    pub async fn klines(
        &self,
        symbol: &str,       // Trading pair, e.g. BTCUSDT.
        interval: Interval, // Candle width.
        limit: u32,         // Number of candles to fetch.
    ) -> Result<Vec<Candle>, RequestError> {
        let symbol = normalize_symbol(symbol)?;
        let rows = client::request::<Vec<KlineRow>>(
            &self.endpoint("/api/v3/klines"),
            &[
                ("symbol", symbol.clone()),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ],
            self.timeout,
        )
        .await?;

        let candles = candles_from_rows(&symbol, rows)?;
        log::info!(
            "Fetched {} {} candles for {}",
            candles.len(),
            interval,
            symbol
        );
        Ok(candles)
    }

    /// Raw klines payload, as served by the exchange.
    pub async fn raw_klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Value, RequestError> {
        let symbol = normalize_symbol(symbol)?;
        client::request(
            &self.endpoint("/api/v3/klines"),
            &[
                ("symbol", symbol),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ],
            self.timeout,
        )
        .await
    }

    /// Latest traded price.
    pub async fn ticker_price(&self, symbol: &str) -> Result<Value, RequestError> {
        let symbol = normalize_symbol(symbol)?;
        client::request(
            &self.endpoint("/api/v3/ticker/price"),
            &[("symbol", symbol)],
            self.timeout,
        )
        .await
    }

    /// Order book snapshot with `limit` levels per side.
    pub async fn order_book(&self, symbol: &str, limit: u32) -> Result<Value, RequestError> {
        let symbol = normalize_symbol(symbol)?;
        if !constants::ORDER_BOOK_LIMITS.contains(&limit) {
            return Err(RequestError::InvalidRequest(format!(
                "order book limit {} not one of {:?}",
                limit,
                constants::ORDER_BOOK_LIMITS
            )));
        }
        client::request(
            &self.endpoint("/api/v3/depth"),
            &[("symbol", symbol), ("limit", limit.to_string())],
            self.timeout,
        )
        .await
    }

    /// Most recent trades.
    pub async fn recent_trades(&self, symbol: &str, limit: u32) -> Result<Value, RequestError> {
        let symbol = normalize_symbol(symbol)?;
        client::request(
            &self.endpoint("/api/v3/trades"),
            &[("symbol", symbol), ("limit", limit.to_string())],
            self.timeout,
        )
        .await
    }
}

impl CandleSource for BinanceClient {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Candle>, RequestError> {
        self.klines(symbol, interval, limit).await
    }
}

/// Upper-cases a trading pair and rejects anything that is not alphanumeric.
pub fn normalize_symbol(symbol: &str) -> Result<String, RequestError> {
    let symbol = symbol.trim();
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RequestError::InvalidRequest(format!(
            "invalid symbol '{}'",
            symbol
        )));
    }
    Ok(symbol.to_ascii_uppercase())
}

// Converts exchange rows into candles, failing on the first unparsable field.
fn candles_from_rows(symbol: &str, rows: Vec<KlineRow>) -> Result<Vec<Candle>, RequestError> {
    if rows.is_empty() {
        return Err(RequestError::NoData(format!("no candles returned for {}", symbol)));
    }

    let mut candles = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        candles.push(Candle {
            timestamp: row.0,
            open: parse_decimal(&row.1, "open", i)?,
            high: parse_decimal(&row.2, "high", i)?,
            low: parse_decimal(&row.3, "low", i)?,
            close: parse_decimal(&row.4, "close", i)?,
            volume: parse_decimal(&row.5, "volume", i)?,
            close_time: row.6,
            quote_asset_volume: parse_decimal(&row.7, "quote asset volume", i)?,
            trades: row.8,
            taker_buy_base_volume: parse_decimal(&row.9, "taker buy base volume", i)?,
            taker_buy_quote_volume: parse_decimal(&row.10, "taker buy quote volume", i)?,
        });
    }
    model::check_series(&candles)?;
    Ok(candles)
}

fn parse_decimal(raw: &str, field: &str, row: usize) -> Result<f64, RequestError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            RequestError::Malformed(format!("row {}: {} '{}' is not a number", row, field, raw))
        })
}
