use serde::{Deserialize, de::IgnoredAny};

/// One row of `GET /api/v3/klines`. Decimals arrive as strings.
#[derive(Debug, Deserialize)]
pub struct KlineRow(
    pub i64,         // Open time.
    pub String,      // Open.
    pub String,      // High.
    pub String,      // Low.
    pub String,      // Close.
    pub String,      // Volume.
    pub i64,         // Close time.
    pub String,      // Quote asset volume.
    pub u64,         // Number of trades.
    pub String,      // Taker buy base asset volume.
    pub String,      // Taker buy quote asset volume.
    pub IgnoredAny,  // Unused field.
);
