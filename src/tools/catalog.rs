use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    analysis::{Analyst, CandleSource},
    binance::api_caller::BinanceClient,
    config, constants,
    export::{self, Artifact, Delivery},
    http::client::RequestError,
    model::{AnalysisError, ImageFormat, Interval},
};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

fn default_symbol() -> String {
    constants::DEFAULT_SYMBOL.to_string()
}

fn default_depth_limit() -> u32 {
    constants::TOOL_DEPTH_LIMIT
}

fn default_trades_limit() -> u32 {
    constants::TOOL_TRADES_LIMIT
}

fn default_kline_interval() -> String {
    constants::TOOL_KLINE_INTERVAL.to_string()
}

fn default_kline_limit() -> u32 {
    constants::TOOL_KLINE_LIMIT
}

#[derive(Debug, Deserialize)]
struct PriceArgs {
    #[serde(default = "default_symbol")]
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct DepthArgs {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_depth_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct TradesArgs {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_trades_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct KlineArgs {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_kline_interval")]
    interval: String,
    #[serde(default = "default_kline_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct AnalyzeInput {
    symbol: String,
}

// Accepts both `{"input": {"symbol": ..}}` and a bare `{"symbol": ..}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnalyzeArgs {
    Wrapped { input: AnalyzeInput },
    Flat(AnalyzeInput),
}

impl AnalyzeArgs {
    fn symbol(self) -> String {
        match self {
            AnalyzeArgs::Wrapped { input } | AnalyzeArgs::Flat(input) => input.symbol,
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Tool descriptors advertised by `tools/list`.
pub fn definitions() -> Value {
    let symbol = json!({
        "type": "string",
        "description": "Trading pair, e.g. BTCUSDT or ETHUSDT",
        "default": constants::DEFAULT_SYMBOL
    });
    let intervals: Vec<&str> = Interval::ALL.iter().map(|i| i.as_str()).collect();

    json!([
        {
            "name": "get_price",
            "description": "Current price of a trading pair.",
            "inputSchema": {
                "type": "object",
                "properties": { "symbol": symbol.clone() }
            }
        },
        {
            "name": "get_orderbook",
            "description": "Order book snapshot of a trading pair.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": symbol.clone(),
                    "limit": {
                        "type": "integer",
                        "enum": constants::ORDER_BOOK_LIMITS,
                        "default": constants::TOOL_DEPTH_LIMIT
                    }
                }
            }
        },
        {
            "name": "get_recent_trades",
            "description": "Most recent executed trades of a trading pair.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": symbol.clone(),
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": constants::KLINE_LIMIT_MAX,
                        "default": constants::TOOL_TRADES_LIMIT
                    }
                }
            }
        },
        {
            "name": "get_klines",
            "description": "Price candles of a trading pair.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": symbol.clone(),
                    "interval": {
                        "type": "string",
                        "enum": intervals,
                        "default": constants::TOOL_KLINE_INTERVAL
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": constants::KLINE_LIMIT_MAX,
                        "default": constants::TOOL_KLINE_LIMIT
                    }
                }
            }
        },
        {
            "name": "analyze_indicators",
            "description": "Technical analysis chart (price, RSI, Stoch RSI, Williams %R, MACD, ADX, FDI, Hurst) as a base64 data URI.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "input": {
                        "type": "object",
                        "properties": { "symbol": { "type": "string" } },
                        "required": ["symbol"]
                    }
                },
                "required": ["input"]
            }
        }
    ])
}

/// Market tools plus the analysis capability, dispatched by name.
pub struct ToolBox<S> {
    analyst: Analyst<S>,
    market: BinanceClient,
    format: ImageFormat, // Encoding of analyze_indicators images.
}

impl<S: CandleSource> ToolBox<S> {
    pub fn new(analyst: Analyst<S>, market: BinanceClient, format: ImageFormat) -> Self {
        Self {
            analyst,
            market,
            format,
        }
    }

    /// Runs a tool and returns its text payload.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        log::info!("Tool call: {}", name);
        match name {
            "get_price" => {
                let args: PriceArgs = parse_args(arguments)?;
                Ok(self.market.ticker_price(&args.symbol).await?.to_string())
            }
            "get_orderbook" => {
                let args: DepthArgs = parse_args(arguments)?;
                Ok(self
                    .market
                    .order_book(&args.symbol, args.limit)
                    .await?
                    .to_string())
            }
            "get_recent_trades" => {
                let args: TradesArgs = parse_args(arguments)?;
                let limit = config::check_limit(args.limit).map_err(ToolError::InvalidArguments)?;
                Ok(self
                    .market
                    .recent_trades(&args.symbol, limit)
                    .await?
                    .to_string())
            }
            "get_klines" => {
                let args: KlineArgs = parse_args(arguments)?;
                let interval: Interval = args
                    .interval
                    .parse()
                    .map_err(ToolError::InvalidArguments)?;
                let limit = config::check_limit(args.limit).map_err(ToolError::InvalidArguments)?;
                Ok(self
                    .market
                    .raw_klines(&args.symbol, interval, limit)
                    .await?
                    .to_string())
            }
            "analyze_indicators" => {
                let args: AnalyzeArgs = parse_args(arguments)?;
                let artifact = self
                    .analyst
                    .artifact(&args.symbol(), self.format, Delivery::Base64)
                    .await?;
                Ok(match artifact {
                    Artifact::DataUri(uri) => uri,
                    Artifact::Bytes(bytes) => export::data_uri(&bytes, self.format),
                    Artifact::File(path) => path.display().to_string(),
                })
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
