// Data source
pub const BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const HTTP_TIMEOUT_SECS: u64 = 10;
pub const KLINE_LIMIT: u32 = 100;
pub const KLINE_LIMIT_MAX: u32 = 1000;
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

// Indicator windows
pub const RSI_WINDOW: usize = 14;
pub const STOCH_RSI_SMOOTH: usize = 3;
pub const WILLIAMS_R_WINDOW: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const ADX_WINDOW: usize = 14;
pub const FDI_WINDOW: usize = 10;
pub const HURST_MAX_LAG: usize = 20;
pub const HURST_SPAN: usize = 21;
pub const HURST_TAU_FLOOR: f64 = 1e-8;

// Chart
pub const CHART_WIDTH: u32 = 1800;
pub const CHART_HEIGHT: u32 = 1200;

// Order book depths accepted by the exchange.
pub const ORDER_BOOK_LIMITS: [u32; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];

// Tool server defaults
pub const TOOL_DEPTH_LIMIT: u32 = 5;
pub const TOOL_TRADES_LIMIT: u32 = 5;
pub const TOOL_KLINE_INTERVAL: &str = "1h";
pub const TOOL_KLINE_LIMIT: u32 = 10;
pub const PROTOCOL_VERSION: &str = "2024-11-05";
