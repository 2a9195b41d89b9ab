//! Orchestration: fetch candles, compute indicators, lay them out for the chart.

use chrono::{DateTime, Utc};

use crate::{
    chart,
    config::Settings,
    export::{self, Artifact, Delivery},
    http::client::RequestError,
    indicators::{IndicatorParams, IndicatorSet, Series},
    model::{self, AnalysisError, Candle, ImageFormat, Interval, Result},
};

/// Anything that can supply an ordered candle history.
///
/// Implementations must fail explicitly on network or parse errors rather
/// than return partial data.
#[allow(async_fn_in_trait)]
pub trait CandleSource {
    async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> std::result::Result<Vec<Candle>, RequestError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub interval: Interval,
    pub limit: u32,
    pub indicators: IndicatorParams,
}

impl AnalysisParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.interval,
            limit: settings.limit,
            indicators: IndicatorParams::default(),
        }
    }
}

/// A chart panel: named lines sharing one y-axis plus horizontal guides.
#[derive(Debug)]
pub struct Panel<'a> {
    pub title: &'static str,
    pub lines: Vec<(&'static str, &'a Series)>,
    pub guides: &'static [f64],
}

/// Computed analysis for one symbol, aligned on the candle timestamps.
#[derive(Debug, Clone)]
pub struct Report {
    pub symbol: String,
    pub title: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub close: Series,
    pub indicators: IndicatorSet,
}

impl Report {
    /// The four stacked panels of the chart, top to bottom.
    pub fn panels(&self) -> Vec<Panel<'_>> {
        let ind = &self.indicators;
        vec![
            Panel {
                title: "Price",
                lines: vec![("Price", &self.close)],
                guides: &[],
            },
            Panel {
                title: "Momentum (RSI, Stoch RSI, Williams %R)",
                lines: vec![
                    ("RSI", &ind.rsi),
                    ("Stoch RSI", &ind.stoch_rsi.k),
                    ("Williams %R", &ind.williams_r),
                ],
                guides: &[70.0, 30.0],
            },
            Panel {
                title: "Trend (MACD, ADX)",
                lines: vec![
                    ("MACD", &ind.macd.macd),
                    ("Signal", &ind.macd.signal),
                    ("ADX", &ind.adx.adx),
                ],
                guides: &[],
            },
            Panel {
                title: "Fractality (FDI, Hurst exponent)",
                lines: vec![("FDI", &ind.fdi), ("Hurst", &ind.hurst)],
                guides: &[0.5],
            },
        ]
    }
}

/// Fetches candles for `symbol` and computes its report. No retries.
pub async fn analyze<S: CandleSource>(
    source: &S,
    symbol: &str,
    params: &AnalysisParams,
) -> Result<Report> {
    let candles = source.fetch(symbol, params.interval, params.limit).await?;
    build_report(symbol, &candles, &params.indicators)
}

/// Computes a report from an already fetched candle history.
pub fn build_report(symbol: &str, candles: &[Candle], params: &IndicatorParams) -> Result<Report> {
    let symbol = symbol.trim().to_ascii_uppercase();
    if candles.is_empty() {
        return Err(RequestError::NoData(format!("no candles returned for {}", symbol)).into());
    }
    model::check_series(candles)?;

    let needed = params.min_history();
    if candles.len() < needed {
        return Err(AnalysisError::InsufficientHistory {
            symbol,
            needed,
            available: candles.len(),
        });
    }
    if candles.len() < params.full_history() {
        let partial: Vec<_> = params
            .requirements()
            .into_iter()
            .filter(|(_, n)| *n > candles.len())
            .map(|(name, _)| name)
            .collect();
        log::warn!(
            "{}: {} candles leave {} fully undefined",
            symbol,
            candles.len(),
            partial.join(", ")
        );
    }

    // check_series has already validated every timestamp.
    let timestamps: Vec<DateTime<Utc>> = candles.iter().filter_map(Candle::datetime).collect();
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();

    let indicators = IndicatorSet::compute(&close, &high, &low, params)?;

    let title = format!(
        "{} - price history ({} to {})",
        symbol,
        timestamps[0].date_naive(),
        timestamps[timestamps.len() - 1].date_naive()
    );

    Ok(Report {
        symbol,
        title,
        timestamps,
        close: close.into_iter().map(Some).collect(),
        indicators,
    })
}

/// The "analyze a symbol, get an artifact" capability handed to front ends.
pub struct Analyst<S> {
    source: S,
    params: AnalysisParams,
    chart_size: (u32, u32),
}

impl<S: CandleSource> Analyst<S> {
    pub fn new(source: S, params: AnalysisParams, chart_size: (u32, u32)) -> Self {
        Self {
            source,
            params,
            chart_size,
        }
    }

    pub async fn report(&self, symbol: &str) -> Result<Report> {
        analyze(&self.source, symbol, &self.params).await
    }

    /// Runs the analysis and delivers the rendered chart as requested.
    pub async fn artifact(
        &self,
        symbol: &str,
        format: ImageFormat,
        delivery: Delivery,
    ) -> Result<Artifact> {
        let report = self.report(symbol).await?;
        self.deliver(&report, format, delivery)
    }

    /// Renders an already computed report and delivers it.
    pub fn deliver(
        &self,
        report: &Report,
        format: ImageFormat,
        delivery: Delivery,
    ) -> Result<Artifact> {
        let image = chart::render(report, format, self.chart_size)?;
        log::info!(
            "Rendered {} chart for {} ({} bytes)",
            format.extension(),
            report.symbol,
            image.len()
        );
        export::deliver(&report.symbol, image, format, delivery)
    }
}
