// Binance market data client.
mod binance {
    // Client for the public REST endpoints.
    pub mod api_caller;
    // Wire structures of the REST responses.
    pub mod response;
}
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data models.
mod model;
// module storing defaults
mod constants;
// Settings read from the environment.
mod config;
// Technical indicator engine.
mod indicators;
// Fetch, compute and lay out a report.
mod analysis;
// Chart rendering.
mod chart;
// Image and CSV delivery.
mod export;
// Tool server exposing market data and analysis.
mod tools {
    /// Tool definitions and dispatch.
    pub mod catalog;
    /// JSON-RPC framing over stdio.
    pub mod server;
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

use analysis::{AnalysisParams, Analyst};
use binance::api_caller::BinanceClient;
use config::Settings;
use export::{Artifact, Delivery};
use model::{ImageFormat, Interval};
use tools::{catalog::ToolBox, server::Server};

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch candles for a symbol and render the indicator chart.
    Analyze {
        #[arg(default_value = constants::DEFAULT_SYMBOL)]
        symbol: String,
        /// Candle interval (1m, 1h, 1d, 1w, 1M, ...). Overrides KLINE_INTERVAL.
        #[arg(long)]
        interval: Option<Interval>,
        /// Number of candles, 1 to 1000. Overrides KLINE_LIMIT.
        #[arg(long, value_parser = parse_limit)]
        limit: Option<u32>,
        /// Image path. Defaults to {SYMBOL}_analysis.{ext}.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
        format: ImageFormat,
        /// Print the image as a base64 data URI instead of writing a file.
        #[arg(long, conflicts_with = "output")]
        base64: bool,
        /// Also write the indicator table as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Serve the market and analysis tools as JSON-RPC over stdio.
    Serve {
        /// Encoding of analyze_indicators images.
        #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
        format: ImageFormat,
    },
}

fn parse_limit(raw: &str) -> Result<u32, String> {
    let limit: u32 = raw.parse().map_err(|e| format!("{}", e))?;
    config::check_limit(limit)
}

struct AnalyzeRequest {
    symbol: String,
    interval: Option<Interval>,
    limit: Option<u32>,
    delivery: Delivery,
    format: ImageFormat,
    csv: Option<PathBuf>,
}

async fn analyze(settings: &Settings, request: AnalyzeRequest) -> model::Result<()> {
    let mut params = AnalysisParams::from_settings(settings);
    if let Some(interval) = request.interval {
        params.interval = interval;
    }
    if let Some(limit) = request.limit {
        params.limit = limit;
    }

    let analyst = Analyst::new(BinanceClient::new(settings), params, settings.chart_size);
    let report = analyst.report(&request.symbol).await?;

    if let Some(path) = &request.csv {
        export::write_report_csv(&report, path)?;
    }

    match analyst.deliver(&report, request.format, request.delivery)? {
        Artifact::File(path) => println!("{}", path.display()),
        Artifact::DataUri(uri) => println!("{}", uri),
        Artifact::Bytes(bytes) => log::warn!("{} bytes rendered but not delivered", bytes.len()),
    }
    Ok(())
}

async fn serve(settings: &Settings, format: ImageFormat) -> model::Result<()> {
    let analyst = Analyst::new(
        BinanceClient::new(settings),
        AnalysisParams::from_settings(settings),
        settings.chart_size,
    );
    let tools = ToolBox::new(analyst, BinanceClient::new(settings), format);
    Server::new(tools).run().await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
// Main function entry point.
async fn main() {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(2);
        }
    };

    let outcome = match args.command {
        Commands::Analyze {
            symbol,
            interval,
            limit,
            output,
            format,
            base64,
            csv,
        } => {
            let delivery = if base64 {
                Delivery::Base64
            } else {
                Delivery::File(output)
            };
            let request = AnalyzeRequest {
                symbol,
                interval,
                limit,
                delivery,
                format,
                csv,
            };
            analyze(&settings, request).await
        }
        Commands::Serve { format } => serve(&settings, format).await,
    };

    if let Err(err) = outcome {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
