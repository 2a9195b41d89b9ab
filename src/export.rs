use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose, Engine as _};
use csv::Writer;

use crate::{
    analysis::Report,
    model::{AnalysisError, ImageFormat, Result},
};

/// How a rendered chart is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    File(Option<PathBuf>), // None = "{SYMBOL}_analysis.{ext}" in the working directory.
    Bytes,
    Base64,
}

/// A delivered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(PathBuf),
    Bytes(Vec<u8>),
    DataUri(String), // data:{mime};base64,{payload}
}

pub fn default_path(symbol: &str, format: ImageFormat) -> PathBuf {
    PathBuf::from(format!("{}_analysis.{}", symbol, format.extension()))
}

pub fn data_uri(bytes: &[u8], format: ImageFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime(),
        general_purpose::STANDARD.encode(bytes)
    )
}

pub fn deliver(
    symbol: &str,
    bytes: Vec<u8>,
    format: ImageFormat,
    delivery: Delivery,
) -> Result<Artifact> {
    match delivery {
        Delivery::File(path) => {
            let path = path.unwrap_or_else(|| default_path(symbol, format));
            fs::write(&path, &bytes)?;
            log::info!("Chart saved to {}", path.display());
            Ok(Artifact::File(path))
        }
        Delivery::Bytes => Ok(Artifact::Bytes(bytes)),
        Delivery::Base64 => Ok(Artifact::DataUri(data_uri(&bytes, format))),
    }
}

/// Serializes the report as CSV: one row per candle, undefined values left empty.
pub fn report_to_csv_vec(report: &Report) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    let named = report.indicators.named();

    // Write header row
    let mut header = vec!["timestamp", "close"];
    header.extend(named.iter().map(|(name, _)| *name));
    writer.write_record(&header)?;

    // Write the data rows.
    for (i, timestamp) in report.timestamps.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(timestamp.to_rfc3339());
        record.push(cell(report.close.get(i).copied().flatten()));
        for (_, series) in &named {
            record.push(cell(series.get(i).copied().flatten()));
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AnalysisError::Io(e.into_error()))
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_report_csv(report: &Report, path: &Path) -> Result<()> {
    let bytes = report_to_csv_vec(report)?;
    fs::write(path, bytes)?;
    log::info!("Indicator table saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{build_report, tests::daily_candles},
        indicators::IndicatorParams,
    };

    fn report() -> Report {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        build_report("BTCUSDT", &daily_candles(&closes), &IndicatorParams::default()).unwrap()
    }

    #[test]
    fn data_uri_carries_mime_and_payload() {
        assert_eq!(data_uri(b"abc", ImageFormat::Png), "data:image/png;base64,YWJj");
        assert!(data_uri(b"<svg/>", ImageFormat::Svg).starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn default_path_uses_symbol_and_extension() {
        assert_eq!(
            default_path("ETHUSDT", ImageFormat::Svg),
            PathBuf::from("ETHUSDT_analysis.svg")
        );
    }

    #[test]
    fn delivers_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let artifact = deliver(
            "BTCUSDT",
            vec![1, 2, 3],
            ImageFormat::Png,
            Delivery::File(Some(path.clone())),
        )
        .unwrap();
        assert_eq!(artifact, Artifact::File(path.clone()));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn delivers_in_memory() {
        let bytes = deliver("BTCUSDT", vec![7], ImageFormat::Svg, Delivery::Bytes).unwrap();
        assert_eq!(bytes, Artifact::Bytes(vec![7]));
        let uri = deliver("BTCUSDT", b"abc".to_vec(), ImageFormat::Png, Delivery::Base64).unwrap();
        assert_eq!(uri, Artifact::DataUri("data:image/png;base64,YWJj".to_string()));
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("chart.png");
        let err = deliver("BTCUSDT", vec![1], ImageFormat::Png, Delivery::File(Some(path)))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }

    #[test]
    fn csv_has_one_row_per_candle() {
        let report = report();
        let bytes = report_to_csv_vec(&report).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "timestamp");
        assert_eq!(&headers[1], "close");
        assert!(headers.iter().any(|h| h == "hurst"));

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 40);
        assert_eq!(&rows[0][0], "2024-01-01T00:00:00+00:00");
        let rsi = headers.iter().position(|h| h == "rsi").unwrap();
        // RSI is undefined until its window fills.
        assert_eq!(&rows[0][rsi], "");
        assert!(!rows[39][rsi].is_empty());
    }

    #[test]
    fn csv_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report_csv(&report(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("timestamp,close,rsi"));
    }
}
