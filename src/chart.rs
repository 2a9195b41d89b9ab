//! Renders a report as four stacked panels sharing the time axis.

use chrono::DateTime;
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use plotters::{coord::Shift, drawing::DrawingAreaErrorKind, prelude::*};
use thiserror::Error;

use crate::{
    analysis::{Panel, Report},
    indicators::Series,
    model::ImageFormat,
};

const PALETTE: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
    RGBColor(214, 39, 40),
];
const GUIDE_COLOR: RGBColor = RGBColor(128, 128, 128);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("invalid chart size {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("nothing to render: report has no timestamps")]
    Empty,
    #[error("PNG output needs the `ttf` feature to draw text")]
    NoTextBackend,
}

fn draw_err<E>(err: DrawingAreaErrorKind<E>) -> RenderError
where
    E: std::error::Error + Send + Sync,
{
    RenderError::Draw(err.to_string())
}

/// Renders the report into an encoded image of `size` pixels.
pub fn render(report: &Report, format: ImageFormat, size: (u32, u32)) -> Result<Vec<u8>, RenderError> {
    if size.0 == 0 || size.1 == 0 {
        return Err(RenderError::InvalidSize(size.0, size.1));
    }
    if report.timestamps.is_empty() {
        return Err(RenderError::Empty);
    }

    match format {
        ImageFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
                draw_report(&root, report)?;
                root.present().map_err(draw_err)?;
            }
            Ok(svg.into_bytes())
        }
        ImageFormat::Png => {
            // The bitmap backend panics on text without a font backend.
            if !cfg!(feature = "ttf") {
                return Err(RenderError::NoTextBackend);
            }
            let mut pixels = vec![0u8; size.0 as usize * size.1 as usize * 3];
            {
                let root = BitMapBackend::with_buffer(&mut pixels, size).into_drawing_area();
                draw_report(&root, report)?;
                root.present().map_err(draw_err)?;
            }
            encode_png(&pixels, size)
        }
    }
}

fn encode_png(pixels: &[u8], (width, height): (u32, u32)) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(pixels, width, height, ColorType::Rgb8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(bytes)
}

fn draw_report<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    report: &Report,
) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(draw_err)?;
    let body = root
        .titled(&report.title, ("sans-serif", 26))
        .map_err(draw_err)?;

    let xs: Vec<f64> = report
        .timestamps
        .iter()
        .map(|t| t.timestamp() as f64)
        .collect();

    let panels = report.panels();
    let areas = body.split_evenly((panels.len(), 1));
    for (area, panel) in areas.iter().zip(&panels) {
        draw_panel(area, panel, &xs)?;
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel<'_>,
    xs: &[f64],
) -> Result<(), RenderError> {
    let (x_min, x_max) = x_range(xs);
    let (y_min, y_max) = y_range(panel);

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 18))
        .margin(8)
        .x_label_area_size(28)
        .y_label_area_size(64)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(5)
        .x_label_formatter(&|x| format_date(*x))
        .draw()
        .map_err(draw_err)?;

    for &level in panel.guides {
        chart
            .draw_series(LineSeries::new(
                vec![(x_min, level), (x_max, level)],
                GUIDE_COLOR.mix(0.5).stroke_width(1),
            ))
            .map_err(draw_err)?;
    }

    let mut any_labelled = false;
    for (i, (name, series)) in panel.lines.iter().enumerate() {
        let style = if panel.lines.len() == 1 {
            BLACK.stroke_width(2)
        } else {
            PALETTE[i % PALETTE.len()].stroke_width(2)
        };

        // Undefined values split the line into separate runs.
        let mut labelled = false;
        for run in defined_runs(xs, series) {
            let anno = chart
                .draw_series(LineSeries::new(run, style))
                .map_err(draw_err)?;
            if !labelled {
                anno.label(*name)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                labelled = true;
            }
        }
        if !labelled {
            log::warn!("{}: no defined values to plot", name);
        }
        any_labelled |= labelled;
    }

    if any_labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

/// Contiguous runs of defined points.
fn defined_runs(xs: &[f64], series: &Series) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (x, value) in xs.iter().zip(series) {
        match value {
            Some(y) => current.push((*x, *y)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn x_range(xs: &[f64]) -> (f64, f64) {
    let first = xs.first().copied().unwrap_or(0.0);
    let last = xs.last().copied().unwrap_or(first);
    if last > first {
        (first, last)
    } else {
        (first - 43_200.0, first + 43_200.0)
    }
}

fn y_range(panel: &Panel<'_>) -> (f64, f64) {
    let values = panel
        .lines
        .iter()
        .flat_map(|(_, series)| series.iter().flatten().copied())
        .chain(panel.guides.iter().copied());

    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min {
        (max - min) * 0.05
    } else {
        min.abs().max(1.0) * 0.05
    };
    (min - pad, max + pad)
}

fn format_date(seconds: f64) -> String {
    DateTime::from_timestamp(seconds as i64, 0)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
