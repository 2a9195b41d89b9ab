//! Fractal measures: Fractal Dimension Index and the Hurst exponent.

use super::{check_finite, check_window, IndicatorError, Series};
use crate::constants::HURST_TAU_FLOOR;

/// Fractal Dimension Index over a trailing window.
///
/// Entry `i` measures the path `prices[i - window..=i]`: the curve length is
/// the sum of `sqrt(dp^2 + 1)` over consecutive samples (one horizontal unit
/// per step) and the linear length is `sqrt((last - first)^2 + window^2)`.
/// The index is `1 + log2(curve / linear)`, so a straight line scores 1 and
/// rougher paths score higher. The first `window` entries are `None`.
///
/// Each position is recomputed from its own window; no state is carried over.
pub fn fdi(prices: &[f64], window: usize) -> Result<Series, IndicatorError> {
    check_window("fdi", window, 1)?;
    check_finite("price", prices)?;

    let mut out: Series = vec![None; prices.len().min(window)];
    for i in window..prices.len() {
        out.push(Some(fdi_segment(&prices[i - window..=i])));
    }
    Ok(out)
}

// linear >= steps >= 1, so the ratio is always finite and >= 1.
fn fdi_segment(segment: &[f64]) -> f64 {
    let steps = (segment.len() - 1) as f64;
    let curve: f64 = segment
        .windows(2)
        .map(|pair| ((pair[1] - pair[0]).powi(2) + 1.0).sqrt())
        .sum();
    let rise = segment[segment.len() - 1] - segment[0];
    let linear = (rise.powi(2) + steps.powi(2)).sqrt();
    1.0 + (curve / linear).log10() / 2f64.log10()
}

/// Estimates the Hurst exponent of `ts` from the scaling of lagged differences.
///
/// For each lag in `2..max_lag` the population standard deviation of
/// `ts[lag..] - ts[..len - lag]` is taken (floored at `1e-8` so a flat series
/// does not hit `ln(0)`), and the slope of `ln(tau)` against `ln(lag)` is
/// returned. Returns `None` when `ts` has no more than `max_lag` samples or when
/// `max_lag < 4` leaves fewer than two lags to fit.
pub fn hurst_exponent(ts: &[f64], max_lag: usize) -> Option<f64> {
    if max_lag < 4 || ts.len() <= max_lag {
        return None;
    }

    let mut log_lags = Vec::with_capacity(max_lag - 2);
    let mut log_tau = Vec::with_capacity(max_lag - 2);
    for lag in 2..max_lag {
        let diffs: Vec<f64> = ts[lag..].iter().zip(ts).map(|(a, b)| a - b).collect();
        let tau = std_dev(&diffs);
        let tau = if tau > 0.0 { tau } else { HURST_TAU_FLOOR };
        log_lags.push((lag as f64).ln());
        log_tau.push(tau.ln());
    }

    let slope = least_squares_slope(&log_lags, &log_tau);
    slope.is_finite().then_some(slope)
}

/// Hurst exponent of the trailing window `prices[i - span..i]` at every `i >= span`.
pub fn rolling_hurst(prices: &[f64], span: usize, max_lag: usize) -> Result<Series, IndicatorError> {
    check_window("hurst max_lag", max_lag, 4)?;
    if span <= max_lag {
        return Err(IndicatorError::InvalidParameters {
            indicator: "hurst",
            reason: format!("span {} must be greater than max_lag {}", span, max_lag),
        });
    }
    check_finite("price", prices)?;

    let mut out: Series = vec![None; prices.len().min(span)];
    for i in span..prices.len() {
        out.push(hurst_exponent(&prices[i - span..i], max_lag));
    }
    Ok(out)
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn least_squares_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x).powi(2);
    }
    sxy / sxx
}
