//! Indicator engine: pure functions from price series to aligned indicator series.
//!
//! Every function returns a series with exactly one entry per input sample.
//! `None` marks a position that cannot be computed yet (insufficient lookback)
//! or is numerically undefined; values are never zero-filled or dropped.

pub mod fractal;
pub mod momentum;
pub mod trend;

use thiserror::Error;

use crate::constants;

/// An indicator series aligned 1:1 with its source price series.
pub type Series = Vec<Option<f64>>;

#[derive(Error, Debug, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator}: window must be at least {min}, got {window}")]
    InvalidWindow {
        indicator: &'static str,
        window: usize,
        min: usize,
    },
    #[error("{indicator}: {reason}")]
    InvalidParameters {
        indicator: &'static str,
        reason: String,
    },
    #[error("non-finite value {value} in {series} series at index {index}")]
    NonFinite {
        series: &'static str,
        index: usize,
        value: f64,
    },
    #[error("series length mismatch: close={close}, high={high}, low={low}")]
    LengthMismatch {
        close: usize,
        high: usize,
        low: usize,
    },
}

/// Windows for every indicator computed by [`IndicatorSet::compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_window: usize,
    pub stoch_smooth_k: usize,
    pub stoch_smooth_d: usize,
    pub williams_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_window: usize,
    pub fdi_window: usize,
    pub hurst_span: usize,
    pub hurst_max_lag: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_window: constants::RSI_WINDOW,
            stoch_smooth_k: constants::STOCH_RSI_SMOOTH,
            stoch_smooth_d: constants::STOCH_RSI_SMOOTH,
            williams_window: constants::WILLIAMS_R_WINDOW,
            macd_fast: constants::MACD_FAST,
            macd_slow: constants::MACD_SLOW,
            macd_signal: constants::MACD_SIGNAL,
            adx_window: constants::ADX_WINDOW,
            fdi_window: constants::FDI_WINDOW,
            hurst_span: constants::HURST_SPAN,
            hurst_max_lag: constants::HURST_MAX_LAG,
        }
    }
}

impl IndicatorParams {
    /// Number of samples each indicator needs before its first defined value.
    pub fn requirements(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("RSI", self.rsi_window),
            (
                "Stoch RSI",
                (2 * self.rsi_window + self.stoch_smooth_k).saturating_sub(2),
            ),
            ("Williams %R", self.williams_window),
            ("MACD", self.macd_slow),
            ("ADX", 2 * self.adx_window),
            ("FDI", self.fdi_window + 1),
            ("Hurst", self.hurst_span + 1),
        ]
    }

    /// Fewest samples for which at least one indicator is defined.
    pub fn min_history(&self) -> usize {
        self.requirements()
            .into_iter()
            .map(|(_, needed)| needed)
            .min()
            .unwrap_or(1)
    }

    /// Fewest samples for which every indicator is defined.
    pub fn full_history(&self) -> usize {
        self.requirements()
            .into_iter()
            .map(|(_, needed)| needed)
            .max()
            .unwrap_or(1)
    }
}

/// All indicators for one price history, aligned to the same axis.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub rsi: Series,
    pub stoch_rsi: momentum::StochRsi,
    pub williams_r: Series,
    pub macd: trend::Macd,
    pub adx: trend::Adx,
    pub fdi: Series,
    pub hurst: Series,
}

impl IndicatorSet {
    pub fn compute(
        close: &[f64],
        high: &[f64],
        low: &[f64],
        params: &IndicatorParams,
    ) -> Result<Self, IndicatorError> {
        check_lengths(close, high, low)?;

        Ok(IndicatorSet {
            rsi: momentum::rsi(close, params.rsi_window)?,
            stoch_rsi: momentum::stoch_rsi(
                close,
                params.rsi_window,
                params.stoch_smooth_k,
                params.stoch_smooth_d,
            )?,
            williams_r: momentum::williams_r(high, low, close, params.williams_window)?,
            macd: trend::macd(close, params.macd_fast, params.macd_slow, params.macd_signal)?,
            adx: trend::adx(high, low, close, params.adx_window)?,
            fdi: fractal::fdi(close, params.fdi_window)?,
            hurst: fractal::rolling_hurst(close, params.hurst_span, params.hurst_max_lag)?,
        })
    }

    /// Every series with a display name, in a stable order.
    pub fn named(&self) -> Vec<(&'static str, &Series)> {
        vec![
            ("rsi", &self.rsi),
            ("stoch_rsi", &self.stoch_rsi.stoch_rsi),
            ("stoch_rsi_k", &self.stoch_rsi.k),
            ("stoch_rsi_d", &self.stoch_rsi.d),
            ("williams_r", &self.williams_r),
            ("macd", &self.macd.macd),
            ("macd_signal", &self.macd.signal),
            ("macd_histogram", &self.macd.histogram),
            ("adx", &self.adx.adx),
            ("plus_di", &self.adx.plus_di),
            ("minus_di", &self.adx.minus_di),
            ("fdi", &self.fdi),
            ("hurst", &self.hurst),
        ]
    }
}

pub(crate) fn check_window(
    indicator: &'static str,
    window: usize,
    min: usize,
) -> Result<(), IndicatorError> {
    if window < min {
        return Err(IndicatorError::InvalidWindow {
            indicator,
            window,
            min,
        });
    }
    Ok(())
}

pub(crate) fn check_finite(series: &'static str, values: &[f64]) -> Result<(), IndicatorError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(IndicatorError::NonFinite {
            series,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_lengths(close: &[f64], high: &[f64], low: &[f64]) -> Result<(), IndicatorError> {
    if close.len() != high.len() || close.len() != low.len() {
        return Err(IndicatorError::LengthMismatch {
            close: close.len(),
            high: high.len(),
            low: low.len(),
        });
    }
    check_finite("close", close)?;
    check_finite("high", high)?;
    check_finite("low", low)
}

pub(crate) fn defined(values: &[f64]) -> Series {
    values.iter().copied().map(Some).collect()
}

/// Recursive exponential average (`y = (1 - alpha) * y' + alpha * x`), seeded
/// with the first defined observation and reported once `min_periods`
/// observations have been seen.
pub(crate) fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Series {
    let mut out = Vec::with_capacity(values.len());
    let mut avg: Option<f64> = None;
    let mut seen = 0;
    for value in values {
        if let Some(x) = value {
            avg = Some(match avg {
                None => *x,
                Some(prev) => (1.0 - alpha) * prev + alpha * x,
            });
            seen += 1;
        }
        out.push(if seen >= min_periods { avg } else { None });
    }
    out
}

/// Applies `f` to each full trailing window; a window with any undefined entry is undefined.
fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = Vec::with_capacity(values.len());
    let mut buf = Vec::with_capacity(window);
    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            out.push(None);
            continue;
        }
        buf.clear();
        buf.extend(values[i + 1 - window..=i].iter().map_while(|v| *v));
        out.push(if buf.len() == window { Some(f(&buf)) } else { None });
    }
    out
}

pub(crate) fn rolling_min(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub(crate) fn rolling_max(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

pub(crate) fn rolling_mean(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn assert_close(actual: Option<f64>, expected: f64, tolerance: f64) {
        let actual = actual.expect("expected a defined value");
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} != {} (tolerance {})",
            actual,
            expected,
            tolerance
        );
    }

    pub fn sine(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.3).sin() + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn ewm_seeds_with_first_observation() {
        let values = defined(&[2.0, 4.0, 8.0]);
        let out = ewm(&values, 0.5, 1);
        assert_eq!(out, vec![Some(2.0), Some(3.0), Some(5.5)]);

        let out = ewm(&values, 0.5, 2);
        assert_eq!(out, vec![None, Some(3.0), Some(5.5)]);
    }

    #[test]
    fn ewm_skips_leading_undefined() {
        let values = vec![None, None, Some(1.0), Some(3.0)];
        assert_eq!(ewm(&values, 0.5, 2), vec![None, None, None, Some(2.0)]);
    }

    #[test]
    fn rolling_windows_need_full_history() {
        let values = vec![Some(3.0), Some(1.0), None, Some(5.0), Some(4.0), Some(2.0)];
        assert_eq!(
            rolling_min(&values, 2),
            vec![None, Some(1.0), None, None, Some(4.0), Some(2.0)]
        );
        assert_eq!(
            rolling_max(&values, 3),
            vec![None, None, None, None, None, Some(5.0)]
        );
        assert_eq!(
            rolling_mean(&values, 1),
            vec![Some(3.0), Some(1.0), None, Some(5.0), Some(4.0), Some(2.0)]
        );
    }

    #[test]
    fn compute_keeps_every_series_aligned() {
        let close = sine(120);
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();

        let set = IndicatorSet::compute(&close, &high, &low, &IndicatorParams::default()).unwrap();
        for (name, series) in set.named() {
            assert_eq!(series.len(), close.len(), "{} misaligned", name);
            assert!(series.iter().any(|v| v.is_some()), "{} never defined", name);
        }
    }

    #[test]
    fn compute_rejects_mismatched_lengths() {
        let close = sine(40);
        let high = sine(39);
        let err = IndicatorSet::compute(&close, &high, &close, &IndicatorParams::default());
        assert!(matches!(err, Err(IndicatorError::LengthMismatch { .. })));
    }

    #[test]
    fn compute_rejects_non_finite_prices() {
        let mut close = sine(40);
        close[7] = f64::INFINITY;
        let err = IndicatorSet::compute(&close, &close, &close, &IndicatorParams::default());
        assert_eq!(
            err,
            Err(IndicatorError::NonFinite {
                series: "close",
                index: 7,
                value: f64::INFINITY
            })
        );
    }

    #[test]
    fn requirements_match_first_defined_positions() {
        let params = IndicatorParams::default();
        let close = sine(200);
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let set = IndicatorSet::compute(&close, &high, &low, &params).unwrap();

        let first = |s: &Series| s.iter().position(|v| v.is_some()).unwrap() + 1;
        let by_name: Vec<(&str, usize)> = vec![
            ("RSI", first(&set.rsi)),
            ("Stoch RSI", first(&set.stoch_rsi.k)),
            ("Williams %R", first(&set.williams_r)),
            ("MACD", first(&set.macd.macd)),
            ("ADX", first(&set.adx.adx)),
            ("FDI", first(&set.fdi)),
            ("Hurst", first(&set.hurst)),
        ];
        assert_eq!(params.requirements(), by_name);
        assert_eq!(params.min_history(), 11);
        assert_eq!(params.full_history(), 29);
    }
}
