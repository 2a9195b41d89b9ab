//! Trend indicators: EMA, MACD and the Average Directional Index.

use super::{check_finite, check_lengths, check_window, defined, ewm, IndicatorError, Series};

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
}

/// ADX with its directional indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct Adx {
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first defined value and reported once `span` values have been seen.
pub fn ema(values: &[Option<f64>], span: usize) -> Series {
    let multiplier = 2.0 / (span as f64 + 1.0);
    ewm(values, multiplier, span.max(1))
}

/// Moving Average Convergence Divergence.
///
/// The signal line is the `signal`-span EMA of the MACD line, starting at the
/// MACD line's first defined value.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Macd, IndicatorError> {
    check_window("macd fast", fast, 1)?;
    check_window("macd slow", slow, 1)?;
    check_window("macd signal", signal, 1)?;
    if fast >= slow {
        return Err(IndicatorError::InvalidParameters {
            indicator: "macd",
            reason: format!("fast span {} must be shorter than slow span {}", fast, slow),
        });
    }
    check_finite("close", close)?;

    let prices = defined(close);
    let fast_ema = ema(&prices, fast);
    let slow_ema = ema(&prices, slow);

    let line: Series = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|pair| match pair {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|pair| match pair {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    Ok(Macd {
        macd: line,
        signal: signal_line,
        histogram,
    })
}

/// Average Directional Index using Wilder's smoothing.
///
/// True range and directional movement are summed over bars `1..=window`, then
/// carried with `s = s - s / window + x`. `+DI` and `-DI` start at index
/// `window`; the ADX is seeded with the mean of the first `window` DX values and
/// first appears at index `2 * window - 1`. Bars with no range or no
/// directional movement contribute a DX of zero.
///
/// `+DI` and `-DI` are placed on the bar whose movement completes their first
/// smoothing window (index `window`), one bar later than `ta`'s `adx_pos` and
/// `adx_neg`, which report the same values at `window - 1`. The ADX itself
/// lines up with `ta`'s `adx`.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Result<Adx, IndicatorError> {
    check_window("adx", window, 1)?;
    check_lengths(close, high, low)?;

    let len = close.len();
    let mut out = Adx {
        adx: vec![None; len],
        plus_di: vec![None; len],
        minus_di: vec![None; len],
    };
    if len <= window {
        return Ok(out);
    }

    let mut trs = vec![0.0; len];
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        trs[i] = true_range(high[i], low[i], close[i - 1]);
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let period = window as f64;
    let mut smooth_tr: f64 = trs[1..=window].iter().sum();
    let mut smooth_plus: f64 = plus_dm[1..=window].iter().sum();
    let mut smooth_minus: f64 = minus_dm[1..=window].iter().sum();
    let mut dx = vec![0.0; len];

    for i in window..len {
        if i > window {
            smooth_tr = smooth_tr - smooth_tr / period + trs[i];
            smooth_plus = smooth_plus - smooth_plus / period + plus_dm[i];
            smooth_minus = smooth_minus - smooth_minus / period + minus_dm[i];
        }

        let (plus_di, minus_di) = if smooth_tr > 0.0 {
            (100.0 * smooth_plus / smooth_tr, 100.0 * smooth_minus / smooth_tr)
        } else {
            (0.0, 0.0)
        };
        out.plus_di[i] = Some(plus_di);
        out.minus_di[i] = Some(minus_di);

        let di_sum = plus_di + minus_di;
        if di_sum > 0.0 {
            dx[i] = 100.0 * (plus_di - minus_di).abs() / di_sum;
        }
    }

    let first = 2 * window - 1;
    if len > first {
        let mut average = dx[window..=first].iter().sum::<f64>() / period;
        out.adx[first] = Some(average);
        for i in first + 1..len {
            average = (average * (period - 1.0) + dx[i]) / period;
            out.adx[i] = Some(average);
        }
    }

    Ok(out)
}

fn true_range(high: f64, low: f64, previous_close: f64) -> f64 {
    let a = high - low;
    let b = (high - previous_close).abs();
    let c = (low - previous_close).abs();

    // find the max value of a, b, and c
    a.max(b).max(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::tests::{assert_close, sine};

    // Non-trivial OHLC path with uneven bar ranges.
    fn wavy_ohlc(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let close: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64;
                100.0 + 5.0 * (0.3 * x).sin() + 2.0 * (0.7 * x).cos()
            })
            .collect();
        let high = close
            .iter()
            .enumerate()
            .map(|(i, c)| c + 1.0 + 0.5 * (0.5 * i as f64).sin().abs())
            .collect();
        let low = close
            .iter()
            .enumerate()
            .map(|(i, c)| c - 1.0 - 0.5 * (0.4 * i as f64).cos().abs())
            .collect();
        (high, low, close)
    }

    #[test]
    fn ema_seeds_with_first_value() {
        let values = defined(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let out = ema(&values, 3);
        assert_eq!(out[..2], [None, None]);
        // alpha 0.5: 10 -> 10.5 -> 11.25 -> 12.125 -> 13.0625
        assert_close(out[2], 11.25, 1e-12);
        assert_close(out[3], 12.125, 1e-12);
        assert_close(out[4], 13.0625, 1e-12);
    }

    #[test]
    fn macd_alignment_follows_the_slow_and_signal_spans() {
        let close = sine(80);
        let out = macd(&close, 12, 26, 9).unwrap();
        assert_eq!(out.macd.len(), close.len());
        assert!(out.macd[..25].iter().all(|v| v.is_none()));
        assert!(out.macd[25..].iter().all(|v| v.is_some()));
        assert!(out.signal[..33].iter().all(|v| v.is_none()));
        assert!(out.signal[33..].iter().all(|v| v.is_some()));
        for i in 33..close.len() {
            assert_close(
                out.histogram[i],
                out.macd[i].unwrap() - out.signal[i].unwrap(),
                1e-12,
            );
        }
    }

    #[test]
    fn macd_of_a_flat_series_is_zero() {
        let out = macd(&[50.0; 40], 12, 26, 9).unwrap();
        assert!(out.macd.iter().flatten().all(|v| *v == 0.0));
        assert!(out.histogram.iter().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn macd_rejects_inverted_spans() {
        assert!(matches!(
            macd(&[1.0; 40], 26, 12, 9),
            Err(IndicatorError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn adx_of_a_steady_uptrend_is_100() {
        let close: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 0.5).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 0.5).collect();
        let out = adx(&high, &low, &close, 14).unwrap();

        assert!(out.adx[..27].iter().all(|v| v.is_none()));
        for i in 27..close.len() {
            assert_close(out.adx[i], 100.0, 1e-9);
        }
        assert!(out.plus_di[..14].iter().all(|v| v.is_none()));
        assert!(out.minus_di[14..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn adx_stays_in_range_on_a_sine_wave() {
        let close = sine(150);
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let out = adx(&high, &low, &close, 14).unwrap();
        assert_eq!(out.adx.len(), close.len());
        for v in out.adx.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn adx_of_a_flat_market_is_zero() {
        let flat = [10.0; 40];
        let out = adx(&flat, &flat, &flat, 14).unwrap();
        assert!(out.adx.iter().flatten().all(|v| *v == 0.0));
        assert_eq!(out.adx[27], Some(0.0));
    }

    #[test]
    fn adx_with_short_history_is_undefined() {
        let short = [1.0; 14];
        let out = adx(&short, &short, &short, 14).unwrap();
        assert_eq!(out.adx, vec![None; 14]);
        assert_eq!(out.plus_di, vec![None; 14]);
    }

    #[test]
    fn true_range_uses_previous_close_gaps() {
        assert_eq!(true_range(12.0, 10.0, 11.0), 2.0);
        assert_eq!(true_range(12.0, 10.0, 5.0), 7.0);
        assert_eq!(true_range(12.0, 10.0, 15.0), 5.0);
    }

    #[test]
    fn adx_matches_reference_values() {
        let (high, low, close) = wavy_ohlc(80);
        let out = adx(&high, &low, &close, 14).unwrap();

        assert_eq!(out.adx[26], None);
        assert_close(out.adx[27], 23.678510458028704, 1e-9);
        assert_close(out.adx[40], 23.960126445121922, 1e-9);
        assert_close(out.adx[79], 23.169982591891777, 1e-9);

        assert_eq!(out.plus_di[13], None);
        assert_close(out.plus_di[14], 8.933753947041096, 1e-9);
        assert_close(out.minus_di[14], 27.15235507680432, 1e-9);
        assert_close(out.plus_di[40], 12.154809837322558, 1e-9);
        assert_close(out.minus_di[40], 22.117664855082054, 1e-9);
        assert_close(out.plus_di[79], 16.272226456340103, 1e-9);
        assert_close(out.minus_di[79], 24.637423005089627, 1e-9);
    }

    #[test]
    fn macd_matches_reference_values() {
        let (_, _, close) = wavy_ohlc(80);
        let out = macd(&close, 12, 26, 9).unwrap();

        assert_close(out.macd[25], 0.11841614391472888, 1e-9);
        assert_close(out.macd[33], -0.22988950555583187, 1e-9);
        assert_close(out.macd[79], -1.2433028412579148, 1e-9);

        assert_eq!(out.signal[32], None);
        assert_close(out.signal[33], 0.4127069717349382, 1e-9);
        assert_close(out.signal[79], -0.2806886368225441, 1e-9);
        assert_close(out.histogram[79], -1.2433028412579148 + 0.2806886368225441, 1e-9);
    }
}
