//! Momentum oscillators: RSI, Stochastic RSI and Williams %R.

use super::{
    check_finite, check_lengths, check_window, defined, ewm, rolling_max, rolling_mean,
    rolling_min, IndicatorError, Series,
};

/// Stochastic RSI lines. Values lie in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsi {
    pub stoch_rsi: Series,
    pub k: Series,
    pub d: Series,
}

/// Relative Strength Index with Wilder smoothing (`alpha = 1 / window`).
///
/// The first difference counts as no change, both averages are seeded with the
/// first observation, and the first value appears once `window` observations
/// exist. When the average loss is zero the RSI is 100.
pub fn rsi(close: &[f64], window: usize) -> Result<Series, IndicatorError> {
    check_window("rsi", window, 1)?;
    check_finite("close", close)?;
    Ok(rsi_values(close, window))
}

fn rsi_values(close: &[f64], window: usize) -> Series {
    let mut gains = Vec::with_capacity(close.len());
    let mut losses = Vec::with_capacity(close.len());
    for i in 0..close.len() {
        let change = if i == 0 { 0.0 } else { close[i] - close[i - 1] };
        gains.push(Some(change.max(0.0)));
        losses.push(Some((-change).max(0.0)));
    }

    let alpha = 1.0 / window as f64;
    let avg_gain = ewm(&gains, alpha, window);
    let avg_loss = ewm(&losses, alpha, window);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|pair| match pair {
            (Some(_), Some(loss)) if loss == 0.0 => Some(100.0),
            (Some(gain), Some(loss)) => Some(100.0 - 100.0 / (1.0 + gain / loss)),
            _ => None,
        })
        .collect()
}

/// Stochastic RSI: where the RSI sits inside its own `window`-bar range.
///
/// `%K` is the `smooth_k`-bar mean of the raw value and `%D` the `smooth_d`-bar
/// mean of `%K`. Positions whose RSI range is zero are undefined.
pub fn stoch_rsi(
    close: &[f64],
    window: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> Result<StochRsi, IndicatorError> {
    check_window("stoch_rsi", window, 1)?;
    check_window("stoch_rsi %K", smooth_k, 1)?;
    check_window("stoch_rsi %D", smooth_d, 1)?;
    check_finite("close", close)?;

    let rsi = rsi_values(close, window);
    let lowest = rolling_min(&rsi, window);
    let highest = rolling_max(&rsi, window);

    let stoch_rsi: Series = rsi
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(value, (low, high))| match (value, low, high) {
            (Some(v), Some(lo), Some(hi)) if hi > lo => Some((v - lo) / (hi - lo)),
            _ => None,
        })
        .collect();
    let k = rolling_mean(&stoch_rsi, smooth_k);
    let d = rolling_mean(&k, smooth_d);

    Ok(StochRsi { stoch_rsi, k, d })
}

/// Williams %R over `window` bars, in `[-100, 0]`.
///
/// Undefined where the highest high equals the lowest low.
pub fn williams_r(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: usize,
) -> Result<Series, IndicatorError> {
    check_window("williams_r", window, 1)?;
    check_lengths(close, high, low)?;

    let highest = rolling_max(&defined(high), window);
    let lowest = rolling_min(&defined(low), window);

    Ok(close
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(c, (hh, ll))| match (hh, ll) {
            (Some(hh), Some(ll)) if hh > ll => Some(-100.0 * (hh - c) / (hh - ll)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::tests::{assert_close, sine};

    #[test]
    fn rsi_stays_in_range_on_a_sine_wave() {
        let close = sine(200);
        let out = rsi(&close, 14).unwrap();
        assert_eq!(out.len(), close.len());
        assert!(out[..13].iter().all(|v| v.is_none()));
        for value in out[13..].iter() {
            let v = value.unwrap();
            assert!((0.0..=100.0).contains(&v), "RSI out of range: {}", v);
        }
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let close: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let out = rsi(&close, 14).unwrap();
        assert!(out[13..].iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let close: Vec<f64> = (1..=20).map(|i| 20.0 - i as f64).collect();
        let out = rsi(&close, 14).unwrap();
        assert!(out[13..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn rsi_matches_hand_computed_wilder_average() {
        // window 2 -> alpha 0.5, gains [0, 2, 0, 1], losses [0, 0, 1, 0]
        let close = [10.0, 12.0, 11.0, 12.0];
        let out = rsi(&close, 2).unwrap();
        assert_eq!(out[0], None);
        // avg gain 1.0, avg loss 0.0
        assert_eq!(out[1], Some(100.0));
        // avg gain 0.5, avg loss 0.5
        assert_close(out[2], 50.0, 1e-12);
        // avg gain 0.75, avg loss 0.25
        assert_close(out[3], 75.0, 1e-12);
    }

    #[test]
    fn rsi_with_short_history_is_undefined() {
        assert_eq!(rsi(&[1.0; 10], 14).unwrap(), vec![None; 10]);
    }

    #[test]
    fn stoch_rsi_lines_stay_in_unit_range() {
        let close = sine(200);
        let out = stoch_rsi(&close, 14, 3, 3).unwrap();
        assert_eq!(out.k.len(), close.len());
        assert!(out.k[..28].iter().all(|v| v.is_none()));
        for series in [&out.stoch_rsi, &out.k, &out.d] {
            for v in series.iter().flatten() {
                assert!((0.0..=1.0).contains(v), "stoch RSI out of range: {}", v);
            }
        }
        assert!(out.d[30..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn stoch_rsi_is_undefined_when_rsi_is_flat() {
        let close: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let out = stoch_rsi(&close, 14, 3, 3).unwrap();
        assert!(out.stoch_rsi.iter().all(|v| v.is_none()));
    }

    #[test]
    fn williams_r_stays_in_range_on_a_sine_wave() {
        let close = sine(200);
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let out = williams_r(&high, &low, &close, 14).unwrap();
        assert_eq!(out.len(), close.len());
        assert!(out[..13].iter().all(|v| v.is_none()));
        for value in out[13..].iter() {
            let v = value.unwrap();
            assert!((-100.0..=0.0).contains(&v), "%R out of range: {}", v);
        }
    }

    #[test]
    fn williams_r_hand_computed() {
        let high = [10.0, 12.0, 11.0];
        let low = [8.0, 9.0, 7.0];
        let close = [9.0, 11.0, 8.0];
        let out = williams_r(&high, &low, &close, 2).unwrap();
        assert_eq!(out[0], None);
        // hh 12, ll 8, close 11
        assert_close(out[1], -25.0, 1e-12);
        // hh 12, ll 7, close 8
        assert_close(out[2], -80.0, 1e-12);
    }
}
