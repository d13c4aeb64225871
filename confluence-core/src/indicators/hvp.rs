//! Historical volatility (HV) and historical volatility percentile (HVP).
//!
//! HV[t] = sample stdev of ln(close[j] / close[j-1]) over the last `hv_period`
//! returns, annualized by sqrt(bars_per_year) and expressed in percent.
//!
//! HVP[t] = share of the trailing `lookback` HV samples (current included)
//! that are strictly below HV[t], times 100. A market whose volatility never
//! changes therefore reads 0, not 100, and a fresh volatility high reads close
//! to 100.

use crate::domain::Candle;

pub fn historical_volatility(candles: &[Candle], hv_period: usize, bars_per_year: f64) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];

    if hv_period < 2 || n <= hv_period {
        return result;
    }

    let mut returns = vec![f64::NAN; n];
    for i in 1..n {
        let prev = candles[i - 1].close;
        let cur = candles[i].close;
        if prev > 0.0 && cur > 0.0 {
            returns[i] = (cur / prev).ln();
        }
    }

    let scale = bars_per_year.max(0.0).sqrt() * 100.0;

    for i in hv_period..n {
        let window = &returns[i + 1 - hv_period..=i];
        if window.iter().any(|r| r.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / hv_period as f64;
        let var = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (hv_period - 1) as f64;
        result[i] = var.sqrt() * scale;
    }

    result
}

/// Percentile rank of each HV sample against its trailing `lookback` window.
pub fn percentile_rank(series: &[f64], lookback: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];

    if lookback == 0 {
        return result;
    }

    for i in 0..n {
        let current = series[i];
        if current.is_nan() {
            continue;
        }
        let start = (i + 1).saturating_sub(lookback);
        let mut total = 0usize;
        let mut below = 0usize;
        for &v in &series[start..=i] {
            if v.is_nan() {
                continue;
            }
            total += 1;
            if v < current {
                below += 1;
            }
        }
        // `total` includes `current`, so it is never zero here.
        result[i] = below as f64 / total as f64 * 100.0;
    }

    result
}

pub fn hvp(candles: &[Candle], hv_period: usize, lookback: usize, bars_per_year: f64) -> Vec<f64> {
    percentile_rank(&historical_volatility(candles, hv_period, bars_per_year), lookback)
}
