//! Stochastic oscillator (%K / %D).
//!
//! %K = (close - lowest_low) / (highest_high - lowest_low) * 100 over the
//! trailing `k_period` candles. A zero range reads as 50 (neutral).
//! %D = SMA(%K, d_period).

use super::sma::sma_of_series;
use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> StochasticSeries {
    let n = candles.len();
    let mut k = vec![f64::NAN; n];

    if k_period == 0 || n < k_period {
        return StochasticSeries {
            d: vec![f64::NAN; n],
            k,
        };
    }

    for i in (k_period - 1)..n {
        let window = &candles[i + 1 - k_period..=i];
        let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let close = candles[i].close;

        if close.is_nan() || !highest.is_finite() || !lowest.is_finite() {
            continue;
        }

        let range = highest - lowest;
        k[i] = if range <= 0.0 {
            50.0
        } else {
            ((close - lowest) / range * 100.0).clamp(0.0, 100.0)
        };
    }

    let d = sma_of_series(&k, d_period);
    StochasticSeries { k, d }
}
