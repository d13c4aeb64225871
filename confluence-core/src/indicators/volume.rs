//! Volume ratio and volume spike.
//!
//! ratio[t] = volume[t] / mean(volume[t-lookback..t])
//! The mean excludes the current bar. A zero mean reads 1.0 (neutral).

use crate::domain::Candle;

pub fn volume_ratio(candles: &[Candle], lookback: usize) -> Vec<f64> {
    let n = candles.len();
    let mut result = vec![f64::NAN; n];

    if lookback == 0 || n <= lookback {
        return result;
    }

    let mut sum: f64 = candles[..lookback].iter().map(|c| c.volume).sum();
    for i in lookback..n {
        let mean = sum / lookback as f64;
        let current = candles[i].volume;
        if !mean.is_nan() && !current.is_nan() {
            result[i] = if mean > 0.0 { current / mean } else { 1.0 };
        }
        sum += current - candles[i - lookback].volume;
    }

    result
}

/// True when the latest candle's volume exceeds `multiplier` × the mean of
/// the preceding `lookback` candles.
pub fn volume_spike(candles: &[Candle], lookback: usize, multiplier: f64) -> bool {
    volume_ratio(candles, lookback)
        .last()
        .is_some_and(|&ratio| ratio > multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    fn with_volumes(volumes: &[f64]) -> Vec<Candle> {
        let closes = vec![100.0; volumes.len()];
        let mut candles = make_candles(&closes);
        for (c, &v) in candles.iter_mut().zip(volumes) {
            c.volume = v;
        }
        candles
    }

    #[test]
    fn ratio_excludes_current_bar() {
        let candles = with_volumes(&[100.0, 100.0, 100.0, 300.0]);
        let ratio = volume_ratio(&candles, 3);
        assert!(ratio[2].is_nan());
        assert_approx(ratio[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ratio_rolls_forward() {
        let candles = with_volumes(&[100.0, 200.0, 300.0, 200.0, 100.0]);
        let ratio = volume_ratio(&candles, 2);
        assert_approx(ratio[2], 2.0, DEFAULT_EPSILON); // 300 / 150
        assert_approx(ratio[3], 0.8, DEFAULT_EPSILON); // 200 / 250
        assert_approx(ratio[4], 0.4, DEFAULT_EPSILON); // 100 / 250
    }

    #[test]
    fn zero_volume_history_is_neutral() {
        let candles = with_volumes(&[0.0, 0.0, 0.0, 50.0]);
        assert_eq!(volume_ratio(&candles, 3)[3], 1.0);
    }

    #[test]
    fn spike_detection() {
        let candles = with_volumes(&[1000.0, 1000.0, 1000.0, 2000.0]);
        assert!(volume_spike(&candles, 3, 1.5));
        assert!(!volume_spike(&candles, 3, 2.0));
        assert!(!volume_spike(&candles[..2], 3, 1.5));
    }
}
