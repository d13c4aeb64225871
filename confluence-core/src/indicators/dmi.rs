//! DMI / ADX: Directional Movement Index and Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive candles
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! A zero smoothed true range (perfectly flat market) yields DI = 0 and DX = 0
//! rather than a division by zero.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Candle;

/// The three DMI output series, aligned to the input candles.
#[derive(Debug, Clone, PartialEq)]
pub struct DmiSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

pub fn dmi_adx(candles: &[Candle], period: usize) -> DmiSeries {
    let n = candles.len();
    let empty = DmiSeries {
        plus_di: vec![f64::NAN; n],
        minus_di: vec![f64::NAN; n],
        adx: vec![f64::NAN; n],
    };

    if n < 2 || period == 0 {
        return empty;
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let mut tr = true_range(candles);
    tr[0] = f64::NAN;

    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut plus_di = vec![f64::NAN; n];
    let mut minus_di = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];

    for i in 0..n {
        if smooth_tr[i].is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
            continue;
        }
        if smooth_tr[i] == 0.0 {
            plus_di[i] = 0.0;
            minus_di[i] = 0.0;
            dx[i] = 0.0;
            continue;
        }

        let pdi = 100.0 * smooth_plus[i] / smooth_tr[i];
        let mdi = 100.0 * smooth_minus[i] / smooth_tr[i];
        plus_di[i] = pdi;
        minus_di[i] = mdi;

        let di_sum = pdi + mdi;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / di_sum
        };
    }

    DmiSeries {
        plus_di,
        minus_di,
        adx: wilder_smooth(&dx, period),
    }
}

/// ADX as a single-series indicator.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        dmi_adx(candles, self.period).adx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_candles;

    fn trending(n: usize, step: f64) -> Vec<Candle> {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * step;
                (base - 1.0, base + 3.0, base - 3.0, base + 2.0)
            })
            .collect();
        make_ohlc_candles(&data)
    }

    #[test]
    fn adx_bounds() {
        let candles = make_ohlc_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 110.0, 103.0, 108.0),
            (108.0, 112.0, 106.0, 110.0),
            (110.0, 111.0, 104.0, 105.0),
            (105.0, 109.0, 103.0, 107.0),
            (107.0, 113.0, 105.0, 112.0),
        ]);
        let dmi = dmi_adx(&candles, 3);
        for (i, &v) in dmi.adx.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "ADX out of bounds at {i}: {v}");
            }
        }
    }

    #[test]
    fn uptrend_has_plus_di_dominant() {
        let dmi = dmi_adx(&trending(40, 5.0), 5);
        let last = dmi.plus_di.len() - 1;
        assert!(dmi.plus_di[last] > dmi.minus_di[last]);
        assert!(dmi.adx[last] > 20.0, "ADX {}", dmi.adx[last]);
    }

    #[test]
    fn downtrend_has_minus_di_dominant() {
        let dmi = dmi_adx(&trending(40, -2.0), 5);
        let last = dmi.minus_di.len() - 1;
        assert!(dmi.minus_di[last] > dmi.plus_di[last]);
    }

    #[test]
    fn flat_market_is_zero_not_nan() {
        let candles = make_ohlc_candles(&[(100.0, 100.0, 100.0, 100.0); 30]);
        let dmi = dmi_adx(&candles, 5);
        assert_eq!(dmi.plus_di[29], 0.0);
        assert_eq!(dmi.minus_di[29], 0.0);
        assert_eq!(dmi.adx[29], 0.0);
    }

    #[test]
    fn too_few_candles() {
        let candles = make_ohlc_candles(&[(100.0, 105.0, 95.0, 102.0)]);
        let dmi = dmi_adx(&candles, 3);
        assert!(dmi.adx.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn adx_lookback() {
        assert_eq!(Adx::new(14).lookback(), 27);
    }
}
