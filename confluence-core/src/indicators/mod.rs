//! Indicator library.
//!
//! Pure functions over a candle window: candle history in, numeric series of
//! the same length out. Warmup positions are `f64::NAN`; degenerate inputs
//! (flat ranges, zero true range, empty history) produce neutral values
//! instead of NaN/Infinity. Nothing here panics on short input.
//!
//! Single-series indicators also implement [`Indicator`]; multi-series ones
//! (DMI, Stochastic) return a struct of aligned series.

pub mod atr;
pub mod dmi;
pub mod ema;
pub mod hvp;
pub mod sma;
pub mod stochastic;
pub mod volume;

pub use atr::{true_range, wilder_smooth, Atr};
pub use dmi::{dmi_adx, Adx, DmiSeries};
pub use ema::{ema_alpha, ema_of_series, Ema};
pub use hvp::{historical_volatility, hvp, percentile_rank};
pub use sma::{sma_of_series, Sma};
pub use stochastic::{stochastic, StochasticSeries};
pub use volume::{volume_ratio, volume_spike};

use crate::domain::Candle;

/// Trait for single-series indicators.
///
/// # Look-ahead contamination guard
/// No value at index t may depend on candles after t. Computing over a
/// truncated window must reproduce the prefix of the full-window output.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_200", "atr_14").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Returns a `Vec<f64>` of the same length as `candles`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Synthetic candles from close prices.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000,
/// one hour apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                time: i as i64 * 3_600_000,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            time: i as i64 * 3_600_000,
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
