//! Market snapshot: the indicator bundle for the latest bar of a window.
//!
//! Indicators are computed once over the whole window; only the values the
//! decision logic needs for the last bar (and the bar before it, for cross
//! detection) are kept.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Timeframe};
use crate::indicators::{
    closes, dmi_adx, ema_of_series, hvp, sma_of_series, stochastic, volume_ratio, Atr, Indicator,
};
use crate::options::Options;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub time: i64,
    pub close: f64,

    pub ema_fast: f64,
    pub ema_fast_prev: f64,
    pub sma_slow: f64,
    pub sma_slow_prev: f64,
    /// Close that drops out of the slow SMA window when the next bar arrives.
    pub sma_leaving_close: f64,

    pub atr: f64,

    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: f64,

    pub stoch_k: f64,
    pub stoch_d: f64,
    pub stoch_k_prev: f64,
    pub stoch_d_prev: f64,

    pub hvp: f64,
    pub hvp_ma: f64,

    pub volume_ratio: f64,
}

impl MarketSnapshot {
    /// Build the snapshot for the last candle.
    ///
    /// Returns `None` when the window is shorter than `opts.min_window()`.
    /// Any field may still be NaN: check [`has_cross_inputs`](Self::has_cross_inputs)
    /// before detecting a cross. Comparisons on confirmation inputs treat NaN
    /// as "not confirmed".
    pub fn from_candles(candles: &[Candle], timeframe: Timeframe, opts: &Options) -> Option<Self> {
        let n = candles.len();
        if n < opts.min_window() || n < 2 || opts.sma_slow == 0 {
            return None;
        }
        let last = n - 1;

        let close_series = closes(candles);
        let ema = ema_of_series(&close_series, opts.ema_fast);
        let sma = sma_of_series(&close_series, opts.sma_slow);
        let atr = Atr::new(opts.atr_period.max(1)).compute(candles);
        let dmi = dmi_adx(candles, opts.dmi_period);
        let stoch = stochastic(candles, opts.stoch_k_period, opts.stoch_d_period);
        let hvp_series = hvp(
            candles,
            opts.hv_period,
            opts.hvp_lookback,
            timeframe.bars_per_year(),
        );
        let hvp_ma = sma_of_series(&hvp_series, opts.hvp_ma_period);
        let vol_ratio = volume_ratio(candles, opts.volume_lookback);

        let snapshot = Self {
            time: candles[last].time,
            close: candles[last].close,
            ema_fast: ema[last],
            ema_fast_prev: ema[last - 1],
            sma_slow: sma[last],
            sma_slow_prev: sma[last - 1],
            sma_leaving_close: close_series[n - opts.sma_slow],
            atr: atr[last],
            plus_di: dmi.plus_di[last],
            minus_di: dmi.minus_di[last],
            adx: dmi.adx[last],
            stoch_k: stoch.k[last],
            stoch_d: stoch.d[last],
            stoch_k_prev: stoch.k[last - 1],
            stoch_d_prev: stoch.d[last - 1],
            hvp: hvp_series[last],
            hvp_ma: hvp_ma[last],
            volume_ratio: vol_ratio[last],
        };

        Some(snapshot)
    }

    /// The four MA samples and the close are all finite.
    pub fn has_cross_inputs(&self) -> bool {
        [
            self.close,
            self.ema_fast,
            self.ema_fast_prev,
            self.sma_slow,
            self.sma_slow_prev,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
