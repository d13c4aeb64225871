//! Engine options.
//!
//! Every field has a default, and deserialization fills missing fields from
//! those defaults, so a partial TOML table overrides only what it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::variant::StrategyVariant;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("{field} must be >= 1")]
    ZeroPeriod { field: &'static str },
    #[error("ema_fast ({fast}) must be shorter than sma_slow ({slow})")]
    FastNotFaster { fast: usize, slow: usize },
    #[error("{field} must be a finite, non-negative number (got {value})")]
    BadMultiplier { field: &'static str, value: f64 },
    #[error("hv_period must be >= 2 (got {0})")]
    HvPeriodTooShort(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub variant: StrategyVariant,

    // ── Crossover ──
    pub ema_fast: usize,
    pub sma_slow: usize,
    pub enable_pre_cross: bool,
    /// Relative distance between close and the projected crossing price that
    /// still counts as a pre-cross (0.001 = 0.1%).
    pub predictive_buffer: f64,

    // ── Volume ──
    pub volume_lookback: usize,
    pub volume_spike_ratio: f64,
    /// SHORT-only: allow low-volume bearish continuation.
    pub enable_short_grind: bool,
    pub grind_volume_ratio: f64,

    // ── Volatility regime ──
    pub hv_period: usize,
    pub hvp_lookback: usize,
    pub hvp_ma_period: usize,
    pub hvp_threshold: f64,

    // ── Stochastic ──
    pub use_stoch: bool,
    pub stoch_k_period: usize,
    pub stoch_d_period: usize,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,

    // ── DMI / ADX ──
    pub use_dmi: bool,
    pub dmi_period: usize,
    pub adx_threshold: f64,

    // ── Position management ──
    pub atr_period: usize,
    pub trail_atr_mult: f64,
    pub breakeven_atr: f64,

    // ── Cooldown ──
    pub signal_cooldown_hours: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            variant: StrategyVariant::Confluence,
            ema_fast: 21,
            sma_slow: 200,
            enable_pre_cross: true,
            predictive_buffer: 0.001,
            volume_lookback: 20,
            volume_spike_ratio: 1.5,
            enable_short_grind: false,
            grind_volume_ratio: 0.8,
            hv_period: 20,
            hvp_lookback: 100,
            hvp_ma_period: 20,
            hvp_threshold: 50.0,
            use_stoch: false,
            stoch_k_period: 14,
            stoch_d_period: 3,
            stoch_overbought: 80.0,
            stoch_oversold: 20.0,
            use_dmi: false,
            dmi_period: 14,
            adx_threshold: 20.0,
            atr_period: 14,
            trail_atr_mult: 2.0,
            breakeven_atr: 1.0,
            signal_cooldown_hours: 4.0,
        }
    }
}

impl Options {
    /// Minimum candle count for an evaluation: max(sma_slow + 2, hvp_lookback + 5).
    pub fn min_window(&self) -> usize {
        (self.sma_slow + 2).max(self.hvp_lookback + 5)
    }

    pub fn cooldown_ms(&self) -> i64 {
        (self.signal_cooldown_hours.max(0.0) * 3_600_000.0) as i64
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        let periods = [
            ("ema_fast", self.ema_fast),
            ("sma_slow", self.sma_slow),
            ("volume_lookback", self.volume_lookback),
            ("hvp_lookback", self.hvp_lookback),
            ("hvp_ma_period", self.hvp_ma_period),
            ("stoch_k_period", self.stoch_k_period),
            ("stoch_d_period", self.stoch_d_period),
            ("dmi_period", self.dmi_period),
            ("atr_period", self.atr_period),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(OptionsError::ZeroPeriod { field });
            }
        }
        if self.hv_period < 2 {
            return Err(OptionsError::HvPeriodTooShort(self.hv_period));
        }
        if self.ema_fast >= self.sma_slow {
            return Err(OptionsError::FastNotFaster {
                fast: self.ema_fast,
                slow: self.sma_slow,
            });
        }
        let multipliers = [
            ("predictive_buffer", self.predictive_buffer),
            ("volume_spike_ratio", self.volume_spike_ratio),
            ("grind_volume_ratio", self.grind_volume_ratio),
            ("trail_atr_mult", self.trail_atr_mult),
            ("breakeven_atr", self.breakeven_atr),
            ("signal_cooldown_hours", self.signal_cooldown_hours),
        ];
        for (field, value) in multipliers {
            if !value.is_finite() || value < 0.0 {
                return Err(OptionsError::BadMultiplier { field, value });
            }
        }
        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON form, for provenance in reports.
    pub fn fingerprint(&self) -> String {
        // Serializing a plain struct of numbers and enums cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
