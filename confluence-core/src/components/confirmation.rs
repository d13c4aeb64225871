//! Confirmation engine.
//!
//! Every confirmation is evaluated on every candidate, whether or not the
//! variant requires it: unrequired ones still feed the confidence bonuses and
//! end up in the signal metadata. Any NaN input reads as "not confirmed".

use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::MarketSnapshot;
use crate::domain::Direction;
use crate::options::Options;

/// Outcome of each confirmation for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmations {
    pub volume: bool,
    /// SHORT-only low-volume continuation. Always false for LONG.
    pub short_grind: bool,
    pub volatility: bool,
    pub stochastic: bool,
    pub dmi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    Volume,
    Volatility,
    Stochastic,
    Dmi,
}

impl fmt::Display for ConfirmationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfirmationKind::Volume => "volume",
            ConfirmationKind::Volatility => "volatility",
            ConfirmationKind::Stochastic => "stochastic",
            ConfirmationKind::Dmi => "dmi",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationEngine {
    volume_spike_ratio: f64,
    enable_short_grind: bool,
    grind_volume_ratio: f64,
    hvp_threshold: f64,
    stoch_overbought: f64,
    stoch_oversold: f64,
    adx_threshold: f64,
}

impl ConfirmationEngine {
    pub fn new(opts: &Options) -> Self {
        Self {
            volume_spike_ratio: opts.volume_spike_ratio,
            enable_short_grind: opts.enable_short_grind,
            grind_volume_ratio: opts.grind_volume_ratio,
            hvp_threshold: opts.hvp_threshold,
            stoch_overbought: opts.stoch_overbought,
            stoch_oversold: opts.stoch_oversold,
            adx_threshold: opts.adx_threshold,
        }
    }

    pub fn evaluate(&self, direction: Direction, snap: &MarketSnapshot) -> Confirmations {
        let volatility = self.volatility_ok(snap);
        Confirmations {
            volume: snap.volume_ratio > self.volume_spike_ratio,
            short_grind: self.short_grind(direction, snap, volatility),
            volatility,
            stochastic: self.stochastic_ok(direction, snap),
            dmi: self.dmi_ok(direction, snap),
        }
    }

    /// HVP above the absolute threshold, or above its own moving average.
    fn volatility_ok(&self, snap: &MarketSnapshot) -> bool {
        snap.hvp > self.hvp_threshold || snap.hvp > snap.hvp_ma
    }

    fn short_grind(&self, direction: Direction, snap: &MarketSnapshot, volatility: bool) -> bool {
        self.enable_short_grind
            && direction == Direction::Short
            && snap.volume_ratio < self.grind_volume_ratio
            && snap.minus_di > snap.plus_di
            && volatility
    }

    /// %K crossing %D on this bar, away from the exhausted extreme.
    fn stochastic_ok(&self, direction: Direction, snap: &MarketSnapshot) -> bool {
        let (k, d, k_prev, d_prev) = (snap.stoch_k, snap.stoch_d, snap.stoch_k_prev, snap.stoch_d_prev);
        match direction {
            Direction::Long => k > d && k_prev <= d_prev && k < self.stoch_overbought,
            Direction::Short => k < d && k_prev >= d_prev && k > self.stoch_oversold,
        }
    }

    fn dmi_ok(&self, direction: Direction, snap: &MarketSnapshot) -> bool {
        let trending = snap.adx > self.adx_threshold;
        match direction {
            Direction::Long => snap.plus_di > snap.minus_di && trending,
            Direction::Short => snap.minus_di > snap.plus_di && trending,
        }
    }
}
