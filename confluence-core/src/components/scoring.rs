//! Confidence scoring.
//!
//! ```text
//! confidence = clamp(70 + volume + volatility + stoch + dmi + timeliness, 70, 95)
//! volume     = clamp((ratio - 1.5) * 10, 0, 15)
//! volatility = clamp((hvp - 50) / 5, 0, 10)
//! stoch      = 3 if the stochastic confirmation holds
//! dmi        = 2 if the DMI confirmation holds
//! timeliness = 5 for a pre-cross with ratio >= 1.5 and hvp >= 50
//! ```

use serde::{Deserialize, Serialize};

use super::confirmation::Confirmations;
use super::snapshot::MarketSnapshot;
use crate::domain::Grade;

pub const BASE_CONFIDENCE: f64 = 70.0;
pub const MAX_CONFIDENCE: f64 = 95.0;

const VOLUME_PIVOT: f64 = 1.5;
const VOLUME_CAP: f64 = 15.0;
const VOLATILITY_PIVOT: f64 = 50.0;
const VOLATILITY_CAP: f64 = 10.0;
const STOCH_BONUS: f64 = 3.0;
const DMI_BONUS: f64 = 2.0;
const TIMELINESS_BONUS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub confidence: u8,
    pub grade: Grade,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn score(&self, snap: &MarketSnapshot, confirmations: &Confirmations, pre_cross: bool) -> Score {
        // `max` before `min` so a NaN input collapses to a zero bonus.
        let volume = ((snap.volume_ratio - VOLUME_PIVOT) * 10.0).max(0.0).min(VOLUME_CAP);
        let volatility = ((snap.hvp - VOLATILITY_PIVOT) / 5.0).max(0.0).min(VOLATILITY_CAP);
        let stoch = if confirmations.stochastic { STOCH_BONUS } else { 0.0 };
        let dmi = if confirmations.dmi { DMI_BONUS } else { 0.0 };
        let timely = pre_cross && snap.volume_ratio >= VOLUME_PIVOT && snap.hvp >= VOLATILITY_PIVOT;
        let timeliness = if timely { TIMELINESS_BONUS } else { 0.0 };

        let raw = BASE_CONFIDENCE + volume + volatility + stoch + dmi + timeliness;
        let confidence = raw.round().clamp(BASE_CONFIDENCE, MAX_CONFIDENCE) as u8;
        Score {
            confidence,
            grade: Grade::from_confidence(confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(volume_ratio: f64, hvp: f64) -> MarketSnapshot {
        MarketSnapshot {
            time: 0,
            close: 100.0,
            ema_fast: 100.0,
            ema_fast_prev: 100.0,
            sma_slow: 100.0,
            sma_slow_prev: 100.0,
            sma_leaving_close: 100.0,
            atr: 1.0,
            plus_di: f64::NAN,
            minus_di: f64::NAN,
            adx: f64::NAN,
            stoch_k: f64::NAN,
            stoch_d: f64::NAN,
            stoch_k_prev: f64::NAN,
            stoch_d_prev: f64::NAN,
            hvp,
            hvp_ma: f64::NAN,
            volume_ratio,
        }
    }

    #[test]
    fn floor_is_seventy() {
        let s = ConfidenceScorer.score(&snap(0.5, 10.0), &Confirmations::default(), false);
        assert_eq!(s.confidence, 70);
        assert_eq!(s.grade, Grade::C);
    }

    #[test]
    fn bonuses_add_up() {
        // volume: (2.0 - 1.5) * 10 = 5, volatility: (60 - 50) / 5 = 2
        let s = ConfidenceScorer.score(&snap(2.0, 60.0), &Confirmations::default(), false);
        assert_eq!(s.confidence, 77);

        let c = Confirmations {
            stochastic: true,
            dmi: true,
            ..Confirmations::default()
        };
        let s = ConfidenceScorer.score(&snap(2.0, 60.0), &c, true);
        // 77 + 3 + 2 + 5
        assert_eq!(s.confidence, 87);
        assert_eq!(s.grade, Grade::A);
    }

    #[test]
    fn ceiling_is_ninety_five() {
        let c = Confirmations {
            stochastic: true,
            dmi: true,
            ..Confirmations::default()
        };
        let s = ConfidenceScorer.score(&snap(10.0, 100.0), &c, true);
        assert_eq!(s.confidence, 95);
        assert_eq!(s.grade, Grade::APlus);
    }

    #[test]
    fn timeliness_only_for_strong_pre_cross() {
        let weak = ConfidenceScorer.score(&snap(1.2, 60.0), &Confirmations::default(), true);
        let actual = ConfidenceScorer.score(&snap(1.2, 60.0), &Confirmations::default(), false);
        assert_eq!(weak.confidence, actual.confidence);
    }

    #[test]
    fn nan_inputs_score_the_floor() {
        let s = ConfidenceScorer.score(&snap(f64::NAN, f64::NAN), &Confirmations::default(), true);
        assert_eq!(s.confidence, 70);
    }
}
