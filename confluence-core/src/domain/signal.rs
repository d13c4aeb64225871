//! Signal: the immutable record the engine emits.
//!
//! Signals describe a market event for one (symbol, timeframe) at one bar.
//! Downstream collaborators (persistence, notification, execution) consume
//! them; nothing in the engine mutates a signal after it is built.

use serde::{Deserialize, Deserializer, Serialize};

use super::candle::Timeframe;
use super::ids::SignalId;
use crate::components::confirmation::Confirmations;
use crate::components::variant::StrategyVariant;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Entry,
    Exit,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Entry => "ENTRY",
            SignalKind::Exit => "EXIT",
        }
    }
}

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalReason {
    /// Predictive entry one bar ahead of the mechanical cross.
    PreCross,
    /// Mechanical EMA/SMA cross on this bar.
    Cross,
    /// Opposite cross while a position is open.
    ReverseCross,
    /// Close crossed the trailing stop against the position.
    TrailingStop,
}

impl SignalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalReason::PreCross => "PreCross",
            SignalReason::Cross => "Cross",
            SignalReason::ReverseCross => "ReverseCross",
            SignalReason::TrailingStop => "TrailingStop",
        }
    }
}

/// Discrete confidence bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

impl Grade {
    /// 90+ → A+, 85-89 → A, 80-84 → B, anything else → C.
    pub fn from_confidence(confidence: u8) -> Self {
        match confidence {
            90.. => Grade::APlus,
            85..=89 => Grade::A,
            80..=84 => Grade::B,
            _ => Grade::C,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

/// serde_json writes non-finite floats as `null`. Indicators that are still
/// warming up are NaN, so read `null` back as NaN instead of failing.
fn f64_or_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Indicator bundle captured when an entry fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub variant: StrategyVariant,
    #[serde(deserialize_with = "f64_or_nan")]
    pub ema_fast: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub sma_slow: f64,
    /// Close that would force the cross on the next bar (pre-cross entries only).
    pub projected_cross_price: Option<f64>,
    #[serde(deserialize_with = "f64_or_nan")]
    pub volume_ratio: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub hvp: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub hvp_ma: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub stoch_k: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub stoch_d: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub plus_di: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub minus_di: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub adx: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub atr: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub initial_stop: f64,
    pub confirmations: Confirmations,
}

/// Position context captured when the trailing stop is hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopMeta {
    #[serde(deserialize_with = "f64_or_nan")]
    pub entry_price: f64,
    pub entry_time: i64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub trailing_stop: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub highest_close: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub lowest_close: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub atr: f64,
    pub breakeven_armed: bool,
}

/// Position context captured when an opposite cross closes the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseCrossMeta {
    #[serde(deserialize_with = "f64_or_nan")]
    pub entry_price: f64,
    pub entry_time: i64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub ema_fast: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub sma_slow: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub trailing_stop: f64,
}

/// Metadata attached to a signal, keyed by the bundle that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bundle", rename_all = "snake_case")]
pub enum SignalMeta {
    Confluence(EntryMeta),
    TrailingStop(TrailingStopMeta),
    ReverseCross(ReverseCrossMeta),
}

/// An immutable entry or exit event for the latest bar of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Time of the bar that produced the signal (epoch ms).
    pub time: i64,
    pub direction: Direction,
    pub kind: SignalKind,
    pub reason: SignalReason,
    #[serde(deserialize_with = "f64_or_nan")]
    pub price: f64,
    /// Entry-only, integer in [70, 95].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    pub meta: SignalMeta,
}

impl Signal {
    pub fn is_entry(&self) -> bool {
        self.kind == SignalKind::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.kind == SignalKind::Exit
    }
}
