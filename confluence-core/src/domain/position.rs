use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Open position for one (symbol, timeframe) key.
///
/// Absence from the state store means the key is flat. The trailing stop
/// obeys the ratchet invariant: it may tighten but never loosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: i64,
    /// ATR at entry, used when the current bar's ATR is unavailable.
    pub entry_atr: f64,
    pub highest_close_since_entry: f64,
    pub lowest_close_since_entry: f64,
    pub trailing_stop: f64,
    /// Set once favourable excursion reaches the breakeven threshold.
    #[serde(default)]
    pub breakeven_armed: bool,
}

impl PositionState {
    /// Favourable excursion in price units (never negative).
    pub fn favorable_excursion(&self) -> f64 {
        match self.direction {
            Direction::Long => (self.highest_close_since_entry - self.entry_price).max(0.0),
            Direction::Short => (self.entry_price - self.lowest_close_since_entry).max(0.0),
        }
    }
}
