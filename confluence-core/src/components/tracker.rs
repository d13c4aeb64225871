//! Position tracker: Flat → OpenLong | OpenShort → Flat.
//!
//! Per bar while open:
//! 1. extend the close extremes,
//! 2. ratchet the trailing stop to `extreme ∓ ATR × trail_atr_mult` (tighten only),
//! 3. once the favourable excursion reaches `ATR × breakeven_atr`, hold the stop
//!    at or beyond the entry price,
//! 4. exit if the close is through the stop, else on a fresh reverse cross.
//!
//! The trailing-stop check wins when both exits trigger on the same bar.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, PositionState, SignalReason};
use crate::options::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitDecision {
    TrailingStop,
    ReverseCross,
}

impl ExitDecision {
    pub fn reason(self) -> SignalReason {
        match self {
            ExitDecision::TrailingStop => SignalReason::TrailingStop,
            ExitDecision::ReverseCross => SignalReason::ReverseCross,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    trail_atr_mult: f64,
    breakeven_atr: f64,
}

impl PositionTracker {
    pub fn new(trail_atr_mult: f64, breakeven_atr: f64) -> Self {
        Self {
            trail_atr_mult,
            breakeven_atr,
        }
    }

    pub fn from_options(opts: &Options) -> Self {
        Self::new(opts.trail_atr_mult, opts.breakeven_atr)
    }

    /// Initial stop distance from the entry price.
    pub fn initial_stop(&self, direction: Direction, entry_price: f64, atr: f64) -> f64 {
        match direction {
            Direction::Long => entry_price - atr * self.trail_atr_mult,
            Direction::Short => entry_price + atr * self.trail_atr_mult,
        }
    }

    pub fn open(&self, direction: Direction, entry_price: f64, entry_time: i64, atr: f64) -> PositionState {
        PositionState {
            direction,
            entry_price,
            entry_time,
            entry_atr: atr,
            highest_close_since_entry: entry_price,
            lowest_close_since_entry: entry_price,
            trailing_stop: self.initial_stop(direction, entry_price, atr),
            breakeven_armed: false,
        }
    }

    /// Advance the position by one bar. Returns the exit, if any; the caller
    /// deletes the state when one is returned.
    ///
    /// `reverse_cross` is the direction of an actual cross on this bar.
    pub fn update(
        &self,
        state: &mut PositionState,
        close: f64,
        atr: f64,
        reverse_cross: Option<Direction>,
    ) -> Option<ExitDecision> {
        let atr = if atr.is_finite() && atr > 0.0 {
            atr
        } else {
            state.entry_atr
        };

        if close.is_finite() {
            state.highest_close_since_entry = state.highest_close_since_entry.max(close);
            state.lowest_close_since_entry = state.lowest_close_since_entry.min(close);
        }

        self.ratchet(state, atr);
        self.apply_breakeven(state, atr);

        let stopped = match state.direction {
            Direction::Long => close < state.trailing_stop,
            Direction::Short => close > state.trailing_stop,
        };
        if stopped {
            return Some(ExitDecision::TrailingStop);
        }

        match reverse_cross {
            Some(dir) if dir == state.direction.opposite() => Some(ExitDecision::ReverseCross),
            _ => None,
        }
    }

    fn ratchet(&self, state: &mut PositionState, atr: f64) {
        let distance = atr * self.trail_atr_mult;
        state.trailing_stop = match state.direction {
            Direction::Long => state
                .trailing_stop
                .max(state.highest_close_since_entry - distance),
            Direction::Short => state
                .trailing_stop
                .min(state.lowest_close_since_entry + distance),
        };
    }

    fn apply_breakeven(&self, state: &mut PositionState, atr: f64) {
        if !state.breakeven_armed && state.favorable_excursion() >= atr * self.breakeven_atr {
            state.breakeven_armed = true;
        }
        if state.breakeven_armed {
            state.trailing_stop = match state.direction {
                Direction::Long => state.trailing_stop.max(state.entry_price),
                Direction::Short => state.trailing_stop.min(state.entry_price),
            };
        }
    }
}
