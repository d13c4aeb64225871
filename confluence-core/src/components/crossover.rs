//! Crossover detection: mechanical EMA/SMA crosses and predictive pre-crosses.
//!
//! Actual cross: the fast EMA is above (below) the slow SMA on this bar and
//! was at or below (at or above) it on the previous bar.
//!
//! Pre-cross: both the EMA recursion and the SMA window update are linear in
//! the next close P, so the close that makes them equal has a closed form:
//!
//! ```text
//! EMA' = (1 - a) * ema + a * P
//! SMA' = sma + (P - leaving) / N
//! EMA' == SMA'  =>  P* = (sma - leaving / N - (1 - a) * ema) / (a - 1 / N)
//! ```
//!
//! A pre-cross fires when the gap is narrowing on the correct side and the
//! current close is already within `predictive_buffer` of P*.

use serde::{Deserialize, Serialize};

use super::snapshot::MarketSnapshot;
use crate::domain::{Direction, SignalReason};
use crate::indicators::ema_alpha;
use crate::options::Options;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossEvent {
    CrossUp,
    CrossDown,
    NearCross {
        direction: Direction,
        projected_price: f64,
    },
}

impl CrossEvent {
    pub fn direction(&self) -> Direction {
        match self {
            CrossEvent::CrossUp => Direction::Long,
            CrossEvent::CrossDown => Direction::Short,
            CrossEvent::NearCross { direction, .. } => *direction,
        }
    }

    pub fn is_actual(&self) -> bool {
        !matches!(self, CrossEvent::NearCross { .. })
    }

    pub fn reason(&self) -> SignalReason {
        if self.is_actual() {
            SignalReason::Cross
        } else {
            SignalReason::PreCross
        }
    }

    pub fn projected_price(&self) -> Option<f64> {
        match self {
            CrossEvent::NearCross {
                projected_price, ..
            } => Some(*projected_price),
            _ => None,
        }
    }
}

/// Mechanical cross from two consecutive samples. Bullish and bearish are
/// mutually exclusive by construction.
pub fn actual_cross(ema_now: f64, sma_now: f64, ema_prev: f64, sma_prev: f64) -> Option<Direction> {
    if ema_now > sma_now && ema_prev <= sma_prev {
        Some(Direction::Long)
    } else if ema_now < sma_now && ema_prev >= sma_prev {
        Some(Direction::Short)
    } else {
        None
    }
}

/// Close on the next bar that would make EMA and SMA meet.
///
/// `None` when the projection is undefined (EMA and SMA react identically to
/// the next close) or lands on a non-positive price.
pub fn projected_cross_price(
    ema_now: f64,
    sma_now: f64,
    leaving_close: f64,
    alpha: f64,
    sma_period: usize,
) -> Option<f64> {
    if sma_period == 0 {
        return None;
    }
    let inv_n = 1.0 / sma_period as f64;
    let denom = alpha - inv_n;
    if denom.abs() < 1e-12 {
        return None;
    }
    let price = (sma_now - leaving_close * inv_n - (1.0 - alpha) * ema_now) / denom;
    (price.is_finite() && price > 0.0).then_some(price)
}

#[derive(Debug, Clone)]
pub struct CrossoverDetector {
    alpha: f64,
    sma_period: usize,
    predictive_buffer: f64,
    pre_cross_enabled: bool,
}

impl CrossoverDetector {
    pub fn new(ema_period: usize, sma_period: usize, predictive_buffer: f64, pre_cross_enabled: bool) -> Self {
        Self {
            alpha: ema_alpha(ema_period),
            sma_period,
            predictive_buffer,
            pre_cross_enabled,
        }
    }

    pub fn from_options(opts: &Options, pre_cross_enabled: bool) -> Self {
        Self::new(opts.ema_fast, opts.sma_slow, opts.predictive_buffer, pre_cross_enabled)
    }

    pub fn detect(&self, snap: &MarketSnapshot) -> Option<CrossEvent> {
        if !snap.has_cross_inputs() {
            return None;
        }

        match actual_cross(snap.ema_fast, snap.sma_slow, snap.ema_fast_prev, snap.sma_slow_prev) {
            Some(Direction::Long) => return Some(CrossEvent::CrossUp),
            Some(Direction::Short) => return Some(CrossEvent::CrossDown),
            None => {}
        }

        if !self.pre_cross_enabled {
            return None;
        }
        self.pre_cross(snap)
    }

    fn pre_cross(&self, snap: &MarketSnapshot) -> Option<CrossEvent> {
        let gap_now = snap.ema_fast - snap.sma_slow;
        let gap_prev = snap.ema_fast_prev - snap.sma_slow_prev;

        // EMA below SMA and closing in → bullish; above and closing in → bearish.
        let direction = if gap_now < 0.0 && gap_now > gap_prev {
            Direction::Long
        } else if gap_now > 0.0 && gap_now < gap_prev {
            Direction::Short
        } else {
            return None;
        };

        let projected = projected_cross_price(
            snap.ema_fast,
            snap.sma_slow,
            snap.sma_leaving_close,
            self.alpha,
            self.sma_period,
        )?;

        let distance = (snap.close - projected).abs() / projected;
        (distance <= self.predictive_buffer).then_some(CrossEvent::NearCross {
            direction,
            projected_price: projected,
        })
    }
}
