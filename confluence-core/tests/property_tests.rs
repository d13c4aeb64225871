//! Property tests for core invariants.
//!
//! Uses proptest to verify:
//! 1. SMA equals brute-force windowed averaging
//! 2. EMA of a constant series is that constant
//! 3. Bullish and bearish actual crosses never coincide
//! 4. Confidence is always an integer in [70, 95]; grades partition it
//! 5. Windows shorter than the minimum produce no signals
//! 6. Ratchet monotonicity: trailing stops only tighten
//! 7. Two ENTRYs for one key/direction are never closer than the cooldown

use std::sync::Arc;

use proptest::prelude::*;

use confluence_core::components::{
    actual_cross, ConfidenceScorer, Confirmations, MarketSnapshot, PositionTracker,
};
use confluence_core::domain::{Candle, Direction, Grade, SymbolInput, Timeframe};
use confluence_core::indicators::{ema_of_series, sma_of_series};
use confluence_core::{MemoryStore, Options, SignalEngine};

const HOUR: i64 = 3_600_000;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_series(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), len)
}

fn snapshot(volume_ratio: f64, hvp: f64) -> MarketSnapshot {
    MarketSnapshot {
        time: 0,
        close: 100.0,
        ema_fast: 100.0,
        ema_fast_prev: 100.0,
        sma_slow: 100.0,
        sma_slow_prev: 100.0,
        sma_leaving_close: 100.0,
        atr: 1.0,
        plus_di: 20.0,
        minus_di: 20.0,
        adx: 20.0,
        stoch_k: 50.0,
        stoch_d: 50.0,
        stoch_k_prev: 50.0,
        stoch_d_prev: 50.0,
        hvp,
        hvp_ma: 50.0,
        volume_ratio,
    }
}

fn bullish_cross(time: i64) -> MarketSnapshot {
    MarketSnapshot {
        time,
        close: 101.0,
        ema_fast: 100.5,
        ema_fast_prev: 99.8,
        ..snapshot(2.0, 60.0)
    }
}

/// Closes far below any long stop with no cross.
fn washout(time: i64) -> MarketSnapshot {
    MarketSnapshot {
        time,
        close: 50.0,
        ema_fast: 100.5,
        ema_fast_prev: 100.6,
        ..snapshot(1.0, 10.0)
    }
}

// ── 1-2. Indicators ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_matches_brute_force(values in arb_series(1..120), period in 1usize..30) {
        let sma = sma_of_series(&values, period);
        prop_assert_eq!(sma.len(), values.len());
        for i in 0..values.len() {
            if i + 1 < period {
                prop_assert!(sma[i].is_nan());
            } else {
                let window = &values[i + 1 - period..=i];
                let expected = window.iter().sum::<f64>() / period as f64;
                prop_assert!((sma[i] - expected).abs() < 1e-6, "i={} got={} want={}", i, sma[i], expected);
            }
        }
    }

    #[test]
    fn ema_of_constant_is_constant(value in arb_price(), len in 1usize..200, period in 1usize..50) {
        let values = vec![value; len];
        let ema = ema_of_series(&values, period);
        for (i, v) in ema.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(v.is_nan());
            } else {
                prop_assert!((v - value).abs() < 1e-9);
            }
        }
    }
}

// ── 3. Cross exclusivity ────────────────────────────────────────────

proptest! {
    #[test]
    fn crosses_are_mutually_exclusive(
        ema_now in arb_price(), sma_now in arb_price(),
        ema_prev in arb_price(), sma_prev in arb_price()
    ) {
        let bullish = ema_now > sma_now && ema_prev <= sma_prev;
        let bearish = ema_now < sma_now && ema_prev >= sma_prev;
        prop_assert!(!(bullish && bearish));
        let got = actual_cross(ema_now, sma_now, ema_prev, sma_prev);
        prop_assert_eq!(got == Some(Direction::Long), bullish);
        prop_assert_eq!(got == Some(Direction::Short), bearish);
    }
}

// ── 4. Confidence bounds ────────────────────────────────────────────

proptest! {
    #[test]
    fn confidence_is_bounded(
        ratio in -5.0..50.0_f64,
        hvp in -10.0..200.0_f64,
        stochastic in any::<bool>(),
        dmi in any::<bool>(),
        pre_cross in any::<bool>()
    ) {
        let confirmations = Confirmations { stochastic, dmi, ..Confirmations::default() };
        let score = ConfidenceScorer.score(&snapshot(ratio, hvp), &confirmations, pre_cross);
        prop_assert!((70..=95).contains(&score.confidence));
        prop_assert_eq!(score.grade, Grade::from_confidence(score.confidence));
        if score.confidence < 80 {
            prop_assert_eq!(score.grade, Grade::C);
        }
    }
}

// ── 5. Short input ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn short_windows_yield_no_signals(closes in arb_series(0..202)) {
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                time: i as i64 * HOUR,
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect();
        let input = SymbolInput::new("BTCUSDT", Timeframe::H1, candles);
        let engine = SignalEngine::new(Arc::new(MemoryStore::new()));
        prop_assert!(engine.generate_signals(&input, &Options::default()).is_empty());
    }
}

// ── 6. Ratchet monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn trailing_stop_only_tightens(
        entry in arb_price(),
        path in prop::collection::vec((arb_price(), 0.1..20.0_f64), 1..60),
        long in any::<bool>()
    ) {
        let tracker = PositionTracker::new(2.0, 1.0);
        let direction = if long { Direction::Long } else { Direction::Short };
        let mut pos = tracker.open(direction, entry, 0, 1.0);
        let mut prev = pos.trailing_stop;

        for (close, atr) in path {
            let exit = tracker.update(&mut pos, close, atr, None);
            match direction {
                Direction::Long => prop_assert!(pos.trailing_stop >= prev),
                Direction::Short => prop_assert!(pos.trailing_stop <= prev),
            }
            prev = pos.trailing_stop;
            if exit.is_some() {
                break;
            }
        }
    }
}

// ── 7. Cooldown spacing ─────────────────────────────────────────────

proptest! {
    #[test]
    fn entries_respect_the_cooldown(
        gaps in prop::collection::vec(1i64..6, 1..40),
        cooldown_hours in 0u32..8
    ) {
        let opts = Options {
            signal_cooldown_hours: cooldown_hours as f64,
            ..Options::default()
        };
        let engine = SignalEngine::new(Arc::new(MemoryStore::new()));

        // Alternate a qualifying bullish cross with a stop-out so positions
        // never block entries; only the cooldown can.
        let mut time = 0i64;
        let mut entry_times = Vec::new();
        for gap in gaps {
            time += gap * HOUR;
            let eval = engine.evaluate_snapshot("BTCUSDT", Timeframe::H1, &bullish_cross(time), &opts);
            if let Some(entry) = eval.entry() {
                entry_times.push(entry.time);
            }
            time += HOUR;
            engine.evaluate_snapshot("BTCUSDT", Timeframe::H1, &washout(time), &opts);
        }

        prop_assert!(!entry_times.is_empty());
        for pair in entry_times.windows(2) {
            prop_assert!(pair[1] - pair[0] >= opts.cooldown_ms());
        }
    }
}
