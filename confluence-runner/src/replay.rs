//! Bar-by-bar replay of a candle history through the engine.
//!
//! Each step hands the engine a trailing window ending at the next bar, the
//! same way a live poller would, so position and cooldown state carry across
//! steps through the engine's store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use confluence_core::domain::{Candle, Direction, Signal, SymbolInput, Timeframe};
use confluence_core::store::PositionKey;
use confluence_core::{Options, SignalEngine};

/// Extra bars kept ahead of the minimum window so the EMA seed settles.
pub const DEFAULT_WINDOW_SLACK: usize = 300;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub symbol: String,
    pub timeframe: Option<Timeframe>,
    pub bars: usize,
    /// Engine calls made (bars at or past the minimum window).
    pub evaluated: usize,
    pub entries: usize,
    pub long_entries: usize,
    pub short_entries: usize,
    /// Exit count per reason (`TrailingStop`, `ReverseCross`).
    pub exits: BTreeMap<String, usize>,
    /// Suppressed candidates per diagnostic kind.
    pub suppressed: BTreeMap<String, usize>,
    /// True when a position is still open after the last bar.
    pub open_at_end: bool,
    pub options_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub summary: ReplaySummary,
    pub signals: Vec<Signal>,
}

impl ReplayReport {
    pub fn entries(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_entry())
    }

    pub fn exits(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_exit())
    }
}

/// Replays `candles` through `engine`.
///
/// `window` is the trailing window length handed to each call; `None` means
/// the minimum window plus [`DEFAULT_WINDOW_SLACK`]. Windows shorter than the
/// minimum are raised to it.
pub fn replay(
    engine: &SignalEngine,
    symbol: &str,
    timeframe: Timeframe,
    candles: &[Candle],
    options: &Options,
    window: Option<usize>,
) -> ReplayReport {
    let min_window = options.min_window();
    let window = window
        .unwrap_or(min_window + DEFAULT_WINDOW_SLACK)
        .max(min_window);

    let mut summary = ReplaySummary {
        symbol: symbol.to_string(),
        timeframe: Some(timeframe),
        bars: candles.len(),
        options_fingerprint: options.fingerprint(),
        ..ReplaySummary::default()
    };
    let mut signals = Vec::new();

    for end in min_window..=candles.len() {
        let start = end.saturating_sub(window);
        let input = SymbolInput::new(symbol, timeframe, candles[start..end].to_vec());
        let eval = engine.evaluate(&input, options);
        summary.evaluated += 1;

        for diagnostic in &eval.diagnostics {
            *summary.suppressed.entry(diagnostic.name().to_string()).or_default() += 1;
        }
        for signal in &eval.signals {
            if signal.is_entry() {
                summary.entries += 1;
                match signal.direction {
                    Direction::Long => summary.long_entries += 1,
                    Direction::Short => summary.short_entries += 1,
                }
            } else {
                *summary.exits.entry(signal.reason.as_str().to_string()).or_default() += 1;
            }
        }
        signals.extend(eval.signals);
    }

    let key = PositionKey::new(symbol, timeframe);
    summary.open_at_end = engine.store().get_position(&key).is_some();

    if summary.evaluated == 0 {
        debug!(symbol, %timeframe, bars = candles.len(), need = min_window, "replay skipped: history shorter than minimum window");
    }
    info!(
        symbol,
        %timeframe,
        bars = summary.bars,
        entries = summary.entries,
        exits = summary.exits.values().sum::<usize>(),
        "replay complete"
    );

    ReplayReport { summary, signals }
}
