//! Signal engine: composes the components for one evaluation call.
//!
//! Per call, for the latest bar only:
//! 1. Snapshot indicators (or bail out with a diagnostic). Without valid
//!    crossover inputs only the trailing stop of an open position is checked.
//! 2. Detect the crossover event.
//! 3. Exit phase: advance any open position; an exit deletes it.
//! 4. Entry phase: open position, missing confirmations, cooldown and an
//!    unusable ATR each suppress the candidate; otherwise emit the ENTRY,
//!    open the position and stamp the cooldown.
//!
//! At most one EXIT and one ENTRY per call, EXIT first. Calls for the same
//! (symbol, timeframe) are serialized by a keyed mutex; distinct keys never
//! contend beyond the brief lookup of their lock. Idle locks are dropped once
//! the lock map reaches [`LOCK_PRUNE_AT`] entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::{
    ConfidenceScorer, ConfirmationEngine, ConfirmationKind, CooldownLedger, CrossEvent,
    CrossoverDetector, ExitDecision, MarketSnapshot, PositionTracker,
};
use crate::domain::{
    Direction, EntryMeta, PositionState, ReverseCrossMeta, Signal, SignalId, SignalKind,
    SignalMeta, SymbolInput, Timeframe, TrailingStopMeta,
};
use crate::options::Options;
use crate::store::{PositionKey, StateStore};

/// Lock map size at which locks nobody holds are dropped.
pub const LOCK_PRUNE_AT: usize = 256;

/// Why a candidate produced no signal. Not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    InsufficientData { have: usize, need: usize },
    IndicatorsUnavailable,
    PositionOpen { direction: Direction },
    ConfirmationFailed {
        direction: Direction,
        missing: Vec<ConfirmationKind>,
    },
    CooldownActive { direction: Direction, remaining_ms: i64 },
}

impl Diagnostic {
    /// Stable tag, matching the serialized `kind`.
    pub fn name(&self) -> &'static str {
        match self {
            Diagnostic::InsufficientData { .. } => "insufficient_data",
            Diagnostic::IndicatorsUnavailable => "indicators_unavailable",
            Diagnostic::PositionOpen { .. } => "position_open",
            Diagnostic::ConfirmationFailed { .. } => "confirmation_failed",
            Diagnostic::CooldownActive { .. } => "cooldown_active",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub signals: Vec<Signal>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Evaluation {
    fn diagnostic(diagnostic: Diagnostic) -> Self {
        Self {
            signals: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn entry(&self) -> Option<&Signal> {
        self.signals.iter().find(|s| s.is_entry())
    }

    pub fn exit(&self) -> Option<&Signal> {
        self.signals.iter().find(|s| s.is_exit())
    }
}

pub struct SignalEngine {
    store: Arc<dyn StateStore>,
    key_locks: Mutex<HashMap<PositionKey, Arc<Mutex<()>>>>,
}

impl SignalEngine {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Signals for the latest bar of `input`. Empty when nothing fires.
    pub fn generate_signals(&self, input: &SymbolInput, options: &Options) -> Vec<Signal> {
        self.evaluate(input, options).signals
    }

    /// Like [`generate_signals`](Self::generate_signals), with the reasons a
    /// candidate was suppressed.
    pub fn evaluate(&self, input: &SymbolInput, options: &Options) -> Evaluation {
        let need = options.min_window();
        let have = input.candles.len();
        if have < need {
            debug!(symbol = %input.symbol, timeframe = %input.timeframe, have, need, "insufficient data");
            return Evaluation::diagnostic(Diagnostic::InsufficientData { have, need });
        }

        let Some(snapshot) = MarketSnapshot::from_candles(&input.candles, input.timeframe, options) else {
            debug!(symbol = %input.symbol, timeframe = %input.timeframe, "indicators unavailable");
            return Evaluation::diagnostic(Diagnostic::IndicatorsUnavailable);
        };

        self.evaluate_snapshot(&input.symbol, input.timeframe, &snapshot, options)
    }

    /// Run the decision logic on a precomputed indicator bundle.
    pub fn evaluate_snapshot(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        snapshot: &MarketSnapshot,
        options: &Options,
    ) -> Evaluation {
        let key = PositionKey::new(symbol, timeframe);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !snapshot.has_cross_inputs() {
            // No cross can be detected, but an open position still has a stop.
            let mut eval = Evaluation::diagnostic(Diagnostic::IndicatorsUnavailable);
            if snapshot.close.is_finite() {
                if let Some(exit) = self.exit_phase(&key, snapshot, options, None) {
                    eval.signals.push(exit);
                }
            }
            return eval;
        }

        let requirements = options.variant.requirements(options);
        let event = CrossoverDetector::from_options(options, requirements.pre_cross).detect(snapshot);
        let actual_cross = event.filter(CrossEvent::is_actual).map(|e| e.direction());

        let mut eval = Evaluation::default();

        if let Some(exit) = self.exit_phase(&key, snapshot, options, actual_cross) {
            eval.signals.push(exit);
        }

        let Some(event) = event else {
            return eval;
        };

        match self.entry_phase(&key, snapshot, options, event) {
            Ok(entry) => eval.signals.push(entry),
            Err(diagnostic) => eval.diagnostics.push(diagnostic),
        }
        eval
    }

    fn key_lock(&self, key: &PositionKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= LOCK_PRUNE_AT && !locks.contains_key(key) {
            // Only the map holds a strong ref to an idle lock, and new refs
            // are handed out under the map lock.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Number of per-key locks currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.key_locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn exit_phase(
        &self,
        key: &PositionKey,
        snap: &MarketSnapshot,
        options: &Options,
        actual_cross: Option<Direction>,
    ) -> Option<Signal> {
        let mut position = self.store.get_position(key)?;
        let tracker = PositionTracker::from_options(options);

        let Some(exit) = tracker.update(&mut position, snap.close, snap.atr, actual_cross) else {
            self.store.set_position(key, position);
            return None;
        };

        self.store.delete_position(key);
        let signal = exit_signal(key, snap, &position, exit);
        info!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            direction = signal.direction.as_str(),
            reason = ?signal.reason,
            price = signal.price,
            stop = position.trailing_stop,
            "exit"
        );
        Some(signal)
    }

    fn entry_phase(
        &self,
        key: &PositionKey,
        snap: &MarketSnapshot,
        options: &Options,
        event: CrossEvent,
    ) -> Result<Signal, Diagnostic> {
        let direction = event.direction();

        if let Some(open) = self.store.get_position(key) {
            debug!(symbol = %key.symbol, timeframe = %key.timeframe, open = open.direction.as_str(), "entry suppressed: position open");
            return Err(Diagnostic::PositionOpen {
                direction: open.direction,
            });
        }

        let confirmations = ConfirmationEngine::new(options).evaluate(direction, snap);
        let missing = options
            .variant
            .requirements(options)
            .missing(direction, &confirmations);
        if !missing.is_empty() {
            debug!(symbol = %key.symbol, timeframe = %key.timeframe, direction = direction.as_str(), ?missing, "entry suppressed: confirmations");
            return Err(Diagnostic::ConfirmationFailed { direction, missing });
        }

        let ledger = CooldownLedger::new(self.store.as_ref(), options.cooldown_ms());
        let cooldown_key = key.cooldown(direction);
        let remaining_ms = ledger.remaining_ms(&cooldown_key, snap.time);
        if remaining_ms > 0 {
            debug!(symbol = %key.symbol, timeframe = %key.timeframe, direction = direction.as_str(), remaining_ms, "entry suppressed: cooldown");
            return Err(Diagnostic::CooldownActive {
                direction,
                remaining_ms,
            });
        }

        if !(snap.atr.is_finite() && snap.atr > 0.0) {
            debug!(symbol = %key.symbol, timeframe = %key.timeframe, atr = snap.atr, "entry suppressed: no usable ATR");
            return Err(Diagnostic::IndicatorsUnavailable);
        }

        let tracker = PositionTracker::from_options(options);
        let position = tracker.open(direction, snap.close, snap.time, snap.atr);
        let score = ConfidenceScorer.score(snap, &confirmations, !event.is_actual());

        let signal = Signal {
            id: SignalId::derive(&key.symbol, key.timeframe, snap.time, direction, SignalKind::Entry),
            symbol: key.symbol.clone(),
            timeframe: key.timeframe,
            time: snap.time,
            direction,
            kind: SignalKind::Entry,
            reason: event.reason(),
            price: snap.close,
            confidence: Some(score.confidence),
            grade: Some(score.grade),
            meta: SignalMeta::Confluence(EntryMeta {
                variant: options.variant,
                ema_fast: snap.ema_fast,
                sma_slow: snap.sma_slow,
                projected_cross_price: event.projected_price(),
                volume_ratio: snap.volume_ratio,
                hvp: snap.hvp,
                hvp_ma: snap.hvp_ma,
                stoch_k: snap.stoch_k,
                stoch_d: snap.stoch_d,
                plus_di: snap.plus_di,
                minus_di: snap.minus_di,
                adx: snap.adx,
                atr: snap.atr,
                initial_stop: position.trailing_stop,
                confirmations,
            }),
        };

        self.store.set_position(key, position);
        ledger.record_fired(&cooldown_key, snap.time);

        info!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            direction = direction.as_str(),
            reason = ?signal.reason,
            price = signal.price,
            confidence = score.confidence,
            grade = score.grade.as_str(),
            "entry"
        );
        Ok(signal)
    }
}

fn exit_signal(
    key: &PositionKey,
    snap: &MarketSnapshot,
    position: &PositionState,
    exit: ExitDecision,
) -> Signal {
    let meta = match exit {
        ExitDecision::TrailingStop => SignalMeta::TrailingStop(TrailingStopMeta {
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            trailing_stop: position.trailing_stop,
            highest_close: position.highest_close_since_entry,
            lowest_close: position.lowest_close_since_entry,
            atr: snap.atr,
            breakeven_armed: position.breakeven_armed,
        }),
        ExitDecision::ReverseCross => SignalMeta::ReverseCross(ReverseCrossMeta {
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            ema_fast: snap.ema_fast,
            sma_slow: snap.sma_slow,
            trailing_stop: position.trailing_stop,
        }),
    };

    Signal {
        id: SignalId::derive(&key.symbol, key.timeframe, snap.time, position.direction, SignalKind::Exit),
        symbol: key.symbol.clone(),
        timeframe: key.timeframe,
        time: snap.time,
        direction: position.direction,
        kind: SignalKind::Exit,
        reason: exit.reason(),
        price: snap.close,
        confidence: None,
        grade: None,
        meta,
    }
}
