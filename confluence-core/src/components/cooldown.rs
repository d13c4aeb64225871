//! Cooldown ledger.
//!
//! An ENTRY for (symbol, timeframe, direction) is blocked while fewer than
//! `signal_cooldown_hours` have elapsed since the last one. Timestamps are
//! overwritten, never deleted; staleness is purely elapsed time.

use crate::store::{CooldownKey, StateStore};

pub struct CooldownLedger<'a> {
    store: &'a dyn StateStore,
    window_ms: i64,
}

impl<'a> CooldownLedger<'a> {
    pub fn new(store: &'a dyn StateStore, window_ms: i64) -> Self {
        Self { store, window_ms }
    }

    /// Time left before an entry is allowed again. Zero when allowed.
    pub fn remaining_ms(&self, key: &CooldownKey, now_ms: i64) -> i64 {
        match self.store.get_cooldown(key) {
            Some(last) => (self.window_ms - (now_ms - last)).max(0),
            None => 0,
        }
    }

    pub fn allow_entry(&self, key: &CooldownKey, now_ms: i64) -> bool {
        self.remaining_ms(key, now_ms) == 0
    }

    pub fn record_fired(&self, key: &CooldownKey, now_ms: i64) {
        self.store.set_cooldown(key, now_ms);
    }
}
