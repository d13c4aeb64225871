//! State store: open positions and cooldown timestamps.
//!
//! The engine never keeps per-key state of its own. Everything that must
//! survive between evaluation calls goes through [`StateStore`], injected at
//! construction, so callers choose where it lives.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, PositionState, Timeframe};

/// Position key: one open position per (symbol, timeframe).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl PositionKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }

    pub fn cooldown(&self, direction: Direction) -> CooldownKey {
        CooldownKey {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            direction,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}

/// Cooldown key: LONG and SHORT are tracked independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CooldownKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
}

/// Key-value store for engine state.
///
/// Implementations must be safe to share across threads; the engine
/// serializes access per position key, so a store only needs to make
/// individual operations atomic.
pub trait StateStore: Send + Sync {
    fn get_position(&self, key: &PositionKey) -> Option<PositionState>;
    fn set_position(&self, key: &PositionKey, state: PositionState);
    /// Remove and return the position, if any.
    fn delete_position(&self, key: &PositionKey) -> Option<PositionState>;

    /// Epoch ms of the last ENTRY for this key.
    fn get_cooldown(&self, key: &CooldownKey) -> Option<i64>;
    fn set_cooldown(&self, key: &CooldownKey, fired_at_ms: i64);
}

/// Serializable copy of a [`MemoryStore`], entries sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub positions: Vec<(PositionKey, PositionState)>,
    pub cooldowns: Vec<(CooldownKey, i64)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: RwLock<HashMap<PositionKey, PositionState>>,
    cooldowns: RwLock<HashMap<CooldownKey, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        store.restore(snapshot);
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut positions: Vec<_> = self
            .positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));

        let mut cooldowns: Vec<_> = self
            .cooldowns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        cooldowns.sort_by(|a, b| a.0.cmp(&b.0));

        StoreSnapshot {
            positions,
            cooldowns,
        }
    }

    /// Replace all contents with the snapshot.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
        positions.clear();
        positions.extend(snapshot.positions);
        drop(positions);

        let mut cooldowns = self.cooldowns.write().unwrap_or_else(PoisonError::into_inner);
        cooldowns.clear();
        cooldowns.extend(snapshot.cooldowns);
    }

    pub fn open_positions(&self) -> usize {
        self.positions.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl StateStore for MemoryStore {
    fn get_position(&self, key: &PositionKey) -> Option<PositionState> {
        self.positions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_position(&self, key: &PositionKey, state: PositionState) {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), state);
    }

    fn delete_position(&self, key: &PositionKey) -> Option<PositionState> {
        self.positions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    fn get_cooldown(&self, key: &CooldownKey) -> Option<i64> {
        self.cooldowns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    fn set_cooldown(&self, key: &CooldownKey, fired_at_ms: i64) {
        self.cooldowns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), fired_at_ms);
    }
}
