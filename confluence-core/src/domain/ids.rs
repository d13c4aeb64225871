use serde::{Deserialize, Serialize};
use std::fmt;

use super::candle::Timeframe;
use super::signal::{Direction, SignalKind};

/// Deterministic signal ID.
///
/// BLAKE3 over the idempotency key `(symbol, timeframe, time, direction, kind)`,
/// so re-evaluating the same bar yields the same ID and downstream upserts
/// stay idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn derive(
        symbol: &str,
        timeframe: Timeframe,
        time: i64,
        direction: Direction,
        kind: SignalKind,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(b"\0");
        hasher.update(timeframe.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(&time.to_le_bytes());
        hasher.update(direction.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(kind.as_str().as_bytes());
        let hash = hasher.finalize();
        // 16 bytes of hex is plenty for uniqueness within a signal table.
        Self(hash.to_hex()[..32].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = SignalId::derive("BTCUSDT", Timeframe::H1, 1_000, Direction::Long, SignalKind::Entry);
        let b = SignalId::derive("BTCUSDT", Timeframe::H1, 1_000, Direction::Long, SignalKind::Entry);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn every_key_component_matters() {
        let base = SignalId::derive("BTCUSDT", Timeframe::H1, 1_000, Direction::Long, SignalKind::Entry);
        let variants = [
            SignalId::derive("ETHUSDT", Timeframe::H1, 1_000, Direction::Long, SignalKind::Entry),
            SignalId::derive("BTCUSDT", Timeframe::H4, 1_000, Direction::Long, SignalKind::Entry),
            SignalId::derive("BTCUSDT", Timeframe::H1, 2_000, Direction::Long, SignalKind::Entry),
            SignalId::derive("BTCUSDT", Timeframe::H1, 1_000, Direction::Short, SignalKind::Entry),
            SignalId::derive("BTCUSDT", Timeframe::H1, 1_000, Direction::Long, SignalKind::Exit),
        ];
        for v in variants {
            assert_ne!(base, v);
        }
    }
}
