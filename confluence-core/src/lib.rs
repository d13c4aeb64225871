//! Confluence Core: signal generation for OHLCV candle windows.
//!
//! This crate contains the signal core:
//! - Domain types (candles, signals, positions, IDs)
//! - Indicator library (EMA, SMA, ATR, DMI/ADX, Stochastic, HVP, volume ratio)
//! - Signal components (crossover, confirmations, scoring, cooldown, tracker)
//! - State store trait and the in-memory implementation
//! - The engine that composes them for the latest bar of a window
//!
//! The core places no orders and performs no I/O. All per-key state lives in
//! the injected [`store::StateStore`].

pub mod components;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod options;
pub mod store;

pub use engine::{Diagnostic, Evaluation, SignalEngine};
pub use options::{Options, OptionsError};
pub use store::{MemoryStore, StateStore};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across scan threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::SymbolInput>();
        require_sync::<domain::SymbolInput>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::PositionState>();
        require_sync::<domain::PositionState>();

        // Components
        require_send::<components::MarketSnapshot>();
        require_sync::<components::MarketSnapshot>();
        require_send::<components::CrossoverDetector>();
        require_sync::<components::CrossoverDetector>();
        require_send::<components::ConfirmationEngine>();
        require_sync::<components::ConfirmationEngine>();
        require_send::<components::PositionTracker>();
        require_sync::<components::PositionTracker>();

        // Engine and state
        require_send::<Options>();
        require_sync::<Options>();
        require_send::<MemoryStore>();
        require_sync::<MemoryStore>();
        require_send::<SignalEngine>();
        require_sync::<SignalEngine>();
        require_send::<Evaluation>();
        require_sync::<Evaluation>();
    }

    /// Architecture contract: the engine reaches per-key state only through
    /// the injected store trait object.
    #[test]
    fn engine_accepts_any_state_store() {
        fn _check_trait_object_builds(store: std::sync::Arc<dyn StateStore>) -> SignalEngine {
            SignalEngine::new(store)
        }
    }
}
