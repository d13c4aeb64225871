//! Signal components, composed per evaluation by the engine:
//! - Snapshot: indicator bundle for the latest bar
//! - Crossover detector: actual and predictive EMA/SMA crosses
//! - Confirmation engine: volume, volatility, stochastic, DMI
//! - Confidence scorer: bounded score and grade
//! - Cooldown ledger: per-direction entry suppression
//! - Position tracker: trailing stop, breakeven, reverse-cross exits

pub mod confirmation;
pub mod cooldown;
pub mod crossover;
pub mod scoring;
pub mod snapshot;
pub mod tracker;
pub mod variant;

pub use confirmation::{ConfirmationEngine, ConfirmationKind, Confirmations};
pub use cooldown::CooldownLedger;
pub use crossover::{actual_cross, projected_cross_price, CrossEvent, CrossoverDetector};
pub use scoring::{ConfidenceScorer, Score};
pub use snapshot::MarketSnapshot;
pub use tracker::{ExitDecision, PositionTracker};
pub use variant::{Requirements, StrategyVariant};
