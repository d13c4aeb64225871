//! Domain types for the signal core.

pub mod candle;
pub mod ids;
pub mod position;
pub mod signal;

pub use candle::{Candle, SymbolInput, Timeframe, TimeframeParseError};
pub use ids::SignalId;
pub use position::PositionState;
pub use signal::{
    Direction, EntryMeta, Grade, ReverseCrossMeta, Signal, SignalKind, SignalMeta, SignalReason,
    TrailingStopMeta,
};
