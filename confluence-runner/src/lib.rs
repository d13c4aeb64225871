//! Confluence Runner: the collaborators around `confluence-core`.
//!
//! - TOML configuration (options, universe, retry policy, outputs)
//! - Candle sources: CSV, seeded synthetic, bounded retry
//! - Bar-by-bar replay with a summary report
//! - Parallel universe scan
//! - Idempotent JSONL signal sink
//! - Checksummed state file for polling callers

pub mod candles;
pub mod config;
pub mod replay;
pub mod scan;
pub mod sink;
pub mod state_file;

pub use candles::{
    source_for, CandleError, CandleSource, CsvCandleSource, RetryingSource, SyntheticCandleSource,
};
pub use config::{Backoff, ConfigError, OutputConfig, RetryPolicy, RunnerConfig, UniverseEntry};
pub use replay::{replay, ReplayReport, ReplaySummary};
pub use scan::{scan_inputs, scan_universe, ScanOutcome, ScanReport};
pub use sink::{JsonlSink, MemorySink, SignalSink, SinkError};
pub use state_file::{load_state, save_state, StoreError};
