//! Candle sources: CSV files, a seeded synthetic generator, and a bounded
//! retry wrapper.
//!
//! Sources hand the engine candles sorted strictly ascending by time. The
//! engine itself never sorts or deduplicates, so ordering is checked here.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use confluence_core::domain::{Candle, Timeframe};

use crate::config::{RetryPolicy, UniverseEntry};

#[derive(Debug, Error)]
pub enum CandleError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unparseable timestamp '{value}' in {path}")]
    BadTimestamp { path: PathBuf, value: String },

    #[error("candles in {path} not strictly ascending at time {time}")]
    Unordered { path: PathBuf, time: i64 },

    #[error("no candles for {symbol}@{timeframe}")]
    Empty { symbol: String, timeframe: Timeframe },

    #[error("{symbol}@{timeframe}: giving up after {attempts} attempts: {last}")]
    Exhausted {
        symbol: String,
        timeframe: Timeframe,
        attempts: u32,
        #[source]
        last: Box<CandleError>,
    },
}

impl CandleError {
    /// Worth retrying: the file may appear or unlock. Content errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, CandleError::Io { .. })
    }
}

pub trait CandleSource: Send + Sync {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, CandleError>;
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Reads `time,open,high,low,close,volume` with a header row.
///
/// `time` is epoch milliseconds, RFC 3339, or `YYYY-MM-DD HH:MM:SS` (UTC).
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandleSource for CsvCandleSource {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, CandleError> {
        let candles = read_candles_csv(&self.path)?;
        if candles.is_empty() {
            return Err(CandleError::Empty {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        debug!(symbol, %timeframe, path = %self.path.display(), count = candles.len(), "loaded csv candles");
        Ok(candles)
    }
}

pub fn read_candles_csv(path: &Path) -> Result<Vec<Candle>, CandleError> {
    let file = File::open(path).map_err(|source| CandleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut candles: Vec<Candle> = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| CandleError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let time = parse_timestamp(&row.time).ok_or_else(|| CandleError::BadTimestamp {
            path: path.to_path_buf(),
            value: row.time.clone(),
        })?;
        if candles.last().is_some_and(|prev| prev.time >= time) {
            return Err(CandleError::Unordered {
                path: path.to_path_buf(),
                time,
            });
        }

        let candle = Candle {
            time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !candle.is_sane() {
            warn!(path = %path.display(), time, "inconsistent OHLC values");
        }
        candles.push(candle);
    }

    Ok(candles)
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Seeded random walk, deterministic per (symbol, timeframe).
#[derive(Debug, Clone)]
pub struct SyntheticCandleSource {
    bars: usize,
    /// Time of the first candle (epoch ms), aligned down to the timeframe.
    start_ms: i64,
}

impl SyntheticCandleSource {
    /// 2024-01-01T00:00:00Z
    pub const DEFAULT_START_MS: i64 = 1_704_067_200_000;

    pub fn new(bars: usize) -> Self {
        Self {
            bars,
            start_ms: Self::DEFAULT_START_MS,
        }
    }

    pub fn with_start(mut self, start_ms: i64) -> Self {
        self.start_ms = start_ms;
        self
    }

    pub fn generate(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(b"\0");
        hasher.update(timeframe.as_str().as_bytes());
        let seed: [u8; 32] = *hasher.finalize().as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let step = timeframe.millis();
        let start = self.start_ms - self.start_ms.rem_euclid(step);
        // Per-bar volatility grows with the square root of the bar length.
        let scale = (timeframe.minutes() as f64 / 60.0).sqrt();

        let mut candles = Vec::with_capacity(self.bars);
        let mut price = 100.0_f64;
        let mut drift = 0.0_f64;

        for i in 0..self.bars {
            // Slowly wandering drift produces trends long enough to cross the slow SMA.
            drift = (drift + rng.gen_range(-0.0004..0.0004)).clamp(-0.003, 0.003);
            let ret = drift + rng.gen_range(-0.008..0.008) * scale;
            let open = price;
            let close = (price * (1.0 + ret)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004) * scale);
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004) * scale);
            let mut volume = rng.gen_range(800.0..1200.0);
            if rng.gen_bool(0.05) {
                volume *= rng.gen_range(1.5..3.5);
            }

            candles.push(Candle {
                time: start + i as i64 * step,
                open,
                high,
                low,
                close,
                volume,
            });
            price = close;
        }

        candles
    }
}

impl CandleSource for SyntheticCandleSource {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, CandleError> {
        if self.bars == 0 {
            return Err(CandleError::Empty {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        Ok(self.generate(symbol, timeframe))
    }
}

// ── Retry ────────────────────────────────────────────────────────────

/// Retries transient failures of the inner source with bounded backoff.
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: CandleSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<S: CandleSource> CandleSource for RetryingSource<S> {
    fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, CandleError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt);
                warn!(symbol, %timeframe, attempt, delay_ms = delay.as_millis() as u64, "retrying candle fetch");
                thread::sleep(delay);
            }

            match self.inner.fetch(symbol, timeframe) {
                Ok(candles) => return Ok(candles),
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(last) => Err(CandleError::Exhausted {
                symbol: symbol.to_string(),
                timeframe,
                attempts,
                last: Box::new(last),
            }),
            None => Err(CandleError::Empty {
                symbol: symbol.to_string(),
                timeframe,
            }),
        }
    }
}

/// Source for a universe entry: its CSV with retry, or synthetic candles.
pub fn source_for(entry: &UniverseEntry, retry: &RetryPolicy) -> Box<dyn CandleSource> {
    match &entry.csv {
        Some(path) => Box::new(RetryingSource::new(CsvCandleSource::new(path), retry.clone())),
        None => Box::new(SyntheticCandleSource::new(entry.synthetic_bars)),
    }
}
