//! Runner configuration (TOML).
//!
//! ```toml
//! [options]
//! ema_fast = 21
//! enable_short_grind = true
//!
//! [[universe]]
//! symbol = "BTCUSDT"
//! timeframe = "1h"
//! csv = "data/BTCUSDT_1h.csv"
//!
//! [[universe]]
//! symbol = "ETHUSDT"
//! timeframe = "15m"          # no csv: synthetic candles
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 250
//! backoff = "exponential"
//!
//! [output]
//! signals = "out/signals.jsonl"
//! state = "out/state.json"
//! ```
//!
//! Every table is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use confluence_core::domain::Timeframe;
use confluence_core::{Options, OptionsError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),

    #[error("retry.max_attempts must be >= 1")]
    ZeroAttempts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub options: Options,
    pub universe: Vec<UniverseEntry>,
    pub retry: RetryPolicy,
    pub output: OutputConfig,
}

/// One (symbol, timeframe) to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// CSV history. Without one the entry runs on synthetic candles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    /// Synthetic history length.
    #[serde(default = "default_synthetic_bars")]
    pub synthetic_bars: usize,
}

fn default_synthetic_bars() -> usize {
    600
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            csv: None,
            synthetic_bars: default_synthetic_bars(),
        }
    }

    pub fn with_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Linear,
    Exponential,
}

/// Bounded retry for candle sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    ///
    /// Linear: base × retry. Exponential: base × 2^(retry-1).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = match self.backoff {
            Backoff::Linear => u64::from(retry),
            Backoff::Exponential => 1u64 << (retry - 1).min(16),
        };
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSONL signal file, upserted by signal ID.
    pub signals: Option<PathBuf>,
    /// Engine state carried between runs.
    pub state: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.options.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::components::StrategyVariant;

    #[test]
    fn full_config_parses() {
        let text = r#"
            [options]
            ema_fast = 9
            variant = "trending"
            enable_short_grind = true

            [[universe]]
            symbol = "BTCUSDT"
            timeframe = "1h"
            csv = "data/btc.csv"

            [[universe]]
            symbol = "ETHUSDT"
            timeframe = "15m"
            synthetic_bars = 400

            [retry]
            max_attempts = 5
            backoff = "linear"

            [output]
            signals = "out/signals.jsonl"
        "#;
        let cfg = RunnerConfig::from_toml_str(text).unwrap();
        assert_eq!(cfg.options.ema_fast, 9);
        assert_eq!(cfg.options.sma_slow, 200);
        assert_eq!(cfg.options.variant, StrategyVariant::Trending);
        assert!(cfg.options.enable_short_grind);

        assert_eq!(cfg.universe.len(), 2);
        assert_eq!(cfg.universe[0].csv.as_deref(), Some(Path::new("data/btc.csv")));
        assert_eq!(cfg.universe[0].synthetic_bars, 600);
        assert_eq!(cfg.universe[1].timeframe, Timeframe::M15);
        assert_eq!(cfg.universe[1].synthetic_bars, 400);

        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.base_delay_ms, 250);
        assert_eq!(cfg.retry.backoff, Backoff::Linear);
        assert_eq!(cfg.output.signals.as_deref(), Some(Path::new("out/signals.jsonl")));
        assert!(cfg.output.state.is_none());
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let cfg = RunnerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, RunnerConfig::default());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let err = RunnerConfig::from_toml_str("[options]\nema_fast = 300\n").unwrap_err();
        assert!(matches!(err, ConfigError::Options(OptionsError::FastNotFaster { .. })));

        let err = RunnerConfig::from_toml_str("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroAttempts));
    }

    #[test]
    fn unknown_timeframe_is_a_parse_error() {
        let err = RunnerConfig::from_toml_str(
            "[[universe]]\nsymbol = \"BTCUSDT\"\ntimeframe = \"1d\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn backoff_delays() {
        let linear = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
            backoff: Backoff::Linear,
        };
        assert_eq!(linear.delay_for(1), Duration::from_millis(100));
        assert_eq!(linear.delay_for(3), Duration::from_millis(300));

        let exp = RetryPolicy {
            backoff: Backoff::Exponential,
            ..linear
        };
        assert_eq!(exp.delay_for(1), Duration::from_millis(100));
        assert_eq!(exp.delay_for(2), Duration::from_millis(200));
        assert_eq!(exp.delay_for(4), Duration::from_millis(800));
        assert_eq!(exp.delay_for(0), Duration::ZERO);
    }
}
