//! Parallel evaluation of a universe of (symbol, timeframe) windows.
//!
//! Each input is one engine call; distinct keys share nothing but the store,
//! so rayon fans them out freely.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use confluence_core::domain::{Signal, SymbolInput, Timeframe};
use confluence_core::{Diagnostic, Options, SignalEngine};

use crate::candles::{source_for, CandleError};
use crate::config::RunnerConfig;

/// Outcome for one universe entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub signals: Vec<Signal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Candle fetch failure; the entry was not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanReport {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.outcomes.iter().flat_map(|o| o.signals.iter())
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Evaluates every input in parallel. Output order follows `inputs`.
pub fn scan_inputs(engine: &SignalEngine, inputs: &[SymbolInput], options: &Options) -> ScanReport {
    let outcomes = inputs
        .par_iter()
        .map(|input| {
            let eval = engine.evaluate(input, options);
            ScanOutcome {
                symbol: input.symbol.clone(),
                timeframe: input.timeframe,
                signals: eval.signals,
                diagnostics: eval.diagnostics,
                error: None,
            }
        })
        .collect();
    ScanReport { outcomes }
}

/// Fetches candles for every universe entry and evaluates the latest bar.
///
/// A failed fetch is reported on its outcome and does not stop the scan.
pub fn scan_universe(engine: &SignalEngine, config: &RunnerConfig) -> ScanReport {
    let outcomes: Vec<ScanOutcome> = config
        .universe
        .par_iter()
        .map(|entry| {
            let fetched: Result<Vec<_>, CandleError> =
                source_for(entry, &config.retry).fetch(&entry.symbol, entry.timeframe);
            match fetched {
                Ok(candles) => {
                    let input = SymbolInput::new(entry.symbol.clone(), entry.timeframe, candles);
                    let eval = engine.evaluate(&input, &config.options);
                    ScanOutcome {
                        symbol: entry.symbol.clone(),
                        timeframe: entry.timeframe,
                        signals: eval.signals,
                        diagnostics: eval.diagnostics,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(symbol = %entry.symbol, timeframe = %entry.timeframe, error = %e, "candle fetch failed");
                    ScanOutcome {
                        symbol: entry.symbol.clone(),
                        timeframe: entry.timeframe,
                        signals: Vec::new(),
                        diagnostics: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    let report = ScanReport { outcomes };
    info!(
        entries = config.universe.len(),
        signals = report.signals().count(),
        failures = report.failures(),
        "scan complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candles::SyntheticCandleSource;
    use crate::config::{RetryPolicy, UniverseEntry};
    use confluence_core::MemoryStore;
    use std::sync::Arc;

    fn engine() -> SignalEngine {
        SignalEngine::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn parallel_matches_sequential() {
        let opts = Options::default();
        let inputs: Vec<SymbolInput> = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT"]
            .iter()
            .flat_map(|&s| {
                Timeframe::ALL.into_iter().map(move |tf| {
                    SymbolInput::new(s, tf, SyntheticCandleSource::new(400).generate(s, tf))
                })
            })
            .collect();

        let parallel = scan_inputs(&engine(), &inputs, &opts);

        let sequential = engine();
        for (input, outcome) in inputs.iter().zip(&parallel.outcomes) {
            assert_eq!(outcome.symbol, input.symbol);
            assert_eq!(outcome.timeframe, input.timeframe);
            let expected = sequential.generate_signals(input, &opts);
            assert_eq!(
                serde_json::to_string(&outcome.signals).unwrap(),
                serde_json::to_string(&expected).unwrap()
            );
        }
    }

    #[test]
    fn short_inputs_report_insufficient_data() {
        let input = SymbolInput::new(
            "BTCUSDT",
            Timeframe::H1,
            SyntheticCandleSource::new(50).generate("BTCUSDT", Timeframe::H1),
        );
        let report = scan_inputs(&engine(), &[input], &Options::default());
        assert!(report.outcomes[0].signals.is_empty());
        assert_eq!(
            report.outcomes[0].diagnostics,
            vec![Diagnostic::InsufficientData { have: 50, need: 202 }]
        );
    }

    #[test]
    fn failed_fetch_does_not_stop_the_scan() {
        let config = RunnerConfig {
            universe: vec![
                UniverseEntry::new("BTCUSDT", Timeframe::H1),
                UniverseEntry::new("ETHUSDT", Timeframe::H1).with_csv("/nonexistent/eth.csv"),
            ],
            retry: RetryPolicy {
                max_attempts: 1,
                base_delay_ms: 0,
                ..RetryPolicy::default()
            },
            ..RunnerConfig::default()
        };
        let report = scan_universe(&engine(), &config);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].error.is_none());
        assert!(report.outcomes[1].error.is_some());
        assert_eq!(report.failures(), 1);
    }
}
