//! Signal sinks.
//!
//! Signal IDs are derived from (symbol, timeframe, time, direction, kind), so
//! writing the same signal twice must not duplicate it. [`JsonlSink`] keeps
//! one JSON object per line and upserts by ID.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use confluence_core::domain::Signal;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("signal file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait SignalSink {
    /// Stores `signals`, replacing any with the same ID. Returns how many
    /// were new.
    fn write(&mut self, signals: &[Signal]) -> Result<usize, SinkError>;
}

/// In-memory sink, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    signals: Vec<Signal>,
    index: HashMap<String, usize>,
}

impl MemorySink {
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    fn upsert(&mut self, signal: Signal) -> bool {
        match self.index.get(signal.id.as_str()) {
            Some(&i) => {
                self.signals[i] = signal;
                false
            }
            None => {
                self.index.insert(signal.id.as_str().to_string(), self.signals.len());
                self.signals.push(signal);
                true
            }
        }
    }
}

impl SignalSink for MemorySink {
    fn write(&mut self, signals: &[Signal]) -> Result<usize, SinkError> {
        Ok(signals.iter().filter(|s| self.upsert((*s).clone())).count())
    }
}

/// JSON-lines file, rewritten in place on every write.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// All stored signals in file order. A missing file reads as empty and
    /// lines that do not parse as a signal are skipped.
    pub fn read_all(&self) -> Result<Vec<Signal>, SinkError> {
        Ok(self
            .read_lines()?
            .into_iter()
            .filter_map(|line| match line {
                StoredLine::Signal(signal) => Some(signal),
                StoredLine::Unparsed(_) => None,
            })
            .collect())
    }

    fn read_lines(&self) -> Result<Vec<StoredLine>, SinkError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        let mut lines = Vec::new();
        for (lineno, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Signal>(&line) {
                Ok(signal) => lines.push(StoredLine::Signal(signal)),
                Err(e) => {
                    warn!(path = %self.path.display(), line = lineno + 1, error = %e, "unparsed signal line kept as is");
                    lines.push(StoredLine::Unparsed(line));
                }
            }
        }
        Ok(lines)
    }

    fn write_lines(&self, lines: &[StoredLine]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        // Write beside the target and rename so readers never see half a file.
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp).map_err(|e| self.io_err(e))?;
            let mut out = BufWriter::new(file);
            for line in lines {
                match line {
                    StoredLine::Signal(signal) => {
                        let json = serde_json::to_string(signal)?;
                        writeln!(out, "{json}")
                    }
                    StoredLine::Unparsed(raw) => writeln!(out, "{raw}"),
                }
                .map_err(|e| self.io_err(e))?;
            }
            out.flush().map_err(|e| self.io_err(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

/// One line of a signal file. Lines that do not parse are carried through
/// rewrites untouched.
enum StoredLine {
    Signal(Signal),
    Unparsed(String),
}

impl SignalSink for JsonlSink {
    fn write(&mut self, signals: &[Signal]) -> Result<usize, SinkError> {
        if signals.is_empty() {
            return Ok(0);
        }

        let mut lines = self.read_lines()?;
        let mut index: HashMap<String, usize> = lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| match line {
                StoredLine::Signal(s) => Some((s.id.as_str().to_string(), i)),
                StoredLine::Unparsed(_) => None,
            })
            .collect();

        let mut added = 0;
        for signal in signals {
            match index.get(signal.id.as_str()) {
                Some(&i) => lines[i] = StoredLine::Signal(signal.clone()),
                None => {
                    index.insert(signal.id.as_str().to_string(), lines.len());
                    lines.push(StoredLine::Signal(signal.clone()));
                    added += 1;
                }
            }
        }
        self.write_lines(&lines)?;

        debug!(path = %self.path.display(), added, total = lines.len(), "signals written");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_core::components::{Confirmations, StrategyVariant};
    use confluence_core::domain::{
        Direction, EntryMeta, Grade, SignalId, SignalKind, SignalMeta, SignalReason, Timeframe,
    };

    fn entry(time: i64, price: f64) -> Signal {
        Signal {
            id: SignalId::derive("BTCUSDT", Timeframe::H1, time, Direction::Long, SignalKind::Entry),
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::H1,
            time,
            direction: Direction::Long,
            kind: SignalKind::Entry,
            reason: SignalReason::Cross,
            price,
            confidence: Some(82),
            grade: Some(Grade::B),
            meta: SignalMeta::Confluence(EntryMeta {
                variant: StrategyVariant::Confluence,
                ema_fast: 100.5,
                sma_slow: 100.0,
                projected_cross_price: None,
                volume_ratio: 2.0,
                hvp: 60.0,
                hvp_ma: 50.0,
                stoch_k: 55.0,
                stoch_d: 50.0,
                plus_di: 25.0,
                minus_di: 15.0,
                adx: 25.0,
                atr: 1.0,
                initial_stop: price - 2.0,
                confirmations: Confirmations::default(),
            }),
        }
    }

    #[test]
    fn memory_sink_upserts() {
        let mut sink = MemorySink::default();
        assert_eq!(sink.write(&[entry(1, 100.0), entry(2, 101.0)]).unwrap(), 2);
        assert_eq!(sink.write(&[entry(2, 101.5), entry(3, 102.0)]).unwrap(), 1);
        assert_eq!(sink.signals().len(), 3);
        assert_eq!(sink.signals()[1].price, 101.5);
    }

    #[test]
    fn jsonl_rewrites_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("signals.jsonl");
        let mut sink = JsonlSink::new(&path);

        assert_eq!(sink.write(&[entry(1, 100.0), entry(2, 101.0)]).unwrap(), 2);
        assert_eq!(sink.write(&[entry(1, 100.0), entry(2, 101.0)]).unwrap(), 0);
        assert_eq!(sink.write(&[entry(3, 102.0)]).unwrap(), 1);

        let stored = sink.read_all().unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.iter().map(|s| s.time).collect::<Vec<_>>(), vec![1, 2, 3]);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");
        let good = serde_json::to_string(&entry(1, 100.0)).unwrap();
        fs::write(&path, format!("{good}\nnot json\n\n")).unwrap();

        let sink = JsonlSink::new(&path);
        assert_eq!(sink.read_all().unwrap().len(), 1);
    }

    #[test]
    fn unparsed_lines_survive_a_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");
        let good = serde_json::to_string(&entry(1, 100.0)).unwrap();
        fs::write(&path, format!("{good}\n{{\"partial\": true\n")).unwrap();

        let mut sink = JsonlSink::new(&path);
        assert_eq!(sink.write(&[entry(2, 101.0)]).unwrap(), 1);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "{\"partial\": true");
        assert_eq!(sink.read_all().unwrap().len(), 2);
    }

    #[test]
    fn entries_with_warming_indicators_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.jsonl");
        let mut sink = JsonlSink::new(&path);

        // ADX is still NaN when dmi_period is long and DMI is not required.
        let mut warming = entry(1, 100.0);
        if let SignalMeta::Confluence(meta) = &mut warming.meta {
            meta.adx = f64::NAN;
            meta.stoch_k = f64::NAN;
        }

        assert_eq!(sink.write(&[warming.clone()]).unwrap(), 1);
        assert!(fs::read_to_string(&path).unwrap().contains("\"adx\":null"));

        let stored = sink.read_all().unwrap();
        assert_eq!(stored.len(), 1);
        let SignalMeta::Confluence(meta) = &stored[0].meta else {
            panic!("entry bundle");
        };
        assert!(meta.adx.is_nan());
        assert_eq!(meta.plus_di, 25.0);

        // Same ID again adds nothing; a different signal keeps the first.
        assert_eq!(sink.write(&[warming]).unwrap(), 0);
        assert_eq!(sink.write(&[entry(2, 101.0)]).unwrap(), 1);
        assert_eq!(sink.read_all().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("none.jsonl"));
        assert!(sink.read_all().unwrap().is_empty());
    }
}
