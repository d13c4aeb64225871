//! Confluence CLI: scan a universe, replay a history, generate candles.
//!
//! Commands:
//! - `scan`: evaluate the latest bar of every universe entry in a TOML config
//! - `replay`: feed one history bar by bar through the engine
//! - `synth`: write seeded synthetic candles to CSV
//!
//! Logs go to stderr (`RUST_LOG`, default `confluence=info`); results go to
//! stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use confluence_core::domain::{Signal, Timeframe};
use confluence_core::{MemoryStore, Options, SignalEngine};
use confluence_runner::{
    load_state, replay, save_state, scan_universe, CandleSource, CsvCandleSource, JsonlSink,
    MemorySink, ReplayReport, RetryPolicy, RetryingSource, RunnerConfig, SignalSink, SyntheticCandleSource,
};

#[derive(Parser)]
#[command(name = "confluence", about = "Confluence: EMA/SMA crossover signals with confirmations")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the latest bar of every universe entry.
    Scan {
        /// Runner config (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Print signals without writing the signal file or state.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Replay one candle history bar by bar.
    Replay {
        /// Symbol the signals are attributed to.
        #[arg(long)]
        symbol: String,

        /// Timeframe: 5m, 15m, 1h or 4h.
        #[arg(long)]
        timeframe: Timeframe,

        /// CSV history (time,open,high,low,close,volume).
        #[arg(long, conflicts_with = "synthetic")]
        csv: Option<PathBuf>,

        /// Replay this many synthetic bars instead of a CSV.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Runner config to take `[options]` and `[retry]` from.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trailing window per step. Defaults to the minimum window plus slack.
        #[arg(long)]
        window: Option<usize>,

        /// Append emitted signals to this JSONL file.
        #[arg(long)]
        signals_out: Option<PathBuf>,

        /// Print every signal, not only the summary.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Write seeded synthetic candles to CSV.
    Synth {
        #[arg(long)]
        symbol: String,

        #[arg(long)]
        timeframe: Timeframe,

        #[arg(long, default_value_t = 600)]
        bars: usize,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        /// Write times as RFC 3339 instead of epoch milliseconds.
        #[arg(long, default_value_t = false)]
        rfc3339: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Scan { config, dry_run } => run_scan(&config, dry_run),
        Commands::Replay {
            symbol,
            timeframe,
            csv,
            synthetic,
            config,
            window,
            signals_out,
            verbose,
        } => run_replay(
            &symbol,
            timeframe,
            csv,
            synthetic,
            config.as_deref(),
            window,
            signals_out,
            verbose,
        ),
        Commands::Synth {
            symbol,
            timeframe,
            bars,
            out,
            rfc3339,
        } => run_synth(&symbol, timeframe, bars, &out, rfc3339),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("confluence=info,warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn run_scan(config_path: &Path, dry_run: bool) -> Result<()> {
    let config = RunnerConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if config.universe.is_empty() {
        bail!("{}: [[universe]] is empty", config_path.display());
    }

    let store = match &config.output.state {
        Some(path) => load_state(path).with_context(|| format!("loading state {}", path.display()))?,
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);
    let engine = SignalEngine::new(store.clone());

    let report = scan_universe(&engine, &config);

    for outcome in &report.outcomes {
        match &outcome.error {
            Some(err) => println!("{:<12} {:<4} error: {err}", outcome.symbol, outcome.timeframe),
            None if outcome.signals.is_empty() => {
                let why = outcome
                    .diagnostics
                    .first()
                    .map(|d| d.name())
                    .unwrap_or("no event");
                println!("{:<12} {:<4} -      ({why})", outcome.symbol, outcome.timeframe);
            }
            None => {
                for signal in &outcome.signals {
                    println!("{}", format_signal(signal));
                }
            }
        }
    }

    let emitted: Vec<Signal> = report.signals().cloned().collect();
    if dry_run {
        let mut preview = MemorySink::default();
        let unique = preview.write(&emitted)?;
        info!(signals = unique, "dry run: signal file and state left untouched");
        return Ok(());
    }

    if let Some(path) = &config.output.signals {
        let added = JsonlSink::new(path)
            .write(&emitted)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), added, "signals stored");
    }
    if let Some(path) = &config.output.state {
        save_state(path, &store).with_context(|| format!("saving state {}", path.display()))?;
    }

    if report.failures() == report.outcomes.len() {
        bail!("every universe entry failed to load candles");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_replay(
    symbol: &str,
    timeframe: Timeframe,
    csv: Option<PathBuf>,
    synthetic: Option<usize>,
    config_path: Option<&Path>,
    window: Option<usize>,
    signals_out: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let (options, retry) = match config_path {
        Some(path) => {
            let cfg = RunnerConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
            (cfg.options, cfg.retry)
        }
        None => (Options::default(), RetryPolicy::default()),
    };

    let candles = match (csv, synthetic) {
        (Some(path), _) => RetryingSource::new(CsvCandleSource::new(&path), retry)
            .fetch(symbol, timeframe)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, Some(bars)) => SyntheticCandleSource::new(bars).fetch(symbol, timeframe)?,
        (None, None) => bail!("one of --csv or --synthetic is required"),
    };

    let engine = SignalEngine::new(Arc::new(MemoryStore::new()));
    let report = replay(&engine, symbol, timeframe, &candles, &options, window);

    if verbose {
        for signal in &report.signals {
            println!("{}", format_signal(signal));
        }
        println!();
    }
    print_summary(&report)?;

    if let Some(path) = signals_out {
        let added = JsonlSink::new(&path)
            .write(&report.signals)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{added} new signals written to {}", path.display());
    }
    Ok(())
}

fn run_synth(symbol: &str, timeframe: Timeframe, bars: usize, out: &Path, rfc3339: bool) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    let candles = SyntheticCandleSource::new(bars).generate(symbol, timeframe);

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(out).with_context(|| format!("creating {}", out.display()))?;
    writer.write_record(["time", "open", "high", "low", "close", "volume"])?;
    for c in &candles {
        let time = if rfc3339 {
            DateTime::from_timestamp_millis(c.time)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .with_context(|| format!("time {} out of range", c.time))?
        } else {
            c.time.to_string()
        };
        writer.write_record([
            time,
            format!("{:.6}", c.open),
            format!("{:.6}", c.high),
            format!("{:.6}", c.low),
            format!("{:.6}", c.close),
            format!("{:.2}", c.volume),
        ])?;
    }
    writer.flush()?;

    println!("{} {}@{} candles written to {}", candles.len(), symbol, timeframe, out.display());
    Ok(())
}

fn format_signal(s: &Signal) -> String {
    let time = DateTime::from_timestamp_millis(s.time)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| s.time.to_string());
    let score = match (s.confidence, s.grade) {
        (Some(c), Some(g)) => format!(" {c} {}", g.as_str()),
        _ => String::new(),
    };
    format!(
        "{:<12} {:<4} {} {:<5} {:<5} {:<12} {:>12.4}{score}",
        s.symbol,
        s.timeframe,
        time,
        s.kind.as_str(),
        s.direction.as_str(),
        s.reason.as_str(),
        s.price,
    )
}

fn print_summary(report: &ReplayReport) -> Result<()> {
    let s = &report.summary;
    println!("=== Replay ===");
    println!("Symbol:         {}", s.symbol);
    println!("Bars:           {} ({} evaluated)", s.bars, s.evaluated);
    println!(
        "Entries:        {} ({} long, {} short)",
        s.entries, s.long_entries, s.short_entries
    );
    for (reason, count) in &s.exits {
        println!("Exits {reason:<10} {count}");
    }
    for (kind, count) in &s.suppressed {
        println!("Suppressed {kind:<22} {count}");
    }
    println!("Open at end:    {}", s.open_at_end);
    println!("Options:        {}", &s.options_fingerprint[..16.min(s.options_fingerprint.len())]);
    println!();
    println!("{}", serde_json::to_string(s)?);
    Ok(())
}
