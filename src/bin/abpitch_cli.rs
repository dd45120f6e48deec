use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use abpitch::engine::{Engine, Snapshot};
use abpitch::playback::CpalSink;
use abpitch::{AppConfig, SlotId};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "abpitch_cli",
    about = "Offline pitch comparison harness for two WAV sources"
)]
struct Cli {
    /// Override path to the analysis configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze both sources at one playhead position and print the readouts
    Analyze {
        /// WAV file for slot A
        a: PathBuf,
        /// WAV file for slot B
        b: PathBuf,
        /// Playhead position to analyze, in seconds
        #[arg(long, default_value_t = 0.0)]
        at: f64,
        /// Additionally sweep the whole timeline at this step (seconds)
        #[arg(long)]
        step: Option<f64>,
        /// Write the report to this path instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Play both sources synchronized through the default output device
    Play {
        /// WAV file for slot A
        a: PathBuf,
        /// WAV file for slot B
        b: PathBuf,
        /// Start offset in seconds
        #[arg(long, default_value_t = 0.0)]
        at: f64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Analyze {
            a,
            b,
            at,
            step,
            output,
        } => run_analyze(config, &a, &b, at, step, output),
        Commands::Play { a, b, at } => run_play(config, &a, &b, at),
    }
}

fn load_both(engine: &mut Engine, a: &PathBuf, b: &PathBuf) -> Result<()> {
    let bytes = fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    engine
        .load_source(SlotId::A, &bytes)
        .with_context(|| format!("decoding {}", a.display()))?;

    let bytes = fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    engine
        .load_source(SlotId::B, &bytes)
        .with_context(|| format!("decoding {}", b.display()))?;
    Ok(())
}

fn run_analyze(
    config: AppConfig,
    a: &PathBuf,
    b: &PathBuf,
    at: f64,
    step: Option<f64>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut engine = Engine::new(config);
    load_both(&mut engine, a, b)?;

    let duration = engine
        .snapshot()
        .effective_duration
        .context("no comparable timeline after loading")?;

    let positions: Vec<f64> = match step {
        Some(step) if step > 0.0 => {
            let mut t = 0.0;
            let mut out = Vec::new();
            while t < duration {
                out.push(t);
                t += step;
            }
            out
        }
        _ => vec![at.clamp(0.0, duration)],
    };

    let mut readouts = Vec::with_capacity(positions.len());
    for &position in &positions {
        readouts.push(analyze_at(&mut engine, position, duration));
    }

    let report = AnalyzeReport {
        a: a.display().to_string(),
        b: b.display().to_string(),
        effective_duration: duration,
        readouts,
    };
    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = output {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

/// Seek to `position` and tick until the deferred offline job has resolved.
fn analyze_at(engine: &mut Engine, position: f64, duration: f64) -> Readout {
    let width = 1000.0;
    engine.begin_seek(position / duration * width, width);
    engine.end_seek();

    // First tick issues the job, second runs it
    engine.tick();
    let snapshot = engine.tick();
    Readout {
        position_secs: snapshot.playhead_secs,
        pitch_a_hz: snapshot.pitch_a,
        pitch_b_hz: snapshot.pitch_b,
    }
}

fn run_play(config: AppConfig, a: &PathBuf, b: &PathBuf, at: f64) -> Result<ExitCode> {
    let mut engine = Engine::new(config).with_sink(Box::new(CpalSink::new()));
    load_both(&mut engine, a, b)?;

    let duration = engine
        .snapshot()
        .effective_duration
        .context("no comparable timeline after loading")?;

    if at > 0.0 {
        let width = 1000.0;
        engine.begin_seek(at / duration * width, width);
        engine.end_seek();
    }

    engine.play();
    loop {
        let snapshot = engine.tick();
        print_status(&snapshot);
        if !snapshot.playing {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }
    println!();
    Ok(ExitCode::from(0))
}

fn print_status(snapshot: &Snapshot) {
    let fmt_pitch = |p: Option<f64>| match p {
        Some(hz) => format!("{hz:7.1} Hz"),
        None => "   --   ".to_string(),
    };
    print!(
        "\r{:7.2}s  A: {}  B: {}",
        snapshot.playhead_secs,
        fmt_pitch(snapshot.pitch_a),
        fmt_pitch(snapshot.pitch_b)
    );
    let _ = std::io::stdout().flush();
}

#[derive(Serialize)]
struct AnalyzeReport {
    a: String,
    b: String,
    effective_duration: f64,
    readouts: Vec<Readout>,
}

#[derive(Serialize)]
struct Readout {
    position_secs: f64,
    pitch_a_hz: Option<f64>,
    pitch_b_hz: Option<f64>,
}
