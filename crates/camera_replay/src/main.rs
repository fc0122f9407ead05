mod device;
mod replay;

use anyhow::{Context, Result};
use camera_recovery::synthetic::OrbitCapture;
use camera_recovery::{DetectorConfig, DiagnosticLog, Session, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use crate::replay::Replay;

#[derive(Parser, Debug)]
#[command(name = "camera_replay", version, about = "Replays recorded shader-constant feeds through the camera recovery engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a recorded capture (JSON lines) through the engine.
    Replay {
        #[arg(long)]
        capture: PathBuf,

        /// Detector settings; defaults apply when the file does not exist.
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Diagnostic stream destination.
        #[arg(long)]
        diag_log: Option<PathBuf>,

        /// Write every recovered transform as JSON lines.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a synthetic orbiting-camera capture.
    Synth {
        #[arg(long, default_value_t = 120)]
        frames: u32,

        #[arg(long, default_value_t = 3)]
        draws_per_frame: u32,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Replay {
            capture,
            config,
            diag_log,
            output,
        } => run_replay(capture, config, diag_log, output),
        Command::Synth {
            frames,
            draws_per_frame,
            out,
        } => run_synth(frames, draws_per_frame, out),
    }
}

fn run_replay(
    capture: PathBuf,
    config: PathBuf,
    diag_log: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = DetectorConfig::load_or_default(&config)
        .with_context(|| format!("loading {}", config.display()))?;

    let log = match &diag_log {
        Some(path) if config.enable_logging => DiagnosticLog::create(path)
            .with_context(|| format!("creating diagnostic log {}", path.display()))?,
        _ => DiagnosticLog::disabled(),
    };

    let output: Option<Box<dyn Write>> = match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output {}", path.display()))?;
            Some(Box::new(BufWriter::new(file)))
        }
        None => None,
    };

    let reader = BufReader::new(
        File::open(&capture).with_context(|| format!("opening capture {}", capture.display()))?,
    );

    let mut session = Session::new(config, log);
    let summaries = Replay::new(&mut session, output).run(reader)?;

    let locked = summaries
        .iter()
        .filter(|s| s.phase == camera_recovery::LockPhase::Locked)
        .count();
    info!("{} of {} streams locked", locked, summaries.len());
    Ok(())
}

fn run_synth(frames: u32, draws_per_frame: u32, out: PathBuf) -> Result<()> {
    let capture = OrbitCapture {
        frames,
        draws_per_frame,
        ..Default::default()
    };
    let file = File::create(&out).with_context(|| format!("creating {}", out.display()))?;
    let mut writer = BufWriter::new(file);

    let events = capture.events();
    for event in &events {
        serde_json::to_writer(&mut writer, event).context("serializing event")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!("Wrote {} events ({} frames) to {}", events.len(), frames, out.display());
    Ok(())
}
