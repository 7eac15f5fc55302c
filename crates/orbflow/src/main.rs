//! Orbflow - headless runner for the control-signal engine
//!
//! Drives the engine with synthetic audio and an obstacle scene and writes
//! the parameter set as JSON lines.

mod demo;
mod logging_setup;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use demo::{JsonLinesWriter, Scenario, SyntheticAudio};
use orbflow_core::{
    ColorPreset, ColorStrategyKind, ControlEngine, EngineConfig, FftSourceConfig,
    FftSpectrumSource, LogConfig, ParameterTable,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "orbflow", author, version, about)]
struct Cli {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write logs to timestamped files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine and print one JSON object per tick
    Run(RunArgs),
    /// Write the default configuration (.ron, .json or .toml)
    DefaultConfig {
        /// Destination file
        #[arg(long)]
        output: PathBuf,
    },
    /// List the built-in color presets
    Presets,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Ticks per second
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Synthetic audio
    #[arg(long, value_enum, default_value_t = Scenario::Kick)]
    scenario: Scenario,

    /// Override the configured color strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Write records here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Cycle,
    Preset,
    Frequency,
}

impl From<StrategyArg> for ColorStrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Cycle => ColorStrategyKind::SpectrumCycle,
            StrategyArg::Preset => ColorStrategyKind::PresetGradient,
            StrategyArg::Frequency => ColorStrategyKind::FrequencyMapped,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: cli.log_level.clone(),
        file_output: cli.log_dir.is_some(),
        log_directory: cli.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs")),
        ..LogConfig::default()
    };
    let _log_guard = logging_setup::init(&log_config)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::DefaultConfig { output } => {
            EngineConfig::default()
                .save(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;
            info!("Default configuration written to {:?}", output);
            Ok(())
        }
        Command::Presets => {
            let mut stdout = io::stdout().lock();
            for preset in ColorPreset::builtins() {
                writeln!(stdout, "{:<18} {}", preset.name, preset.description)?;
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be a positive number, got {}", args.fps);
    }
    let dt = 1.0 / args.fps;

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => EngineConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.color.strategy = strategy.into();
    }
    config.clearance.self_owner = Some(demo::ORB_OWNER);

    let source_config = FftSourceConfig::default();
    let mut source = FftSpectrumSource::new(source_config.clone());
    demo::prepare_source(&mut source, args.scenario, args.ticks as f32 * dt);
    let mut audio = SyntheticAudio::new(args.scenario, source_config.sample_rate);

    let scene = demo::DemoScene::new();
    let mut engine = ControlEngine::new(config, source, ParameterTable::new())
        .with_clearance(scene.clone());
    for correction in engine.corrections() {
        info!("Using corrected value {}", correction);
    }

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = JsonLinesWriter::new(out);

    info!(
        "Running {} ticks at {} fps ({:?} scenario)",
        args.ticks,
        args.fps,
        audio.scenario()
    );

    let mut beats = 0u64;
    for tick in 0..args.ticks {
        let time = tick as f32 * dt;
        let block = audio.next_block(dt);
        engine.source_mut().push_samples(&block);
        let anchor = demo::anchor_at(time);
        scene.move_orb(anchor);
        engine.set_anchor(anchor);
        engine.tick(dt);

        let snapshot = engine.snapshot();
        if snapshot.beat {
            beats += 1;
        }
        writer.write(tick, &snapshot, engine.output(), engine.sink())?;
    }

    let lines = writer.lines();
    writer.finish()?;

    let snapshot = engine.snapshot();
    info!(
        "Done: {} records, {} beats, tempo {:?}",
        lines, beats, snapshot.tempo_bpm
    );
    Ok(())
}
