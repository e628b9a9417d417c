#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays or validates Tile Defence maps.

mod input;
mod report;

use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    process::ExitCode,
    thread,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Sender;
use tile_defence_core::{Command, GameOverReason};
use tile_defence_simulation::{
    load_map, GameConfig, GameLoop, GameManager, LoopOutcome, MapFileError,
};
use tracing_subscriber::EnvFilter;

/// Tile-based tower defence in the terminal.
#[derive(Debug, Parser)]
#[command(name = "tile-defence", version)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Play a map, reading commands from stdin.
    Play(PlayArgs),
    /// Check that a map file is well formed.
    ValidateMap {
        /// Map file, or a map name inside the configured map directory.
        map: PathBuf,
        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
struct PlayArgs {
    /// Map file, or a map name inside the configured map directory.
    map: PathBuf,
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed of the wave size draw.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulation frequency in ticks per second.
    #[arg(long)]
    tick_hz: Option<u32>,
    /// Run ticks back to back without real-time pacing.
    #[arg(long)]
    headless: bool,
    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Start the next wave automatically.
    #[arg(long)]
    auto_wave: bool,
}

const EXIT_MALFORMED_MAP: u8 = 1;
const EXIT_RUNTIME: u8 = 2;

/// Entry point for the Tile Defence command-line interface.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        CliCommand::Play(args) => play(args),
        CliCommand::ValidateMap { map, config } => validate_map(&map, config.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            if is_malformed_map(&error) {
                ExitCode::from(EXIT_MALFORMED_MAP)
            } else {
                ExitCode::from(EXIT_RUNTIME)
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

fn validate_map(map: &Path, config: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let path = config.resolve_map_path(map);
    let map = load_map(&path, config.world.tile_size)?;
    println!(
        "{}: {}x{} tiles, path of {} tiles",
        path.display(),
        map.columns(),
        map.rows(),
        map.path().len()
    );
    Ok(ExitCode::SUCCESS)
}

fn play(args: PlayArgs) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(tick_hz) = args.tick_hz {
        config.tick_hz = tick_hz;
    }
    if args.max_ticks.is_some() {
        config.max_ticks = args.max_ticks;
    }
    config.headless |= args.headless;
    config.auto_wave |= args.auto_wave;
    config.validate().context("invalid command-line settings")?;

    let path = config.resolve_map_path(&args.map);
    let map = load_map(&path, config.world.tile_size)?;
    tracing::info!(
        map = %path.display(),
        seed = config.seed,
        tick_hz = config.tick_hz,
        headless = config.headless,
        "starting game"
    );

    let (game_loop, handles) = GameLoop::new(GameManager::new(map, &config), &config);
    drop(handles.combat);
    // A headless game only outlives its input when something else ends it.
    let run_past_eof = config.headless && (config.max_ticks.is_some() || config.auto_wave);
    spawn_stdin_reader(handles.inputs.clone(), run_past_eof)?;
    let runner = thread::Builder::new()
        .name("game-loop".to_owned())
        .spawn(move || game_loop.run())
        .context("failed to start the game loop")?;

    for event in handles.events.iter() {
        if let Some(line) = report::describe(&event) {
            println!("{line}");
        }
    }
    let outcome: LoopOutcome = runner
        .join()
        .map_err(|_| anyhow::anyhow!("game loop panicked"))?;
    if let Ok(snapshot) = handles.snapshots.try_recv() {
        println!("{}", report::summary(&snapshot));
    }

    if outcome.game_over == Some(GameOverReason::Internal) {
        anyhow::bail!("simulation stopped after an internal error");
    }
    Ok(ExitCode::SUCCESS)
}

/// Forwards parsed stdin lines to the game loop. End of input quits unless
/// `run_past_eof` is set.
fn spawn_stdin_reader(inputs: Sender<Command>, run_past_eof: bool) -> Result<()> {
    let _ = thread::Builder::new()
        .name("stdin".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        tracing::warn!(%error, "failed to read stdin");
                        break;
                    }
                };
                if line.trim().eq_ignore_ascii_case("help") {
                    eprintln!("{}", input::USAGE);
                    continue;
                }
                match input::parse_line(&line) {
                    Ok(Some(command)) => {
                        if inputs.send(command).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => eprintln!("{error:#}\n{}", input::USAGE),
                }
            }
            if !run_past_eof {
                let _ = inputs.send(Command::Quit);
            }
        })
        .context("failed to start the stdin reader")?;
    Ok(())
}

fn is_malformed_map(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<MapFileError>(),
            Some(MapFileError::Malformed { .. })
        )
    })
}
