//! Arena contest runner.
//!
//! Loads a contest config, binds every agent id to an external oracle
//! command, plays the requested number of rounds and writes the round
//! history as JSONL (one round per line, round 0 first).
//!
//! Usage:
//!   arena --config contest.json --oracle-cmd "./ask-model" --rounds 3
//!
//! The oracle command is run through `sh -c` once per request. It reads
//! `{"prompt": ..., "schema": ...}` on stdin and answers on stdout;
//! `ARENA_AGENT` and `ARENA_ROLE` tell it which persona is being asked.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use arena_engine::contest::{write_history_jsonl, AgentRegistry, Contest, ContestConfig, ContestError};
use arena_engine::oracle::ProcessOracle;

/// Runs an arena contest against an external oracle command.
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(version, about, long_about = None)]
struct Args {
    /// Contest config (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Shell command answering oracle requests
    #[arg(long)]
    oracle_cmd: String,

    /// Rounds to play after setup
    #[arg(long, default_value = "1")]
    rounds: u32,

    /// Random seed, overrides the config (0 = entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output file path (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "contest failed");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Contest(#[from] ContestError),

    #[error("cannot write history: {0}")]
    Io(#[from] io::Error),
}

fn run(args: &Args) -> Result<(), RunError> {
    let mut config = ContestConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let registry = build_registry(&config, args);

    let start = Instant::now();
    let mut contest = Contest::start(config, &registry)?;
    let played = contest.play(args.rounds);
    info!(
        rounds = contest.round_number(),
        state = %contest.state(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "contest finished"
    );

    // Completed rounds are written even when a later round failed.
    write_output(contest.history(), args.output.as_ref())?;
    played.map_err(RunError::from)
}

/// Binds every agent id in the config to the oracle command. An id used
/// for several roles gets the first one.
fn build_registry(config: &ContestConfig, args: &Args) -> AgentRegistry {
    let roles = [(config.arena.as_str(), "arena"), (config.judge.as_str(), "judge")]
        .into_iter()
        .chain(config.players.iter().map(|id| (id.as_str(), "player")));

    let mut registry = AgentRegistry::new();
    for (id, role) in roles {
        if registry.contains(id) {
            continue;
        }
        let mut oracle = ProcessOracle::new("sh")
            .arg("-c")
            .arg(args.oracle_cmd.clone())
            .env("ARENA_AGENT", id)
            .env("ARENA_ROLE", role);
        if let Some(ms) = args.timeout_ms {
            oracle = oracle.timeout(Duration::from_millis(ms));
        }
        registry.register(id, oracle);
    }
    registry
}

fn write_output(
    history: &[arena_engine::round::ContestRound],
    path: Option<&PathBuf>,
) -> io::Result<()> {
    let writer: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(writer);
    write_history_jsonl(history, &mut out)
}
