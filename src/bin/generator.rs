// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   generator [--name <NAME>] [--capacity <N>] [--limit <N>] [--seed <S>] EDGE...
//
// EDGE is "<int>-<int>". Attaches to a running supervisor's channel and keeps
// pushing random 3-colouring candidates until the supervisor stops it or a
// SIGINT/SIGTERM arrives.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use colouring_channel::{
    generator, logging, shutdown, ChannelConfig, ChannelHandle, Error, Graph, RandomColouring,
    Result, DEFAULT_CAPACITY,
};

#[derive(Debug, Parser)]
#[command(name = "generator", version, about = "Push random 3-colouring candidates to the supervisor")]
struct Args {
    /// Graph edges, each "<int>-<int>".
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true, value_name = "EDGE")]
    edges: Vec<String>,

    /// Base name of the shared segment and semaphores.
    #[arg(long, env = "COLOURING_CHANNEL", default_value = ChannelConfig::DEFAULT_NAME)]
    name: String,

    /// Number of slots in the shared buffer; must match the supervisor.
    #[arg(long, env = "COLOURING_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Stop after delivering this many solutions.
    #[arg(long)]
    limit: Option<u64>,

    /// Seed for the colouring RNG (random by default).
    #[arg(long)]
    seed: Option<u64>,
}

fn run(args: &Args) -> Result<()> {
    let graph = Graph::parse(&args.edges)?;
    let config = ChannelConfig::new(&args.name).with_capacity(args.capacity);
    config.validate()?;
    shutdown::install().map_err(|e| Error::resource("sigaction", "SIGINT/SIGTERM", e))?;

    let channel = ChannelHandle::attach(&config)?;
    let mut heuristic = match args.seed {
        Some(seed) => RandomColouring::seeded(seed),
        None => RandomColouring::from_entropy(),
    };

    let summary = generator::run(
        &channel,
        &graph,
        &mut heuristic,
        shutdown::interrupted,
        args.limit,
    );
    let closed = channel.close();
    summary?;
    closed
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "generator failed");
            eprintln!("generator: {e}");
            ExitCode::FAILURE
        }
    }
}
