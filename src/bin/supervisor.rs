// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   supervisor [--name <NAME>] [--capacity <N>] [--clear-stale]
//
// Creates the channel, then reads solutions from generators and prints every
// improvement. Exits once a generator finds a 3-colouring or on
// SIGINT/SIGTERM; either way generators are told to stop and every shared
// object is removed.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use colouring_channel::supervisor::{self, Termination};
use colouring_channel::{
    logging, shutdown, ChannelConfig, ChannelHandle, Error, Result, DEFAULT_CAPACITY,
};

#[derive(Debug, Parser)]
#[command(name = "supervisor", version, about = "Collect 3-colouring candidates from generators")]
struct Args {
    /// Base name of the shared segment and semaphores.
    #[arg(long, env = "COLOURING_CHANNEL", default_value = ChannelConfig::DEFAULT_NAME)]
    name: String,

    /// Number of slots in the shared buffer.
    #[arg(long, env = "COLOURING_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Remove objects left behind by a crashed run before creating the channel.
    #[arg(long)]
    clear_stale: bool,
}

fn run(args: &Args) -> Result<()> {
    let config = ChannelConfig::new(&args.name).with_capacity(args.capacity);
    config.validate()?;
    shutdown::install().map_err(|e| Error::resource("sigaction", "SIGINT/SIGTERM", e))?;

    if args.clear_stale {
        ChannelHandle::clear_storage(&config);
    }
    let channel = ChannelHandle::create(&config)?;

    let summary = supervisor::run(&channel, shutdown::interrupted, |best| {
        println!("Solution with {} removed edge(s): {best}", best.amount());
    });
    let closed = channel.close();
    let summary = summary?;
    closed?;

    match summary.termination {
        Termination::Solved => println!("The given graph is 3-colourable."),
        Termination::Interrupted => info!(received = summary.received, "interrupted, shut down"),
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "supervisor failed");
            eprintln!("supervisor: {e}");
            ExitCode::FAILURE
        }
    }
}
