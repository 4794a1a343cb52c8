// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Consumer loop: pop solutions, keep the best, stop everyone when the graph
// turns out to be 3-colourable or a shutdown signal arrives.

use tracing::info;

use crate::channel::{ChannelHandle, PopOutcome};
use crate::error::Result;
use crate::solution::Solution;

/// Why the supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A generator delivered a solution removing no edges.
    Solved,
    /// A shutdown signal arrived.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSummary {
    pub termination: Termination,
    /// Best solution seen; the sentinel if nothing arrived.
    pub best: Solution,
    /// Solutions popped, including the final one.
    pub received: u64,
}

/// Run the consumer role on the owner's channel.
///
/// `on_improvement` is called for every solution strictly better than the
/// best so far, except the final 3-colouring. Whatever happens, the stop
/// flag is raised before returning so blocked generators can leave.
pub fn run<F, R>(channel: &ChannelHandle, interrupted: F, on_improvement: R) -> Result<SupervisorSummary>
where
    F: Fn() -> bool,
    R: FnMut(&Solution),
{
    let summary = consume(channel, interrupted, on_improvement);
    let stopped = channel.request_stop();
    let summary = summary?;
    stopped?;

    info!(
        termination = ?summary.termination,
        received = summary.received,
        best = summary.best.amount(),
        "supervisor finished"
    );
    Ok(summary)
}

fn consume<F, R>(channel: &ChannelHandle, interrupted: F, mut on_improvement: R) -> Result<SupervisorSummary>
where
    F: Fn() -> bool,
    R: FnMut(&Solution),
{
    let mut best = Solution::no_solution();
    let mut received = 0u64;

    let termination = loop {
        if interrupted() {
            break Termination::Interrupted;
        }
        let solution = match channel.pop_until(&interrupted)? {
            PopOutcome::Item(solution) => solution,
            PopOutcome::Interrupted => break Termination::Interrupted,
            PopOutcome::Empty => continue,
        };
        received += 1;

        if solution.is_colourable() {
            best = solution;
            break Termination::Solved;
        }
        if solution.improves_on(&best) {
            best = solution;
            on_improvement(&best);
        }
    };

    Ok(SupervisorSummary {
        termination,
        best,
        received,
    })
}
