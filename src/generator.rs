// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Producer loop: generate a candidate, push it, repeat until told to stop.

use tracing::{debug, info};

use crate::channel::{ChannelHandle, PushOutcome};
use crate::error::Result;
use crate::graph::{Graph, Heuristic};

/// Why a generator loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorExit {
    /// The supervisor set the stop flag.
    Stopped,
    /// A shutdown signal arrived, possibly while blocked in a push.
    Interrupted,
    /// The configured number of pushes was reached.
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSummary {
    pub pushed: u64,
    pub exit: GeneratorExit,
}

/// Run the producer role on an attached channel.
///
/// `interrupted` is polled before every iteration and while a push waits;
/// `limit` caps the number of delivered solutions (`None` = until stopped).
/// The caller still owns `channel` and closes it afterwards.
pub fn run<H, F>(
    channel: &ChannelHandle,
    graph: &Graph,
    heuristic: &mut H,
    interrupted: F,
    limit: Option<u64>,
) -> Result<GeneratorSummary>
where
    H: Heuristic + ?Sized,
    F: Fn() -> bool,
{
    let mut pushed = 0u64;
    let exit = loop {
        if limit.is_some_and(|max| pushed >= max) {
            break GeneratorExit::LimitReached;
        }
        if interrupted() {
            break GeneratorExit::Interrupted;
        }
        if channel.is_stopped() {
            break GeneratorExit::Stopped;
        }

        let solution = heuristic.generate(graph);
        match channel.push_until(&solution, &interrupted)? {
            PushOutcome::Delivered => pushed += 1,
            PushOutcome::Stopped => break GeneratorExit::Stopped,
            PushOutcome::Interrupted => break GeneratorExit::Interrupted,
            // blocking push waits instead
            PushOutcome::Full => debug!("push reported a full buffer"),
        }
    };

    info!(pushed, exit = ?exit, "generator finished");
    Ok(GeneratorSummary { pushed, exit })
}
