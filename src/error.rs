// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Crate-wide error type.

use std::io;

use thiserror::Error;

/// Everything that can make a channel process give up.
///
/// A semaphore wait interrupted by a signal is deliberately absent: it is a
/// normal shutdown path and surfaces as `PushOutcome::Interrupted` /
/// `PopOutcome::Interrupted` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command input. Raised before any shared object is touched.
    #[error("usage: {0}")]
    Usage(String),

    /// Creating, attaching, mapping, unmapping, waiting on or removing one of
    /// the shared objects failed.
    #[error("{op} failed for {name}: {source}")]
    Resource {
        op: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },

    /// The shared state broke an invariant (index out of range, bad record,
    /// consumer call on a producer handle). Never retried.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl Error {
    pub fn resource(op: &'static str, name: impl Into<String>, source: io::Error) -> Self {
        Error::Resource {
            op,
            name: name.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
