// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Bounded producer/consumer channel between processes, built on POSIX
// shared memory and named semaphores. Many generator processes push
// 3-colouring candidates; one supervisor pops them and keeps the best.

pub mod shm_name;

mod platform;

mod shm;
pub use shm::{ShmOpenMode, ShmSegment};

mod semaphore;
pub use semaphore::NamedSemaphore;

mod error;
pub use error::{Error, Result};

pub mod solution;
pub use solution::{Edge, Node, Solution, MAX_EDGES};

pub mod layout;
pub use layout::{ChannelLayout, DEFAULT_CAPACITY, MAX_CAPACITY};

pub mod channel;
pub use channel::{ChannelConfig, ChannelHandle, PopOutcome, PushOutcome, Role, SlotCounts};

pub mod graph;
pub use graph::{Graph, Heuristic, RandomColouring};

pub mod shutdown;

pub mod generator;
pub mod supervisor;

pub mod logging;
