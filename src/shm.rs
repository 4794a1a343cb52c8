// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named shared memory segment.
// Delegates to platform::PlatformShm.

use std::io;

use crate::platform::{PlatformShm, ShmMode};

/// Open mode for shared memory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmOpenMode {
    /// Create exclusively and size the segment; fails if the name already exists.
    Create,
    /// Open existing; fails if it does not exist or its size differs.
    Open,
}

/// A named, inter-process shared memory region of a fixed size.
///
/// Dropping the segment unmaps it. The name stays in the system namespace
/// until someone calls [`ShmSegment::unlink_by_name`].
pub struct ShmSegment {
    inner: PlatformShm,
}

impl ShmSegment {
    /// Create or open the segment `name` of exactly `size` bytes and map it.
    pub fn acquire(name: &str, size: usize, mode: ShmOpenMode) -> io::Result<Self> {
        let platform_mode = match mode {
            ShmOpenMode::Create => ShmMode::Create,
            ShmOpenMode::Open => ShmMode::Open,
        };
        let inner = PlatformShm::acquire(name, size, platform_mode)?;
        Ok(Self { inner })
    }

    /// Pointer to the start of the mapping. Null once unmapped.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_mut_ptr()
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// The platform name used to open the segment.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Unmap now and report failure, instead of silently on drop.
    pub fn unmap(mut self) -> io::Result<()> {
        self.inner.unmap()
    }

    /// Remove a named segment without needing an open handle.
    pub fn unlink_by_name(name: &str) -> io::Result<()> {
        PlatformShm::unlink_by_name(name)
    }
}
