// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named inter-process counting semaphore.
// Delegates to platform::PlatformSemaphore.

use std::io;

use crate::platform::PlatformSemaphore;

/// A system-visible counting semaphore identified by name.
///
/// `create` is exclusive and `open` never creates, so a process can tell a
/// stale semaphore left by a crashed run apart from a fresh one. Dropping
/// the handle closes it; the name is only removed by [`NamedSemaphore::unlink`].
pub struct NamedSemaphore {
    inner: PlatformSemaphore,
}

impl NamedSemaphore {
    /// Create `name` with an initial count. Fails if the name already exists.
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        let inner = PlatformSemaphore::create(name, initial)?;
        Ok(Self { inner })
    }

    /// Open an existing semaphore. Fails if it does not exist.
    pub fn open(name: &str) -> io::Result<Self> {
        let inner = PlatformSemaphore::open(name)?;
        Ok(Self { inner })
    }

    /// Acquire one unit, blocking indefinitely.
    ///
    /// Returns an `io::ErrorKind::Interrupted` error when a signal handler
    /// ran while blocked; the count is left untouched in that case.
    pub fn wait(&self) -> io::Result<()> {
        self.inner.wait()
    }

    /// Acquire one unit if available. `Ok(false)` if the count is zero.
    pub fn try_wait(&self) -> io::Result<bool> {
        self.inner.try_wait()
    }

    /// Acquire one unit, giving up after `timeout_ms`.
    /// Returns `Ok(true)` if acquired, `Ok(false)` on timeout.
    pub fn wait_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        self.inner.wait_timeout(timeout_ms)
    }

    /// Release `count` units.
    pub fn post(&self, count: u32) -> io::Result<()> {
        for _ in 0..count {
            self.inner.post()?;
        }
        Ok(())
    }

    /// Current count.
    pub fn value(&self) -> io::Result<i32> {
        self.inner.value()
    }

    /// POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Close this handle now and report failure, instead of silently on drop.
    pub fn close(mut self) -> io::Result<()> {
        self.inner.close()
    }

    /// Remove a named semaphore from the system namespace.
    pub fn unlink(name: &str) -> io::Result<()> {
        PlatformSemaphore::unlink_by_name(name)
    }
}
