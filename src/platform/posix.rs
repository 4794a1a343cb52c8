// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX implementation of the shared memory segment and named counting
// semaphores backing the channel.

use std::ffi::CString;
use std::io;
use std::ptr;

use crate::shm_name;

/// Permissions for every object the channel creates (owner read/write).
const PERMS: libc::mode_t = 0o600;

fn c_name(posix_name: &str) -> io::Result<CString> {
    CString::new(posix_name.as_bytes()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

// ---------------------------------------------------------------------------
// PlatformShm: POSIX shared memory
// ---------------------------------------------------------------------------

pub struct PlatformShm {
    mem: *mut u8,
    size: usize,
    name: String, // POSIX name (with leading '/')
}

// Safety: the mapping is process-shared; callers synchronise access.
unsafe impl Send for PlatformShm {}
unsafe impl Sync for PlatformShm {}

/// Open mode for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmMode {
    /// `O_CREAT | O_EXCL`, then size the object with `ftruncate`.
    Create,
    /// Existing object only; never created or resized.
    Open,
}

impl PlatformShm {
    pub fn acquire(name: &str, size: usize, mode: ShmMode) -> io::Result<Self> {
        if name.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
        }
        if size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }

        let posix_name = shm_name::posix_name(name);
        let c_name = c_name(&posix_name)?;

        let fd = match mode {
            ShmMode::Create => unsafe {
                libc::shm_open(
                    c_name.as_ptr(),
                    libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                    PERMS as libc::c_uint,
                )
            },
            ShmMode::Open => unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) },
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        // From here on a created object must be unlinked again on failure.
        let fail = |fd: libc::c_int, err: io::Error| -> io::Error {
            unsafe { libc::close(fd) };
            if mode == ShmMode::Create {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
            }
            err
        };

        match mode {
            ShmMode::Create => {
                if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
                    return Err(fail(fd, io::Error::last_os_error()));
                }
            }
            ShmMode::Open => {
                let mut st: libc::stat = unsafe { std::mem::zeroed() };
                if unsafe { libc::fstat(fd, &mut st) } != 0 {
                    return Err(fail(fd, io::Error::last_os_error()));
                }
                let actual = st.st_size as usize;
                if !size_matches(actual, size) {
                    let msg = format!("segment {posix_name} is {actual} bytes, expected {size}");
                    return Err(fail(fd, io::Error::new(io::ErrorKind::InvalidData, msg)));
                }
            }
        }

        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if mem == libc::MAP_FAILED {
            return Err(fail(fd, io::Error::last_os_error()));
        }
        // The mapping keeps the object alive; the descriptor is no longer needed.
        unsafe { libc::close(fd) };

        Ok(Self {
            mem: mem as *mut u8,
            size,
            name: posix_name,
        })
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.mem
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unmap the segment. Calling it again is a no-op.
    pub fn unmap(&mut self) -> io::Result<()> {
        if self.mem.is_null() {
            return Ok(());
        }
        let ret = unsafe { libc::munmap(self.mem as *mut libc::c_void, self.size) };
        self.mem = ptr::null_mut();
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// `shm_unlink` a segment by its user-facing name.
    pub fn unlink_by_name(name: &str) -> io::Result<()> {
        let c_name = c_name(&shm_name::posix_name(name))?;
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for PlatformShm {
    fn drop(&mut self) {
        let _ = self.unmap();
    }
}

// Linux reports the exact ftruncate size; macOS rounds up to the page size.
#[cfg(not(target_os = "macos"))]
fn size_matches(actual: usize, expected: usize) -> bool {
    actual == expected
}

#[cfg(target_os = "macos")]
fn size_matches(actual: usize, expected: usize) -> bool {
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) }.max(1) as usize;
    actual >= expected && actual < expected + page
}

// ---------------------------------------------------------------------------
// PlatformSemaphore: POSIX named counting semaphore (sem_open)
// ---------------------------------------------------------------------------

pub struct PlatformSemaphore {
    sem: *mut libc::sem_t,
    name: String,
}

// Safety: sem_t operations are thread-safe.
unsafe impl Send for PlatformSemaphore {}
unsafe impl Sync for PlatformSemaphore {}

impl PlatformSemaphore {
    /// Create a new named semaphore. Fails with `AlreadyExists` if the name is taken.
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        let posix_name = shm_name::posix_name(name);
        let c_name = c_name(&posix_name)?;
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                PERMS as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        Self::finish(sem, posix_name)
    }

    /// Open an existing named semaphore. Fails with `NotFound` if it does not exist.
    pub fn open(name: &str) -> io::Result<Self> {
        let posix_name = shm_name::posix_name(name);
        let c_name = c_name(&posix_name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        Self::finish(sem, posix_name)
    }

    fn finish(sem: *mut libc::sem_t, name: String) -> io::Result<Self> {
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { sem, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn live(&self) -> io::Result<*mut libc::sem_t> {
        if self.sem.is_null() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "semaphore is closed"));
        }
        Ok(self.sem)
    }

    /// Block until the count is positive, then decrement it.
    /// A signal delivered while blocked yields `ErrorKind::Interrupted`.
    pub fn wait(&self) -> io::Result<()> {
        if unsafe { libc::sem_wait(self.live()?) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Decrement without blocking. `Ok(false)` when the count is zero.
    pub fn try_wait(&self) -> io::Result<bool> {
        if unsafe { libc::sem_trywait(self.live()?) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) => Ok(false),
            _ => Err(err),
        }
    }

    /// Wait at most `timeout_ms`. `Ok(false)` on timeout.
    #[cfg(not(target_os = "macos"))]
    pub fn wait_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        let sem = self.live()?;
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
        let ns_total = ts.tv_nsec as u64 + (timeout_ms % 1000) * 1_000_000;
        ts.tv_sec +=
            (timeout_ms / 1000) as libc::time_t + (ns_total / 1_000_000_000) as libc::time_t;
        ts.tv_nsec = (ns_total % 1_000_000_000) as libc::c_long;
        if unsafe { libc::sem_timedwait(sem, &ts) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ETIMEDOUT) => Ok(false),
            _ => Err(err),
        }
    }

    /// macOS lacks `sem_timedwait`; poll `sem_trywait` until the deadline.
    #[cfg(target_os = "macos")]
    pub fn wait_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
        loop {
            if self.try_wait()? {
                return Ok(true);
            }
            if std::time::Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    /// Increment the count, waking one waiter if any.
    pub fn post(&self) -> io::Result<()> {
        if unsafe { libc::sem_post(self.live()?) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Current count (`sem_getvalue`). Unsupported on macOS.
    pub fn value(&self) -> io::Result<i32> {
        let mut v: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.live()?, &mut v) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(v)
    }

    /// Close this process's handle. Calling it again is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if self.sem.is_null() {
            return Ok(());
        }
        let ret = unsafe { libc::sem_close(self.sem) };
        self.sem = ptr::null_mut();
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// `sem_unlink` a semaphore by its user-facing name.
    pub fn unlink_by_name(name: &str) -> io::Result<()> {
        let c_name = c_name(&shm_name::posix_name(name))?;
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for PlatformSemaphore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
