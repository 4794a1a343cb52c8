// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Bounded multi-producer / single-consumer channel between processes.
//
// One shared segment holds the cursors, `capacity` solution slots and a stop
// flag (see `layout`). Three named semaphores drive it:
//
//   free   counts empty slots   (starts at capacity)
//   used   counts filled slots  (starts at 0)
//   write  writer gate, serialises producers on the single write cursor
//
// Producers take `write` then `free`, write the slot, then post `used` and
// `write`. The consumer takes `used`, reads the slot, then posts `free`.
// The owner (consumer) creates every object and is the only one to unlink
// them; producers attach and detach.

use std::io;
use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::{ChannelLayout, SharedState, DEFAULT_CAPACITY, MAX_CAPACITY};
use crate::semaphore::NamedSemaphore;
use crate::shm::{ShmOpenMode, ShmSegment};
use crate::solution::Solution;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Base name and slot count shared by every process of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    name: String,
    capacity: usize,
}

impl ChannelConfig {
    pub const DEFAULT_NAME: &'static str = "colouring";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(self.capacity)
    }

    pub fn shm_name(&self) -> String {
        format!("{}_shm", self.name)
    }

    pub fn free_name(&self) -> String {
        format!("{}_free", self.name)
    }

    pub fn used_name(&self) -> String {
        format!("{}_used", self.name)
    }

    pub fn gate_name(&self) -> String {
        format!("{}_write", self.name)
    }

    fn semaphore_names(&self) -> [String; 3] {
        [self.free_name(), self.used_name(), self.gate_name()]
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains(['/', '\0']) {
            return Err(Error::Usage(format!(
                "channel name {:?} must be non-empty and contain no '/'",
                self.name
            )));
        }
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(Error::Usage(format!(
                "capacity {} outside 1..={MAX_CAPACITY}",
                self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Which side of the channel a handle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created every object; consumes and finally unlinks them.
    Owner,
    /// Opened existing objects; produces and only detaches.
    Attached,
}

/// Result of a push that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The solution is in a slot and the consumer has been woken.
    Delivered,
    /// No free slot (`try_push` only).
    Full,
    /// The consumer asked everyone to stop; nothing was written.
    Stopped,
    /// A signal interrupted a blocking wait; nothing was written.
    Interrupted,
}

/// Result of a pop that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    Item(Solution),
    /// No filled slot (`try_pop` only).
    Empty,
    /// A signal interrupted the wait on `used`.
    Interrupted,
}

/// Semaphore counts, for invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCounts {
    pub free: usize,
    pub used: usize,
}

/// End of a blocking semaphore wait.
enum Waited {
    Acquired,
    Interrupted,
}

/// Optional interrupt predicate checked around blocking waits.
type Interrupt<'a> = Option<&'a dyn Fn() -> bool>;

/// Longest a set interrupt flag can go unnoticed by a blocking wait.
const POLL_MS: u64 = 50;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

struct Resources {
    shm: ShmSegment,
    state: SharedState,
    free: NamedSemaphore,
    used: NamedSemaphore,
    gate: NamedSemaphore,
}

/// One process's view of the channel.
///
/// Dropping the handle runs the same teardown as [`ChannelHandle::close`],
/// logging instead of returning errors, so unwinding and early returns
/// still release every mapping and semaphore handle.
pub struct ChannelHandle {
    config: ChannelConfig,
    role: Role,
    res: Option<Resources>,
}

// Safety: the raw mapping is only reached through semaphore-guarded
// operations; moving the handle to another thread is fine. It is not `Sync`:
// one thread per handle.
unsafe impl Send for ChannelHandle {}

/// Unlinks names created so far unless disarmed. Declared before the objects
/// it covers so they are closed before their names are removed.
struct CreateGuard<'a> {
    config: &'a ChannelConfig,
    shm: bool,
    sems: Vec<String>,
    armed: bool,
}

impl CreateGuard<'_> {
    fn semaphore(&mut self, name: String, initial: u32) -> Result<NamedSemaphore> {
        let sem = NamedSemaphore::create(&name, initial)
            .map_err(|e| Error::resource("create semaphore", &name, e))?;
        self.sems.push(name);
        Ok(sem)
    }
}

impl Drop for CreateGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || (!self.shm && self.sems.is_empty()) {
            return;
        }
        if self.shm {
            let _ = ShmSegment::unlink_by_name(&self.config.shm_name());
        }
        for name in &self.sems {
            let _ = NamedSemaphore::unlink(name);
        }
        warn!(channel = %self.config.name, "channel creation failed, removed partial objects");
    }
}

impl ChannelHandle {
    /// Create the segment and the three semaphores. Owner only, once per run.
    ///
    /// Fails if any of the four names already exists (for instance left over
    /// by a crashed run); stale objects are never reused. On failure every
    /// object created by this call is closed and unlinked again.
    pub fn create(config: &ChannelConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();

        let mut guard = CreateGuard {
            config,
            shm: false,
            sems: Vec::with_capacity(3),
            armed: true,
        };

        let shm_name = config.shm_name();
        let shm = ShmSegment::acquire(&shm_name, layout.size(), ShmOpenMode::Create)
            .map_err(|e| Error::resource("create segment", &shm_name, e))?;
        guard.shm = true;

        let state = unsafe { SharedState::new(shm.as_mut_ptr(), layout) };
        state.init();

        let free = guard.semaphore(config.free_name(), config.capacity() as u32)?;
        let used = guard.semaphore(config.used_name(), 0)?;
        let gate = guard.semaphore(config.gate_name(), 1)?;

        guard.armed = false;
        info!(
            channel = %config.name,
            capacity = config.capacity(),
            bytes = layout.size(),
            "channel created"
        );
        Ok(Self {
            config: config.clone(),
            role: Role::Owner,
            res: Some(Resources {
                shm,
                state,
                free,
                used,
                gate,
            }),
        })
    }

    /// Open the objects an owner created. Never creates or resizes anything.
    ///
    /// Fails if the segment or any semaphore is missing, or if the segment
    /// size does not match `config`'s capacity.
    pub fn attach(config: &ChannelConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();

        let shm_name = config.shm_name();
        let shm = ShmSegment::acquire(&shm_name, layout.size(), ShmOpenMode::Open)
            .map_err(|e| Error::resource("attach segment", &shm_name, e))?;
        let state = unsafe { SharedState::new(shm.as_mut_ptr(), layout) };

        let open_sem = |name: String| {
            NamedSemaphore::open(&name).map_err(|e| Error::resource("attach semaphore", &name, e))
        };
        let free = open_sem(config.free_name())?;
        let used = open_sem(config.used_name())?;
        let gate = open_sem(config.gate_name())?;

        info!(channel = %config.name, "attached to channel");
        Ok(Self {
            config: config.clone(),
            role: Role::Attached,
            res: Some(Resources {
                shm,
                state,
                free,
                used,
                gate,
            }),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    fn res(&self) -> Result<&Resources> {
        self.res
            .as_ref()
            .ok_or_else(|| Error::Protocol("channel is closed".into()))
    }

    fn require_owner(&self, op: &str) -> Result<()> {
        if self.role != Role::Owner {
            return Err(Error::Protocol(format!(
                "{op} is reserved for the channel owner"
            )));
        }
        Ok(())
    }

    fn check_index(&self, cursor: &str, index: usize) -> Result<()> {
        if index >= self.config.capacity {
            return Err(Error::Protocol(format!(
                "{cursor} {index} outside 0..{}",
                self.config.capacity
            )));
        }
        Ok(())
    }

    /// Take one unit, blocking. With a predicate the wait is cut into
    /// `POLL_MS` slices and the predicate is checked before each, so a
    /// signal landing between the caller's last check and the wait is not
    /// lost. Without one only EINTR ends the wait early.
    fn wait(sem: &NamedSemaphore, interrupted: Interrupt<'_>) -> Result<Waited> {
        let is_eintr = |e: &io::Error| e.kind() == io::ErrorKind::Interrupted;
        let Some(interrupted) = interrupted else {
            return match sem.wait() {
                Ok(()) => Ok(Waited::Acquired),
                Err(e) if is_eintr(&e) => Ok(Waited::Interrupted),
                Err(e) => Err(Error::resource("sem_wait", sem.name(), e)),
            };
        };
        loop {
            if interrupted() {
                return Ok(Waited::Interrupted);
            }
            match sem.wait_timeout(POLL_MS) {
                Ok(true) => return Ok(Waited::Acquired),
                Ok(false) => {}
                Err(e) if is_eintr(&e) => return Ok(Waited::Interrupted),
                Err(e) => return Err(Error::resource("sem_timedwait", sem.name(), e)),
            }
        }
    }

    /// Take one unit if available.
    fn try_take(sem: &NamedSemaphore) -> Result<bool> {
        sem.try_wait()
            .map_err(|e| Error::resource("sem_trywait", sem.name(), e))
    }

    fn release(sem: &NamedSemaphore) -> Result<()> {
        sem.post(1)
            .map_err(|e| Error::resource("sem_post", sem.name(), e))
    }

    /// Return units while already failing with `cause`; a failed release is
    /// logged since `cause` is what the caller gets.
    fn release_after(cause: Error, sems: &[&NamedSemaphore]) -> Error {
        for sem in sems {
            if let Err(e) = Self::release(sem) {
                warn!(error = %e, cause = %cause, "release after failed push");
            }
        }
        cause
    }

    // -----------------------------------------------------------------------
    // Producer side
    // -----------------------------------------------------------------------

    /// Write one solution, blocking while another producer writes or the
    /// buffer is full. Never returns `PushOutcome::Full`.
    pub fn push(&self, solution: &Solution) -> Result<PushOutcome> {
        self.push_inner(solution, true, None)
    }

    /// Like [`push`](Self::push), but gives up with `PushOutcome::Interrupted`
    /// once `interrupted` returns true, even if the signal that set it came
    /// before the wait started.
    pub fn push_until<F>(&self, solution: &Solution, interrupted: F) -> Result<PushOutcome>
    where
        F: Fn() -> bool,
    {
        self.push_inner(solution, true, Some(&interrupted))
    }

    /// Like [`push`](Self::push), but returns `PushOutcome::Full` instead of
    /// waiting for a free slot. The writer gate is still waited for.
    pub fn try_push(&self, solution: &Solution) -> Result<PushOutcome> {
        self.push_inner(solution, false, None)
    }

    fn push_inner(
        &self,
        solution: &Solution,
        block: bool,
        interrupted: Interrupt<'_>,
    ) -> Result<PushOutcome> {
        solution.validate()?;
        let res = self.res()?;

        if let Waited::Interrupted = Self::wait(&res.gate, interrupted)? {
            return Ok(PushOutcome::Interrupted);
        }
        if res.state.stop().load(Ordering::Acquire) {
            Self::release(&res.gate)?;
            return Ok(PushOutcome::Stopped);
        }

        let free = if block {
            Self::wait(&res.free, interrupted).map(|w| matches!(w, Waited::Acquired))
        } else {
            Self::try_take(&res.free)
        };
        match free {
            Ok(true) => {}
            Ok(false) => {
                Self::release(&res.gate)?;
                return Ok(if block {
                    PushOutcome::Interrupted
                } else {
                    PushOutcome::Full
                });
            }
            Err(e) => return Err(Self::release_after(e, &[&res.gate])),
        }

        // The wake may be the consumer's shutdown release. Hand it on to the
        // next producer in line instead of writing into a dead buffer.
        if res.state.stop().load(Ordering::Acquire) {
            Self::release(&res.free)?;
            Self::release(&res.gate)?;
            return Ok(PushOutcome::Stopped);
        }

        let index = res.state.write_index().load(Ordering::Acquire) as usize;
        if let Err(e) = self.check_index("write_index", index) {
            return Err(Self::release_after(e, &[&res.free, &res.gate]));
        }
        unsafe { res.state.write_slot(index, solution) };
        let next = (index + 1) % self.config.capacity;
        res.state.write_index().store(next as u32, Ordering::Release);

        Self::release(&res.used)?;
        Self::release(&res.gate)?;
        debug!(slot = index, amount = solution.amount(), "pushed solution");
        Ok(PushOutcome::Delivered)
    }

    // -----------------------------------------------------------------------
    // Consumer side
    // -----------------------------------------------------------------------

    /// Take the oldest filled slot, blocking while the buffer is empty.
    /// Owner only. Never returns `PopOutcome::Empty`.
    pub fn pop(&self) -> Result<PopOutcome> {
        self.pop_inner(true, None)
    }

    /// Like [`pop`](Self::pop), but gives up with `PopOutcome::Interrupted`
    /// once `interrupted` returns true.
    pub fn pop_until<F: Fn() -> bool>(&self, interrupted: F) -> Result<PopOutcome> {
        self.pop_inner(true, Some(&interrupted))
    }

    /// Like [`pop`](Self::pop), but returns `PopOutcome::Empty` instead of waiting.
    pub fn try_pop(&self) -> Result<PopOutcome> {
        self.pop_inner(false, None)
    }

    fn pop_inner(&self, block: bool, interrupted: Interrupt<'_>) -> Result<PopOutcome> {
        self.require_owner("pop")?;
        let res = self.res()?;

        if block {
            if let Waited::Interrupted = Self::wait(&res.used, interrupted)? {
                return Ok(PopOutcome::Interrupted);
            }
        } else if !Self::try_take(&res.used)? {
            return Ok(PopOutcome::Empty);
        }

        let index = res.state.read_index().load(Ordering::Acquire) as usize;
        self.check_index("read_index", index)?;
        let solution = unsafe { res.state.read_slot(index) };
        let next = (index + 1) % self.config.capacity;
        res.state.read_index().store(next as u32, Ordering::Release);
        Self::release(&res.free)?;

        solution.validate()?;
        debug!(slot = index, amount = solution.amount(), "popped solution");
        Ok(PopOutcome::Item(solution))
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Whether the owner has asked producers to stop. A closed handle counts
    /// as stopped.
    pub fn is_stopped(&self) -> bool {
        match &self.res {
            Some(res) => res.state.stop().load(Ordering::Acquire),
            None => true,
        }
    }

    /// Set the stop flag and release `free` once more than the protocol
    /// accounts for, so a producer blocked on a full buffer wakes up. That
    /// producer passes the release on (see `push`). Owner only; repeated
    /// calls do nothing.
    pub fn request_stop(&self) -> Result<()> {
        self.require_owner("request_stop")?;
        let res = self.res()?;
        if res.state.stop().swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        Self::release(&res.free)?;
        info!(channel = %self.config.name, "stop requested");
        Ok(())
    }

    /// Current `free` / `used` semaphore counts.
    pub fn counts(&self) -> Result<SlotCounts> {
        let res = self.res()?;
        let value = |sem: &NamedSemaphore| {
            sem.value()
                .map(|v| v.max(0) as usize)
                .map_err(|e| Error::resource("sem_getvalue", sem.name(), e))
        };
        Ok(SlotCounts {
            free: value(&res.free)?,
            used: value(&res.used)?,
        })
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Unmap the segment and close the semaphore handles; the owner then
    /// also unlinks all four names. Every step is attempted even if an
    /// earlier one failed; the first failure is returned.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(res) = self.res.take() else {
            return Ok(());
        };
        let Resources {
            shm,
            state,
            free,
            used,
            gate,
        } = res;
        drop(state);

        let mut first: Option<Error> = None;
        let mut note = |step: Result<()>| {
            if let Err(e) = step {
                warn!(error = %e, "channel teardown step failed");
                first.get_or_insert(e);
            }
        };

        let shm_name = shm.name().to_owned();
        note(shm.unmap().map_err(|e| Error::resource("munmap", &shm_name, e)));
        for sem in [free, used, gate] {
            let name = sem.name().to_owned();
            note(sem.close().map_err(|e| Error::resource("sem_close", &name, e)));
        }

        if self.role == Role::Owner {
            let name = self.config.shm_name();
            note(ShmSegment::unlink_by_name(&name).map_err(|e| Error::resource("shm_unlink", &name, e)));
            for name in self.config.semaphore_names() {
                note(NamedSemaphore::unlink(&name).map_err(|e| Error::resource("sem_unlink", &name, e)));
            }
        }

        info!(channel = %self.config.name, role = ?self.role, "channel closed");
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remove all four names of `config`, whoever created them. For cleaning
    /// up after a crashed run; a normal owner never needs it.
    pub fn clear_storage(config: &ChannelConfig) {
        if let Err(e) = ShmSegment::unlink_by_name(&config.shm_name()) {
            debug!(error = %e, "no segment to clear");
        }
        for name in config.semaphore_names() {
            if let Err(e) = NamedSemaphore::unlink(&name) {
                debug!(error = %e, name = %name, "no semaphore to clear");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(error = %e, "channel teardown failed during drop");
        }
    }
}
