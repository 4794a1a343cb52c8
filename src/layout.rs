// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Byte layout of the shared channel state:
//
//   offset 0            read_index   u32
//   offset 4            write_index  u32
//   offset 8            slots        [Solution; capacity]
//   offset 8 + cap*132  stop         u8 (bool)
//   padding up to a multiple of 4
//
// Every process in a run derives the same layout from the same capacity.

use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::solution::Solution;

/// Slot count used when none is configured.
pub const DEFAULT_CAPACITY: usize = 5;

/// Largest accepted slot count.
pub const MAX_CAPACITY: usize = 4096;

#[repr(C)]
struct Cursors {
    read_index: AtomicU32,
    write_index: AtomicU32,
}

/// Offsets of the channel state fields for a given capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    capacity: usize,
    slots_offset: usize,
    stop_offset: usize,
    size: usize,
}

impl ChannelLayout {
    pub const fn new(capacity: usize) -> Self {
        let slots_offset = size_of::<Cursors>();
        let stop_offset = slots_offset + capacity * size_of::<Solution>();
        let align = align_of::<Solution>();
        let size = (stop_offset + size_of::<AtomicBool>()).div_ceil(align) * align;
        Self {
            capacity,
            slots_offset,
            stop_offset,
            size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total segment size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slots_offset(&self) -> usize {
        self.slots_offset
    }

    pub fn stop_offset(&self) -> usize {
        self.stop_offset
    }
}

/// Typed view over a mapped channel segment.
///
/// Valid only while the mapping it was built from is alive; the owning
/// `ChannelHandle` guarantees that.
pub(crate) struct SharedState {
    base: *mut u8,
    layout: ChannelLayout,
}

impl SharedState {
    /// # Safety
    /// `base` must point to a live, writable mapping of at least
    /// `layout.size()` bytes, aligned to 4.
    pub(crate) unsafe fn new(base: *mut u8, layout: ChannelLayout) -> Self {
        Self { base, layout }
    }

    fn cursors(&self) -> &Cursors {
        unsafe { &*(self.base as *const Cursors) }
    }

    pub(crate) fn read_index(&self) -> &AtomicU32 {
        &self.cursors().read_index
    }

    pub(crate) fn write_index(&self) -> &AtomicU32 {
        &self.cursors().write_index
    }

    pub(crate) fn stop(&self) -> &AtomicBool {
        unsafe { &*(self.base.add(self.layout.stop_offset) as *const AtomicBool) }
    }

    /// Zero both cursors and clear the stop flag.
    pub(crate) fn init(&self) {
        self.read_index().store(0, Ordering::Relaxed);
        self.write_index().store(0, Ordering::Relaxed);
        self.stop().store(false, Ordering::Release);
    }

    fn slot_ptr(&self, index: usize) -> *mut Solution {
        debug_assert!(index < self.layout.capacity);
        unsafe { (self.base.add(self.layout.slots_offset) as *mut Solution).add(index) }
    }

    /// # Safety
    /// The caller must have exclusive write access to slot `index`
    /// (it holds the writer gate and a `free` unit).
    pub(crate) unsafe fn write_slot(&self, index: usize, solution: &Solution) {
        std::ptr::write_volatile(self.slot_ptr(index), *solution);
    }

    /// # Safety
    /// Slot `index` must have been fully written (the caller holds a `used` unit).
    pub(crate) unsafe fn read_slot(&self, index: usize) -> Solution {
        std::ptr::read_volatile(self.slot_ptr(index))
    }
}
