// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared memory segment create/open/unlink semantics.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use colouring_channel::{ShmOpenMode, ShmSegment};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_shm_{}_{n}", std::process::id())
}

#[test]
fn create_maps_zeroed_memory() {
    let name = unique_name("zeroed");
    let _ = ShmSegment::unlink_by_name(&name);

    let shm = ShmSegment::acquire(&name, 256, ShmOpenMode::Create).expect("create");
    assert_eq!(shm.size(), 256);
    assert!(shm.name().starts_with('/'));
    let bytes = unsafe { std::slice::from_raw_parts(shm.as_mut_ptr(), 256) };
    assert!(bytes.iter().all(|&b| b == 0));

    ShmSegment::unlink_by_name(&name).expect("unlink");
}

#[test]
fn create_is_exclusive() {
    let name = unique_name("exclusive");
    let _ = ShmSegment::unlink_by_name(&name);

    let _first = ShmSegment::acquire(&name, 64, ShmOpenMode::Create).expect("create");
    let err = ShmSegment::acquire(&name, 64, ShmOpenMode::Create)
        .err()
        .expect("second create must fail");
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

    ShmSegment::unlink_by_name(&name).expect("unlink");
}

#[test]
fn open_missing_fails() {
    let name = unique_name("missing");
    let _ = ShmSegment::unlink_by_name(&name);

    let err = ShmSegment::acquire(&name, 64, ShmOpenMode::Open)
        .err()
        .expect("open must fail");
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn open_sees_writes_from_creator() {
    let name = unique_name("shared");
    let _ = ShmSegment::unlink_by_name(&name);

    let creator = ShmSegment::acquire(&name, 128, ShmOpenMode::Create).expect("create");
    let opener = ShmSegment::acquire(&name, 128, ShmOpenMode::Open).expect("open");
    assert_ne!(creator.as_mut_ptr(), opener.as_mut_ptr());

    let data = b"three colours";
    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr(), creator.as_mut_ptr(), data.len());
    }
    let seen = unsafe { std::slice::from_raw_parts(opener.as_mut_ptr(), data.len()) };
    assert_eq!(seen, data);

    ShmSegment::unlink_by_name(&name).expect("unlink");
}

#[cfg(not(target_os = "macos"))]
#[test]
fn open_with_wrong_size_fails() {
    let name = unique_name("size");
    let _ = ShmSegment::unlink_by_name(&name);

    let _creator = ShmSegment::acquire(&name, 128, ShmOpenMode::Create).expect("create");
    let err = ShmSegment::acquire(&name, 256, ShmOpenMode::Open)
        .err()
        .expect("size mismatch must fail");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    ShmSegment::unlink_by_name(&name).expect("unlink");
}

#[test]
fn unmap_then_unlink_frees_the_name() {
    let name = unique_name("reuse");
    let _ = ShmSegment::unlink_by_name(&name);

    let shm = ShmSegment::acquire(&name, 64, ShmOpenMode::Create).expect("create");
    shm.unmap().expect("unmap");
    ShmSegment::unlink_by_name(&name).expect("unlink");

    assert!(ShmSegment::acquire(&name, 64, ShmOpenMode::Open).is_err());
    let again = ShmSegment::acquire(&name, 64, ShmOpenMode::Create).expect("recreate");
    drop(again);
    ShmSegment::unlink_by_name(&name).expect("unlink");
}

#[test]
fn zero_size_is_rejected() {
    let name = unique_name("empty");
    let err = ShmSegment::acquire(&name, 0, ShmOpenMode::Create)
        .err()
        .expect("zero size must fail");
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}
