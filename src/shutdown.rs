// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Signal-driven cancellation.
//
// The handler only stores into a static atomic. It is installed without
// SA_RESTART, so a process blocked in `sem_wait` comes back with EINTR and
// the channel reports `Interrupted`; the main loop then runs the ordinary
// stop and teardown path. No channel operation ever runs inside the handler.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Signals that request a graceful shutdown.
pub const SHUTDOWN_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

extern "C" fn on_signal(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the flag-setting handler for SIGINT and SIGTERM.
pub fn install() -> io::Result<()> {
    for sig in SHUTDOWN_SIGNALS {
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        unsafe { libc::sigemptyset(&mut action.sa_mask) };
        if unsafe { libc::sigaction(sig, &action, std::ptr::null_mut()) } != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Whether a shutdown signal has arrived since start-up.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
