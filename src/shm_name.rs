// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX object names for the channel's segment and semaphores.
// Both `shm_open` and `sem_open` want a single leading '/', and macOS caps
// both namespaces at 31 bytes (PSHMNAMLEN / PSEMNAMLEN).

/// FNV-1a 64-bit hash of `data`.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    data.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Longest name (leading '/' included) the platform accepts. 0 = no limit.
#[cfg(target_os = "macos")]
pub const NAME_MAX: usize = 31;

#[cfg(not(target_os = "macos"))]
pub const NAME_MAX: usize = 0;

/// Normalise `name` into a POSIX object name.
///
/// A leading '/' is added when missing. If the result exceeds [`NAME_MAX`] it
/// is shortened to `/<prefix>_<fnv1a hex>`, keeping as much of the original
/// as fits so the object is still recognisable in `/dev/shm` listings.
pub fn posix_name(name: &str) -> String {
    let full = match name.strip_prefix('/') {
        Some(_) => name.to_owned(),
        None => format!("/{name}"),
    };
    shorten(full, NAME_MAX)
}

fn shorten(full: String, limit: usize) -> String {
    if limit == 0 || full.len() <= limit {
        return full;
    }
    // '/' + '_' + 16 hex digits
    let prefix_len = limit.saturating_sub(18);
    let body = &full[1..];
    let mut cut = prefix_len.min(body.len());
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("/{}_{:016x}", &body[..cut], fnv1a_64(full.as_bytes()))
}
