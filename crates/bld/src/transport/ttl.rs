// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multicast TTL (hop limit) configuration.
//!
//! BLD consumers usually sit a few routed hops away from the IOCs, so the
//! default is 32 rather than the link-local 1.
//!
//! # Environment Variable
//!
//! `BLD_MULTICAST_TTL=<value>` - Set the multicast TTL of every transport (1-255)

use crate::config::{DEFAULT_MULTICAST_TTL, ENV_MULTICAST_TTL};
use socket2::Socket;
use std::io;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// TTL configuration for BLD transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    /// TTL for multicast packets
    pub multicast: u8,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            multicast: DEFAULT_MULTICAST_TTL,
        }
    }
}

impl TtlConfig {
    /// Same subnet only.
    #[must_use]
    pub const fn link_local() -> Self {
        Self { multicast: 1 }
    }

    #[must_use]
    pub const fn custom(multicast: u8) -> Self {
        Self { multicast }
    }

    /// Default, overridden by `BLD_MULTICAST_TTL` when it parses.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var(ENV_MULTICAST_TTL) {
            match val.trim().parse::<u8>() {
                Ok(ttl) if ttl > 0 => config.multicast = ttl,
                _ => log::warn!(
                    "[TTL] ignoring {}='{}', using {}",
                    ENV_MULTICAST_TTL,
                    val,
                    config.multicast
                ),
            }
        }
        config
    }
}

/// Set `IP_MULTICAST_TTL` on a socket.
#[cfg(unix)]
pub fn set_multicast_ttl(socket: &Socket, ttl: u8) -> io::Result<()> {
    let fd = socket.as_raw_fd();
    let ttl_val = libc::c_int::from(ttl);
    // SAFETY:
    // - fd is a valid socket descriptor owned by `socket`
    // - IPPROTO_IP / IP_MULTICAST_TTL are valid option constants
    // - ttl_val is a stack-allocated c_int, properly aligned and sized
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_IP,
            libc::IP_MULTICAST_TTL,
            &ttl_val as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    if result == 0 {
        log::debug!("[TTL] Set multicast TTL={} on fd={}", ttl, fd);
        Ok(())
    } else {
        let err = io::Error::last_os_error();
        log::warn!(
            "[TTL] Failed to set multicast TTL={} on fd={}: {}",
            ttl,
            fd,
            err
        );
        Err(err)
    }
}

/// Current `IP_MULTICAST_TTL` of a socket.
#[cfg(unix)]
#[must_use]
pub fn multicast_ttl(socket: &Socket) -> Option<u8> {
    let fd = socket.as_raw_fd();
    let mut ttl_val: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY:
    // - fd is a valid socket descriptor owned by `socket`
    // - ttl_val is a mutable c_int and len holds its size
    let result = unsafe {
        libc::getsockopt(
            fd,
            libc::IPPROTO_IP,
            libc::IP_MULTICAST_TTL,
            &mut ttl_val as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if result == 0 {
        u8::try_from(ttl_val).ok()
    } else {
        None
    }
}

#[cfg(windows)]
pub fn set_multicast_ttl(socket: &Socket, ttl: u8) -> io::Result<()> {
    socket.set_multicast_ttl_v4(u32::from(ttl))
}

#[cfg(windows)]
#[must_use]
pub fn multicast_ttl(socket: &Socket) -> Option<u8> {
    socket
        .multicast_ttl_v4()
        .ok()
        .and_then(|v| u8::try_from(v).ok())
}
