// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire byte order (little-endian) conversion.
//!
//! BLD consumers expect little-endian fields regardless of the producer's
//! host order. `to_wire_*` returns a value whose in-memory representation is
//! the wire representation: a no-op on little-endian hosts, a full byte swap
//! on big-endian hosts (e.g. PowerPC RTEMS IOCs). `from_wire_*` is the same
//! involution.

/// Unconditional byte swap of a u32.
#[inline]
#[must_use]
pub const fn swap_u32(value: u32) -> u32 {
    value.swap_bytes()
}

/// Unconditional byte swap of an f64 (as two swapped, exchanged u32 halves).
#[inline]
#[must_use]
pub fn swap_f64(value: f64) -> f64 {
    let bits = value.to_bits();
    let hi = (bits >> 32) as u32;
    let lo = bits as u32;
    f64::from_bits(u64::from(swap_u32(lo)) << 32 | u64::from(swap_u32(hi)))
}

#[cfg(target_endian = "little")]
mod host {
    #[inline]
    pub const fn u32_(value: u32) -> u32 {
        value
    }
    #[inline]
    pub fn f64_(value: f64) -> f64 {
        value
    }
}

#[cfg(target_endian = "big")]
mod host {
    #[inline]
    pub const fn u32_(value: u32) -> u32 {
        super::swap_u32(value)
    }
    #[inline]
    pub fn f64_(value: f64) -> f64 {
        super::swap_f64(value)
    }
}

/// Host value to wire representation.
#[inline]
#[must_use]
pub const fn to_wire_u32(value: u32) -> u32 {
    host::u32_(value)
}

/// Host value to wire representation.
#[inline]
#[must_use]
pub fn to_wire_f64(value: f64) -> f64 {
    host::f64_(value)
}

/// Wire representation to host value.
#[inline]
#[must_use]
pub const fn from_wire_u32(value: u32) -> u32 {
    host::u32_(value)
}

/// Wire representation to host value.
#[inline]
#[must_use]
pub fn from_wire_f64(value: f64) -> f64 {
    host::f64_(value)
}
