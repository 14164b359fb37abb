// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLD Global Configuration - Single Source of Truth
//!
//! Wire constants from the BLD ICD and the PDS container format, fiducial
//! sentinels, and process-wide limits. **NEVER hardcode elsewhere!**

// =======================================================================
// Wire layout (BLD ICD)
// =======================================================================

/// Number of leading u32 fields not counted by `extentSize`.
///
/// nanoseconds, seconds, reservedA, fiducial, reservedB, plus Section 1.
pub const LEADING_FIELDS: usize = 10;

/// Bytes not counted by `extentSize` (`LEADING_FIELDS` x 4 = 40).
pub const LEADING_BYTES: usize = LEADING_FIELDS * 4;

/// Size of one mirrored XTC section (damage, logical, physical, type, extent).
pub const SECTION_BYTES: usize = 20;

/// Full fixed header size: leading fields plus the Section 2 mirror (60).
pub const HEADER_BYTES: usize = LEADING_BYTES + SECTION_BYTES;

/// Header bytes counted by `extentSize` in addition to the payload.
///
/// The Section 2 mirror is the inner container header and is part of the extent.
pub const EXTENT_HEADER_DELTA: usize = HEADER_BYTES - LEADING_BYTES;

/// Logical id of a reporter-level record (pdsdata `Level::Reporter`).
pub const BLD_LOGICAL_ID: u32 = 0x0600_0000;

/// Damage bit set on a size/type error (BLD ICD).
pub const DAMAGE_SIZE_TYPE: u32 = 0x4000;

// =======================================================================
// Fiducials
// =======================================================================

/// Mask of the fiducial bits carried in the low bits of the nanoseconds field.
pub const FIDUCIAL_MASK: u32 = 0x1FFFF;

/// Fiducial value reported by the timing system for an invalid pulse.
pub const FIDUCIAL_INVALID: u32 = 0x1FFFF;

/// Fiducial value of a cycle that has not been prepared.
pub const FIDUCIAL_NOT_SET: u32 = 0x20000;

/// Fiducial used when no fiducial source is configured.
///
/// Highest value of the valid range; the timing system never reports it
/// (`prepare_cycle` rejects ids >= this value read from a source).
pub const FIDUCIAL_UNTRACKED: u32 = 0x1FFFE;

/// Seconds from the POSIX epoch to the EPICS epoch (1990-01-01 UTC).
pub const EPICS_EPOCH_OFFSET: u64 = 631_152_000;

// =======================================================================
// Limits
// =======================================================================

/// Number of publisher instances in a default registry.
pub const MAX_INSTANCES: usize = 10;

/// Largest datagram a publisher will be configured for (jumbo Ethernet MTU).
pub const MTU: usize = 9000;

/// Per-datagram address overhead added to the socket send buffer (`sockaddr`).
pub const SOCKADDR_BYTES: usize = 16;

/// Default multicast TTL (1 + routers in the middle, with margin).
pub const DEFAULT_MULTICAST_TTL: u8 = 32;

/// Hot-path failures are logged once every this many occurrences.
pub const LOG_SAMPLE_MODULO: u64 = 1000;

/// Forward-link value meaning "no existing link".
pub const NO_LINK: &str = "0";

// =======================================================================
// Environment overrides
// =======================================================================

/// Overrides the multicast TTL of every transport.
pub const ENV_MULTICAST_TTL: &str = "BLD_MULTICAST_TTL";

/// Default egress interface (address or name) when a config gives none.
pub const ENV_MULTICAST_IF: &str = "BLD_MULTICAST_IF";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_arithmetic() {
        assert_eq!(LEADING_BYTES, 40);
        assert_eq!(HEADER_BYTES, 60);
        assert_eq!(EXTENT_HEADER_DELTA, 20);
    }

    #[test]
    fn test_fiducial_sentinels_ordering() {
        const { assert!(FIDUCIAL_UNTRACKED < FIDUCIAL_INVALID) };
        const { assert!(FIDUCIAL_INVALID < FIDUCIAL_NOT_SET) };
        assert_eq!(FIDUCIAL_INVALID & FIDUCIAL_MASK, FIDUCIAL_INVALID);
        assert_eq!(FIDUCIAL_NOT_SET & FIDUCIAL_MASK, 0);
    }
}
