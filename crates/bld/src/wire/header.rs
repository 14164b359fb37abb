// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLD packet header layout.
//!
//! ```text
//!  offset  field
//!   0      nanoseconds      \
//!   4      seconds           |
//!   8      reservedA (0)     |  leading fields, not counted
//!  12      fiducialId        |  by extentSize (40 bytes)
//!  16      reservedB (0)     |
//!  20      damage           -+- XTC Section 1
//!  24      logicalId         |
//!  28      physicalId        |
//!  32      dataType          |
//!  36      extentSize       /
//!  40      damage           \
//!  44      logicalId         |  XTC Section 2, byte-identical
//!  48      physicalId        |  mirror of Section 1
//!  52      dataType          |
//!  56      extentSize       /
//!  60      payload...
//! ```
//!
//! All fields are little-endian on the wire.

use super::cursor::{Cursor, CursorMut};
use crate::config::{
    BLD_LOGICAL_ID, EPICS_EPOCH_OFFSET, FIDUCIAL_MASK, HEADER_BYTES, LEADING_BYTES,
    SECTION_BYTES,
};
use crate::error::{Error, Result};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pulse timestamp, as carried by the timing system.
///
/// On LCLS the low 17 bits of `nanoseconds` hold the pulse fiducial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: u32,
    pub nanoseconds: u32,
}

impl Timestamp {
    #[must_use]
    pub const fn new(seconds: u32, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Wall-clock time in the EPICS epoch.
    #[must_use]
    pub fn now() -> Self {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let seconds = since_unix.as_secs().saturating_sub(EPICS_EPOCH_OFFSET);
        Self::new(seconds as u32, since_unix.subsec_nanos())
    }

    /// Fiducial encoded in the low bits of `nanoseconds`.
    #[must_use]
    pub const fn fiducial(&self) -> u32 {
        self.nanoseconds & FIDUCIAL_MASK
    }
}

/// Fiducial of the pulse stamped `timestamp`.
#[must_use]
pub const fn fiducial_from_timestamp(timestamp: &Timestamp) -> u32 {
    timestamp.fiducial()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// One XTC section (mirrored twice in the header).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XtcSection {
    pub damage: u32,
    pub logical_id: u32,
    pub physical_id: u32,
    pub data_type: u32,
    pub extent_size: u32,
}

impl XtcSection {
    fn write(&self, cursor: &mut CursorMut<'_>) -> Result<()> {
        cursor.write_u32(self.damage)?;
        cursor.write_u32(self.logical_id)?;
        cursor.write_u32(self.physical_id)?;
        cursor.write_u32(self.data_type)?;
        cursor.write_u32(self.extent_size)
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            damage: cursor.read_u32()?,
            logical_id: cursor.read_u32()?,
            physical_id: cursor.read_u32()?,
            data_type: cursor.read_u32()?,
            extent_size: cursor.read_u32()?,
        })
    }
}

/// Logical (host-order) view of a BLD packet header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketHeader {
    pub timestamp: Timestamp,
    pub fiducial_id: u32,
    pub section1: XtcSection,
    pub section2: XtcSection,
}

impl PacketHeader {
    /// Header with both sections set from `section`.
    #[must_use]
    pub fn mirrored(timestamp: Timestamp, fiducial_id: u32, section: XtcSection) -> Self {
        Self {
            timestamp,
            fiducial_id,
            section1: section,
            section2: section,
        }
    }

    /// Section 1 for a reporter-class record.
    #[must_use]
    pub fn reporter_section(damage: u32, physical_id: u32, data_type: u32, extent: u32) -> XtcSection {
        XtcSection {
            damage,
            logical_id: BLD_LOGICAL_ID,
            physical_id,
            data_type,
            extent_size: extent,
        }
    }

    pub fn damage(&self) -> u32 {
        self.section1.damage
    }

    pub fn is_damaged(&self) -> bool {
        self.section1.damage != 0
    }

    pub fn physical_id(&self) -> u32 {
        self.section1.physical_id
    }

    pub fn data_type(&self) -> u32 {
        self.section1.data_type
    }

    pub fn extent_size(&self) -> u32 {
        self.section1.extent_size
    }

    /// True when Section 2 agrees with Section 1.
    pub fn is_mirrored(&self) -> bool {
        self.section1 == self.section2
    }

    /// Bytes of this packet on the wire: `extentSize` plus the leading fields.
    pub fn packet_byte_size(&self) -> usize {
        self.section1.extent_size as usize + LEADING_BYTES
    }

    /// Write the header into the first [`HEADER_BYTES`] of `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < HEADER_BYTES {
            return Err(Error::BufferTooSmall {
                needed: HEADER_BYTES,
                capacity: buf.len(),
            });
        }
        let mut cursor = CursorMut::new(buf);
        cursor.write_u32(self.timestamp.nanoseconds)?;
        cursor.write_u32(self.timestamp.seconds)?;
        cursor.write_u32(0)?;
        cursor.write_u32(self.fiducial_id)?;
        cursor.write_u32(0)?;
        self.section1.write(&mut cursor)?;
        self.section2.write(&mut cursor)
    }

    /// Parse a header from the start of `buf`.
    ///
    /// A damaged packet is sent as its leading fields only; Section 2 is then
    /// taken to mirror Section 1.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let nanoseconds = cursor.read_u32()?;
        let seconds = cursor.read_u32()?;
        let _reserved_a = cursor.read_u32()?;
        let fiducial_id = cursor.read_u32()?;
        let _reserved_b = cursor.read_u32()?;
        let section1 = XtcSection::read(&mut cursor)?;
        let section2 = if cursor.remaining() >= SECTION_BYTES {
            XtcSection::read(&mut cursor)?
        } else {
            section1
        };
        Ok(Self {
            timestamp: Timestamp::new(seconds, nanoseconds),
            fiducial_id,
            section1,
            section2,
        })
    }
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ts={} fid=0x{:05x} damage=0x{:x} phy={} type={} extent={}",
            self.timestamp,
            self.fiducial_id,
            self.damage(),
            self.physical_id(),
            self.data_type(),
            self.extent_size()
        )
    }
}
