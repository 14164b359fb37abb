// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet construction into a caller-owned, reused buffer.
//!
//! [`PacketEncoder::build_header`] never fails on a bad physical id, size or
//! data type: it writes a well-formed header flagged with
//! [`DAMAGE_SIZE_TYPE`] and `extentSize = 0`, which is still sent so
//! consumers see the damage. Only a buffer too small for the fixed header is
//! an error.

use super::codec::{FieldValue, PayloadCodec};
use super::header::{PacketHeader, Timestamp};
use super::registry::{physical_id, PayloadRegistry};
use crate::config::{DAMAGE_SIZE_TYPE, EXTENT_HEADER_DELTA, HEADER_BYTES};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Builds BLD packets against a payload registry.
#[derive(Debug, Clone)]
pub struct PacketEncoder {
    registry: Arc<PayloadRegistry>,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new(PayloadRegistry::global())
    }
}

impl PacketEncoder {
    #[must_use]
    pub fn new(registry: Arc<PayloadRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PayloadRegistry> {
        &self.registry
    }

    /// Write a header for `physical_id` at the start of `buf`.
    ///
    /// The extent covers the registered payload size. The header is marked
    /// damaged when the id is out of range or unregistered, when header plus
    /// payload exceed `buf`, or when `data_type` differs from the registered
    /// type.
    pub fn build_header<'b>(
        &self,
        buf: &'b mut [u8],
        timestamp: Timestamp,
        fiducial_id: u32,
        damage: u32,
        physical_id: u32,
        data_type: u32,
    ) -> Result<PacketWriter<'b>> {
        if buf.len() < HEADER_BYTES {
            return Err(Error::BufferTooSmall {
                needed: HEADER_BYTES,
                capacity: buf.len(),
            });
        }

        let damaged = |buf: &'b mut [u8]| -> Result<PacketWriter<'b>> {
            let section =
                PacketHeader::reporter_section(DAMAGE_SIZE_TYPE, physical_id, data_type, 0);
            let header = PacketHeader::mirrored(timestamp, fiducial_id, section);
            PacketWriter::write(buf, header, None, 0)
        };

        if physical_id >= physical_id::COUNT {
            log::warn!(
                "[BLD-PKT] physical id {} is out of range (max {})",
                physical_id,
                physical_id::COUNT - 1
            );
            return damaged(buf);
        }
        let Some(entry) = self.registry.lookup(physical_id) else {
            log::warn!("[BLD-PKT] physical id {} has no registered payload", physical_id);
            return damaged(buf);
        };

        let total = HEADER_BYTES + entry.payload_bytes;
        if total > buf.len() {
            log::warn!(
                "[BLD-PKT] Packet size ({}) is larger than given buffer size ({})",
                total,
                buf.len()
            );
            return damaged(buf);
        }
        if data_type != entry.data_type {
            log::warn!(
                "[BLD-PKT] data type {} is not compatible with physical id {}, expected {}",
                data_type,
                physical_id,
                entry.data_type
            );
            return damaged(buf);
        }

        let extent = (EXTENT_HEADER_DELTA + entry.payload_bytes) as u32;
        let section = PacketHeader::reporter_section(damage, physical_id, data_type, extent);
        PacketWriter::write(
            buf,
            PacketHeader::mirrored(timestamp, fiducial_id, section),
            Some(entry.codec),
            entry.payload_bytes,
        )
    }

    /// Write a header for a payload the caller packs itself.
    ///
    /// No registry lookup and no type check; the extent covers exactly
    /// `payload_bytes`.
    pub fn build_header_exact<'b>(
        &self,
        buf: &'b mut [u8],
        timestamp: Timestamp,
        fiducial_id: u32,
        physical_id: u32,
        data_type: u32,
        payload_bytes: usize,
    ) -> Result<PacketWriter<'b>> {
        let needed = HEADER_BYTES + payload_bytes;
        if needed > buf.len() {
            return Err(Error::BufferTooSmall {
                needed,
                capacity: buf.len(),
            });
        }
        let extent = (EXTENT_HEADER_DELTA + payload_bytes) as u32;
        let section = PacketHeader::reporter_section(0, physical_id, data_type, extent);
        PacketWriter::write(
            buf,
            PacketHeader::mirrored(timestamp, fiducial_id, section),
            None,
            payload_bytes,
        )
    }
}

/// A header written into a buffer, with access to its payload region.
pub struct PacketWriter<'b> {
    buf: &'b mut [u8],
    header: PacketHeader,
    codec: Option<Arc<dyn PayloadCodec>>,
    payload_bytes: usize,
}

impl<'b> PacketWriter<'b> {
    fn write(
        buf: &'b mut [u8],
        header: PacketHeader,
        codec: Option<Arc<dyn PayloadCodec>>,
        payload_bytes: usize,
    ) -> Result<Self> {
        header.encode(buf)?;
        buf[HEADER_BYTES..HEADER_BYTES + payload_bytes].fill(0);
        Ok(Self {
            buf,
            header,
            codec,
            payload_bytes,
        })
    }

    #[must_use]
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn is_damaged(&self) -> bool {
        self.header.is_damaged()
    }

    /// Bytes to put on the wire.
    pub fn byte_size(&self) -> usize {
        self.header.packet_byte_size()
    }

    /// Write `value` into payload slot `index` through the registered codec.
    ///
    /// No-op when no codec applies (damaged or pre-packed packets).
    pub fn set_field(&mut self, index: usize, value: FieldValue<'_>) -> Result<()> {
        if self.header.is_damaged() {
            return Ok(());
        }
        match &self.codec {
            Some(codec) => {
                let payload = &mut self.buf[HEADER_BYTES..HEADER_BYTES + self.payload_bytes];
                codec.set_field(payload, index, value)
            }
            None => Ok(()),
        }
    }

    /// Payload region following the header.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_BYTES..HEADER_BYTES + self.payload_bytes]
    }

    /// The packet as sent.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.byte_size()]
    }
}

/// Split a received datagram into its header and payload.
pub fn parse_packet(datagram: &[u8]) -> Result<(PacketHeader, &[u8])> {
    let header = PacketHeader::decode(datagram)?;
    let size = header.packet_byte_size();
    if datagram.len() != size {
        return Err(Error::Encoding(format!(
            "datagram of {} bytes, header announces {}",
            datagram.len(),
            size
        )));
    }
    let payload = datagram.get(HEADER_BYTES..).unwrap_or(&[]);
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LEADING_BYTES;
    use crate::wire::cursor::Cursor;
    use crate::wire::registry::data_type;

    fn encoder() -> PacketEncoder {
        PacketEncoder::new(Arc::new(PayloadRegistry::with_builtins()))
    }

    #[test]
    fn test_registered_payload_sets_extent() {
        let mut buf = [0u8; 128];
        let writer = encoder()
            .build_header(
                &mut buf,
                Timestamp::new(10, 20),
                5,
                0,
                physical_id::PHASE_CAVITY,
                data_type::ID_PHASE_CAVITY,
            )
            .expect("header should build");
        assert!(!writer.is_damaged());
        assert_eq!(writer.header().extent_size(), 52);
        assert_eq!(writer.byte_size(), 92);
        assert!(writer.header().is_mirrored());
    }

    #[test]
    fn test_damaged_on_type_mismatch_and_range() {
        let enc = encoder();
        let mut buf = [0u8; 128];
        for (phy, dtype) in [
            (physical_id::PHASE_CAVITY, data_type::ID_EBEAM),
            (physical_id::COUNT, data_type::ANY),
            (57, data_type::ANY),
        ] {
            let writer = enc
                .build_header(&mut buf, Timestamp::default(), 1, 0, phy, dtype)
                .expect("damaged header is still built");
            assert_eq!(writer.header().damage(), DAMAGE_SIZE_TYPE);
            assert_eq!(writer.header().extent_size(), 0);
            assert_eq!(writer.byte_size(), LEADING_BYTES);
            assert!(writer.header().is_mirrored());
        }
    }

    #[test]
    fn test_damaged_when_buffer_cannot_hold_payload() {
        let mut buf = [0u8; HEADER_BYTES + 16];
        let writer = encoder()
            .build_header(
                &mut buf,
                Timestamp::default(),
                1,
                0,
                physical_id::FEE_GAS_DET_ENERGY,
                data_type::ID_FEE_GAS_DET_ENERGY,
            )
            .expect("damaged header is still built");
        assert!(writer.is_damaged());
    }

    #[test]
    fn test_set_field_writes_payload() {
        let mut buf = [0xEEu8; 128];
        let mut writer = encoder()
            .build_header(
                &mut buf,
                Timestamp::default(),
                1,
                0,
                physical_id::FEE_GAS_DET_ENERGY,
                data_type::ID_FEE_GAS_DET_ENERGY,
            )
            .expect("header should build");
        writer
            .set_field(1, FieldValue::Double(-0.5))
            .expect("field should encode");
        let bytes = writer.as_bytes();
        assert_eq!(bytes.len(), 92);
        let mut cursor = Cursor::at(bytes, HEADER_BYTES);
        assert_eq!(cursor.read_f64().expect("read"), 0.0);
        assert_eq!(cursor.read_f64().expect("read"), -0.5);
    }

    #[test]
    fn test_set_field_on_damaged_header_is_noop() {
        let mut buf = [0u8; 64];
        let mut writer = encoder()
            .build_header(&mut buf, Timestamp::default(), 1, 0, 99, data_type::ANY)
            .expect("damaged header is still built");
        writer
            .set_field(3, FieldValue::Double(1.0))
            .expect("no-op");
    }

    #[test]
    fn test_build_header_exact_and_parse() {
        let mut buf = [0u8; 96];
        let mut writer = encoder()
            .build_header_exact(&mut buf, Timestamp::new(1, 2), 9, 77, 3, 12)
            .expect("header should build");
        writer.payload_mut().copy_from_slice(b"hello world!");
        assert_eq!(writer.byte_size(), HEADER_BYTES + 12);
        let datagram = writer.as_bytes().to_vec();

        let (header, payload) = parse_packet(&datagram).expect("packet should parse");
        assert_eq!(header.physical_id(), 77);
        assert_eq!(header.fiducial_id, 9);
        assert_eq!(payload, b"hello world!");

        assert!(parse_packet(&datagram[..datagram.len() - 1]).is_err());
    }

    #[test]
    fn test_build_header_exact_rejects_oversize() {
        let mut buf = [0u8; HEADER_BYTES + 4];
        assert!(matches!(
            encoder().build_header_exact(&mut buf, Timestamp::default(), 0, 0, 0, 5),
            Err(Error::BufferTooSmall { needed: 65, .. })
        ));
    }
}
