// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BLD wire format: header layout, byte order, payload codecs and registry.

pub mod codec;
pub mod cursor;
pub mod encoder;
pub mod header;
pub mod order;
pub mod registry;

pub use codec::{DoubleArray, FieldValue, FixedStrings, IgnoreFields, PayloadCodec};
pub use encoder::{parse_packet, PacketEncoder, PacketWriter};
pub use header::{fiducial_from_timestamp, PacketHeader, Timestamp, XtcSection};
pub use registry::{data_type, physical_id, PayloadRegistry, RegistryEntry};
