// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # BLD - Beam Line Data multicast publisher
//!
//! Publishes per-pulse beam line measurements as fixed-layout UDP multicast
//! datagrams. Each datagram carries a 60-byte header (timestamp, pulse
//! fiducial, two mirrored XTC sections) followed by a payload whose layout
//! is fixed by the source's physical id.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bld::{MemoryPvStore, Publisher, PublisherConfig, Result};
//! use bld::wire::{data_type, physical_id};
//!
//! fn main() -> Result<()> {
//!     let pvs = MemoryPvStore::new();
//!     pvs.set_double("CAV:1", 0.25);
//!
//!     let mut publisher = Publisher::multicast(0);
//!     publisher.configure(
//!         PublisherConfig::builder("239.255.24.1", 10148)
//!             .max_payload(32)
//!             .source(physical_id::PHASE_CAVITY, data_type::ID_PHASE_CAVITY)
//!             .pv("CAV:1")
//!             .build(),
//!     )?;
//!     publisher.start(&pvs)?;
//!
//!     // Once per pulse:
//!     publisher.prepare_cycle(&pvs)?;
//!     publisher.send_cycle(&pvs)?;
//!
//!     publisher.stop(&pvs)
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  PublisherRegistry -> Publisher (configure/start/stop/cycle) |
//! +--------------------------------------------------------------+
//! |  pv: ValueSource | TriggerChain   (host control system)      |
//! +--------------------------------------------------------------+
//! |  wire: PacketEncoder | PayloadRegistry | codecs | header     |
//! +--------------------------------------------------------------+
//! |  transport: DatagramSink | MulticastTransport (socket2)      |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`publisher`] - Per-instance state machine and instance registry
//! - [`wire`] - Header layout, payload codecs and the payload registry
//! - [`transport`] - Multicast UDP sender, TTL and interface selection
//! - [`pv`] - Interfaces to the host's process variables and records
//! - [`loaders`] - YAML instance files (feature `config-loaders`)

pub mod config;
pub mod error;
pub mod loaders;
pub mod logging;
pub mod publisher;
pub mod pv;
pub mod transport;
pub mod wire;

pub use error::{Error, ErrorKind, Result, SocketStep};
pub use publisher::{
    FiducialTracker, HookLink, Publisher, PublisherConfig, PublisherConfigBuilder,
    PublisherRegistry, PublisherStats,
};
pub use pv::{FieldLinks, MemoryPvStore, PvData, PvType, PvValue, TriggerChain, ValueSource};
pub use transport::{
    DatagramSink, InterfaceSpec, MulticastFactory, MulticastTransport, SinkFactory, SinkSpec,
    TtlConfig,
};
pub use wire::{PacketEncoder, PacketHeader, PayloadRegistry, Timestamp};
