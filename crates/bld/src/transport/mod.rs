// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network transport for BLD packets.
//!
//! Publishers talk to the network through [`DatagramSink`] and obtain sinks
//! from a [`SinkFactory`] on `start()`. The production factory opens a
//! [`MulticastTransport`]; tests substitute a recording sink.

pub mod iface;
pub mod multicast;
pub mod ttl;

pub use iface::InterfaceSpec;
pub use multicast::MulticastTransport;
pub use ttl::TtlConfig;

use crate::error::Result;
use std::net::SocketAddrV4;

/// Outbound datagram channel owned by one publisher.
pub trait DatagramSink: Send {
    /// Send `datagram` as a single datagram. Never retried.
    fn send(&mut self, datagram: &[u8]) -> Result<()>;

    /// Where datagrams go.
    fn destination(&self) -> SocketAddrV4;

    /// Logging verbosity; no effect on behavior.
    fn set_debug_level(&mut self, _level: i32) {}
}

/// Parameters of a sink opened by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub destination: SocketAddrV4,
    /// Largest datagram the sink must carry (header plus max payload).
    pub max_datagram: usize,
    pub interface: Option<InterfaceSpec>,
}

/// Opens sinks for publishers.
pub trait SinkFactory: Send {
    type Sink: DatagramSink;

    fn open(&self, spec: &SinkSpec) -> Result<Self::Sink>;
}

/// Factory for real multicast sockets.
#[derive(Debug, Clone, Copy)]
pub struct MulticastFactory {
    ttl: TtlConfig,
}

impl Default for MulticastFactory {
    fn default() -> Self {
        Self::new(TtlConfig::from_env())
    }
}

impl MulticastFactory {
    #[must_use]
    pub fn new(ttl: TtlConfig) -> Self {
        Self { ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> TtlConfig {
        self.ttl
    }
}

impl SinkFactory for MulticastFactory {
    type Sink = MulticastTransport;

    fn open(&self, spec: &SinkSpec) -> Result<MulticastTransport> {
        let fallback = if spec.interface.is_none() {
            InterfaceSpec::from_env()
        } else {
            None
        };
        let interface = spec.interface.as_ref().or(fallback.as_ref());
        MulticastTransport::open(
            spec.destination,
            spec.max_datagram,
            self.ttl.multicast,
            interface,
        )
    }
}
