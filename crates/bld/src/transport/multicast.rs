// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP multicast sender.
//!
//! One socket per publisher, bound to an ephemeral port on the wildcard
//! address. Sends are fire-and-forget: a failed send is reported and never
//! retried, since a retried multicast could duplicate a pulse record.

use super::iface::InterfaceSpec;
use super::ttl;
use super::DatagramSink;
use crate::config::SOCKADDR_BYTES;
use crate::error::{Error, Result, SocketStep};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// Dedicated multicast send socket with a mutable destination.
#[derive(Debug)]
pub struct MulticastTransport {
    socket: Option<UdpSocket>,
    destination: SocketAddrV4,
    local: SocketAddrV4,
    max_datagram: usize,
    debug_level: i32,
}

fn step(step: SocketStep) -> impl FnOnce(io::Error) -> Error {
    move |source| {
        log::error!(
            "[BLD-NET] {} failed, errno = {} ({})",
            step,
            source.raw_os_error().unwrap_or(0),
            source
        );
        Error::Transport { step, source }
    }
}

impl MulticastTransport {
    /// Open a sender for `destination`.
    ///
    /// On any failure the partially configured socket is closed and the
    /// failing step is reported with its OS error.
    pub fn open(
        destination: SocketAddrV4,
        max_datagram: usize,
        multicast_ttl: u8,
        interface: Option<&InterfaceSpec>,
    ) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(step(SocketStep::Socket))?;

        socket
            .set_send_buffer_size(max_datagram + SOCKADDR_BYTES)
            .map_err(step(SocketStep::SendBufferSize))?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        socket
            .bind(&bind_addr.into())
            .map_err(step(SocketStep::Bind))?;

        let local = socket
            .local_addr()
            .map_err(step(SocketStep::LocalAddr))?
            .as_socket_ipv4()
            .ok_or_else(|| {
                step(SocketStep::LocalAddr)(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "local address is not IPv4",
                ))
            })?;

        ttl::set_multicast_ttl(&socket, multicast_ttl).map_err(step(SocketStep::MulticastTtl))?;

        if let Some(spec) = interface {
            let addr = spec.resolve().map_err(step(SocketStep::ResolveInterface))?;
            socket
                .set_multicast_if_v4(&addr)
                .map_err(step(SocketStep::MulticastInterface))?;
            log::debug!("[BLD-NET] multicast interface {} ({})", spec, addr);
        }

        log::debug!(
            "[BLD-NET] transport open local={} dest={} ttl={} max={}",
            local,
            destination,
            multicast_ttl,
            max_datagram
        );

        Ok(Self {
            socket: Some(socket.into()),
            destination,
            local,
            max_datagram,
            debug_level: 0,
        })
    }

    /// Send `datagram` as one UDP datagram to the current destination.
    pub fn send(&self, datagram: &[u8]) -> Result<()> {
        let Some(socket) = &self.socket else {
            return Err(Error::InvalidState("transport is closed".into()));
        };
        if datagram.len() > self.max_datagram {
            return Err(Error::PayloadTooLarge {
                len: datagram.len(),
                max: self.max_datagram,
            });
        }

        match socket.send_to(datagram, self.destination) {
            Ok(sent) if sent == datagram.len() => {
                if self.debug_level > 1 {
                    log::debug!("[BLD-NET] sent {} bytes to {}", sent, self.destination);
                }
                Ok(())
            }
            Ok(sent) => Err(Error::SendFailed {
                len: datagram.len(),
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short send: {} of {} bytes", sent, datagram.len()),
                ),
            }),
            Err(source) => {
                log::debug!(
                    "[BLD-NET] send error={} dest={} len={}",
                    source,
                    self.destination,
                    datagram.len()
                );
                Err(Error::SendFailed {
                    len: datagram.len(),
                    source,
                })
            }
        }
    }

    /// Release the socket. Safe to call more than once.
    pub fn close(&mut self) {
        if self.socket.take().is_some() && self.debug_level > 0 {
            log::debug!("[BLD-NET] transport to {} closed", self.destination);
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Redirect to another group without reopening.
    pub fn set_addr(&mut self, addr: Ipv4Addr) {
        self.destination.set_ip(addr);
    }

    /// Redirect to another port without reopening.
    pub fn set_port(&mut self, port: u16) {
        self.destination.set_port(port);
    }

    #[must_use]
    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }

    /// Ephemeral address the socket is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local
    }

    #[must_use]
    pub fn max_datagram(&self) -> usize {
        self.max_datagram
    }

    pub fn set_debug_level(&mut self, level: i32) {
        self.debug_level = level;
    }

    #[must_use]
    pub fn debug_level(&self) -> i32 {
        self.debug_level
    }
}

impl DatagramSink for MulticastTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        MulticastTransport::send(self, datagram)
    }

    fn destination(&self) -> SocketAddrV4 {
        self.destination
    }

    fn set_debug_level(&mut self, level: i32) {
        self.debug_level = level;
    }
}
