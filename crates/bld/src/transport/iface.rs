// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Egress interface selection for multicast sends.
//!
//! An interface is given either as an IPv4 address or as a device name
//! (`eth0`); names are resolved through `local_ip_address` when the
//! transport opens.

use crate::config::ENV_MULTICAST_IF;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Outbound multicast interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceSpec {
    Address(Ipv4Addr),
    Name(String),
}

impl InterfaceSpec {
    /// Parse a shell argument; an empty string means no interface.
    #[must_use]
    pub fn parse_optional(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        if arg.is_empty() {
            None
        } else {
            arg.parse().ok()
        }
    }

    /// Interface from `BLD_MULTICAST_IF`, if set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let value = std::env::var(ENV_MULTICAST_IF).ok()?;
        let spec = Self::parse_optional(&value)?;
        log::debug!("[BLD-NET] Using {} override: {}", ENV_MULTICAST_IF, spec);
        Some(spec)
    }

    /// IPv4 address of the interface.
    pub fn resolve(&self) -> io::Result<Ipv4Addr> {
        match self {
            InterfaceSpec::Address(addr) => Ok(*addr),
            InterfaceSpec::Name(name) => resolve_name(name),
        }
    }
}

impl FromStr for InterfaceSpec {
    type Err = io::Error;

    fn from_str(s: &str) -> io::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty interface",
            ));
        }
        Ok(match s.parse::<Ipv4Addr>() {
            Ok(addr) => InterfaceSpec::Address(addr),
            Err(_) => InterfaceSpec::Name(s.to_string()),
        })
    }
}

impl fmt::Display for InterfaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceSpec::Address(addr) => write!(f, "{}", addr),
            InterfaceSpec::Name(name) => f.write_str(name),
        }
    }
}

fn resolve_name(name: &str) -> io::Result<Ipv4Addr> {
    let interfaces = local_ip_address::list_afinet_netifas().map_err(|e| {
        io::Error::other(format!("failed to list network interfaces: {}", e))
    })?;

    for (ifname, ip) in interfaces {
        if ifname == name {
            if let IpAddr::V4(ipv4) = ip {
                log::debug!("[BLD-NET] interface {} -> {}", name, ipv4);
                return Ok(ipv4);
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no IPv4 address on interface '{}'", name),
    ))
}

/// Non-loopback IPv4 interfaces, as (name, address).
pub fn list_interfaces() -> Vec<(String, Ipv4Addr)> {
    match local_ip_address::list_afinet_netifas() {
        Ok(ifs) => ifs
            .into_iter()
            .filter_map(|(name, ip)| match ip {
                IpAddr::V4(v4) if !v4.is_loopback() => Some((name, v4)),
                _ => None,
            })
            .collect(),
        Err(e) => {
            log::debug!("[BLD-NET] Failed to list network interfaces: {}", e);
            Vec::new()
        }
    }
}
