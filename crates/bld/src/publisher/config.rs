// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-instance publisher configuration.

use crate::config::{HEADER_BYTES, MTU};
use crate::error::{Error, Result};
use crate::transport::InterfaceSpec;
use crate::wire::PayloadRegistry;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Separators accepted in a PV list string.
pub const PV_LIST_SEPARATORS: &[char] = &[' ', ',', ';', '\r', '\n'];

/// Split a PV list on spaces, commas, semicolons and line breaks.
#[must_use]
pub fn split_pv_list(list: &str) -> Vec<String> {
    list.split(PV_LIST_SEPARATORS)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(arg: &str) -> Option<String> {
    let arg = arg.trim();
    (!arg.is_empty()).then(|| arg.to_string())
}

/// Everything a publisher needs to build and send its packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Destination multicast group, as given.
    pub address: String,
    pub port: u16,
    /// Largest payload, excluding the packet header.
    pub max_payload: usize,
    pub interface: Option<InterfaceSpec>,
    pub physical_id: u32,
    pub data_type: u32,
    /// Record whose processing triggers `prepare_cycle`.
    pub pre_trigger: Option<String>,
    /// Record whose processing triggers `send_cycle`.
    pub post_trigger: Option<String>,
    /// PV holding the current fiducial; `None` disables duplicate tracking.
    pub fiducial_pv: Option<String>,
    /// Values sent each cycle, in payload order.
    pub pv_names: Vec<String>,
}

impl PublisherConfig {
    /// Start a builder for `address:port`.
    pub fn builder(address: impl Into<String>, port: u16) -> PublisherConfigBuilder {
        PublisherConfigBuilder::new(address, port)
    }

    /// Configuration from the ten arguments of the shell command.
    ///
    /// Empty strings mean "absent" for the interface, triggers and fiducial.
    #[allow(clippy::too_many_arguments)]
    pub fn from_shell_args(
        address: &str,
        port: u16,
        max_payload: usize,
        interface: &str,
        physical_id: u32,
        data_type: u32,
        pre_trigger: &str,
        post_trigger: &str,
        fiducial_pv: &str,
        pv_list: &str,
    ) -> Self {
        Self {
            address: address.trim().to_string(),
            port,
            max_payload,
            interface: InterfaceSpec::parse_optional(interface),
            physical_id,
            data_type,
            pre_trigger: non_empty(pre_trigger),
            post_trigger: non_empty(post_trigger),
            fiducial_pv: non_empty(fiducial_pv),
            pv_names: split_pv_list(pv_list),
        }
    }

    /// Destination group address.
    pub fn group(&self) -> Result<Ipv4Addr> {
        if self.address.is_empty() {
            return Err(Error::Config("destination address is empty".into()));
        }
        self.address
            .parse()
            .map_err(|_| Error::Config(format!("invalid destination address '{}'", self.address)))
    }

    pub fn destination(&self) -> Result<SocketAddrV4> {
        Ok(SocketAddrV4::new(self.group()?, self.port))
    }

    /// Header plus the largest payload.
    #[must_use]
    pub fn max_datagram(&self) -> usize {
        self.max_payload + HEADER_BYTES
    }

    /// Check the configuration against the wire limits and `registry`.
    pub fn validate(&self, registry: &PayloadRegistry) -> Result<()> {
        self.group()?;
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".into()));
        }
        if self.max_payload == 0 {
            return Err(Error::Config("max payload size must be non-zero".into()));
        }
        if self.max_datagram() > MTU {
            return Err(Error::Config(format!(
                "max payload {} plus {}-byte header exceeds MTU {}",
                self.max_payload, HEADER_BYTES, MTU
            )));
        }
        if let Some(entry) = registry.lookup(self.physical_id) {
            if entry.payload_bytes > self.max_payload {
                return Err(Error::PayloadTooLarge {
                    len: entry.payload_bytes,
                    max: self.max_payload,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for PublisherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "    Server Addr {}  Port {}  MaxDataSize {}",
            self.address, self.port, self.max_payload
        )?;
        writeln!(
            f,
            "    MCastIF {}  PhysicalId {}  DataType {}",
            self.interface
                .as_ref()
                .map_or_else(|| "default".to_string(), ToString::to_string),
            self.physical_id,
            self.data_type
        )?;
        writeln!(
            f,
            "    PreTrigger <{}>  PostTrigger <{}>  Fiducial <{}>",
            self.pre_trigger.as_deref().unwrap_or(""),
            self.post_trigger.as_deref().unwrap_or(""),
            self.fiducial_pv.as_deref().unwrap_or("")
        )?;
        write!(f, "    PvList <{}>", self.pv_names.join(" "))
    }
}

/// Builder for [`PublisherConfig`].
#[derive(Debug, Clone)]
pub struct PublisherConfigBuilder {
    config: PublisherConfig,
}

impl PublisherConfigBuilder {
    fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            config: PublisherConfig {
                address: address.into(),
                port,
                max_payload: 0,
                interface: None,
                physical_id: 0,
                data_type: 0,
                pre_trigger: None,
                post_trigger: None,
                fiducial_pv: None,
                pv_names: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn max_payload(mut self, bytes: usize) -> Self {
        self.config.max_payload = bytes;
        self
    }

    #[must_use]
    pub fn interface(mut self, interface: InterfaceSpec) -> Self {
        self.config.interface = Some(interface);
        self
    }

    /// Payload schema: physical id and data type tag.
    #[must_use]
    pub fn source(mut self, physical_id: u32, data_type: u32) -> Self {
        self.config.physical_id = physical_id;
        self.config.data_type = data_type;
        self
    }

    #[must_use]
    pub fn pre_trigger(mut self, record: impl Into<String>) -> Self {
        self.config.pre_trigger = Some(record.into());
        self
    }

    #[must_use]
    pub fn post_trigger(mut self, record: impl Into<String>) -> Self {
        self.config.post_trigger = Some(record.into());
        self
    }

    #[must_use]
    pub fn fiducial_pv(mut self, name: impl Into<String>) -> Self {
        self.config.fiducial_pv = Some(name.into());
        self
    }

    #[must_use]
    pub fn pv(mut self, name: impl Into<String>) -> Self {
        self.config.pv_names.push(name.into());
        self
    }

    #[must_use]
    pub fn pvs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pv_names.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn build(self) -> PublisherConfig {
        self.config
    }
}
