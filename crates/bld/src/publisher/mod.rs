// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-instance BLD publisher.
//!
//! ```text
//! Stopped --configure--> Stopped --start--> Started --stop--> Stopped
//! ```
//!
//! Once started, the host calls [`Publisher::prepare_cycle`] and
//! [`Publisher::send_cycle`] in alternation, once per pulse. A failed cycle
//! is reported and dropped; the publisher stays started for the next pulse.

pub mod config;
pub mod hooks;
pub mod registry;
pub mod sequence;

pub use config::{split_pv_list, PublisherConfig, PublisherConfigBuilder};
pub use hooks::HookLink;
pub use registry::PublisherRegistry;
pub use sequence::FiducialTracker;

use crate::config::FIDUCIAL_NOT_SET;
use crate::error::{Error, ErrorKind, Result};
use crate::logging::LogThrottle;
use crate::pv::{TriggerChain, ValueSource};
use crate::transport::{DatagramSink, MulticastFactory, SinkFactory, SinkSpec};
use crate::wire::{PacketEncoder, Timestamp};
use std::fmt::Write as _;

/// Counters since the last start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Datagrams handed to the transport.
    pub sent: u64,
    /// Cycles dropped for a repeated fiducial.
    pub duplicates: u64,
    /// Cycles dropped for an unset or invalid fiducial.
    pub invalid_fiducials: u64,
    /// Cycles dropped for any other reason.
    pub failures: u64,
}

/// One BLD publisher instance.
pub struct Publisher<F: SinkFactory = MulticastFactory> {
    id: usize,
    factory: F,
    encoder: PacketEncoder,
    config: Option<PublisherConfig>,
    sink: Option<F::Sink>,
    buffer: Vec<u8>,
    tracker: FiducialTracker,
    stamp: Timestamp,
    pre_hook: Option<String>,
    post_hook: Option<String>,
    links: Vec<HookLink>,
    debug_level: i32,
    throttle: LogThrottle,
    stats: PublisherStats,
}

impl Publisher<MulticastFactory> {
    /// Publisher sending over real multicast sockets.
    #[must_use]
    pub fn multicast(id: usize) -> Self {
        Self::new(id, MulticastFactory::default(), PacketEncoder::default())
    }
}

impl<F: SinkFactory> Publisher<F> {
    #[must_use]
    pub fn new(id: usize, factory: F, encoder: PacketEncoder) -> Self {
        Self {
            id,
            factory,
            encoder,
            config: None,
            sink: None,
            buffer: Vec::new(),
            tracker: FiducialTracker::new(),
            stamp: Timestamp::default(),
            pre_hook: None,
            post_hook: None,
            links: Vec::new(),
            debug_level: 0,
            throttle: LogThrottle::default(),
            stats: PublisherStats::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> Option<&PublisherConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.sink.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> PublisherStats {
        self.stats
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The open sink, while started.
    #[must_use]
    pub fn sink(&self) -> Option<&F::Sink> {
        self.sink.as_ref()
    }

    #[must_use]
    pub fn sink_mut(&mut self) -> Option<&mut F::Sink> {
        self.sink.as_mut()
    }

    /// Installed hook links, while started.
    #[must_use]
    pub fn links(&self) -> &[HookLink] {
        &self.links
    }

    pub fn set_debug_level(&mut self, level: i32) {
        self.debug_level = level;
        if let Some(sink) = self.sink.as_mut() {
            sink.set_debug_level(level);
        }
    }

    #[must_use]
    pub fn debug_level(&self) -> i32 {
        self.debug_level
    }

    // ===================================================================
    // Lifecycle
    // ===================================================================

    /// Replace the configuration. Rejected while started.
    pub fn configure(&mut self, config: PublisherConfig) -> Result<()> {
        if self.is_started() {
            log::warn!("[BLD] instance {}: stop before configuring", self.id);
            return Err(Error::AlreadyStarted);
        }
        if let Err(e) = config.validate(self.encoder.registry()) {
            log::error!("[BLD] instance {}: configure failed: {}", self.id, e);
            return Err(e);
        }
        log::info!(
            "[BLD] instance {} configured: {}:{} phy={} type={} pvs={}",
            self.id,
            config.address,
            config.port,
            config.physical_id,
            config.data_type,
            config.pv_names.len()
        );
        self.config = Some(config);
        Ok(())
    }

    /// Hook record processed after the pre-trigger.
    pub fn set_pre_hook(&mut self, record: impl Into<String>) -> Result<()> {
        self.set_hook(record.into(), true)
    }

    /// Hook record processed after the post-trigger.
    pub fn set_post_hook(&mut self, record: impl Into<String>) -> Result<()> {
        self.set_hook(record.into(), false)
    }

    fn set_hook(&mut self, record: String, pre: bool) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        log::debug!(
            "[BLD] instance {}: {} hook record <{}>",
            self.id,
            if pre { "pre" } else { "post" },
            record
        );
        let slot = if pre {
            &mut self.pre_hook
        } else {
            &mut self.post_hook
        };
        *slot = Some(record);
        Ok(())
    }

    /// Open the transport and splice the hooks into the trigger chains.
    ///
    /// On failure the publisher stays stopped. Links already rewired by
    /// this call are left in place and logged.
    pub fn start(&mut self, chain: &dyn TriggerChain) -> Result<()> {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        log::info!("[BLD] Starting instance {}", self.id);
        match self.try_start(chain) {
            Ok(sink) => {
                self.sink = Some(sink);
                log::info!("[BLD] instance {} [OK]", self.id);
                Ok(())
            }
            Err(e) => {
                log::error!("[BLD] instance {} start [FAILED]: {}", self.id, e);
                for link in self.links.iter().filter(|l| l.is_installed()) {
                    log::warn!(
                        "[BLD] instance {}: {}.FLNK left pointing at {}",
                        self.id,
                        link.trigger(),
                        link.hook()
                    );
                }
                self.links.clear();
                Err(e)
            }
        }
    }

    fn try_start(&mut self, chain: &dyn TriggerChain) -> Result<F::Sink> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| Error::Config(format!("instance {} is not configured", self.id)))?;
        config.validate(self.encoder.registry())?;

        let pairs = [
            (&config.pre_trigger, &self.pre_hook, "pre"),
            (&config.post_trigger, &self.post_hook, "post"),
        ];
        let mut links = Vec::new();
        for (trigger, hook, which) in pairs {
            if let Some(trigger) = trigger {
                let hook = hook.as_ref().ok_or_else(|| {
                    Error::Config(format!(
                        "{}-trigger <{}> configured but no {} hook record set",
                        which, trigger, which
                    ))
                })?;
                links.push(HookLink::new(trigger.clone(), hook.clone()));
            }
        }

        let spec = SinkSpec {
            destination: config.destination()?,
            max_datagram: config.max_datagram(),
            interface: config.interface.clone(),
        };
        let mut sink = self.factory.open(&spec)?;
        sink.set_debug_level(self.debug_level);
        if self.debug_level > 1 {
            log::debug!(
                "[BLD] instance {}: sending to {}",
                self.id,
                sink.destination()
            );
        }

        self.buffer.clear();
        self.buffer.resize(spec.max_datagram, 0);
        self.tracker.reset();
        self.throttle = LogThrottle::default();
        self.stats = PublisherStats::default();

        self.links = links;
        for link in &mut self.links {
            link.install(chain, self.debug_level)?;
        }
        Ok(sink)
    }

    /// Restore the trigger chains and release the transport.
    ///
    /// Returns [`Error::NotStarted`] if there is nothing to stop.
    pub fn stop(&mut self, chain: &dyn TriggerChain) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        log::info!("[BLD] Shutting down instance {}", self.id);
        for link in &mut self.links {
            if let Err(e) = link.restore(chain, self.debug_level) {
                log::error!("[BLD] instance {} stop [FAILED]: {}", self.id, e);
                return Err(e);
            }
        }
        self.links.clear();
        self.sink = None;
        self.tracker.invalidate();
        log::info!("[BLD] instance {} stopped [OK]", self.id);
        Ok(())
    }

    // ===================================================================
    // Per-pulse operations
    // ===================================================================

    /// Read the fiducial for the coming cycle.
    pub fn prepare_cycle(&mut self, source: &dyn ValueSource) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        let fiducial_pv = self.config.as_ref().and_then(|c| c.fiducial_pv.as_deref());
        let Some(name) = fiducial_pv else {
            self.tracker.prepare_untracked();
            self.stamp = Timestamp::now();
            return Ok(());
        };

        let result = source.read(name).and_then(|value| {
            let fiducial = value
                .as_u32()
                .ok_or_else(|| Error::collaborator(name, format!("not a fiducial: {}", value)))?;
            self.stamp = value.timestamp();
            if self.debug_level > 2 {
                log::debug!("[BLD] instance {}: {} = {}", self.id, name, value);
            }
            self.tracker.prepare(fiducial)
        });
        if let Err(e) = &result {
            if e.kind() != ErrorKind::Sequence {
                self.tracker.invalidate();
            }
            if self.throttle.hit(self.debug_level > 2) {
                log::warn!(
                    "[BLD] instance {}: prepare_cycle failed ({} occurrences): {}",
                    self.id,
                    self.throttle.count(),
                    e
                );
            }
        }
        result
    }

    /// Build and send this pulse's packet from the configured values.
    pub fn send_cycle(&mut self, source: &dyn ValueSource) -> Result<()> {
        if !self.is_started() {
            return Err(Error::NotStarted);
        }
        let result = self.run_cycle(source);
        match &result {
            Ok(()) => self.stats.sent += 1,
            Err(e) => self.report(e),
        }
        result
    }

    fn run_cycle(&mut self, source: &dyn ValueSource) -> Result<()> {
        let fiducial = self.tracker.take()?;
        let (Some(config), Some(sink)) = (self.config.as_ref(), self.sink.as_mut()) else {
            return Err(Error::NotStarted);
        };

        let mut writer = self.encoder.build_header(
            &mut self.buffer,
            self.stamp,
            fiducial,
            0,
            config.physical_id,
            config.data_type,
        )?;

        let mut slot = 0;
        for name in &config.pv_names {
            let value = source.read(name)?;
            if self.debug_level > 2 {
                log::debug!("[BLD] instance {}: {} = {}", self.id, name, value);
            }
            for field in value.fields() {
                writer.set_field(slot, field)?;
                slot += 1;
            }
        }

        if self.debug_level > 1 {
            log::debug!(
                "[BLD-PKT] instance {}: {} ({} bytes) -> {}",
                self.id,
                writer.header(),
                writer.byte_size(),
                sink.destination()
            );
        }
        sink.send(writer.as_bytes())
    }

    /// Send a payload the caller has already packed.
    ///
    /// The fiducial comes from `timestamp`; duplicates of the last sent
    /// fiducial are dropped.
    pub fn send_packet(
        &mut self,
        physical_id: u32,
        data_type: u32,
        timestamp: Timestamp,
        payload: &[u8],
    ) -> Result<()> {
        let result = self.send_prebuilt(physical_id, data_type, timestamp, payload);
        match &result {
            Ok(()) => self.stats.sent += 1,
            Err(Error::NotStarted) => {}
            Err(e) => {
                self.count(e);
                log::warn!("[BLD] instance {}: send_packet: {}", self.id, e);
            }
        }
        result
    }

    fn send_prebuilt(
        &mut self,
        physical_id: u32,
        data_type: u32,
        timestamp: Timestamp,
        payload: &[u8],
    ) -> Result<()> {
        let (Some(config), Some(sink)) = (self.config.as_ref(), self.sink.as_mut()) else {
            return Err(Error::NotStarted);
        };
        let fiducial = self.tracker.check(timestamp.fiducial())?;
        if payload.len() > config.max_payload {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: config.max_payload,
            });
        }
        let mut writer = self.encoder.build_header_exact(
            &mut self.buffer,
            timestamp,
            fiducial,
            physical_id,
            data_type,
            payload.len(),
        )?;
        writer.payload_mut().copy_from_slice(payload);
        sink.send(writer.as_bytes())
    }

    fn count(&mut self, err: &Error) {
        match err {
            Error::DuplicateFiducial(_) => self.stats.duplicates += 1,
            e if e.kind() == ErrorKind::Sequence => self.stats.invalid_fiducials += 1,
            _ => self.stats.failures += 1,
        }
    }

    fn report(&mut self, err: &Error) {
        self.count(err);
        if !self.throttle.hit(self.debug_level > 2) {
            return;
        }
        match err {
            Error::DuplicateFiducial(fid) => log::warn!(
                "[BLD] instance {}: duplicate fiducial 0x{:05x}, cycle dropped ({} drops)",
                self.id,
                fid,
                self.throttle.count()
            ),
            e => log::warn!(
                "[BLD] instance {}: send_cycle failed ({} drops): {}",
                self.id,
                self.throttle.count(),
                e
            ),
        }
    }

    // ===================================================================
    // Introspection
    // ===================================================================

    /// Configuration and internal settings report; also logged.
    pub fn show_config(&self) -> String {
        let mut out = String::new();
        let state = if self.is_started() { "started" } else { "stopped" };
        let _ = writeln!(out, "BLD instance {} ({})", self.id, state);
        let _ = writeln!(out, "  Configurable parameters:");
        match &self.config {
            Some(config) => {
                let _ = writeln!(out, "{}", config);
            }
            None => {
                let _ = writeln!(out, "    <not configured>");
            }
        }
        let _ = writeln!(out, "  Internal Settings:");
        let _ = writeln!(
            out,
            "    PreHook <{}>  PostHook <{}>",
            self.pre_hook.as_deref().unwrap_or(""),
            self.post_hook.as_deref().unwrap_or("")
        );
        for link in &self.links {
            let _ = writeln!(
                out,
                "    {}.FLNK <{}>  saved <{}>",
                link.trigger(),
                link.hook(),
                link.saved().unwrap_or("")
            );
        }
        if let Some(sink) = &self.sink {
            let _ = writeln!(out, "    Destination {}", sink.destination());
        }
        let prev = self.tracker.previous();
        if prev != FIDUCIAL_NOT_SET {
            let _ = writeln!(out, "    Last fiducial 0x{:05x}", prev);
        }
        let _ = writeln!(
            out,
            "    Sent {}  Duplicates {}  Invalid {}  Failures {}",
            self.stats.sent,
            self.stats.duplicates,
            self.stats.invalid_fiducials,
            self.stats.failures
        );
        let _ = write!(out, "    DebugLevel {}", self.debug_level);
        log::info!("[BLD] {}", out);
        out
    }
}

impl<F: SinkFactory> Drop for Publisher<F> {
    fn drop(&mut self) {
        if self.is_started() {
            let spliced: Vec<&str> = self.links.iter().map(HookLink::trigger).collect();
            log::warn!(
                "[BLD] instance {} dropped while started, trigger links not restored: {:?}",
                self.id,
                spliced
            );
        }
    }
}
