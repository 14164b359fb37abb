// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size table of publisher instances addressed by id.
//!
//! Each instance sits behind its own lock, so one instance's pulse
//! callbacks never wait on another's.

use super::Publisher;
use crate::config::MAX_INSTANCES;
use crate::error::{Error, Result};
use crate::pv::TriggerChain;
use crate::transport::{MulticastFactory, SinkFactory};
use crate::wire::{PacketEncoder, PayloadRegistry};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Publisher instances `0..len()`.
pub struct PublisherRegistry<F: SinkFactory = MulticastFactory> {
    instances: Vec<Mutex<Publisher<F>>>,
}

impl Default for PublisherRegistry<MulticastFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl PublisherRegistry<MulticastFactory> {
    /// [`MAX_INSTANCES`] multicast publishers on the global payload registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_INSTANCES)
    }

    #[must_use]
    pub fn with_capacity(count: usize) -> Self {
        Self::with_factory(count, MulticastFactory::default(), PayloadRegistry::global())
    }
}

impl<F: SinkFactory + Clone> PublisherRegistry<F> {
    /// `count` publishers sharing `factory` and `payloads`.
    pub fn with_factory(count: usize, factory: F, payloads: Arc<PayloadRegistry>) -> Self {
        let instances = (0..count)
            .map(|id| {
                let encoder = PacketEncoder::new(payloads.clone());
                Mutex::new(Publisher::new(id, factory.clone(), encoder))
            })
            .collect();
        Self { instances }
    }
}

impl<F: SinkFactory> PublisherRegistry<F> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Lock instance `id`.
    pub fn get(&self, id: usize) -> Result<MutexGuard<'_, Publisher<F>>> {
        self.instances
            .get(id)
            .map(|slot| slot.lock())
            .ok_or(Error::InstanceOutOfRange(id))
    }

    /// Run `f` on instance `id` under its lock.
    pub fn with_instance<R>(&self, id: usize, f: impl FnOnce(&mut Publisher<F>) -> R) -> Result<R> {
        let mut guard = self.get(id)?;
        Ok(f(&mut guard))
    }

    /// Stop every started instance. Returns the ids that failed to stop.
    pub fn stop_all(&self, chain: &dyn TriggerChain) -> Vec<usize> {
        let mut failed = Vec::new();
        for slot in &self.instances {
            let mut publisher = slot.lock();
            if !publisher.is_started() {
                continue;
            }
            if let Err(e) = publisher.stop(chain) {
                log::error!("[BLD] stop_all: instance {}: {}", publisher.id(), e);
                failed.push(publisher.id());
            }
        }
        failed
    }

    /// Concatenated [`Publisher::show_config`] of configured instances.
    pub fn show_all(&self) -> String {
        self.instances
            .iter()
            .filter_map(|slot| {
                let publisher = slot.lock();
                publisher.config().map(|_| publisher.show_config())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
