// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload registry: physical id -> (data type, payload size, codec).
//!
//! The table is populated once with the built-in schemas and may be extended
//! at runtime with [`PayloadRegistry::register`]. Readers take an atomic
//! snapshot (`ArcSwap`), so lookups on the send path never lock.

use super::codec::{DoubleArray, IgnoreFields, PayloadCodec};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Once, OnceLock};

/// Physical ids (pdsdata `BldInfo::Type`) handled by the built-in table.
pub mod physical_id {
    pub const EBEAM: u32 = 0;
    pub const PHASE_CAVITY: u32 = 1;
    pub const FEE_GAS_DET_ENERGY: u32 = 2;

    /// Size of the registry; ids at or above this are out of range.
    pub const COUNT: u32 = 100;
}

/// XTC data type tags (pdsdata `TypeId::Type`).
pub mod data_type {
    pub const ANY: u32 = 0;
    pub const ID_XTC: u32 = 1;
    pub const ID_FRAME: u32 = 2;
    pub const ID_ACQ_WAVEFORM: u32 = 3;
    pub const ID_ACQ_CONFIG: u32 = 4;
    pub const ID_TWO_D_GAUSSIAN: u32 = 5;
    pub const ID_OPAL1K_CONFIG: u32 = 6;
    pub const ID_FRAME_FEX_CONFIG: u32 = 7;
    pub const ID_EVR_CONFIG: u32 = 8;
    pub const ID_TM6740_CONFIG: u32 = 9;
    pub const ID_CONTROL_CONFIG: u32 = 10;
    pub const ID_PNCCD_FRAME: u32 = 11;
    pub const ID_PNCCD_CONFIG: u32 = 12;
    pub const ID_EPICS: u32 = 13;
    pub const ID_FEE_GAS_DET_ENERGY: u32 = 14;
    pub const ID_EBEAM: u32 = 15;
    pub const ID_PHASE_CAVITY: u32 = 16;
}

/// One registered payload schema.
#[derive(Clone)]
pub struct RegistryEntry {
    pub data_type: u32,
    pub payload_bytes: usize,
    pub codec: Arc<dyn PayloadCodec>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("data_type", &self.data_type)
            .field("payload_bytes", &self.payload_bytes)
            .field("codec", &self.codec.name())
            .finish()
    }
}

type Table = Vec<Option<RegistryEntry>>;

/// Mapping from physical id to payload schema.
pub struct PayloadRegistry {
    table: ArcSwap<Table>,
    init: Once,
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadRegistry")
            .field("registered", &self.len())
            .finish()
    }
}

impl PayloadRegistry {
    /// Empty registry; built-ins are installed by the first
    /// [`initialize`](Self::initialize) or [`register`](Self::register).
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(vec![None; physical_id::COUNT as usize]),
            init: Once::new(),
        }
    }

    /// Registry with the built-in schemas installed.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.initialize();
        registry
    }

    /// Process-wide registry shared by publishers that are not given one.
    pub fn global() -> Arc<PayloadRegistry> {
        static GLOBAL: OnceLock<Arc<PayloadRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(PayloadRegistry::with_builtins()))
            .clone()
    }

    /// Install the built-in schemas. Runs once; later calls do nothing.
    pub fn initialize(&self) {
        self.init.call_once(|| {
            let double: Arc<dyn PayloadCodec> = Arc::new(DoubleArray);
            self.insert(physical_id::EBEAM, data_type::ANY, 0, Arc::new(IgnoreFields));
            // fitTime1, fitTime2, charge1, charge2
            self.insert(
                physical_id::PHASE_CAVITY,
                data_type::ID_PHASE_CAVITY,
                4 * 8,
                double.clone(),
            );
            // f_11_ENRC, f_12_ENRC, f_21_ENRC, f_22_ENRC
            self.insert(
                physical_id::FEE_GAS_DET_ENERGY,
                data_type::ID_FEE_GAS_DET_ENERGY,
                4 * 8,
                double,
            );
            log::debug!("[BLD-PKT] payload registry initialized with built-in schemas");
        });
    }

    /// Install or overwrite the schema of `physical_id`.
    ///
    /// Out-of-range ids are ignored; returns whether the entry was installed.
    pub fn register(
        &self,
        physical_id: u32,
        data_type: u32,
        payload_bytes: usize,
        codec: Arc<dyn PayloadCodec>,
    ) -> bool {
        self.initialize();
        if physical_id >= physical_id::COUNT {
            log::debug!(
                "[BLD-PKT] register: physical id {} out of range, ignored",
                physical_id
            );
            return false;
        }
        self.insert(physical_id, data_type, payload_bytes, codec);
        true
    }

    fn insert(
        &self,
        physical_id: u32,
        data_type: u32,
        payload_bytes: usize,
        codec: Arc<dyn PayloadCodec>,
    ) {
        let entry = RegistryEntry {
            data_type,
            payload_bytes,
            codec,
        };
        self.table.rcu(|table| {
            let mut next: Table = (**table).clone();
            next[physical_id as usize] = Some(entry.clone());
            next
        });
    }

    /// Schema registered for `physical_id`.
    #[must_use]
    pub fn lookup(&self, physical_id: u32) -> Option<RegistryEntry> {
        self.table
            .load()
            .get(physical_id as usize)
            .and_then(Clone::clone)
    }

    /// Number of registered physical ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.load().iter().filter(|e| e.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::codec::FixedStrings;

    #[test]
    fn test_builtins_installed_once() {
        let registry = PayloadRegistry::new();
        assert!(registry.is_empty());
        registry.initialize();
        assert_eq!(registry.len(), 3);

        let pcav = registry
            .lookup(physical_id::PHASE_CAVITY)
            .expect("phase cavity registered");
        assert_eq!(pcav.data_type, data_type::ID_PHASE_CAVITY);
        assert_eq!(pcav.payload_bytes, 32);

        let ebeam = registry.lookup(physical_id::EBEAM).expect("ebeam registered");
        assert_eq!(ebeam.payload_bytes, 0);
        assert_eq!(ebeam.codec.name(), "ignore");
    }

    #[test]
    fn test_initialize_does_not_clobber_runtime_entries() {
        let registry = PayloadRegistry::new();
        assert!(registry.register(
            physical_id::FEE_GAS_DET_ENERGY,
            data_type::ID_EPICS,
            8,
            Arc::new(DoubleArray)
        ));
        registry.initialize();
        registry.initialize();
        let entry = registry
            .lookup(physical_id::FEE_GAS_DET_ENERGY)
            .expect("entry registered");
        assert_eq!(entry.data_type, data_type::ID_EPICS);
        assert_eq!(entry.payload_bytes, 8);
    }

    #[test]
    fn test_register_out_of_range_is_ignored() {
        let registry = PayloadRegistry::with_builtins();
        assert!(!registry.register(
            physical_id::COUNT,
            data_type::ANY,
            8,
            Arc::new(DoubleArray)
        ));
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup(physical_id::COUNT).is_none());
        assert!(registry.lookup(u32::MAX).is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = PayloadRegistry::with_builtins();
        registry.register(42, 99, 80, Arc::new(FixedStrings::new(40)));
        registry.register(42, 98, 16, Arc::new(DoubleArray));
        let entry = registry.lookup(42).expect("entry registered");
        assert_eq!((entry.data_type, entry.payload_bytes), (98, 16));
        assert_eq!(entry.codec.name(), "double[]");
    }

    #[test]
    fn test_global_is_shared() {
        let a = PayloadRegistry::global();
        let b = PayloadRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.lookup(physical_id::PHASE_CAVITY).is_some());
    }
}
