// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interfaces to the host control system.
//!
//! The publisher reads values and the fiducial through a [`ValueSource`] and
//! rewires record processing through a [`TriggerChain`]. The host supplies
//! both; [`MemoryPvStore`] is a self-contained implementation.

pub mod memory;
pub mod value;

pub use memory::MemoryPvStore;
pub use value::{PvData, PvType, PvValue};

use crate::error::Result;

/// Keyed store of typed process variables.
pub trait ValueSource {
    /// Current value, type, element count and timestamp of `name`.
    fn read(&self, name: &str) -> Result<PvValue>;

    /// Put a value given in text form.
    fn write(&self, name: &str, value: &str) -> Result<()>;
}

impl<T: ValueSource + ?Sized> ValueSource for &T {
    fn read(&self, name: &str) -> Result<PvValue> {
        (**self).read(name)
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        (**self).write(name, value)
    }
}

/// Forward-link access on the host's records.
pub trait TriggerChain {
    /// Current forward link of `record`; `"0"` or `""` when unlinked.
    fn read_forward_link(&self, record: &str) -> Result<String>;

    fn write_forward_link(&self, record: &str, link: &str) -> Result<()>;
}

/// [`TriggerChain`] over the `<record>.FLNK` fields of a value source.
#[derive(Debug, Clone, Copy)]
pub struct FieldLinks<S>(pub S);

impl<S> FieldLinks<S> {
    fn field(record: &str) -> String {
        format!("{}.FLNK", record)
    }
}

impl<S: ValueSource> TriggerChain for FieldLinks<S> {
    fn read_forward_link(&self, record: &str) -> Result<String> {
        Ok(self.0.read(&Self::field(record))?.as_text())
    }

    fn write_forward_link(&self, record: &str, link: &str) -> Result<()> {
        self.0.write(&Self::field(record), link)
    }
}
