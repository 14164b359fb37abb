// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory PV store.

use super::value::{PvData, PvValue};
use super::{FieldLinks, TriggerChain, ValueSource};
use crate::error::{Error, Result};
use crate::wire::Timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Thread-safe map of PV name to value.
///
/// Writes to an existing PV keep its field type; writes to an unknown PV
/// fail, as they would against a record database.
#[derive(Debug, Default)]
pub struct MemoryPvStore {
    pvs: RwLock<HashMap<String, PvValue>>,
}

impl MemoryPvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a PV.
    pub fn set(&self, name: impl Into<String>, value: PvValue) {
        self.pvs.write().insert(name.into(), value);
    }

    pub fn set_double(&self, name: impl Into<String>, value: f64) {
        self.set(name, PvValue::double(value));
    }

    /// Set a fiducial PV: value `fiducial`, stamped with `timestamp`.
    pub fn set_fiducial(&self, name: impl Into<String>, fiducial: u32, timestamp: Timestamp) {
        let value = i32::try_from(fiducial).unwrap_or(i32::MAX);
        self.set(name, PvValue::long(value).with_timestamp(timestamp));
    }

    /// Create `<record>.FLNK` holding `link`.
    pub fn define_record(&self, record: &str, link: &str) {
        self.set(format!("{}.FLNK", record), PvValue::string(link));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<PvValue> {
        self.pvs.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<PvValue> {
        self.pvs.write().remove(name)
    }

    /// Sorted PV names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pvs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

fn parse_one<T>(name: &str, text: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.trim()
        .parse()
        .map(|v| vec![v])
        .map_err(|e| Error::collaborator(name, format!("cannot convert '{}': {}", text, e)))
}

/// Convert `text` to the field type of `current`.
fn parse_as(name: &str, current: &PvData, text: &str) -> Result<PvData> {
    Ok(match current {
        PvData::String(_) => PvData::String(vec![text.to_string()]),
        PvData::Enum(_) => PvData::Enum(vec![text.to_string()]),
        PvData::Short(_) => PvData::Short(parse_one(name, text)?),
        PvData::Long(_) => PvData::Long(parse_one(name, text)?),
        PvData::Char(_) => PvData::Char(parse_one(name, text)?),
        PvData::Float(_) => PvData::Float(parse_one(name, text)?),
        PvData::Double(_) => PvData::Double(parse_one(name, text)?),
    })
}

impl ValueSource for MemoryPvStore {
    fn read(&self, name: &str) -> Result<PvValue> {
        self.get(name)
            .ok_or_else(|| Error::collaborator(name, "no such PV"))
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        let mut pvs = self.pvs.write();
        let Some(entry) = pvs.get_mut(name) else {
            return Err(Error::collaborator(name, "no such PV"));
        };
        let data = parse_as(name, entry.data(), value)?;
        *entry = PvValue::new(data, entry.timestamp());
        Ok(())
    }
}

impl TriggerChain for MemoryPvStore {
    fn read_forward_link(&self, record: &str) -> Result<String> {
        FieldLinks(self).read_forward_link(record)
    }

    fn write_forward_link(&self, record: &str, link: &str) -> Result<()> {
        FieldLinks(self).write_forward_link(record, link)
    }
}
