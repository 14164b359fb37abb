// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed process-variable values as returned by a value source.

use crate::wire::{FieldValue, Timestamp};
use std::fmt;

/// Field type of a PV (EPICS DBR types the publisher understands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PvType {
    String,
    Short,
    Float,
    Enum,
    Char,
    Long,
    Double,
}

impl fmt::Display for PvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PvType::String => "String",
            PvType::Short => "short",
            PvType::Float => "float",
            PvType::Enum => "enum",
            PvType::Char => "char",
            PvType::Long => "long",
            PvType::Double => "double",
        };
        f.write_str(name)
    }
}

/// Element storage, one vector per field type.
///
/// Enums are carried as their state strings.
#[derive(Debug, Clone, PartialEq)]
pub enum PvData {
    String(Vec<String>),
    Short(Vec<i16>),
    Float(Vec<f32>),
    Enum(Vec<String>),
    Char(Vec<i8>),
    Long(Vec<i32>),
    Double(Vec<f64>),
}

/// A PV reading: data plus the record timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PvValue {
    data: PvData,
    timestamp: Timestamp,
}

impl PvValue {
    #[must_use]
    pub fn new(data: PvData, timestamp: Timestamp) -> Self {
        Self { data, timestamp }
    }

    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::new(PvData::Double(vec![value]), Timestamp::default())
    }

    #[must_use]
    pub fn long(value: i32) -> Self {
        Self::new(PvData::Long(vec![value]), Timestamp::default())
    }

    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(PvData::String(vec![value.into()]), Timestamp::default())
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn data(&self) -> &PvData {
        &self.data
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    #[must_use]
    pub fn type_tag(&self) -> PvType {
        match self.data {
            PvData::String(_) => PvType::String,
            PvData::Short(_) => PvType::Short,
            PvData::Float(_) => PvType::Float,
            PvData::Enum(_) => PvType::Enum,
            PvData::Char(_) => PvType::Char,
            PvData::Long(_) => PvType::Long,
            PvData::Double(_) => PvType::Double,
        }
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        match &self.data {
            PvData::String(v) | PvData::Enum(v) => v.len(),
            PvData::Short(v) => v.len(),
            PvData::Float(v) => v.len(),
            PvData::Char(v) => v.len(),
            PvData::Long(v) => v.len(),
            PvData::Double(v) => v.len(),
        }
    }

    /// Element `index` as a payload field value.
    ///
    /// Numeric types widen to `f64`; strings and enum states stay text.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<FieldValue<'_>> {
        Some(match &self.data {
            PvData::String(v) | PvData::Enum(v) => FieldValue::Text(v.get(index)?.as_str()),
            PvData::Short(v) => FieldValue::Double(f64::from(*v.get(index)?)),
            PvData::Float(v) => FieldValue::Double(f64::from(*v.get(index)?)),
            PvData::Char(v) => FieldValue::Double(f64::from(*v.get(index)?)),
            PvData::Long(v) => FieldValue::Double(f64::from(*v.get(index)?)),
            PvData::Double(v) => FieldValue::Double(*v.get(index)?),
        })
    }

    /// All elements in order.
    pub fn fields(&self) -> impl Iterator<Item = FieldValue<'_>> + '_ {
        (0..self.element_count()).filter_map(move |i| self.field(i))
    }

    /// First element as an unsigned integer (fiducial PVs).
    ///
    /// Negative or non-finite values and unparsable text yield `None`.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self.field(0)? {
            FieldValue::Double(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => {
                Some(v as u32)
            }
            FieldValue::Double(_) => None,
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// First element as text (link fields).
    #[must_use]
    pub fn as_text(&self) -> String {
        match self.field(0) {
            Some(FieldValue::Text(s)) => s.to_string(),
            Some(FieldValue::Double(v)) => v.to_string(),
            None => String::new(),
        }
    }

    fn fmt_element(&self, f: &mut fmt::Formatter<'_>, index: usize) -> fmt::Result {
        match &self.data {
            PvData::String(v) => write!(f, "(String) {}", v[index]),
            PvData::Short(v) => write!(f, "(short) {}", v[index]),
            PvData::Float(v) => write!(f, "(float) {:.6}", v[index]),
            PvData::Enum(v) => write!(f, "(enum) {}", v[index]),
            PvData::Char(v) => {
                let c = v[index];
                write!(f, "(char) {} ({})", char::from(c as u8), c)
            }
            PvData::Long(v) => write!(f, "(long) {}", v[index]),
            PvData::Double(v) => write!(f, "(double) {:.6}", v[index]),
        }
    }
}

impl fmt::Display for PvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.element_count();
        if count == 1 {
            return self.fmt_element(f, 0);
        }
        for index in 0..count {
            if index == 0 {
                write!(f, "Array[{}]: [0] ", count)?;
            } else {
                write!(f, ", [{}] ", index)?;
            }
            self.fmt_element(f, index)?;
        }
        Ok(())
    }
}
