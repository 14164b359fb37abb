// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload field codecs.
//!
//! A codec knows how one payload schema lays out its fields. The publisher
//! hands it values by position; the codec writes them into the payload
//! region, bounds-checked against the registered payload size.

use super::cursor::CursorMut;
use crate::error::{Error, Result};
use std::fmt;

/// Value handed to a codec for one payload slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Double(f64),
    Text(&'a str),
}

impl FieldValue<'_> {
    /// Numeric view; text is parsed.
    pub fn as_f64(&self) -> Result<f64> {
        match *self {
            FieldValue::Double(v) => Ok(v),
            FieldValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Encoding(format!("'{}' is not a number", s))),
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Writes positional field values into a payload region.
pub trait PayloadCodec: Send + Sync + fmt::Debug {
    /// Short schema name for logs.
    fn name(&self) -> &str;

    /// Write `value` at slot `index` of `payload`.
    ///
    /// `payload` is exactly the registered payload region.
    fn set_field(&self, payload: &mut [u8], index: usize, value: FieldValue<'_>) -> Result<()>;
}

/// Schema whose payload is filled elsewhere; field writes are accepted and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreFields;

impl PayloadCodec for IgnoreFields {
    fn name(&self) -> &str {
        "ignore"
    }

    fn set_field(&self, _payload: &mut [u8], _index: usize, _value: FieldValue<'_>) -> Result<()> {
        Ok(())
    }
}

/// Payload made of consecutive little-endian doubles, one per slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleArray;

impl PayloadCodec for DoubleArray {
    fn name(&self) -> &str {
        "double[]"
    }

    fn set_field(&self, payload: &mut [u8], index: usize, value: FieldValue<'_>) -> Result<()> {
        let v = value.as_f64()?;
        let offset = index * 8;
        if offset + 8 > payload.len() {
            return Err(Error::Encoding(format!(
                "field index {} outside {}-byte payload",
                index,
                payload.len()
            )));
        }
        CursorMut::at(payload, offset).write_f64(v)
    }
}

/// Legacy schema of fixed-width, zero-padded strings, one per slot.
#[derive(Debug, Clone, Copy)]
pub struct FixedStrings {
    width: usize,
}

impl FixedStrings {
    /// EPICS `MAX_STRING_SIZE`.
    pub const EPICS_STRING: usize = 40;

    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Default for FixedStrings {
    fn default() -> Self {
        Self::new(Self::EPICS_STRING)
    }
}

impl PayloadCodec for FixedStrings {
    fn name(&self) -> &str {
        "string[]"
    }

    fn set_field(&self, payload: &mut [u8], index: usize, value: FieldValue<'_>) -> Result<()> {
        let offset = index * self.width;
        if offset + self.width > payload.len() {
            return Err(Error::Encoding(format!(
                "field index {} outside {}-byte payload",
                index,
                payload.len()
            )));
        }
        let mut cursor = CursorMut::at(payload, offset);
        match value {
            FieldValue::Text(s) => cursor.write_padded(s.as_bytes(), self.width),
            FieldValue::Double(v) => cursor.write_padded(v.to_string().as_bytes(), self.width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_array_writes_slot() {
        let mut payload = [0u8; 32];
        DoubleArray
            .set_field(&mut payload, 2, FieldValue::Double(1.5))
            .expect("slot 2 fits");
        assert_eq!(&payload[16..24], &1.5f64.to_le_bytes());
        assert_eq!(&payload[..16], &[0u8; 16]);
    }

    #[test]
    fn test_double_array_parses_text_and_bounds_checks() {
        let mut payload = [0u8; 16];
        DoubleArray
            .set_field(&mut payload, 1, FieldValue::Text(" 42 "))
            .expect("text parses");
        assert_eq!(&payload[8..16], &42.0f64.to_le_bytes());
        assert!(DoubleArray
            .set_field(&mut payload, 2, FieldValue::Double(0.0))
            .is_err());
        assert!(DoubleArray
            .set_field(&mut payload, 0, FieldValue::Text("abc"))
            .is_err());
    }

    #[test]
    fn test_fixed_strings_pad_and_truncate() {
        let codec = FixedStrings::new(4);
        let mut payload = [0xAAu8; 8];
        codec
            .set_field(&mut payload, 0, FieldValue::Text("ab"))
            .expect("slot 0 fits");
        codec
            .set_field(&mut payload, 1, FieldValue::Text("abcdef"))
            .expect("slot 1 fits");
        assert_eq!(&payload, b"ab\0\0abcd");
        assert!(codec
            .set_field(&mut payload, 2, FieldValue::Text("x"))
            .is_err());
    }

    #[test]
    fn test_ignore_fields_accepts_anything() {
        let mut payload = [];
        IgnoreFields
            .set_field(&mut payload, 99, FieldValue::Double(1.0))
            .expect("ignored");
    }
}
