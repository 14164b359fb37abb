// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked read/write cursors over wire-order buffers.

use super::order::{from_wire_f64, from_wire_u32, to_wire_f64, to_wire_u32};
use crate::error::{Error, Result};

/// Generate wire-order write methods for primitive types.
///
/// Each generated method checks bounds, converts the value to wire order,
/// copies its bytes and advances the offset.
macro_rules! impl_write_wire {
    ($name:ident, $type:ty, $size:expr, $conv:ident) => {
        pub fn $name(&mut self, value: $type) -> Result<()> {
            self.check($size)?;
            let bytes = $conv(value).to_ne_bytes();
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&bytes);
            self.offset += $size;
            Ok(())
        }
    };
}

/// Generate wire-order read methods for primitive types.
macro_rules! impl_read_wire {
    ($name:ident, $type:ty, $size:expr, $conv:ident) => {
        pub fn $name(&mut self) -> Result<$type> {
            self.check($size)?;
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buffer[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok($conv(<$type>::from_ne_bytes(bytes)))
        }
    };
}

macro_rules! impl_cursor_common {
    () => {
        pub fn offset(&self) -> usize {
            self.offset
        }

        pub fn remaining(&self) -> usize {
            self.buffer.len().saturating_sub(self.offset)
        }

        fn check(&self, len: usize) -> Result<()> {
            if self.offset + len > self.buffer.len() {
                return Err(Error::BufferTooSmall {
                    needed: self.offset + len,
                    capacity: self.buffer.len(),
                });
            }
            Ok(())
        }
    };
}

/// Mutable cursor for writing.
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Cursor positioned at `offset`.
    pub fn at(buffer: &'a mut [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    impl_write_wire!(write_u32, u32, 4, to_wire_u32);
    impl_write_wire!(write_f64, f64, 8, to_wire_f64);

    /// Write `data` into a fixed-width, zero-padded slot.
    pub fn write_padded(&mut self, data: &[u8], width: usize) -> Result<()> {
        self.check(width)?;
        let n = data.len().min(width);
        let slot = &mut self.buffer[self.offset..self.offset + width];
        slot[..n].copy_from_slice(&data[..n]);
        slot[n..].fill(0);
        self.offset += width;
        Ok(())
    }

    impl_cursor_common!();
}

/// Immutable cursor for reading.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    impl_read_wire!(read_u32, u32, 4, from_wire_u32);
    impl_read_wire!(read_f64, f64, 8, from_wire_f64);

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.check(len)?;
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    impl_cursor_common!();
}
