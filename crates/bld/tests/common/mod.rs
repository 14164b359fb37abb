// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for BLD integration tests.

#![allow(dead_code)]

use bld::{DatagramSink, Error, Result, SinkFactory, SinkSpec};
use parking_lot::Mutex;
use std::net::SocketAddrV4;
use std::sync::Arc;

/// Sink factory that keeps every datagram in memory.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    opened: Arc<Mutex<Vec<SinkSpec>>>,
    fail_open: bool,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose `open` always fails like a refused `socket()`.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn opened(&self) -> Vec<SinkSpec> {
        self.opened.lock().clone()
    }
}

pub struct RecordingSink {
    destination: SocketAddrV4,
    max_datagram: usize,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl DatagramSink for RecordingSink {
    fn send(&mut self, datagram: &[u8]) -> Result<()> {
        if datagram.len() > self.max_datagram {
            return Err(Error::PayloadTooLarge {
                len: datagram.len(),
                max: self.max_datagram,
            });
        }
        self.sent.lock().push(datagram.to_vec());
        Ok(())
    }

    fn destination(&self) -> SocketAddrV4 {
        self.destination
    }
}

impl SinkFactory for RecordingFactory {
    type Sink = RecordingSink;

    fn open(&self, spec: &SinkSpec) -> Result<RecordingSink> {
        if self.fail_open {
            return Err(Error::Transport {
                step: bld::SocketStep::Socket,
                // EMFILE
                source: std::io::Error::from_raw_os_error(24),
            });
        }
        self.opened.lock().push(spec.clone());
        Ok(RecordingSink {
            destination: spec.destination,
            max_datagram: spec.max_datagram,
            sent: self.sent.clone(),
        })
    }
}

/// Little-endian f64 slots of a payload.
pub fn doubles(payload: &[u8]) -> Vec<f64> {
    payload
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("8-byte chunk")))
        .collect()
}
