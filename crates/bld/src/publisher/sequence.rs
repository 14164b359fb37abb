// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fiducial sequencing: validity and duplicate suppression.
//!
//! The trigger that drives a publisher can fire twice for one pulse; the
//! second cycle carries the same fiducial and must not be sent.

use crate::config::{FIDUCIAL_INVALID, FIDUCIAL_NOT_SET, FIDUCIAL_UNTRACKED};
use crate::error::{Error, Result};

/// Tracks the prepared fiducial and the last one sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiducialTracker {
    prev: u32,
    cur: u32,
}

impl Default for FiducialTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FiducialTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prev: FIDUCIAL_NOT_SET,
            cur: FIDUCIAL_NOT_SET,
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record the fiducial read for the coming cycle.
    ///
    /// Ids at or above [`FIDUCIAL_UNTRACKED`] are rejected; the cycle will
    /// then report them as invalid. The untracked sentinel itself is only
    /// reachable through [`prepare_untracked`](Self::prepare_untracked).
    pub fn prepare(&mut self, fiducial: u32) -> Result<()> {
        if fiducial == FIDUCIAL_UNTRACKED {
            self.cur = FIDUCIAL_INVALID;
            return Err(Error::InvalidFiducial(fiducial));
        }
        self.cur = fiducial;
        if fiducial > FIDUCIAL_UNTRACKED {
            return Err(Error::InvalidFiducial(fiducial));
        }
        Ok(())
    }

    /// Drop whatever was prepared; the next send reports an unset fiducial.
    pub fn invalidate(&mut self) {
        self.cur = FIDUCIAL_NOT_SET;
    }

    /// Prepare a cycle without fiducial tracking.
    pub fn prepare_untracked(&mut self) {
        self.cur = FIDUCIAL_UNTRACKED;
    }

    /// Consume the prepared fiducial for a send.
    ///
    /// The prepared value is reset to "not set" whatever the outcome.
    pub fn take(&mut self) -> Result<u32> {
        let fiducial = std::mem::replace(&mut self.cur, FIDUCIAL_NOT_SET);
        match fiducial {
            FIDUCIAL_NOT_SET => Err(Error::FiducialUnset),
            FIDUCIAL_UNTRACKED => Ok(fiducial),
            f if f > FIDUCIAL_UNTRACKED => Err(Error::InvalidFiducial(f)),
            f => self.advance(f),
        }
    }

    /// Check a fiducial that comes with a pre-built packet.
    pub fn check(&mut self, fiducial: u32) -> Result<u32> {
        if fiducial >= FIDUCIAL_UNTRACKED {
            return Err(Error::InvalidFiducial(fiducial));
        }
        self.advance(fiducial)
    }

    fn advance(&mut self, fiducial: u32) -> Result<u32> {
        if fiducial == self.prev {
            return Err(Error::DuplicateFiducial(fiducial));
        }
        self.prev = fiducial;
        Ok(fiducial)
    }

    /// Last fiducial sent.
    #[must_use]
    pub fn previous(&self) -> u32 {
        self.prev
    }

    /// Fiducial prepared for the next send.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.cur
    }
}
