// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rate limiting for hot-path log messages.
//!
//! Publishers run once per accelerator pulse. A persistent fault (missing PV,
//! stuck fiducial) would otherwise log at pulse rate, so cycle failures go
//! through a [`LogThrottle`] that lets one message in `modulo` through.

use crate::config::LOG_SAMPLE_MODULO;

/// Counts occurrences and decides which ones get logged.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    count: u64,
    modulo: u64,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(LOG_SAMPLE_MODULO)
    }
}

impl LogThrottle {
    /// Throttle emitting on occurrence 1, `modulo + 1`, `2 * modulo + 1`...
    #[must_use]
    pub fn new(modulo: u64) -> Self {
        Self {
            count: 0,
            modulo: modulo.max(1),
        }
    }

    /// Record one occurrence; true if it should be logged.
    ///
    /// `verbose` bypasses the sampling (high debug levels).
    pub fn hit(&mut self, verbose: bool) -> bool {
        let emit = verbose || self.count % self.modulo == 0;
        self.count = self.count.wrapping_add(1);
        emit
    }

    /// Occurrences recorded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_samples_every_modulo() {
        let mut throttle = LogThrottle::new(3);
        let emitted: Vec<bool> = (0..7).map(|_| throttle.hit(false)).collect();
        assert_eq!(emitted, [true, false, false, true, false, false, true]);
        assert_eq!(throttle.count(), 7);
    }

    #[test]
    fn test_throttle_verbose_always_emits() {
        let mut throttle = LogThrottle::new(100);
        assert!(throttle.hit(false));
        assert!(throttle.hit(true));
        assert!(!throttle.hit(false));
    }

    #[test]
    fn test_zero_modulo_is_clamped() {
        let mut throttle = LogThrottle::new(0);
        assert!(throttle.hit(false));
        assert!(throttle.hit(false));
    }
}
