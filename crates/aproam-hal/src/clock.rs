//! Monotonic time source and blocking delay.

use std::thread;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock with a blocking sleep.
///
/// Every wait inside the connectivity manager goes through this trait, so a
/// simulated clock turns multi-second association timeouts into instant
/// tests.
pub trait Clock: Send {
    /// Milliseconds since an arbitrary fixed origin.  Never decreases.
    fn now_millis(&self) -> u64;

    /// Block the caller for `ms` milliseconds.
    fn sleep_millis(&self, ms: u64);
}

/// Wall-clock implementation backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep_millis(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_millis();
        clock.sleep_millis(5);
        let b = clock.now_millis();
        assert!(b >= a + 5);
    }
}
