//! [`RoamTimer`] – rate limiter for roam checks.

/// Remembers when the last roam check ran.
///
/// Starts at t = 0, so the first check is due one interval after boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoamTimer {
    last_check_ms: u64,
}

impl RoamTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_check_ms(&self) -> u64 {
        self.last_check_ms
    }

    /// `true` once at least `interval_ms` has passed since the last reset.
    pub fn is_due(&self, now_ms: u64, interval_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_check_ms) >= interval_ms
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_check_ms = now_ms;
    }
}
