use std::time::{Duration, Instant};

/// A monotonic point in time. `InstanceInfo::state_entered_at` and similar
/// fields use this instead of wall-clock time so that soft-deadline
/// comparisons (spec §3's per-state timeouts) are immune to clock skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(Instant);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    pub fn has_elapsed(&self, deadline: Duration) -> bool {
        self.elapsed() >= deadline
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::now()
    }
}
