use std::time::Duration;

use orchestrator_core::Timestamp;
use orchestrator_protocol::Command;

/// The ephemeral retry/timeout record for an in-flight `assign_device`
/// (spec §3). Exists only while a connection is in flight: created in
/// `ConnectDevice`, removed on ack, error-exhaustion, or cancellation.
pub struct PendingConnection {
    pub device_id: String,
    /// Rebuilds the `assign_device` command for a given attempt number.
    /// Called again on every retry so embedded fields (session dir,
    /// display name) stay current (spec §4.5 monitor loop item 1).
    pub command_builder: Box<dyn Fn(u32) -> Command + Send + Sync>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_attempt_at: Timestamp,
    pub retry_delay: Duration,
    pub per_attempt_timeout: Duration,
}

impl PendingConnection {
    pub fn new(device_id: String, command_builder: Box<dyn Fn(u32) -> Command + Send + Sync>) -> Self {
        PendingConnection {
            device_id,
            command_builder,
            attempts: 0,
            max_attempts: 3,
            last_attempt_at: Timestamp::now(),
            retry_delay: Duration::from_secs(1),
            per_attempt_timeout: Duration::from_secs(3),
        }
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// True when the current attempt's timeout plus the retry delay has
    /// elapsed, i.e. it's time to try again (spec §4.5 monitor loop item 1).
    pub fn due_for_retry(&self) -> bool {
        !self.attempts_exhausted()
            && self
                .last_attempt_at
                .has_elapsed(self.per_attempt_timeout + self.retry_delay)
    }

    /// True when the per-attempt timeout has elapsed but the retry delay
    /// has not, i.e. the attempt is "late" but not yet due for a resend.
    pub fn attempt_timed_out(&self) -> bool {
        self.last_attempt_at.has_elapsed(self.per_attempt_timeout)
    }
}
