use orchestrator_core::{InstanceId, Timestamp};

use crate::state::InstanceState;

/// Per-instance lifecycle record (spec §3). Mutable, single-owner:
/// `InstanceManager` is the only thing that ever mutates one of these, and
/// always through `InstanceManager::set_state`.
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub instance_id: InstanceId,
    pub module_id: String,
    pub device_id: Option<String>,
    pub state: InstanceState,
    pub state_entered_at: Timestamp,
    pub error_message: Option<String>,
    /// The previous transition, for status/debug surfaces (SPEC_FULL.md
    /// supplement: "Structured `StateChange` history").
    pub last_transition: Option<(InstanceState, InstanceState)>,
    /// Internal modules (no hardware) skip RUNNING and target CONNECTED
    /// directly on `ready` (spec §4.5, §9 open question).
    pub is_internal: bool,
}

impl InstanceInfo {
    pub fn new(instance_id: InstanceId, module_id: String, device_id: Option<String>) -> Self {
        InstanceInfo {
            instance_id,
            module_id,
            device_id,
            state: InstanceState::Stopped,
            state_entered_at: Timestamp::now(),
            error_message: None,
            last_transition: None,
            is_internal: false,
        }
    }

    pub fn time_in_state(&self) -> std::time::Duration {
        self.state_entered_at.elapsed()
    }

    pub fn is_timed_out(&self) -> bool {
        match self.state.soft_deadline() {
            Some(deadline) => self.state_entered_at.has_elapsed(deadline),
            None => false,
        }
    }
}
