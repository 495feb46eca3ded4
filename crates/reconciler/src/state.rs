/// The reconciler's coarser view of a module's runtime state (spec §3,
/// §4.7). Distinct from `InstanceState`: the reconciler operates at module
/// granularity, folding the instance machine's connection detail
/// (CONNECTING, CONNECTED, DISCONNECTING) into IDLE/RECORDING and adding
/// the module-level ERROR state that the instance machine has no
/// equivalent of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActualState {
    Stopped,
    Starting,
    Initializing,
    Idle,
    Recording,
    Stopping,
    Error,
    Crashed,
}

impl ActualState {
    pub fn is_running_state(self) -> bool {
        !self.is_stopped_state()
    }

    /// Spec §3/§8: the set that makes `desired=ENABLED` inconsistent and
    /// triggers `START_REQUESTED` is exactly `{STOPPED, CRASHED, ERROR}`;
    /// every other state (including STOPPING, a settling-down transition)
    /// still counts as "running" for this invariant.
    pub fn is_stopped_state(self) -> bool {
        matches!(self, ActualState::Stopped | ActualState::Crashed | ActualState::Error)
    }
}

/// Spec §8 invariant 4: `is_state_consistent(m) ⇔ (desired=ENABLED ∧
/// actual∈RUNNING_STATES) ∨ (desired=DISABLED ∧ actual∈STOPPED_STATES)`.
pub fn is_state_consistent(desired_enabled: bool, actual: ActualState) -> bool {
    if desired_enabled {
        actual.is_running_state()
    } else {
        actual.is_stopped_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_matches_the_truth_table() {
        assert!(is_state_consistent(true, ActualState::Idle));
        assert!(is_state_consistent(true, ActualState::Recording));
        assert!(is_state_consistent(true, ActualState::Starting));
        assert!(!is_state_consistent(true, ActualState::Stopped));
        assert!(!is_state_consistent(true, ActualState::Error));
        assert!(is_state_consistent(false, ActualState::Stopped));
        assert!(is_state_consistent(false, ActualState::Crashed));
        assert!(is_state_consistent(false, ActualState::Error));
        assert!(!is_state_consistent(false, ActualState::Idle));
    }
}
