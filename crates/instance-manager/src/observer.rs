use orchestrator_core::InstanceId;

use crate::state::InstanceState;

/// One committed transition, handed to every observer and folded into
/// `InstanceInfo::last_transition` (SPEC_FULL.md supplement: "Structured
/// `StateChange` history").
#[derive(Debug, Clone)]
pub struct StateChange {
    pub instance_id: InstanceId,
    pub from: InstanceState,
    pub to: InstanceState,
    pub error_message: Option<String>,
    /// Set only when this transition was driven by an unexpected child
    /// exit (spec §7 "Child crash" row) — distinct from a deliberate
    /// force-stop, which also carries an `error_message` but is not a
    /// crash.
    pub crashed: bool,
}

/// Registered against `InstanceManager::set_state`'s fan-out (spec §4.5:
/// "fires every observer in registration order; observer exceptions are
/// logged but cannot abort the transition"). Boxed trait object rather
/// than a channel since observers here are synchronous, in-process
/// reactions (the reconciler's crash counter, session bookkeeping), not
/// a pub/sub boundary.
pub trait Observer: Send + Sync {
    fn on_state_change(&self, change: &StateChange);
}

impl<F> Observer for F
where
    F: Fn(&StateChange) + Send + Sync,
{
    fn on_state_change(&self, change: &StateChange) {
        self(change)
    }
}

/// The derived UI-facing projection of an instance's state (spec §4.5:
/// "Derives UI state (connected, connecting) from the info and dispatches
/// it to an optional UI callback").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState {
    pub connected: bool,
    pub connecting: bool,
}

impl UiState {
    pub fn derive(state: InstanceState) -> Self {
        UiState {
            connected: state.is_connected(),
            connecting: state.is_connecting(),
        }
    }
}

pub type UiCallback = Box<dyn Fn(&InstanceId, UiState) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_and_connected_are_mutually_exclusive() {
        for state in [
            InstanceState::Starting,
            InstanceState::Connecting,
            InstanceState::Initializing,
            InstanceState::Disconnecting,
            InstanceState::Stopping,
        ] {
            let ui = UiState::derive(state);
            assert!(ui.connecting);
            assert!(!ui.connected);
        }
        let ui = UiState::derive(InstanceState::Connected);
        assert!(ui.connected);
        assert!(!ui.connecting);
    }
}
