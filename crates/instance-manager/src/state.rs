use std::time::Duration;

/// Lifecycle state of a module instance (spec §3). A closed, tagged enum —
/// match over it rather than comparing strings (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    Stopped,
    Starting,
    Running,
    Connecting,
    Initializing,
    Connected,
    Disconnecting,
    Stopping,
}

impl InstanceState {
    /// True if `to` is a permitted next state from `self`, per spec §3's
    /// transition table.
    pub fn can_transition_to(self, to: InstanceState) -> bool {
        use InstanceState::*;
        matches!(
            (self, to),
            (Stopped, Starting)
                | (Starting, Running | Connected | Stopped)
                | (Running, Connecting | Stopping | Stopped)
                | (Connecting, Initializing | Connected | Running | Stopping | Stopped)
                | (Initializing, Connected | Running | Stopping | Stopped)
                | (Connected, Disconnecting | Stopping | Stopped)
                | (Disconnecting, Running | Stopping | Stopped)
                | (Stopping, Stopped)
        )
    }

    /// Soft deadline for remedial action while in this state (spec §3).
    /// `None` means unbounded (e.g. `Initializing`: "module is initializing
    /// hardware").
    pub fn soft_deadline(self) -> Option<Duration> {
        match self {
            InstanceState::Starting => Some(Duration::from_secs(5)),
            InstanceState::Connecting => Some(Duration::from_secs(3)),
            InstanceState::Disconnecting => Some(Duration::from_secs(2)),
            InstanceState::Stopping => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    /// Derives the UI "connecting" flag (spec §4.5): true iff the instance
    /// is in one of the transitional states.
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            InstanceState::Starting
                | InstanceState::Connecting
                | InstanceState::Initializing
                | InstanceState::Disconnecting
                | InstanceState::Stopping
        )
    }

    pub fn is_connected(self) -> bool {
        matches!(self, InstanceState::Connected)
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, InstanceState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstanceState::*;

    #[test]
    fn happy_path_edges_are_permitted() {
        assert!(Stopped.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Connected));
    }

    #[test]
    fn internal_module_shortcut_is_permitted() {
        assert!(Starting.can_transition_to(Connected));
    }

    #[test]
    fn invalid_edges_are_rejected() {
        assert!(!Stopped.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Starting));
        assert!(!Initializing.can_transition_to(Starting));
    }

    #[test]
    fn connecting_implies_not_connected() {
        for state in [Starting, Connecting, Initializing, Disconnecting, Stopping] {
            assert!(state.is_connecting());
            assert!(!state.is_connected());
        }
        assert!(Connected.is_connected());
        assert!(!Connected.is_connecting());
    }
}
