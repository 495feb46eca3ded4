use orchestrator_core::Timestamp;

use crate::state::ActualState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerEventKind {
    DesiredStateChanged,
    ActualStateChanged,
    StartRequested,
    StopRequested,
    CrashDetected,
    AllModulesStopped,
    StartupComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Desired(bool),
    Actual(ActualState),
    CrashCount(u32),
    Success(bool),
}

/// Delivered to every interested observer on every reconciler event (spec
/// §4.7: "listeners receive StateChange{event, module, old, new,
/// timestamp}").
#[derive(Debug, Clone)]
pub struct StateChange {
    pub event: ReconcilerEventKind,
    pub module: String,
    pub old: Option<FieldValue>,
    pub new: Option<FieldValue>,
    pub timestamp: Timestamp,
}
