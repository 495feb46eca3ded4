use orchestrator_core::InstanceId;
use orchestrator_protocol::Status;

/// Events the supervisor publishes upward; `InstanceManager` is the
/// subscriber (spec §4.3: "It publishes events; InstanceManager
/// subscribes").
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    StatusReceived {
        instance_id: InstanceId,
        status: Status,
    },
    ProcessExited {
        instance_id: InstanceId,
        exit_code: Option<i32>,
        /// Non-zero exit while shutdown was not requested (spec §4.2).
        crashed: bool,
    },
    /// An stdout line that didn't parse as a `Status` — diagnostic, not a
    /// failure (spec §4.2).
    UnrecognizedOutput {
        instance_id: InstanceId,
        line: String,
    },
}
