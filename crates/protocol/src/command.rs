use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Recognized command names (spec §4.1). `assign_device` is the one the
/// instance manager's retry machinery cares about by name; the rest are
/// opaque pass-throughs from the orchestrator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    AssignDevice,
    UnassignDevice,
    UnassignAllDevices,
    StartSession,
    StopSession,
    Record,
    Pause,
    GetStatus,
    TakeSnapshot,
    Quit,
    SetLogLevel,
    ShowWindow,
    HideWindow,
    XbeeData,
    Other,
}

impl CommandKind {
    /// The wire name for this command, matching spec §4.1's table,
    /// including the two documented aliases.
    pub fn wire_name(self) -> &'static str {
        match self {
            CommandKind::AssignDevice => "assign_device",
            CommandKind::UnassignDevice => "unassign_device",
            CommandKind::UnassignAllDevices => "unassign_all_devices",
            CommandKind::StartSession => "start_session",
            CommandKind::StopSession => "stop_session",
            CommandKind::Record => "record",
            CommandKind::Pause => "pause",
            CommandKind::GetStatus => "get_status",
            CommandKind::TakeSnapshot => "take_snapshot",
            CommandKind::Quit => "quit",
            CommandKind::SetLogLevel => "set_log_level",
            CommandKind::ShowWindow => "show_window",
            CommandKind::HideWindow => "hide_window",
            CommandKind::XbeeData => "xbee_data",
            CommandKind::Other => "other",
        }
    }

    fn from_wire_name(name: &str) -> Self {
        match name {
            "assign_device" => CommandKind::AssignDevice,
            "unassign_device" => CommandKind::UnassignDevice,
            "unassign_all_devices" => CommandKind::UnassignAllDevices,
            "start_session" => CommandKind::StartSession,
            "stop_session" => CommandKind::StopSession,
            "record" | "start_recording" => CommandKind::Record,
            "pause" | "stop_recording" => CommandKind::Pause,
            "get_status" => CommandKind::GetStatus,
            "take_snapshot" => CommandKind::TakeSnapshot,
            "quit" => CommandKind::Quit,
            "set_log_level" => CommandKind::SetLogLevel,
            "show_window" => CommandKind::ShowWindow,
            "hide_window" => CommandKind::HideWindow,
            "xbee_data" => CommandKind::XbeeData,
            _ => CommandKind::Other,
        }
    }
}

/// The parent-to-child command envelope: `{command, command_id?, ...extra}`.
///
/// Extra fields (device transport details for `assign_device`, the trial
/// number and label for `record`, and so on) ride along as a flat JSON
/// object instead of a fixed struct per command, matching the loose
/// envelope spec §4.1 describes ("Command envelope: `{command: <string>,
/// command_id?: <string>, …}`").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Command {
            command: kind.wire_name().to_string(),
            command_id: None,
            extra: Map::new(),
        }
    }

    pub fn with_command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = Some(command_id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::from_wire_name(&self.command)
    }

    pub fn quit() -> Self {
        Command::new(CommandKind::Quit)
    }

    pub fn get_status() -> Self {
        Command::new(CommandKind::GetStatus)
    }

    pub fn unassign_device() -> Self {
        Command::new(CommandKind::UnassignDevice)
    }

    /// Serializes to one line of newline-delimited JSON, ready to be
    /// written to a child's stdin (spec §4.1).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_kind() {
        assert_eq!(CommandKind::from_wire_name("start_recording"), CommandKind::Record);
        assert_eq!(CommandKind::from_wire_name("stop_recording"), CommandKind::Pause);
    }

    #[test]
    fn round_trips_through_json() {
        let cmd = Command::new(CommandKind::AssignDevice)
            .with_command_id("DRT:ACM0:1")
            .with_field("port", "/dev/ttyACM0")
            .with_field("baudrate", 9600);
        let line = cmd.to_line().unwrap();
        let parsed = Command::from_line(&line).unwrap();
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.kind(), CommandKind::AssignDevice);
    }
}
