use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recognized status types (spec §4.1). Unknown types are not an error —
/// they are logged at debug and otherwise ignored, so this is not a closed
/// enum at the wire level; `StatusKind::Unknown` carries the original
/// string through for that logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    Ready,
    DeviceAck,
    DeviceReady,
    DeviceError,
    DeviceUnassigned,
    Quitting,
    RecordingStarted,
    RecordingStopped,
    GeometryChanged,
    LogMessage,
    XbeeSend,
    Unknown(String),
}

impl StatusKind {
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "ready" => StatusKind::Ready,
            "device_ack" => StatusKind::DeviceAck,
            "device_ready" => StatusKind::DeviceReady,
            "device_error" => StatusKind::DeviceError,
            "device_unassigned" => StatusKind::DeviceUnassigned,
            "quitting" => StatusKind::Quitting,
            "recording_started" => StatusKind::RecordingStarted,
            "recording_stopped" => StatusKind::RecordingStopped,
            "geometry_changed" => StatusKind::GeometryChanged,
            "log_message" => StatusKind::LogMessage,
            "xbee_send" => StatusKind::XbeeSend,
            other => StatusKind::Unknown(other.to_string()),
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            StatusKind::Ready => "ready",
            StatusKind::DeviceAck => "device_ack",
            StatusKind::DeviceReady => "device_ready",
            StatusKind::DeviceError => "device_error",
            StatusKind::DeviceUnassigned => "device_unassigned",
            StatusKind::Quitting => "quitting",
            StatusKind::RecordingStarted => "recording_started",
            StatusKind::RecordingStopped => "recording_stopped",
            StatusKind::GeometryChanged => "geometry_changed",
            StatusKind::LogMessage => "log_message",
            StatusKind::XbeeSend => "xbee_send",
            StatusKind::Unknown(name) => name,
        }
    }
}

/// The child-to-parent status envelope: `{status, command_id?, payload}`
/// (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl Status {
    pub fn kind(&self) -> StatusKind {
        StatusKind::from_wire_name(&self.status)
    }

    /// Any unrecognized line from a child's stdout is treated as
    /// diagnostic log output (spec §4.2), never as a status. Call this
    /// first; `None` means "log it, don't act on it".
    pub fn from_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    /// The `error` field carried by `device_error` statuses (spec §4.1).
    pub fn error_field(&self) -> Option<&str> {
        self.payload.get("error").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_status_name_is_preserved_for_debug_logging() {
        let kind = StatusKind::from_wire_name("snapshot_taken");
        assert_eq!(kind, StatusKind::Unknown("snapshot_taken".to_string()));
        assert_eq!(kind.wire_name(), "snapshot_taken");
    }

    #[test]
    fn malformed_line_is_not_a_status() {
        assert!(Status::from_line("not json at all").is_none());
    }

    #[test]
    fn device_error_payload_carries_error_field() {
        let line = r#"{"status":"device_error","command_id":"DRT:ACM0:1","payload":{"error":"timeout"}}"#;
        let status = Status::from_line(line).unwrap();
        assert_eq!(status.kind(), StatusKind::DeviceError);
        assert_eq!(status.error_field(), Some("timeout"));
    }
}
