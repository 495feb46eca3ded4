/// What the device discovery registry knows about a device before a
/// module instance exists for it (spec §4.6 step 1).
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub module_id: String,
    /// Present for device types that bind hardware via a CLI flag at
    /// spawn time instead of an `assign_device` command (e.g. CSI
    /// cameras) — spec §4.6: "If the device type has a
    /// `device_id_prefix` and carries `extra_cli_args` ... mark the
    /// connection as CLI-initialized."
    pub device_id_prefix: Option<String>,
    pub extra_cli_args: Vec<String>,
    pub is_internal: bool,
    /// Whether this module supports more than one simultaneous device
    /// instance (spec §4.6 step 2: multi-instance modules fold
    /// `device_id` into the instance id suffix).
    pub is_multi_instance: bool,
    pub uses_wireless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    CliInitialized,
    Internal,
    Normal,
}

impl DeviceDescriptor {
    pub fn dispatch_kind(&self) -> DispatchKind {
        if self.is_internal {
            DispatchKind::Internal
        } else if self.device_id_prefix.is_some() && !self.extra_cli_args.is_empty() {
            DispatchKind::CliInitialized
        } else {
            DispatchKind::Normal
        }
    }
}
