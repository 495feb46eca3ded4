use crate::descriptor::DeviceDescriptor;

/// The device discovery registry, specified only by its interface to the
/// core (spec §1 Non-goals; §4.6 step 1).
pub trait DeviceDirectory: Send + Sync {
    fn resolve(&self, device_id: &str) -> Option<DeviceDescriptor>;
}

/// Window geometry and enablement persistence, the "external config
/// collaborator" of spec §4.6 step 4 and `LoadPendingAutoConnects`.
pub trait DeviceConfig: Send + Sync {
    fn window_geometry(&self, module_id: &str, instance_suffix: Option<&str>) -> Option<String>;
    fn is_enabled(&self, module_id: &str) -> bool;
    fn was_connected(&self, module_id: &str) -> bool;
    fn set_connected(&self, module_id: &str, connected: bool);
    fn mark_closed(&self, module_id: &str);
    fn mark_disabled(&self, module_id: &str);
}

/// Notifications and auto-connect requests the coordinator hands off to
/// whatever drives the actual hardware discovery loop (spec §4.6 step 5,
/// `LoadPendingAutoConnects`).
pub trait DeviceHardware: Send + Sync {
    fn notify_connection(&self, device_id: &str, connected: bool);
    fn queue_auto_connect(&self, module_id: &str, device_id: &str);
}
