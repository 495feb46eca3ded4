use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use orchestrator_core::InstanceId;

/// `device_id → instance_id`, the bidirectional table spec §4.6 steps 5
/// and §4.6's `StopAndDisconnect` step 1 both read and write.
#[derive(Default)]
pub struct IdentityMap {
    inner: Mutex<HashMap<String, InstanceId>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        IdentityMap::default()
    }

    pub fn register(&self, device_id: &str, instance_id: InstanceId) {
        self.inner.lock().unwrap().insert(device_id.to_string(), instance_id);
    }

    pub fn unregister(&self, device_id: &str) -> Option<InstanceId> {
        self.inner.lock().unwrap().remove(device_id)
    }

    pub fn lookup(&self, device_id: &str) -> Option<InstanceId> {
        self.inner.lock().unwrap().get(device_id).cloned()
    }

    /// Whether any instance id besides `instance_id` is still registered
    /// for `module_id` — used by `CleanupDeviceDisconnect` to decide
    /// whether the module as a whole should be marked closed/disabled.
    pub fn any_other_instance_for_module(&self, module_id: &str, instance_id: &InstanceId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .values()
            .any(|iid| iid != instance_id && iid.module_id() == module_id)
    }
}

/// Builds the instance id for a device (spec §4.6 step 2): singleton
/// modules get the bare module id; multi-instance modules fold the
/// device id into a short, stable suffix so the same device always maps
/// to the same instance id across restarts.
pub fn make_instance_id(module_id: &str, device_id: &str, is_multi_instance: bool) -> InstanceId {
    if !is_multi_instance {
        return InstanceId::singleton(module_id);
    }
    let mut hasher = DefaultHasher::new();
    device_id.hash(&mut hasher);
    let suffix = format!("{:08x}", hasher.finish() as u32);
    InstanceId::for_device(module_id, &suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_modules_ignore_the_device_id() {
        let a = make_instance_id("GPS", "ttyUSB0", false);
        let b = make_instance_id("GPS", "ttyUSB1", false);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "GPS");
    }

    #[test]
    fn multi_instance_modules_derive_a_stable_suffix() {
        let a = make_instance_id("CAM", "ttyUSB0", true);
        let b = make_instance_id("CAM", "ttyUSB0", true);
        let c = make_instance_id("CAM", "ttyUSB1", true);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.module_id(), "CAM");
    }

    #[test]
    fn identity_map_round_trips() {
        let map = IdentityMap::new();
        let iid = InstanceId::singleton("GPS");
        map.register("ttyUSB0", iid.clone());
        assert_eq!(map.lookup("ttyUSB0"), Some(iid.clone()));
        assert_eq!(map.unregister("ttyUSB0"), Some(iid));
        assert_eq!(map.lookup("ttyUSB0"), None);
    }
}
