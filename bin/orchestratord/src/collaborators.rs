//! Persisted-state collaborators `DeviceCoordinator`/`ModuleReconciler`
//! expect from the rest of the system (spec §6 "Persisted per-module
//! state"). Hardware discovery itself is a Non-goal (spec.md §1), so
//! `ModuleDirectory` resolves one device per module 1:1 from the
//! registry instead of a real discovery bus.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use orchestrator_core::FlatConfig;
use orchestrator_device_coordinator::{DeviceConfig, DeviceDescriptor, DeviceDirectory, DeviceHardware};
use orchestrator_module_registry::ModuleInfo;
use orchestrator_reconciler::EnabledConfigWriter;

/// Resolves a device id straight to the module of the same name. Real
/// hardware discovery (USB/serial enumeration, XBee pairing) is out of
/// scope; every module here owns exactly one implicit "device".
pub struct ModuleDirectory {
    modules: HashMap<String, ModuleInfo>,
}

impl ModuleDirectory {
    pub fn new(modules: Vec<ModuleInfo>) -> Self {
        let modules = modules.into_iter().map(|m| (m.module_id.clone(), m)).collect();
        ModuleDirectory { modules }
    }

    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.modules.values().cloned().collect()
    }
}

impl DeviceDirectory for ModuleDirectory {
    fn resolve(&self, device_id: &str) -> Option<DeviceDescriptor> {
        let module = self.modules.get(device_id)?;
        Some(DeviceDescriptor {
            device_id: device_id.to_string(),
            module_id: module.module_id.clone(),
            device_id_prefix: None,
            extra_cli_args: Vec::new(),
            is_internal: module.is_internal,
            is_multi_instance: false,
            uses_wireless: false,
        })
    }
}

/// Reads and writes each module's flat config file, guarded by one mutex
/// per module id in place of the teacher's per-spec-file writer lock
/// (spec §5 "Config files: writes are serialized by a module-local writer
/// lock held by the persistence observer").
pub struct ConfigStore {
    paths: HashMap<String, PathBuf>,
    cache: Mutex<HashMap<String, FlatConfig>>,
}

impl ConfigStore {
    pub fn new(modules: &[ModuleInfo]) -> Self {
        let paths = modules
            .iter()
            .map(|m| (m.module_id.clone(), m.config_path.clone()))
            .collect();
        ConfigStore {
            paths,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn with_config<R>(&self, module: &str, f: impl FnOnce(&FlatConfig) -> R) -> Option<R> {
        let mut cache = self.cache.lock().unwrap();
        if !cache.contains_key(module) {
            let path = self.paths.get(module)?;
            let config = FlatConfig::load(path).unwrap_or_default();
            cache.insert(module.to_string(), config);
        }
        cache.get(module).map(f)
    }

    fn mutate_config(&self, module: &str, f: impl FnOnce(&mut FlatConfig)) {
        let Some(path) = self.paths.get(module) else {
            log::warn!("no config path known for module {module}, dropping write");
            return;
        };
        let mut cache = self.cache.lock().unwrap();
        let config = cache
            .entry(module.to_string())
            .or_insert_with(|| FlatConfig::load(path).unwrap_or_default());
        f(config);
        if let Err(err) = config.save(path) {
            log::warn!("failed to persist config for {module}: {err}");
        }
    }
}

impl DeviceConfig for ConfigStore {
    fn window_geometry(&self, module_id: &str, instance_suffix: Option<&str>) -> Option<String> {
        let key = instance_suffix
            .map(|suffix| format!("window_geometry_{suffix}"))
            .unwrap_or_else(|| "window_geometry".to_string());
        self.with_config(module_id, |cfg| cfg.get(&key).map(str::to_string))
            .flatten()
    }

    fn is_enabled(&self, module_id: &str) -> bool {
        self.with_config(module_id, |cfg| cfg.get_bool("enabled").unwrap_or(false))
            .unwrap_or(false)
    }

    fn was_connected(&self, module_id: &str) -> bool {
        self.with_config(module_id, |cfg| cfg.get_bool("connected").unwrap_or(false))
            .unwrap_or(false)
    }

    fn set_connected(&self, module_id: &str, connected: bool) {
        self.mutate_config(module_id, |cfg| cfg.set("connected", connected.to_string()));
    }

    fn mark_closed(&self, module_id: &str) {
        self.mutate_config(module_id, |cfg| cfg.set("connected", "false"));
    }

    fn mark_disabled(&self, module_id: &str) {
        self.mutate_config(module_id, |cfg| {
            cfg.set("connected", "false");
            cfg.set("enabled", "false");
        });
    }
}

impl EnabledConfigWriter for ConfigStore {
    fn write_enabled(&self, module: &str, enabled: bool) {
        self.mutate_config(module, |cfg| cfg.set("enabled", enabled.to_string()));
    }
}

impl<T: EnabledConfigWriter + ?Sized> EnabledConfigWriter for std::sync::Arc<T> {
    fn write_enabled(&self, module: &str, enabled: bool) {
        (**self).write_enabled(module, enabled);
    }
}

/// Hardware notification hooks. UI/hardware wiring is a Non-goal (spec.md
/// §1); this just logs what a real discovery/UI layer would act on.
pub struct LoggingHardware;

impl DeviceHardware for LoggingHardware {
    fn notify_connection(&self, device_id: &str, connected: bool) {
        log::info!("device {device_id} connection state: {connected}");
    }

    fn queue_auto_connect(&self, module_id: &str, device_id: &str) {
        log::info!("queued auto-connect for module {module_id} device {device_id}");
    }
}
