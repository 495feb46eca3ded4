use std::sync::Arc;
use std::time::Duration;

use orchestrator_core::InstanceId;
use orchestrator_instance_manager::{InstanceManager, InstanceState};
use orchestrator_module_registry::ModuleInfo;
use orchestrator_process_supervisor::SpawnSpec;
use orchestrator_protocol::Command;

use crate::collaborators::{DeviceConfig, DeviceDirectory, DeviceHardware};
use crate::descriptor::{DeviceDescriptor, DispatchKind};
use crate::error::{CoordinatorError, Result};
use crate::identity::{make_instance_id, IdentityMap};

/// Top-level device-to-instance orchestration (spec §4.6, component C6):
/// drives a device from discovery through the assign/acknowledge
/// handshake into `InstanceManager`'s state machine.
pub struct DeviceCoordinator {
    directory: Arc<dyn DeviceDirectory>,
    config: Arc<dyn DeviceConfig>,
    hardware: Arc<dyn DeviceHardware>,
    instances: Arc<InstanceManager>,
    identity: IdentityMap,
}

impl DeviceCoordinator {
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        config: Arc<dyn DeviceConfig>,
        hardware: Arc<dyn DeviceHardware>,
        instances: Arc<InstanceManager>,
    ) -> Self {
        DeviceCoordinator {
            directory,
            config,
            hardware,
            instances,
            identity: IdentityMap::new(),
        }
    }

    /// Spec §4.6 `ConnectAndStart`.
    pub async fn connect_and_start(&self, device_id: &str, spec: SpawnSpec) -> Result<bool> {
        let descriptor = self
            .directory
            .resolve(device_id)
            .ok_or_else(|| CoordinatorError::UnknownDevice(device_id.to_string()))?;

        let iid = make_instance_id(&descriptor.module_id, device_id, descriptor.is_multi_instance);

        if let Some(info) = self.instances.info(&iid).await {
            if !info.state.is_stopped() {
                return Ok(true); // idempotent: already connected or in flight
            }
        }

        let geometry = self
            .config
            .window_geometry(&descriptor.module_id, iid.device_suffix())
            .or_else(|| self.config.window_geometry(&descriptor.module_id, None));
        let mut spec = spec;
        spec.window_geometry = geometry;
        if matches!(descriptor.dispatch_kind(), DispatchKind::CliInitialized) {
            spec.extra_args.extend(descriptor.extra_cli_args.clone());
        }

        self.instances
            .start_instance(
                iid.clone(),
                &descriptor.module_id,
                Some(device_id.to_string()),
                descriptor.is_internal,
                &spec,
            )
            .await
            .map_err(|source| CoordinatorError::Start {
                device_id: device_id.to_string(),
                source,
            })?;

        self.identity.register(device_id, iid.clone());
        if descriptor.uses_wireless {
            log::debug!("{iid}: wireless relay callback installed for {device_id}");
        }

        if !self.instances.wait_for_ready(&iid, Duration::from_secs(10)).await {
            return Ok(false);
        }

        match descriptor.dispatch_kind() {
            DispatchKind::CliInitialized => {
                let reached = self
                    .poll_until(&iid, Duration::from_secs(30), |state| {
                        state.is_connected() || state.is_stopped()
                    })
                    .await;
                self.config.set_connected(&descriptor.module_id, reached);
                Ok(reached)
            }
            DispatchKind::Internal => {
                self.config.set_connected(&descriptor.module_id, true);
                Ok(true)
            }
            DispatchKind::Normal => {
                let device_id_owned = device_id.to_string();
                let builder = move |attempt: u32| {
                    Command::new(orchestrator_protocol::CommandKind::AssignDevice)
                        .with_field("device_id", device_id_owned.clone())
                        .with_field("attempt", attempt)
                };
                Ok(self.instances.connect_device(&iid, Box::new(builder)).await)
            }
        }
    }

    /// Spec §4.6 `StopAndDisconnect`.
    pub async fn stop_and_disconnect(&self, device_id: &str) -> bool {
        let Some(iid) = self.identity.lookup(device_id) else {
            return false;
        };
        self.instances.stop_instance(&iid).await;
        self.cleanup_device_disconnect(device_id, iid.module_id(), false).await;
        true
    }

    async fn cleanup_device_disconnect(&self, device_id: &str, module_id: &str, _is_crash: bool) {
        let is_internal = self
            .directory
            .resolve(device_id)
            .map(|descriptor| descriptor.is_internal)
            .unwrap_or(false);
        let removed = self.identity.unregister(device_id);
        self.hardware.notify_connection(device_id, false);
        self.config.set_connected(module_id, false);

        let other_instance = removed
            .map(|iid| self.identity.any_other_instance_for_module(module_id, &iid))
            .unwrap_or(false);
        if !other_instance {
            if is_internal {
                self.config.mark_closed(module_id);
            } else {
                self.config.mark_disabled(module_id);
            }
        }
    }

    /// Spec §4.6 `LoadPendingAutoConnects`.
    pub fn load_pending_auto_connects(&self, modules: &[ModuleInfo], is_enabled: impl Fn(&str) -> bool) {
        for module in modules {
            if !is_enabled(&module.module_id) {
                continue;
            }
            if self.config.was_connected(&module.module_id) {
                self.hardware.queue_auto_connect(&module.module_id, &module.module_id);
            }
        }
    }

    async fn poll_until(
        &self,
        iid: &InstanceId,
        timeout: Duration,
        predicate: impl Fn(InstanceState) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(info) = self.instances.info(iid).await {
                if predicate(info.state) {
                    return info.state.is_connected();
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;

    use orchestrator_process_supervisor::ProcessSupervisor;

    struct FakeDirectory {
        entries: StdHashMap<String, DeviceDescriptor>,
    }
    impl DeviceDirectory for FakeDirectory {
        fn resolve(&self, device_id: &str) -> Option<DeviceDescriptor> {
            self.entries.get(device_id).cloned()
        }
    }

    #[derive(Default)]
    struct FakeConfig {
        connected: StdMutex<StdHashMap<String, bool>>,
        closed: StdMutex<Vec<String>>,
        disabled: StdMutex<Vec<String>>,
    }
    impl DeviceConfig for FakeConfig {
        fn window_geometry(&self, _module_id: &str, _instance_suffix: Option<&str>) -> Option<String> {
            None
        }
        fn is_enabled(&self, _module_id: &str) -> bool {
            true
        }
        fn was_connected(&self, module_id: &str) -> bool {
            *self.connected.lock().unwrap().get(module_id).unwrap_or(&false)
        }
        fn set_connected(&self, module_id: &str, connected: bool) {
            self.connected.lock().unwrap().insert(module_id.to_string(), connected);
        }
        fn mark_closed(&self, module_id: &str) {
            self.closed.lock().unwrap().push(module_id.to_string());
        }
        fn mark_disabled(&self, module_id: &str) {
            self.disabled.lock().unwrap().push(module_id.to_string());
        }
    }

    #[derive(Default)]
    struct FakeHardware {
        notified: StdMutex<Vec<(String, bool)>>,
    }
    impl DeviceHardware for FakeHardware {
        fn notify_connection(&self, device_id: &str, connected: bool) {
            self.notified.lock().unwrap().push((device_id.to_string(), connected));
        }
        fn queue_auto_connect(&self, _module_id: &str, _device_id: &str) {}
    }

    fn shell_script(script: &str) -> (tempfile::NamedTempFile, SpawnSpec) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#!/bin/sh\n{script}").unwrap();
        let path = file.path().to_path_buf();
        std::fs::set_permissions(&path, std::os::unix::fs::PermissionsExt::from_mode(0o755)).unwrap();
        let spec = SpawnSpec {
            entry_point: path,
            mode: "headless".to_string(),
            output_dir: std::env::temp_dir(),
            session_prefix: "test".to_string(),
            log_level: "debug".to_string(),
            no_console: true,
            window_geometry: None,
            extra_args: vec![],
        };
        (file, spec)
    }

    fn new_coordinator(
        descriptor: DeviceDescriptor,
    ) -> (DeviceCoordinator, Arc<FakeConfig>, Arc<FakeHardware>) {
        let mut entries = StdHashMap::new();
        entries.insert(descriptor.device_id.clone(), descriptor);
        let directory: Arc<dyn DeviceDirectory> = Arc::new(FakeDirectory { entries });
        let config = Arc::new(FakeConfig::default());
        let hardware = Arc::new(FakeHardware::default());
        let (supervisor, events) = ProcessSupervisor::new();
        let manager = Arc::new(InstanceManager::new(Arc::new(supervisor)));
        tokio::spawn(Arc::clone(&manager).run_event_loop(events));
        let coordinator = DeviceCoordinator::new(
            directory,
            Arc::clone(&config) as Arc<dyn DeviceConfig>,
            Arc::clone(&hardware) as Arc<dyn DeviceHardware>,
            manager,
        );
        (coordinator, config, hardware)
    }

    #[tokio::test]
    async fn internal_module_is_marked_connected_without_an_assign_command() {
        let descriptor = DeviceDescriptor {
            device_id: "INTERNAL0".to_string(),
            module_id: "LOGVIEW".to_string(),
            device_id_prefix: None,
            extra_cli_args: vec![],
            is_internal: true,
            is_multi_instance: false,
            uses_wireless: false,
        };
        let (coordinator, config, _hardware) = new_coordinator(descriptor);
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let ok = coordinator.connect_and_start("INTERNAL0", spec).await.unwrap();
        assert!(ok);
        assert!(config.connected.lock().unwrap().get("LOGVIEW").copied().unwrap_or(false));
        coordinator.stop_and_disconnect("INTERNAL0").await;
    }

    #[tokio::test]
    async fn normal_device_dispatches_an_assign_device_attempt() {
        let descriptor = DeviceDescriptor {
            device_id: "ttyUSB0".to_string(),
            module_id: "GPS".to_string(),
            device_id_prefix: None,
            extra_cli_args: vec![],
            is_internal: false,
            is_multi_instance: false,
            uses_wireless: false,
        };
        let (coordinator, _config, _hardware) = new_coordinator(descriptor);
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let accepted = coordinator.connect_and_start("ttyUSB0", spec).await.unwrap();
        assert!(accepted);
        coordinator.stop_and_disconnect("ttyUSB0").await;
    }

    #[tokio::test]
    async fn stop_and_disconnect_notifies_hardware_and_marks_closed() {
        let descriptor = DeviceDescriptor {
            device_id: "INTERNAL1".to_string(),
            module_id: "LOGVIEW2".to_string(),
            device_id_prefix: None,
            extra_cli_args: vec![],
            is_internal: true,
            is_multi_instance: false,
            uses_wireless: false,
        };
        let (coordinator, config, hardware) = new_coordinator(descriptor);
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        coordinator.connect_and_start("INTERNAL1", spec).await.unwrap();
        let disconnected = coordinator.stop_and_disconnect("INTERNAL1").await;
        assert!(disconnected);
        assert!(hardware.notified.lock().unwrap().contains(&("INTERNAL1".to_string(), false)));
        assert!(config.closed.lock().unwrap().contains(&"LOGVIEW2".to_string()));
    }

    #[tokio::test]
    async fn unknown_device_is_rejected() {
        let (coordinator, _config, _hardware) = new_coordinator(DeviceDescriptor {
            device_id: "known".to_string(),
            module_id: "M".to_string(),
            device_id_prefix: None,
            extra_cli_args: vec![],
            is_internal: true,
            is_multi_instance: false,
            uses_wireless: false,
        });
        let (_guard, spec) = shell_script("sleep 1");
        let result = coordinator.connect_and_start("unknown", spec).await;
        assert!(matches!(result, Err(CoordinatorError::UnknownDevice(_))));
    }
}
