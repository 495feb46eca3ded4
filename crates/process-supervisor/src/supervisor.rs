use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use orchestrator_core::InstanceId;
use orchestrator_protocol::Command;

use crate::child_process::ChildProcess;
use crate::error::Result;
use crate::events::SupervisorEvent;
use crate::spawn_spec::SpawnSpec;

/// Registry of `ChildProcess` keyed by instance id (spec §4.3, component
/// C4). Pure I/O and lifecycle layer: it does not own state transitions,
/// only publishes `SupervisorEvent`s that `InstanceManager` subscribes to.
pub struct ProcessSupervisor {
    children: Mutex<HashMap<InstanceId, Arc<ChildProcess>>>,
    events_tx: tokio::sync::mpsc::UnboundedSender<SupervisorEvent>,
}

impl ProcessSupervisor {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            ProcessSupervisor {
                children: Mutex::new(HashMap::new()),
                events_tx: tx,
            },
            rx,
        )
    }

    /// Locates the module's entry point and spawns it (spec §4.3).
    pub fn spawn(
        &self,
        instance_id: InstanceId,
        module_id: &str,
        spec: &SpawnSpec,
    ) -> Result<()> {
        let child = ChildProcess::spawn(instance_id.clone(), module_id, spec, self.events_tx.clone())?;
        self.children.lock().unwrap().insert(instance_id, Arc::new(child));
        Ok(())
    }

    /// Idempotent w.r.t. a running child; returns `false` if none is
    /// registered for `instance_id` (spec §4.3).
    pub fn send(&self, instance_id: &InstanceId, command: &Command) -> bool {
        let Some(child) = self.get(instance_id) else {
            return false;
        };
        match command.to_line() {
            Ok(line) => child.send(line),
            Err(_) => false,
        }
    }

    /// Graceful stop with terminate/kill escalation (spec §4.2, §4.3).
    /// Removes the child from the registry once it has exited.
    pub async fn stop(&self, instance_id: &InstanceId, timeout: Duration) {
        let Some(child) = self.get(instance_id) else {
            return;
        };
        let quit_line = Command::quit().to_line().unwrap_or_default();
        child.stop(quit_line, timeout).await;
        self.children.lock().unwrap().remove(instance_id);
    }

    /// Immediate kill, no grace period (spec §4.5 monitor loop's timeout
    /// remediation path).
    pub async fn kill(&self, instance_id: &InstanceId) {
        let Some(child) = self.get(instance_id) else {
            return;
        };
        child.kill_immediately().await;
        self.children.lock().unwrap().remove(instance_id);
    }

    pub fn is_running(&self, instance_id: &InstanceId) -> bool {
        self.children.lock().unwrap().contains_key(instance_id)
    }

    /// Instance ids with a live child, for `SessionController`'s fan-out
    /// (spec §4.8).
    pub fn running_instances(&self) -> Vec<InstanceId> {
        self.children.lock().unwrap().keys().cloned().collect()
    }

    pub fn forcefully_stopped(&self, instance_id: &InstanceId) -> bool {
        self.get(instance_id)
            .map(|child| child.forcefully_stopped())
            .unwrap_or(false)
    }

    pub fn dropped_command_count(&self, instance_id: &InstanceId) -> Option<u64> {
        self.get(instance_id).map(|child| child.dropped_command_count())
    }

    fn get(&self, instance_id: &InstanceId) -> Option<Arc<ChildProcess>> {
        self.children.lock().unwrap().get(instance_id).cloned()
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_protocol::StatusKind;
    use std::io::Write;
    use std::time::Duration;

    fn shell_script_spec(script: &str) -> (tempfile::NamedTempFile, SpawnSpec) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#!/bin/sh\n{script}").unwrap();
        let path = file.path().to_path_buf();
        std::fs::set_permissions(&path, std::os::unix::fs::PermissionsExt::from_mode(0o755))
            .unwrap();
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

    #[tokio::test]
    async fn spawned_child_emits_ready_status_received_event() {
        let (_guard, spec) = shell_script_spec(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let (supervisor, mut events) = ProcessSupervisor::new();
        let iid = InstanceId::singleton("TEST");
        supervisor.spawn(iid.clone(), "TEST", &spec).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        match event {
            super::SupervisorEvent::StatusReceived { instance_id, status } => {
                assert_eq!(instance_id, iid);
                assert_eq!(status.kind(), StatusKind::Ready);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        supervisor.kill(&iid).await;
    }

    #[tokio::test]
    async fn non_zero_exit_without_shutdown_is_reported_as_crash() {
        let (_guard, spec) = shell_script_spec("exit 7");
        let (supervisor, mut events) = ProcessSupervisor::new();
        let iid = InstanceId::singleton("TEST");
        supervisor.spawn(iid.clone(), "TEST", &spec).unwrap();

        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("event within timeout")
                .expect("channel open");
            if let super::SupervisorEvent::ProcessExited { crashed, exit_code, .. } = event {
                assert!(crashed);
                assert_eq!(exit_code, Some(7));
                break;
            }
        }
    }
}
