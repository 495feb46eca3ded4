use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use orchestrator_core::InstanceId;
use orchestrator_instance_manager::{InstanceManager, InstanceState};
use orchestrator_process_supervisor::ProcessSupervisor;
use orchestrator_protocol::{Command, CommandKind};

use crate::error::{Result, SessionError};

/// Fans `StartSession`/`StopSession`/`Record`/`Pause`/`GetStatus` out across
/// every healthy instance (spec §4.8, component C8). Grounded on
/// `asyncio.gather(.., return_exceptions=True)`'s per-task isolation: every
/// instance's dispatch is independent, so one failing send never blocks or
/// poisons the others' results.
pub struct SessionController {
    supervisor: Arc<ProcessSupervisor>,
    instances: Arc<InstanceManager>,
    recording: Mutex<bool>,
    session_dir: Mutex<Option<PathBuf>>,
}

impl SessionController {
    pub fn new(supervisor: Arc<ProcessSupervisor>, instances: Arc<InstanceManager>) -> Self {
        SessionController {
            supervisor,
            instances,
            recording: Mutex::new(false),
            session_dir: Mutex::new(None),
        }
    }

    pub async fn start_session(&self) -> HashMap<InstanceId, bool> {
        self.dispatch(Command::new(CommandKind::StartSession)).await
    }

    pub async fn stop_session(&self) -> HashMap<InstanceId, bool> {
        *self.recording.lock().await = false;
        self.dispatch(Command::new(CommandKind::StopSession)).await
    }

    pub async fn get_status(&self) -> HashMap<InstanceId, bool> {
        self.dispatch(Command::new(CommandKind::GetStatus)).await
    }

    /// Rejects if a recording is already in progress; otherwise updates the
    /// session directory every eligible instance writes under before
    /// dispatching (spec §4.8 "Recording guard").
    pub async fn record(&self, trial_number: u32, label: &str, session_dir: &Path) -> Result<HashMap<InstanceId, bool>> {
        {
            let mut recording = self.recording.lock().await;
            if *recording {
                return Err(SessionError::AlreadyRecording);
            }
            *recording = true;
        }
        *self.session_dir.lock().await = Some(session_dir.to_path_buf());
        let command = Command::new(CommandKind::Record)
            .with_field("trial_number", trial_number)
            .with_field("label", label)
            .with_field("output_dir", session_dir.display().to_string());
        Ok(self.dispatch(command).await)
    }

    /// Clears the recording flag only if every instance acknowledged the
    /// pause send (spec §4.8).
    pub async fn pause(&self) -> HashMap<InstanceId, bool> {
        let results = self.dispatch(Command::new(CommandKind::Pause)).await;
        if !results.is_empty() && results.values().all(|sent| *sent) {
            *self.recording.lock().await = false;
        }
        results
    }

    pub async fn is_recording(&self) -> bool {
        *self.recording.lock().await
    }

    async fn eligible_instances(&self) -> Vec<InstanceId> {
        let mut eligible = Vec::new();
        for iid in self.supervisor.running_instances() {
            if let Some(info) = self.instances.info(&iid).await {
                if matches!(info.state, InstanceState::Running | InstanceState::Connected) {
                    eligible.push(iid);
                }
            }
        }
        eligible
    }

    async fn dispatch(&self, command: Command) -> HashMap<InstanceId, bool> {
        let eligible = self.eligible_instances().await;
        let sends = eligible.into_iter().map(|iid| {
            let command = command.clone();
            let supervisor = Arc::clone(&self.supervisor);
            async move {
                let sent = supervisor.send(&iid, &command);
                (iid, sent)
            }
        });
        futures::future::join_all(sends).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn shell_script(script: &str) -> (tempfile::NamedTempFile, orchestrator_process_supervisor::SpawnSpec) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#!/bin/sh\n{script}").unwrap();
        let path = file.path().to_path_buf();
        std::fs::set_permissions(&path, std::os::unix::fs::PermissionsExt::from_mode(0o755)).unwrap();
        let spec = orchestrator_process_supervisor::SpawnSpec {
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

    async fn running_instance(manager: &Arc<InstanceManager>, id: &str) -> InstanceId {
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let iid = InstanceId::singleton(id);
        manager.start_instance(iid.clone(), id, None, false, &spec).await.unwrap();
        assert!(manager.wait_for_ready(&iid, std::time::Duration::from_secs(2)).await);
        iid
    }

    fn new_controller() -> (Arc<SessionController>, Arc<InstanceManager>) {
        let (supervisor, events) = ProcessSupervisor::new();
        let supervisor = Arc::new(supervisor);
        let manager = Arc::new(InstanceManager::new(Arc::clone(&supervisor)));
        tokio::spawn(Arc::clone(&manager).run_event_loop(events));
        let controller = Arc::new(SessionController::new(Arc::clone(&supervisor), Arc::clone(&manager)));
        (controller, manager)
    }

    #[tokio::test]
    async fn start_session_reaches_every_running_instance() {
        let (controller, manager) = new_controller();
        let a = running_instance(&manager, "A").await;
        let b = running_instance(&manager, "B").await;
        let results = controller.start_session().await;
        assert_eq!(results.get(&a), Some(&true));
        assert_eq!(results.get(&b), Some(&true));
        manager.stop_instance(&a).await;
        manager.stop_instance(&b).await;
    }

    #[tokio::test]
    async fn record_rejects_a_second_call_while_already_recording() {
        let (controller, manager) = new_controller();
        let a = running_instance(&manager, "C").await;
        let first = controller.record(1, "trial-1", Path::new("/tmp/session")).await;
        assert!(first.is_ok());
        let second = controller.record(2, "trial-2", Path::new("/tmp/session")).await;
        assert!(matches!(second, Err(SessionError::AlreadyRecording)));
        manager.stop_instance(&a).await;
    }

    #[tokio::test]
    async fn pause_clears_recording_flag_once_every_instance_acks() {
        let (controller, manager) = new_controller();
        let a = running_instance(&manager, "D").await;
        controller.record(1, "trial-1", Path::new("/tmp/session")).await.unwrap();
        assert!(controller.is_recording().await);
        controller.pause().await;
        assert!(!controller.is_recording().await);
        manager.stop_instance(&a).await;
    }
}
