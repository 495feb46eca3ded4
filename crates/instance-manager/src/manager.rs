use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use orchestrator_core::{InstanceId, Timestamp};
use orchestrator_process_supervisor::{ProcessSupervisor, SpawnSpec, SupervisorEvent};
use orchestrator_protocol::{command_id, Command, Status, StatusKind};

use crate::error::{ManagerError, Result};
use crate::info::InstanceInfo;
use crate::observer::{Observer, StateChange, UiCallback, UiState};
use crate::pending::PendingConnection;
use crate::state::InstanceState;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MONITOR_INTERVAL: Duration = Duration::from_millis(500);

struct ManagerState {
    instances: HashMap<InstanceId, InstanceInfo>,
    pending: HashMap<InstanceId, PendingConnection>,
}

/// The instance lifecycle state machine (spec §4.5, component C5 — "the
/// core's core"). Owns every `InstanceInfo`, every in-flight
/// `PendingConnection`, the observer list, and the retry/timeout monitor.
///
/// All mutation funnels through `set_state`; everything else here is
/// either a read of the current snapshot or a request forwarded to the
/// `ProcessSupervisor`. The teacher's per-service `Supervisor::change_state`
/// is the same shape, generalized here to a table-validated transition and
/// an observer fan-out instead of a two-value up/down flag.
pub struct InstanceManager {
    supervisor: Arc<ProcessSupervisor>,
    state: Mutex<ManagerState>,
    observers: Mutex<Vec<Box<dyn Observer>>>,
    ui_callback: Mutex<Option<UiCallback>>,
}

impl InstanceManager {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        InstanceManager {
            supervisor,
            state: Mutex::new(ManagerState {
                instances: HashMap::new(),
                pending: HashMap::new(),
            }),
            observers: Mutex::new(Vec::new()),
            ui_callback: Mutex::new(None),
        }
    }

    pub async fn register_observer(&self, observer: impl Observer + 'static) {
        self.observers.lock().await.push(Box::new(observer));
    }

    pub async fn set_ui_callback(&self, callback: UiCallback) {
        *self.ui_callback.lock().await = Some(callback);
    }

    pub async fn info(&self, iid: &InstanceId) -> Option<InstanceInfo> {
        self.state.lock().await.instances.get(iid).cloned()
    }

    pub async fn running_instance_ids(&self) -> Vec<InstanceId> {
        self.state.lock().await.instances.keys().cloned().collect()
    }

    /// Spec §4.5: reject duplicates unless the existing instance is
    /// STOPPING (wait up to 5s) or STOPPED (reset and reuse).
    pub async fn start_instance(
        &self,
        iid: InstanceId,
        module_id: &str,
        device_id: Option<String>,
        is_internal: bool,
        spec: &SpawnSpec,
    ) -> Result<bool> {
        loop {
            let current = {
                let guard = self.state.lock().await;
                guard.instances.get(&iid).map(|info| info.state)
            };
            match current {
                None | Some(InstanceState::Stopped) => break,
                Some(InstanceState::Stopping) => {
                    if !self
                        .wait_for_state(&iid, Duration::from_secs(5), |s| s == InstanceState::Stopped)
                        .await
                    {
                        return Err(ManagerError::DuplicateInstance(iid.to_string()));
                    }
                }
                Some(_) => return Err(ManagerError::DuplicateInstance(iid.to_string())),
            }
        }

        {
            let mut guard = self.state.lock().await;
            let mut info = InstanceInfo::new(iid.clone(), module_id.to_string(), device_id);
            info.is_internal = is_internal;
            guard.instances.insert(iid.clone(), info);
            guard.pending.remove(&iid);
        }
        self.set_state(&iid, InstanceState::Starting, None).await;

        match self.supervisor.spawn(iid.clone(), module_id, spec) {
            Ok(()) => Ok(true),
            Err(source) => {
                log::warn!("spawn failed for {iid}: {source}");
                self.set_state(&iid, InstanceState::Stopped, Some(source.to_string()))
                    .await;
                Err(ManagerError::Spawn {
                    instance_id: iid.to_string(),
                    source,
                })
            }
        }
    }

    /// Polls until RUNNING/CONNECTED (or just CONNECTED for internal
    /// modules), or returns false on STOPPED/timeout (spec §4.5).
    pub async fn wait_for_ready(&self, iid: &InstanceId, timeout: Duration) -> bool {
        let internal_only = self
            .state
            .lock()
            .await
            .instances
            .get(iid)
            .map(|info| info.is_internal)
            .unwrap_or(false);
        self.wait_for_state(iid, timeout, |state| {
            if internal_only {
                state == InstanceState::Connected
            } else {
                matches!(state, InstanceState::Running | InstanceState::Connected)
            }
        })
        .await
    }

    /// Requires RUNNING or CONNECTING; creates a `PendingConnection`,
    /// transitions to CONNECTING, sends attempt #1, and returns immediately
    /// — the outcome arrives through `on_status_message` (spec §4.5, §4.6:
    /// "no blocking waits").
    pub async fn connect_device(
        &self,
        iid: &InstanceId,
        command_builder: Box<dyn Fn(u32) -> Command + Send + Sync>,
    ) -> bool {
        let device_id = {
            let guard = self.state.lock().await;
            let Some(info) = guard.instances.get(iid) else {
                return false;
            };
            if !matches!(info.state, InstanceState::Running | InstanceState::Connecting) {
                return false;
            }
            info.device_id.clone().unwrap_or_default()
        };

        {
            let mut guard = self.state.lock().await;
            guard
                .pending
                .insert(iid.clone(), PendingConnection::new(device_id, command_builder));
        }
        self.set_state(iid, InstanceState::Connecting, None).await;
        self.send_assign_attempt(iid).await;
        true
    }

    /// Spec §4.5: cancel pending, → STOPPING, ask for `quit`, wait ≤5s for
    /// STOPPED, force-kill on timeout. Idempotent on an already-STOPPED
    /// instance.
    pub async fn stop_instance(&self, iid: &InstanceId) -> bool {
        let already_settled = {
            let guard = self.state.lock().await;
            matches!(
                guard.instances.get(iid).map(|info| info.state),
                None | Some(InstanceState::Stopped)
            )
        };
        if already_settled {
            return true;
        }

        {
            let mut guard = self.state.lock().await;
            guard.pending.remove(iid);
        }
        self.set_state(iid, InstanceState::Stopping, None).await;
        self.supervisor.stop(iid, Duration::from_secs(5)).await;

        if !self
            .wait_for_state(iid, Duration::from_secs(5), |s| s == InstanceState::Stopped)
            .await
        {
            self.supervisor.kill(iid).await;
            self.force_stopped(iid, Some("stop timed out, force-killed".to_string()))
                .await;
        }
        true
    }

    /// Spec §4.5: "parallel stop" — every matching instance is stopped
    /// concurrently, isolated from one another's failures, the same
    /// gather-with-isolation shape `SessionController`'s fan-out uses.
    pub async fn stop_all_instances_for_module(self: &Arc<Self>, module_id: &str) {
        let ids: Vec<InstanceId> = {
            let guard = self.state.lock().await;
            guard
                .instances
                .values()
                .filter(|info| info.module_id == module_id)
                .map(|info| info.instance_id.clone())
                .collect()
        };
        let stops = ids.into_iter().map(|iid| {
            let this = Arc::clone(self);
            async move { this.stop_instance(&iid).await }
        });
        futures::future::join_all(stops).await;
    }

    /// Event ingress from the supervisor's status channel (spec §4.5).
    pub async fn on_status_message(&self, iid: &InstanceId, status: &Status) {
        match status.kind() {
            StatusKind::Ready => {
                let internal = self
                    .state
                    .lock()
                    .await
                    .instances
                    .get(iid)
                    .map(|info| info.is_internal)
                    .unwrap_or(false);
                let target = if internal {
                    InstanceState::Connected
                } else {
                    InstanceState::Running
                };
                self.set_state(iid, target, None).await;
            }
            StatusKind::DeviceAck => {
                self.clear_pending(iid).await;
                self.set_state(iid, InstanceState::Initializing, None).await;
            }
            StatusKind::DeviceReady => {
                self.clear_pending(iid).await;
                self.set_state(iid, InstanceState::Connected, None).await;
            }
            StatusKind::DeviceError => {
                // Never resend immediately; the monitor loop owns retry
                // timing uniformly (spec §9 open question resolution).
                let exhausted = {
                    let guard = self.state.lock().await;
                    guard
                        .pending
                        .get(iid)
                        .map(|pending| pending.attempts_exhausted())
                        .unwrap_or(true)
                };
                if exhausted {
                    let attempts = self.clear_pending(iid).await;
                    let message = status
                        .error_field()
                        .map(|e| format!("connection failed after {attempts} attempts: {e}"))
                        .unwrap_or_else(|| format!("connection failed after {attempts} attempts"));
                    self.set_state(iid, InstanceState::Running, Some(message)).await;
                }
            }
            StatusKind::DeviceUnassigned => {
                self.set_state(iid, InstanceState::Running, None).await;
            }
            StatusKind::Quitting => {
                self.clear_pending(iid).await;
                let already_stopped = self
                    .state
                    .lock()
                    .await
                    .instances
                    .get(iid)
                    .map(|info| info.state == InstanceState::Stopped)
                    .unwrap_or(true);
                if !already_stopped {
                    self.set_state(iid, InstanceState::Stopping, None).await;
                }
            }
            other => {
                log::debug!("unhandled status '{}' for {iid}", other.wire_name());
            }
        }
    }

    /// Spec §4.5: cancel pending, force → STOPPED. `crashed` (from the
    /// supervisor's `ProcessExited` event) is the crash path the
    /// reconciler watches for (spec §7 "Child crash" row) — it is reported
    /// as-is, regardless of the prior state, since the process exiting
    /// non-zero without a requested shutdown is a crash either way.
    pub async fn on_process_exit(&self, iid: &InstanceId, crashed: bool) {
        let prior = self.clear_pending_silent(iid).await;
        if !matches!(prior, Some(InstanceState::Stopping) | Some(InstanceState::Stopped) | None) {
            log::warn!("{iid} exited unexpectedly from {prior:?}");
        }
        let error_message = crashed.then(|| "process exited unexpectedly".to_string());
        self.set_state_ex(iid, InstanceState::Stopped, error_message, crashed).await;
    }

    /// Runs until the supervisor's event channel closes; meant to be
    /// spawned once per `InstanceManager` instance (spec §4.3: "It
    /// publishes events; InstanceManager subscribes").
    pub async fn run_event_loop(
        self: Arc<Self>,
        mut events: tokio::sync::mpsc::UnboundedReceiver<SupervisorEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                SupervisorEvent::StatusReceived { instance_id, status } => {
                    self.on_status_message(&instance_id, &status).await;
                }
                SupervisorEvent::ProcessExited { instance_id, crashed, .. } => {
                    self.on_process_exit(&instance_id, crashed).await;
                }
                SupervisorEvent::UnrecognizedOutput { instance_id, line } => {
                    log::debug!("{instance_id}: {line}");
                }
            }
        }
    }

    /// The ~500ms retry/timeout monitor (spec §4.5). Runs until
    /// `cancel` resolves — cooperative shutdown, not an abort (spec §5:
    /// "monitor loop is cooperatively cancelled during shutdown").
    pub async fn run_monitor_loop(self: Arc<Self>, mut cancel: tokio::sync::oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(MONITOR_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.monitor_tick().await,
                _ = &mut cancel => break,
            }
        }
    }

    async fn monitor_tick(&self) {
        let due_for_retry: Vec<InstanceId>;
        let exhausted: Vec<InstanceId>;
        let timed_out: Vec<(InstanceId, InstanceState)>;
        {
            let guard = self.state.lock().await;
            due_for_retry = guard
                .pending
                .iter()
                .filter(|(_, pending)| pending.due_for_retry())
                .map(|(iid, _)| iid.clone())
                .collect();
            exhausted = guard
                .pending
                .iter()
                .filter(|(_, pending)| pending.attempts_exhausted() && pending.attempt_timed_out())
                .map(|(iid, _)| iid.clone())
                .collect();
            timed_out = guard
                .instances
                .values()
                .filter(|info| !guard.pending.contains_key(&info.instance_id) && info.is_timed_out())
                .map(|info| (info.instance_id.clone(), info.state))
                .collect();
        }

        for iid in due_for_retry {
            self.send_assign_attempt(&iid).await;
        }
        for iid in exhausted {
            let attempts = self.clear_pending(&iid).await;
            self.set_state(
                &iid,
                InstanceState::Running,
                Some(format!("connection timed out after {attempts} attempts")),
            )
            .await;
        }
        for (iid, state) in timed_out {
            match state {
                InstanceState::Starting => {
                    self.supervisor.kill(&iid).await;
                    self.set_state(&iid, InstanceState::Stopped, Some("start timed out".to_string()))
                        .await;
                }
                InstanceState::Stopping => {
                    self.supervisor.kill(&iid).await;
                    self.set_state(&iid, InstanceState::Stopped, Some("stop timed out".to_string()))
                        .await;
                }
                InstanceState::Disconnecting => {
                    self.set_state(&iid, InstanceState::Running, None).await;
                }
                _ => {}
            }
        }
    }

    async fn send_assign_attempt(&self, iid: &InstanceId) {
        let command = {
            let mut guard = self.state.lock().await;
            let Some(pending) = guard.pending.get_mut(iid) else {
                return;
            };
            pending.attempts += 1;
            pending.last_attempt_at = Timestamp::now();
            let cid = command_id(iid, pending.attempts);
            (pending.command_builder)(pending.attempts).with_command_id(cid)
        };
        self.supervisor.send(iid, &command);
    }

    /// Removes the pending connection if any, returning the attempt count
    /// it had reached (0 if there was none).
    async fn clear_pending(&self, iid: &InstanceId) -> u32 {
        self.state
            .lock()
            .await
            .pending
            .remove(iid)
            .map(|pending| pending.attempts)
            .unwrap_or(0)
    }

    /// Like `clear_pending`, but also reports the instance's state before
    /// the caller commits a transition — used by `on_process_exit`, which
    /// needs the prior state to decide whether a crash happened.
    async fn clear_pending_silent(&self, iid: &InstanceId) -> Option<InstanceState> {
        let mut guard = self.state.lock().await;
        guard.pending.remove(iid);
        guard.instances.get(iid).map(|info| info.state)
    }

    async fn force_stopped(&self, iid: &InstanceId, error_message: Option<String>) {
        {
            let mut guard = self.state.lock().await;
            guard.pending.remove(iid);
        }
        self.set_state(iid, InstanceState::Stopped, error_message).await;
    }

    async fn wait_for_state<F>(&self, iid: &InstanceId, timeout: Duration, success: F) -> bool
    where
        F: Fn(InstanceState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let state = {
                let guard = self.state.lock().await;
                guard.instances.get(iid).map(|info| info.state)
            };
            match state {
                Some(s) if success(s) => return true,
                Some(InstanceState::Stopped) => return false,
                None => return false,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// The single write point (spec §4.5). Delegates to `set_state_ex`
    /// with `crashed = false`; every transition except the supervisor's
    /// unexpected-exit path goes through here.
    async fn set_state(&self, iid: &InstanceId, to: InstanceState, error_message: Option<String>) {
        self.set_state_ex(iid, to, error_message, false).await;
    }

    /// Validates the edge (forcing it with a warning if invalid —
    /// force-transitions are recovery machinery, not a bug), timestamps
    /// the entry, clears or sets `error_message`, fans out to observers in
    /// registration order (each isolated with `catch_unwind` so a
    /// panicking observer cannot skip the rest, spec §4.5/§7), and
    /// dispatches the derived UI state. `crashed` is forwarded verbatim
    /// into the `StateChange` so subscribers can distinguish a real crash
    /// from a deliberate stop that also carries an `error_message`.
    async fn set_state_ex(&self, iid: &InstanceId, to: InstanceState, error_message: Option<String>, crashed: bool) {
        let change = {
            let mut guard = self.state.lock().await;
            let Some(info) = guard.instances.get_mut(iid) else {
                return;
            };
            let from = info.state;
            if from == to {
                return;
            }
            if !from.can_transition_to(to) {
                log::warn!("forcing transition {iid}: {from:?} -> {to:?}");
            }
            info.last_transition = Some((from, to));
            info.state = to;
            info.state_entered_at = Timestamp::now();
            if to == InstanceState::Connected {
                info.error_message = None;
            } else if error_message.is_some() {
                info.error_message = error_message.clone();
            }
            StateChange {
                instance_id: iid.clone(),
                from,
                to,
                error_message,
                crashed,
            }
        };

        for observer in self.observers.lock().await.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                observer.on_state_change(&change)
            }));
            if result.is_err() {
                log::warn!("{iid}: observer panicked on state change, continuing");
            }
        }
        if let Some(callback) = self.ui_callback.lock().await.as_ref() {
            callback(iid, UiState::derive(to));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

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

    fn new_manager() -> Arc<InstanceManager> {
        let (supervisor, events) = ProcessSupervisor::new();
        let manager = Arc::new(InstanceManager::new(Arc::new(supervisor)));
        tokio::spawn(Arc::clone(&manager).run_event_loop(events));
        manager
    }

    #[tokio::test]
    async fn ready_moves_starting_to_running_for_normal_modules() {
        let manager = new_manager();
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let iid = InstanceId::singleton("TEST");
        manager
            .start_instance(iid.clone(), "TEST", None, false, &spec)
            .await
            .unwrap();
        assert!(manager.wait_for_ready(&iid, Duration::from_secs(2)).await);
        assert_eq!(manager.info(&iid).await.unwrap().state, InstanceState::Running);
        manager.stop_instance(&iid).await;
    }

    #[tokio::test]
    async fn ready_moves_starting_to_connected_for_internal_modules() {
        let manager = new_manager();
        let (_guard, spec) = shell_script(r#"echo '{"status":"ready","payload":{}}'; sleep 2"#);
        let iid = InstanceId::singleton("INTERNAL");
        manager
            .start_instance(iid.clone(), "INTERNAL", None, true, &spec)
            .await
            .unwrap();
        assert!(manager.wait_for_ready(&iid, Duration::from_secs(2)).await);
        assert_eq!(manager.info(&iid).await.unwrap().state, InstanceState::Connected);
        manager.stop_instance(&iid).await;
    }

    #[tokio::test]
    async fn duplicate_start_is_rejected_while_not_stopped() {
        let manager = new_manager();
        let (_guard, spec) = shell_script("sleep 2");
        let iid = InstanceId::singleton("DUP");
        manager
            .start_instance(iid.clone(), "DUP", None, false, &spec)
            .await
            .unwrap();
        let result = manager.start_instance(iid.clone(), "DUP", None, false, &spec).await;
        assert!(matches!(result, Err(ManagerError::DuplicateInstance(_))));
        manager.stop_instance(&iid).await;
    }

    #[tokio::test]
    async fn stop_instance_on_unknown_instance_is_idempotent() {
        let manager = new_manager();
        let iid = InstanceId::singleton("NEVER_STARTED");
        assert!(manager.stop_instance(&iid).await);
    }

    #[tokio::test]
    async fn connect_device_is_rejected_before_running() {
        let manager = new_manager();
        let (_guard, spec) = shell_script("sleep 2");
        let iid = InstanceId::singleton("NOTYET");
        manager
            .start_instance(iid.clone(), "NOTYET", None, false, &spec)
            .await
            .unwrap();
        let accepted = manager
            .connect_device(&iid, Box::new(|_attempt| Command::get_status()))
            .await;
        assert!(!accepted);
        manager.stop_instance(&iid).await;
    }

    #[tokio::test]
    async fn monitor_tick_resends_a_due_pending_attempt() {
        let manager = new_manager();
        let iid = InstanceId::singleton("RETRY");
        {
            let mut guard = manager.state.lock().await;
            guard
                .instances
                .insert(iid.clone(), InstanceInfo::new(iid.clone(), "RETRY".to_string(), None));
            guard.instances.get_mut(&iid).unwrap().state = InstanceState::Connecting;
            let mut pending =
                PendingConnection::new("dev".to_string(), Box::new(|_attempt| Command::get_status()));
            pending.attempts = 1;
            pending.per_attempt_timeout = Duration::from_millis(10);
            pending.retry_delay = Duration::from_millis(10);
            guard.pending.insert(iid.clone(), pending);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.monitor_tick().await;
        let attempts_after = manager
            .state
            .lock()
            .await
            .pending
            .get(&iid)
            .map(|pending| pending.attempts);
        assert_eq!(attempts_after, Some(2));
    }

    #[tokio::test]
    async fn monitor_tick_expires_a_pending_that_exhausted_retries() {
        let manager = new_manager();
        let iid = InstanceId::singleton("EXHAUSTED");
        {
            let mut guard = manager.state.lock().await;
            guard
                .instances
                .insert(iid.clone(), InstanceInfo::new(iid.clone(), "EXHAUSTED".to_string(), None));
            guard.instances.get_mut(&iid).unwrap().state = InstanceState::Connecting;
            let mut pending =
                PendingConnection::new("dev".to_string(), Box::new(|_attempt| Command::get_status()));
            pending.attempts = 3;
            pending.per_attempt_timeout = Duration::from_millis(10);
            guard.pending.insert(iid.clone(), pending);
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.monitor_tick().await;
        let guard = manager.state.lock().await;
        assert!(!guard.pending.contains_key(&iid));
        let info = guard.instances.get(&iid).unwrap();
        assert_eq!(info.state, InstanceState::Running);
        assert!(info.error_message.as_ref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn on_process_exit_reports_a_crash_distinctly_from_a_clean_exit() {
        let manager = new_manager();
        let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        manager
            .register_observer(move |change: &StateChange| {
                sink.lock().unwrap().push((change.to, change.crashed, change.error_message.clone()));
            })
            .await;

        let (_guard, spec) = shell_script("sleep 2");
        let iid = InstanceId::singleton("CRASHY");
        manager.start_instance(iid.clone(), "CRASHY", None, false, &spec).await.unwrap();
        manager.on_process_exit(&iid, true).await;

        {
            let changes = observed.lock().unwrap();
            let (to, crashed, error_message) = changes.last().unwrap();
            assert_eq!(*to, InstanceState::Stopped);
            assert!(*crashed);
            assert!(error_message.is_some());
        }
        manager.stop_instance(&iid).await;
    }

    #[tokio::test]
    async fn a_panicking_observer_does_not_block_the_rest() {
        let manager = new_manager();
        let second_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        manager
            .register_observer(|_change: &StateChange| panic!("boom"))
            .await;
        let flag = Arc::clone(&second_ran);
        manager
            .register_observer(move |_change: &StateChange| {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            })
            .await;

        let (_guard, spec) = shell_script("sleep 2");
        let iid = InstanceId::singleton("OBSERVED");
        manager.start_instance(iid.clone(), "OBSERVED", None, false, &spec).await.unwrap();

        assert!(second_ran.load(std::sync::atomic::Ordering::SeqCst));
        manager.stop_instance(&iid).await;
    }
}
