use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use orchestrator_core::{BoundedQueue, InstanceId};
use orchestrator_protocol::Status;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::{mpsc, Notify};

use crate::error::{Result, SupervisorError};
use crate::events::SupervisorEvent;
use crate::spawn_spec::SpawnSpec;

/// The command queue to a child is small by design (spec §5: "design
/// target ≤64").
const COMMAND_QUEUE_CAPACITY: usize = 64;

const NO_EXIT_CODE_RECORDED: i32 = i32::MIN;

/// A spawned module child process, owned exclusively by `ProcessSupervisor`
/// (spec §3, §4.2). Other components address it only by instance id.
pub struct ChildProcess {
    instance_id: InstanceId,
    pid: u32,
    queue: Arc<BoundedQueue<String>>,
    shutdown_requested: Arc<AtomicBool>,
    forcefully_stopped: Arc<AtomicBool>,
    exited: Arc<Notify>,
    exit_code: Arc<AtomicI32>,
}

impl ChildProcess {
    pub fn spawn(
        instance_id: InstanceId,
        module_id: &str,
        spec: &SpawnSpec,
        events: mpsc::UnboundedSender<SupervisorEvent>,
    ) -> Result<Self> {
        let mut command = TokioCommand::new(&spec.entry_point);
        command
            .args(spec.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
            module_id: module_id.to_string(),
            entry_point: spec.entry_point.display().to_string(),
            source,
        })?;

        let pid = child.id().unwrap_or_default();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let queue = Arc::new(BoundedQueue::new(COMMAND_QUEUE_CAPACITY));
        let shutdown_requested = Arc::new(AtomicBool::new(false));
        let forcefully_stopped = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(Notify::new());
        let exit_code = Arc::new(AtomicI32::new(NO_EXIT_CODE_RECORDED));

        // Single writer task: drains the bounded queue to stdin, flushing
        // after every message (spec §4.2).
        if let Some(mut stdin) = stdin {
            let queue = queue.clone();
            let iid = instance_id.clone();
            tokio::spawn(async move {
                loop {
                    let line = queue.pop().await;
                    if let Err(err) = stdin.write_all(line.as_bytes()).await {
                        debug!("write to {iid} stdin failed (child likely exited): {err}");
                        break;
                    }
                    if let Err(err) = stdin.write_all(b"\n").await {
                        debug!("write to {iid} stdin failed (child likely exited): {err}");
                        break;
                    }
                    if let Err(err) = stdin.flush().await {
                        debug!("flush to {iid} stdin failed (child likely exited): {err}");
                        break;
                    }
                }
            });
        }

        // Stdout reader: one Status per line; unrecognized lines are
        // diagnostic output, never a failure (spec §4.2).
        if let Some(stdout) = stdout {
            let iid = instance_id.clone();
            let events = events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => match Status::from_line(&line) {
                            Some(status) => {
                                let _ = events.send(SupervisorEvent::StatusReceived {
                                    instance_id: iid.clone(),
                                    status,
                                });
                            }
                            None => {
                                debug!("[{iid}] non-status stdout line: {line}");
                                let _ = events.send(SupervisorEvent::UnrecognizedOutput {
                                    instance_id: iid.clone(),
                                    line,
                                });
                            }
                        },
                        Ok(None) => break,
                        Err(err) => {
                            debug!("[{iid}] stdout read error: {err}");
                            break;
                        }
                    }
                }
            });
        }

        // Stderr is free-form log text; the master captures it as warnings
        // (spec §6).
        if let Some(stderr) = stderr {
            let iid = instance_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[{iid}] {line}");
                }
            });
        }

        // Wait task: detects the crash condition (spec §4.2: "Non-zero
        // exit while `shutdown` was not set is a *crash*").
        {
            let iid = instance_id.clone();
            let shutdown_requested = shutdown_requested.clone();
            let exited = exited.clone();
            let exit_code_slot = exit_code.clone();
            let events = events.clone();
            tokio::spawn(async move {
                let status = child.wait().await;
                let code = status.as_ref().ok().and_then(|s| s.code());
                let success = status.map(|s| s.success()).unwrap_or(false);
                let crashed = !success && !shutdown_requested.load(Ordering::SeqCst);
                info!("[{iid}] process exited: code={code:?} crashed={crashed}");
                exit_code_slot.store(code.unwrap_or(NO_EXIT_CODE_RECORDED), Ordering::SeqCst);
                exited.notify_waiters();
                let _ = events.send(SupervisorEvent::ProcessExited {
                    instance_id: iid,
                    exit_code: code,
                    crashed,
                });
            });
        }

        Ok(ChildProcess {
            instance_id,
            pid,
            queue,
            shutdown_requested,
            forcefully_stopped,
            exited,
            exit_code,
        })
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn forcefully_stopped(&self) -> bool {
        self.forcefully_stopped.load(Ordering::SeqCst)
    }

    pub fn dropped_command_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    fn has_exited(&self) -> bool {
        self.exit_code.load(Ordering::SeqCst) != NO_EXIT_CODE_RECORDED
    }

    async fn wait_exited(&self) {
        while !self.has_exited() {
            self.exited.notified().await;
        }
    }

    /// Enqueues `line` for the writer task. Idempotent w.r.t. a running
    /// child; the queue drops the oldest entry on overflow rather than
    /// blocking (spec §4.2, §5).
    pub fn send(&self, line: String) -> bool {
        if self.has_exited() {
            return false;
        }
        self.queue.push(line);
        true
    }

    /// Sends `quit`, waits `timeout` for exit, escalates to SIGTERM, then
    /// SIGKILL (spec §4.2, §5: "A `quit` that is not acknowledged within 5s
    /// escalates to OS terminate; a further 2s escalates to OS kill").
    pub async fn stop(&self, quit_line: String, timeout: Duration) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.send(quit_line);

        if tokio::time::timeout(timeout, self.wait_exited()).await.is_ok() {
            return;
        }

        warn!(
            "[{}] did not exit within {:?} of quit, escalating to terminate",
            self.instance_id, timeout
        );
        self.forcefully_stopped.store(true, Ordering::SeqCst);
        self.terminate();

        if tokio::time::timeout(Duration::from_secs(2), self.wait_exited())
            .await
            .is_ok()
        {
            return;
        }

        warn!(
            "[{}] did not exit after terminate, escalating to kill",
            self.instance_id
        );
        self.kill();
        self.wait_exited().await;
    }

    /// Unconditional, immediate kill (no escalation wait).
    pub async fn kill_immediately(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.forcefully_stopped.store(true, Ordering::SeqCst);
        self.kill();
        self.wait_exited().await;
    }

    #[cfg(unix)]
    fn terminate(&self) {
        send_signal(self.pid, nix::sys::signal::Signal::SIGTERM);
    }

    #[cfg(not(unix))]
    fn terminate(&self) {
        self.kill();
    }

    #[cfg(unix)]
    fn kill(&self) {
        send_signal(self.pid, nix::sys::signal::Signal::SIGKILL);
    }

    #[cfg(not(unix))]
    fn kill(&self) {
        // best-effort: no windows TerminateProcess wiring in this build,
        // see SPEC_FULL.md's "windows/unix process-kill split".
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::unistd::Pid;
    if let Err(err) = nix::sys::signal::kill(Pid::from_raw(pid as i32), signal) {
        debug!("signal {signal:?} to pid {pid} failed (process likely already gone): {err}");
    }
}
