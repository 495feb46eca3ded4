use std::path::{Path, PathBuf};
use std::sync::Arc;

use orchestrator_device_coordinator::{DeviceConfig, DeviceCoordinator};
use orchestrator_instance_manager::{InstanceManager, InstanceState};
use orchestrator_module_registry::{ModuleInfo, ModuleRegistry};
use orchestrator_process_supervisor::{ProcessSupervisor, SpawnSpec};
use orchestrator_reconciler::{ActualState, ConfigPersistenceObserver, ModuleReconciler};
use orchestrator_session_controller::SessionController;
use orchestrator_shutdown::ShutdownCoordinator;

use crate::cli::Cli;
use crate::collaborators::{ConfigStore, LoggingHardware, ModuleDirectory};

/// Wires every component together for one process lifetime (spec §6
/// "Master CLI", component table in SPEC_FULL.md §0).
pub struct Orchestrator {
    pub instances: Arc<InstanceManager>,
    pub reconciler: Arc<ModuleReconciler>,
    pub coordinator: Arc<DeviceCoordinator>,
    pub sessions: Arc<SessionController>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub modules: Vec<ModuleInfo>,
    config_store: Arc<ConfigStore>,
    data_dir: PathBuf,
    session_prefix: String,
    log_level: String,
    console: bool,
    monitor_cancel: tokio::sync::Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl Orchestrator {
    pub async fn bootstrap(cli: &Cli) -> anyhow::Result<Arc<Orchestrator>> {
        std::fs::create_dir_all(&cli.data_dir)?;
        let modules_dir = cli.data_dir.join("modules");
        let config_dir = cli.data_dir.join("config");
        std::fs::create_dir_all(&modules_dir)?;
        std::fs::create_dir_all(&config_dir)?;

        let registry = ModuleRegistry::new(modules_dir.clone(), config_dir.clone());
        let modules = registry.discover().unwrap_or_else(|err| {
            log::warn!("module discovery failed: {err}");
            Vec::new()
        });

        let (supervisor, events) = ProcessSupervisor::new();
        let supervisor = Arc::new(supervisor);
        let instances = Arc::new(InstanceManager::new(Arc::clone(&supervisor)));
        tokio::spawn(Arc::clone(&instances).run_event_loop(events));

        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(Arc::clone(&instances).run_monitor_loop(cancel_rx));

        let reconciler = Arc::new(ModuleReconciler::new());
        let config_store = Arc::new(ConfigStore::new(&modules));
        reconciler
            .register_observer(ConfigPersistenceObserver::new(Arc::clone(&config_store)))
            .await;

        let directory = Arc::new(ModuleDirectory::new(modules.clone()));
        let coordinator = Arc::new(DeviceCoordinator::new(
            directory,
            Arc::clone(&config_store) as Arc<dyn DeviceConfig>,
            Arc::new(LoggingHardware),
            Arc::clone(&instances),
        ));

        let sessions = Arc::new(SessionController::new(Arc::clone(&supervisor), Arc::clone(&instances)));
        let shutdown = Arc::new(ShutdownCoordinator::new());

        let app = Arc::new(Orchestrator {
            instances,
            reconciler,
            coordinator,
            sessions,
            shutdown,
            modules,
            config_store,
            data_dir: cli.data_dir.clone(),
            session_prefix: cli.session_prefix.clone(),
            log_level: cli.log_level.as_str().to_string(),
            console: cli.console_enabled(),
            monitor_cancel: tokio::sync::Mutex::new(Some(cancel_tx)),
        });

        app.install_shutdown_hooks().await;
        app.bridge_actual_state();
        Ok(app)
    }

    /// Starts every module whose persisted config has `enabled = true`
    /// (spec §4.7 "Startup"), and marks them as the startup set so
    /// `ModuleReconciler::check_startup_complete` can report readiness.
    pub async fn start_enabled_modules(&self) {
        let enabled: Vec<&ModuleInfo> = self
            .modules
            .iter()
            .filter(|m| self.config_store.is_enabled(&m.module_id))
            .collect();
        self.reconciler
            .mark_startup_modules(enabled.iter().map(|m| m.module_id.clone()))
            .await;

        for module in enabled {
            self.reconciler.set_desired_state(&module.module_id, true, false).await;
            let spec = self.spawn_spec_for(module);
            match self.coordinator.connect_and_start(&module.module_id, spec).await {
                Ok(true) => log::info!("module {} started", module.module_id),
                Ok(false) => log::warn!("module {} did not reach ready in time", module.module_id),
                Err(err) => log::warn!("module {} failed to start: {err}", module.module_id),
            }
        }

        self.coordinator
            .load_pending_auto_connects(&self.modules, |module_id| self.config_store.is_enabled(module_id));
    }

    /// Looks up a discovered module by id and builds its spawn spec, for
    /// callers (the interactive command loop) that only have a device id
    /// string in hand.
    pub fn spawn_spec_for_id(&self, module_id: &str) -> Option<SpawnSpec> {
        let module = self.modules.iter().find(|m| m.module_id == module_id)?;
        Some(self.spawn_spec_for(module))
    }

    fn spawn_spec_for(&self, module: &ModuleInfo) -> SpawnSpec {
        SpawnSpec {
            entry_point: module.entry_point.clone(),
            mode: "headless".to_string(),
            output_dir: self.data_dir.clone(),
            session_prefix: self.session_prefix.clone(),
            log_level: self.log_level.clone(),
            no_console: !self.console,
            window_geometry: None,
            extra_args: Vec::new(),
        }
    }

    /// Bridges `InstanceManager` transitions into `ModuleReconciler`'s
    /// actual-state tracking (spec §4.7: "Actual state mirrors instance
    /// state via InstanceManager observer hooks").
    fn bridge_actual_state(self: &Arc<Self>) {
        let reconciler = Arc::clone(&self.reconciler);
        let instances = Arc::clone(&self.instances);
        tokio::spawn(async move {
            instances
                .register_observer(move |change: &orchestrator_instance_manager::StateChange| {
                    let reconciler = Arc::clone(&reconciler);
                    let module = change.instance_id.module_id().to_string();
                    let to = change.to;
                    let crashed = change.crashed;
                    let error = change.error_message.clone();
                    tokio::spawn(async move {
                        let actual = match to {
                            InstanceState::Stopped if crashed => ActualState::Crashed,
                            InstanceState::Stopped => ActualState::Stopped,
                            InstanceState::Starting | InstanceState::Connecting => ActualState::Starting,
                            InstanceState::Initializing => ActualState::Initializing,
                            InstanceState::Running | InstanceState::Connected => ActualState::Idle,
                            InstanceState::Stopping | InstanceState::Disconnecting => ActualState::Stopping,
                        };
                        reconciler.set_actual_state(&module, actual, error.as_deref()).await;
                    });
                })
                .await;
        });
    }

    async fn install_shutdown_hooks(self: &Arc<Self>) {
        let instances = Arc::clone(&self.instances);
        self.shutdown
            .register_cleanup("stop all instances", move || {
                let instances = Arc::clone(&instances);
                async move {
                    for iid in instances.running_instance_ids().await {
                        instances.stop_instance(&iid).await;
                    }
                }
            })
            .await;

        let app = Arc::clone(self);
        self.shutdown
            .register_cleanup("cancel monitor loop", move || {
                let app = Arc::clone(&app);
                async move {
                    if let Some(tx) = app.monitor_cancel.lock().await.take() {
                        let _ = tx.send(());
                    }
                }
            })
            .await;
    }

    pub fn session_output_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}_pending", self.session_prefix))
    }

    pub async fn is_stopped(&self, device_id: &str) -> bool {
        self.instances
            .running_instance_ids()
            .await
            .iter()
            .all(|id| id.module_id() != device_id)
    }
}

/// Creates the `<prefix>_<YYYYMMDD_HHMMSS>` session directory lazily, per
/// spec §6 "Session layout on disk". Timestamp formatting avoided here
/// since the workspace does not depend on `chrono`/`time`; callers that
/// need the literal directory name pass it in from whatever clock source
/// they already have (the CLI's own process start time).
pub fn session_directory(data_dir: &Path, session_prefix: &str, timestamp_suffix: &str) -> PathBuf {
    data_dir.join(format!("{session_prefix}_{timestamp_suffix}"))
}
