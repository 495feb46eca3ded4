use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use orchestrator_core::Timestamp;

use crate::event::{FieldValue, ReconcilerEventKind, StateChange};
use crate::observer::ReconcilerObserver;
use crate::state::ActualState;

#[derive(Debug, Clone, Copy)]
struct ModuleRecord {
    desired_enabled: bool,
    actual: ActualState,
    crash_count: u32,
}

impl Default for ModuleRecord {
    fn default() -> Self {
        ModuleRecord {
            desired_enabled: false,
            actual: ActualState::Stopped,
            crash_count: 0,
        }
    }
}

/// Module-granularity desired-vs-actual controller (spec §4.7, component
/// C7). Separate from `InstanceManager`: it tracks user intent per module,
/// not per-device lifecycle detail.
pub struct ModuleReconciler {
    modules: Mutex<HashMap<String, ModuleRecord>>,
    observers: Mutex<Vec<Box<dyn ReconcilerObserver>>>,
    startup_modules: Mutex<HashSet<String>>,
}

impl ModuleReconciler {
    pub fn new() -> Self {
        ModuleReconciler {
            modules: Mutex::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
            startup_modules: Mutex::new(HashSet::new()),
        }
    }

    pub async fn register_observer(&self, observer: impl ReconcilerObserver + 'static) {
        self.observers.lock().await.push(Box::new(observer));
    }

    /// Populates the startup-tracking set when persisted desired state is
    /// first loaded (spec §4.7 "Startup tracking").
    pub async fn mark_startup_modules(&self, modules: impl IntoIterator<Item = String>) {
        let mut set = self.startup_modules.lock().await;
        set.extend(modules);
    }

    pub async fn desired_state(&self, module: &str) -> bool {
        self.modules
            .lock()
            .await
            .get(module)
            .map(|record| record.desired_enabled)
            .unwrap_or(false)
    }

    pub async fn actual_state(&self, module: &str) -> ActualState {
        self.modules
            .lock()
            .await
            .get(module)
            .map(|record| record.actual)
            .unwrap_or(ActualState::Stopped)
    }

    pub async fn crash_count(&self, module: &str) -> u32 {
        self.modules
            .lock()
            .await
            .get(module)
            .map(|record| record.crash_count)
            .unwrap_or(0)
    }

    /// Spec §4.7 `SetDesiredState`. The per-module lock is the shared
    /// `modules` mutex held for the whole read-modify-write — coarse
    /// relative to a true per-key lock, but `SetDesiredState` only ever
    /// does a short map mutation, so contention between modules is
    /// negligible and correctness (serializing clicks against
    /// reconciliation for the *same* module) is what the spec requires.
    pub async fn set_desired_state(&self, module: &str, enabled: bool, reconcile: bool) {
        let (old_enabled, mismatch) = {
            let mut guard = self.modules.lock().await;
            let record = guard.entry(module.to_string()).or_insert_with(ModuleRecord::default);
            let old = record.desired_enabled;
            record.desired_enabled = enabled;
            let mismatch = reconcile && old != enabled && enabled != record.actual.is_running_state();
            (old, mismatch)
        };
        self.emit(
            ReconcilerEventKind::DesiredStateChanged,
            module,
            Some(FieldValue::Desired(old_enabled)),
            Some(FieldValue::Desired(enabled)),
        )
        .await;
        if mismatch {
            let kind = if enabled {
                ReconcilerEventKind::StartRequested
            } else {
                ReconcilerEventKind::StopRequested
            };
            self.emit(kind, module, None, None).await;
        }
    }

    /// Spec §4.7 `SetActualState`.
    pub async fn set_actual_state(&self, module: &str, state: ActualState, error: Option<&str>) {
        if let Some(error) = error {
            log::warn!("{module}: actual state -> {state:?}: {error}");
        }
        let (old, crash_count) = {
            let mut guard = self.modules.lock().await;
            let record = guard.entry(module.to_string()).or_insert_with(ModuleRecord::default);
            let old = record.actual;
            record.actual = state;
            if state == ActualState::Crashed {
                record.crash_count += 1;
            }
            (old, record.crash_count)
        };
        self.emit(
            ReconcilerEventKind::ActualStateChanged,
            module,
            Some(FieldValue::Actual(old)),
            Some(FieldValue::Actual(state)),
        )
        .await;
        if state == ActualState::Crashed {
            self.emit(
                ReconcilerEventKind::CrashDetected,
                module,
                None,
                Some(FieldValue::CrashCount(crash_count)),
            )
            .await;
        }
        if state.is_stopped_state() && self.all_modules_stopped().await {
            self.emit(ReconcilerEventKind::AllModulesStopped, module, None, None).await;
        }
    }

    async fn all_modules_stopped(&self) -> bool {
        self.modules
            .lock()
            .await
            .values()
            .all(|record| record.actual.is_stopped_state())
    }

    /// Spec §4.7 "Startup tracking": declares completion when every
    /// startup module has left STARTING; success iff none ended stopped.
    pub async fn check_startup_complete(&self) -> Option<bool> {
        let startup = self.startup_modules.lock().await;
        if startup.is_empty() {
            return None;
        }
        let guard = self.modules.lock().await;
        let states: Vec<ActualState> = startup
            .iter()
            .map(|module| guard.get(module).map(|record| record.actual).unwrap_or(ActualState::Stopped))
            .collect();
        drop(guard);
        drop(startup);

        if states.iter().any(|state| *state == ActualState::Starting) {
            return None;
        }
        let success = states.iter().all(|state| !state.is_stopped_state());
        self.emit_global(ReconcilerEventKind::StartupComplete, Some(FieldValue::Success(success)))
            .await;
        Some(success)
    }

    async fn emit(&self, event: ReconcilerEventKind, module: &str, old: Option<FieldValue>, new: Option<FieldValue>) {
        let change = StateChange {
            event,
            module: module.to_string(),
            old,
            new,
            timestamp: Timestamp::now(),
        };
        for observer in self.observers.lock().await.iter() {
            if observer.interested_in(event) {
                observer.on_change(&change);
            }
        }
    }

    async fn emit_global(&self, event: ReconcilerEventKind, new: Option<FieldValue>) {
        let change = StateChange {
            event,
            module: String::new(),
            old: None,
            new,
            timestamp: Timestamp::now(),
        };
        for observer in self.observers.lock().await.iter() {
            if observer.interested_in(event) {
                observer.on_change(&change);
            }
        }
    }
}

impl Default for ModuleReconciler {
    fn default() -> Self {
        Self::new()
    }
}
