use crate::event::{ReconcilerEventKind, StateChange};

/// Registered against `ModuleReconciler`'s fan-out. `interested_in` is the
/// optional event filter spec §4.7 describes; the default accepts
/// everything.
pub trait ReconcilerObserver: Send + Sync {
    fn interested_in(&self, _event: ReconcilerEventKind) -> bool {
        true
    }

    fn on_change(&self, change: &StateChange);
}

/// Syncs a UI checkbox to desired state, clearing it on crash (spec §4.7
/// "Observers used in practice" / S4). The UI-thread marshaling the spec
/// calls for is the caller's responsibility — `set_checked` is expected to
/// already run on the right thread/executor.
pub trait UiCheckboxSync: Send + Sync {
    fn set_checked(&self, module: &str, checked: bool);
}

pub struct UiObserver<T> {
    sync: T,
}

impl<T: UiCheckboxSync> UiObserver<T> {
    pub fn new(sync: T) -> Self {
        UiObserver { sync }
    }
}

impl<T: UiCheckboxSync> ReconcilerObserver for UiObserver<T> {
    fn interested_in(&self, event: ReconcilerEventKind) -> bool {
        matches!(
            event,
            ReconcilerEventKind::DesiredStateChanged | ReconcilerEventKind::CrashDetected
        )
    }

    fn on_change(&self, change: &StateChange) {
        match change.event {
            ReconcilerEventKind::DesiredStateChanged => {
                if let Some(crate::event::FieldValue::Desired(enabled)) = change.new {
                    self.sync.set_checked(&change.module, enabled);
                }
            }
            ReconcilerEventKind::CrashDetected => {
                self.sync.set_checked(&change.module, false);
            }
            _ => {}
        }
    }
}

/// Writes `enabled=<bool>` to the module's config file under a single
/// writer lock (spec §4.7, §5 "Config files: writes are serialized by a
/// module-local writer lock held by the persistence observer").
pub trait EnabledConfigWriter: Send + Sync {
    fn write_enabled(&self, module: &str, enabled: bool);
}

pub struct ConfigPersistenceObserver<T> {
    writer: T,
}

impl<T: EnabledConfigWriter> ConfigPersistenceObserver<T> {
    pub fn new(writer: T) -> Self {
        ConfigPersistenceObserver { writer }
    }
}

impl<T: EnabledConfigWriter> ReconcilerObserver for ConfigPersistenceObserver<T> {
    fn interested_in(&self, event: ReconcilerEventKind) -> bool {
        matches!(event, ReconcilerEventKind::DesiredStateChanged)
    }

    fn on_change(&self, change: &StateChange) {
        if let Some(crate::event::FieldValue::Desired(enabled)) = change.new {
            self.writer.write_enabled(&change.module, enabled);
        }
    }
}
