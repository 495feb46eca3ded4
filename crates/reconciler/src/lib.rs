//! Module-granularity desired-vs-actual reconciliation (spec §4.7,
//! component C7): keeps configured enablement, on-disk config, and UI
//! checkboxes in sync with what is actually running.

mod event;
mod observer;
mod reconciler;
mod state;

pub use event::{FieldValue, ReconcilerEventKind, StateChange};
pub use observer::{ConfigPersistenceObserver, EnabledConfigWriter, ReconcilerObserver, UiCheckboxSync, UiObserver};
pub use reconciler::ModuleReconciler;
pub use state::{is_state_consistent, ActualState};
