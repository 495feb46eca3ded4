//! The instance lifecycle state machine (spec §4.5, components C1 and C5):
//! owns every `(module, device)` pair's transitions and the assign/ack
//! retry monitor.

mod error;
mod info;
mod manager;
mod observer;
mod pending;
mod state;

pub use error::{ManagerError, Result};
pub use info::InstanceInfo;
pub use manager::InstanceManager;
pub use observer::{Observer, StateChange, UiCallback, UiState};
pub use pending::PendingConnection;
pub use state::InstanceState;
