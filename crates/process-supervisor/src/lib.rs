//! Spawns module child processes and multiplexes the line-delimited JSON
//! protocol on their stdin/stdout (spec §4.2, §4.3 — components C2, C4).

mod child_process;
mod error;
mod events;
mod spawn_spec;
mod supervisor;

pub use error::{Result, SupervisorError};
pub use events::SupervisorEvent;
pub use spawn_spec::SpawnSpec;
pub use supervisor::ProcessSupervisor;
