//! Shared primitives used across the orchestrator workspace: instance ids,
//! monotonic timestamps, and the flat config file format (spec §3, §4.4,
//! §9 "Configuration as data").

mod config;
mod instance_id;
mod platform;
mod queue;
mod timestamp;

pub use config::{ConfigError, FlatConfig};
pub use instance_id::InstanceId;
pub use platform::{current_platform, matches_current_platform};
pub use queue::BoundedQueue;
pub use timestamp::Timestamp;
