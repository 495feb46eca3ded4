use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("device {0} does not resolve to a known module")]
    UnknownDevice(String),
    #[error("failed to start instance for device {device_id}: {source}")]
    Start {
        device_id: String,
        #[source]
        source: orchestrator_instance_manager::ManagerError,
    },
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
