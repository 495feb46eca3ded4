use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("instance {0} already exists and is not STOPPED")]
    DuplicateInstance(String),
    #[error("failed to spawn instance {instance_id}: {source}")]
    Spawn {
        instance_id: String,
        #[source]
        source: orchestrator_process_supervisor::SupervisorError,
    },
}

pub type Result<T> = std::result::Result<T, ManagerError>;
