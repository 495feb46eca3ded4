use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn module process {module_id} ({entry_point}): {source}")]
    Spawn {
        module_id: String,
        entry_point: String,
        #[source]
        source: std::io::Error,
    },
    #[error("child process for instance {0} has no stdin pipe")]
    MissingStdin(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
