use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read modules directory {path}: {source}")]
    ReadModulesDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read module directory {path}: {source}")]
    ReadModuleDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
