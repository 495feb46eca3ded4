use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
}

pub type Result<T> = std::result::Result<T, SessionError>;
