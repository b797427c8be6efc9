// Adapter error taxonomy
//
// Failures raised by a concrete wire backend. The broker maps these into
// its own tool-facing error kinds.

use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("launch failed: {0}")]
    Launch(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("target disconnected")]
    Disconnected,

    #[error("no debug information available")]
    NoDebugInfo,

    #[error("thread {0} is not suspended")]
    ThreadNotSuspended(u64),

    #[error("invalid frame")]
    InvalidFrame,

    #[error("invalid object reference {0}")]
    InvalidObject(u64),

    #[error("operation not supported by target: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}
