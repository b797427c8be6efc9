// Broker error taxonomy
//
// Every tool handler renders these as an isError text envelope; nothing
// here ever reaches the JSON-RPC error channel.

use debug_adapter::AdapterError;
use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("Not connected to a VM. Use debug_launch or debug_attach_socket first.")]
    NotConnected,

    #[error("Already connected to a VM. Disconnect first.")]
    AlreadyConnected,

    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("No free local port available")]
    PortUnavailable,

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Field '{field}' not found in {class}")]
    FieldNotFound { class: String, field: String },

    #[error("Method '{method}' not found in {class}")]
    MethodNotFound { class: String, method: String },

    #[error("No code at line {line} in {class}")]
    NoCodeAtLine { class: String, line: i32 },

    #[error("{0} is not a Throwable")]
    NotThrowable(String),

    #[error("Debug info not available. Compile with -g.")]
    NoDebugInfo,

    #[error("Thread not found with ID: {0}")]
    ThreadNotFound(u64),

    #[error("Thread {0} is not suspended. Suspend the VM or wait for a stop first.")]
    ThreadNotSuspended(u64),

    #[error("Frame index {index} out of range (max: {max})")]
    FrameOutOfRange { index: usize, max: usize },

    #[error("Current frame is native code; stepping is not possible")]
    NativeFrame,

    #[error("No object with ID {0} found in any suspended frame")]
    ObjectNotFound(u64),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("NullPointerException: cannot access '{0}' on null")]
    NullDereference(String),

    #[error("Ambiguous overload: {0}")]
    OverloadAmbiguous(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invocation threw {exception_type} (object @{exception_id})")]
    Thrown {
        exception_type: String,
        exception_id: u64,
    },

    #[error("VM does not support {0}")]
    CapabilityMissing(String),

    #[error("Timed out")]
    Timeout,

    #[error("VM disconnected")]
    VmDisconnected,

    #[error("Interrupted")]
    Interrupted,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdapterError> for DebugError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Launch(msg) => DebugError::Launch(msg),
            AdapterError::Connect(msg) => DebugError::Connect(msg),
            AdapterError::Disconnected => DebugError::VmDisconnected,
            AdapterError::NoDebugInfo => DebugError::NoDebugInfo,
            AdapterError::ThreadNotSuspended(id) => DebugError::ThreadNotSuspended(id),
            AdapterError::InvalidFrame => DebugError::FrameOutOfRange { index: 0, max: 0 },
            AdapterError::InvalidObject(id) => DebugError::ObjectNotFound(id),
            AdapterError::Unsupported(what) => DebugError::CapabilityMissing(what),
            AdapterError::Io(e) => DebugError::Internal(e.to_string()),
            AdapterError::Protocol(msg) => DebugError::Internal(msg),
        }
    }
}
