// Abstract debug-adapter surface
//
// The broker core talks to a debuggee exclusively through the traits in
// this crate. A concrete wire backend (e.g. a JDWP client) implements
// them; the `testkit` feature provides a scripted in-memory target for
// exercising the broker without a live VM.

pub mod adapter;
pub mod error;
pub mod events;
pub mod types;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use adapter::{DebugConnector, DebugTarget};
pub use error::{AdapterError, AdapterResult};
pub use events::{Event, EventKind, EventSet};
pub use types::{
    FieldRef, FrameRef, InvokeOutcome, LocalVariable, Location, MethodRef, ObjectId, ObjectRef,
    RequestHandle, RequestId, StepDepth, SuspendPolicy, ThreadId, ThreadRef, TypeRef, Value,
    VmCapabilities, VmDescription,
};
