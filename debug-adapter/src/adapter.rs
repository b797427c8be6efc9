// Adapter capability surface
//
// The broker performs every operation on the debuggee through these two
// traits. A concrete wire backend (JDWP or otherwise) implements them;
// the scripted testkit target implements them in memory.

use crate::error::AdapterResult;
use crate::events::EventSet;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for establishing a target connection.
#[async_trait]
pub trait DebugConnector: Send + Sync {
    async fn connect_socket(&self, host: &str, port: u16) -> AdapterResult<Arc<dyn DebugTarget>>;

    async fn connect_pid(&self, pid: u32) -> AdapterResult<Arc<dyn DebugTarget>>;

    /// Command line the broker spawns for a debug launch. The debuggee
    /// must listen for a socket attach on `127.0.0.1:port`.
    fn launch_command(
        &self,
        main_class: &str,
        classpath: Option<&str>,
        extra_args: &[String],
        port: u16,
        suspend: bool,
    ) -> Vec<String>;
}

/// A live connection to a debuggee.
///
/// All methods take `&self`; implementations are internally synchronized.
#[async_trait]
pub trait DebugTarget: Send + Sync {
    /// Tear down the connection. Idempotent; swallows wire errors.
    async fn dispose(&self);

    async fn vm_description(&self) -> AdapterResult<VmDescription>;

    // Symbol lookup

    async fn classes_by_name(&self, name: &str) -> AdapterResult<Vec<TypeRef>>;

    async fn loaded_class_count(&self) -> AdapterResult<usize>;

    async fn field_by_name(&self, type_ref: &TypeRef, name: &str)
        -> AdapterResult<Option<FieldRef>>;

    async fn fields_of(&self, type_ref: &TypeRef) -> AdapterResult<Vec<FieldRef>>;

    async fn methods_by_name(&self, type_ref: &TypeRef, name: &str)
        -> AdapterResult<Vec<MethodRef>>;

    async fn all_methods(&self, type_ref: &TypeRef) -> AdapterResult<Vec<MethodRef>>;

    /// Executable locations for a source line. Empty when the line holds
    /// no code; `NoDebugInfo` when the class lacks line tables.
    async fn locations_at_line(&self, type_ref: &TypeRef, line: i32)
        -> AdapterResult<Vec<Location>>;

    async fn is_throwable(&self, type_ref: &TypeRef) -> AdapterResult<bool>;

    // Event requests

    async fn create_breakpoint(
        &self,
        location: &Location,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_access_watch(
        &self,
        field: &FieldRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_modify_watch(
        &self,
        field: &FieldRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_method_entry(
        &self,
        type_ref: &TypeRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_method_exit(
        &self,
        type_ref: &TypeRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    /// `type_ref` None means catch-all.
    async fn create_exception(
        &self,
        type_ref: Option<&TypeRef>,
        caught: bool,
        uncaught: bool,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_class_prepare_watch(
        &self,
        class_filter: Option<&str>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_class_unload_watch(
        &self,
        class_filter: Option<&str>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn create_thread_start_watch(&self, policy: SuspendPolicy)
        -> AdapterResult<RequestHandle>;

    async fn create_thread_death_watch(&self, policy: SuspendPolicy)
        -> AdapterResult<RequestHandle>;

    /// Fails `Unsupported` when the target does not advertise monitor
    /// events.
    async fn create_monitor_contended_watch(
        &self,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    /// One-shot line step. `count` restricts to the nth matching step.
    async fn create_step(
        &self,
        thread: &ThreadRef,
        depth: StepDepth,
        class_filter: Option<&str>,
        count: Option<u32>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle>;

    async fn enable_request(&self, handle: RequestHandle) -> AdapterResult<()>;

    async fn disable_request(&self, handle: RequestHandle) -> AdapterResult<()>;

    async fn delete_request(&self, handle: RequestHandle) -> AdapterResult<()>;

    async fn delete_steps_for_thread(&self, thread: &ThreadRef) -> AdapterResult<()>;

    // Threads and frames

    async fn all_threads(&self) -> AdapterResult<Vec<ThreadRef>>;

    async fn resume_all(&self) -> AdapterResult<()>;

    async fn resume_thread(&self, thread: &ThreadRef) -> AdapterResult<()>;

    async fn suspend_all(&self) -> AdapterResult<()>;

    async fn suspend_thread(&self, thread: &ThreadRef) -> AdapterResult<()>;

    async fn is_suspended(&self, thread: &ThreadRef) -> AdapterResult<bool>;

    async fn frames(&self, thread: &ThreadRef) -> AdapterResult<Vec<FrameRef>>;

    async fn visible_locals(&self, frame: &FrameRef) -> AdapterResult<Vec<LocalVariable>>;

    async fn arguments(&self, frame: &FrameRef) -> AdapterResult<Vec<LocalVariable>>;

    async fn this_object(&self, frame: &FrameRef) -> AdapterResult<Option<ObjectRef>>;

    async fn get_local(&self, frame: &FrameRef, name: &str) -> AdapterResult<Value>;

    async fn set_local(&self, frame: &FrameRef, name: &str, value: Value) -> AdapterResult<()>;

    // Objects and arrays

    async fn get_field(&self, object: &ObjectRef, field: &FieldRef) -> AdapterResult<Value>;

    async fn get_static_field(&self, type_ref: &TypeRef, field: &FieldRef)
        -> AdapterResult<Value>;

    async fn array_length(&self, array: &ObjectRef) -> AdapterResult<usize>;

    async fn array_slice(
        &self,
        array: &ObjectRef,
        start: usize,
        count: usize,
    ) -> AdapterResult<Vec<Value>>;

    // Invocation (blocks until the target completes the call)

    async fn invoke_instance(
        &self,
        thread: &ThreadRef,
        object: &ObjectRef,
        method: &MethodRef,
        args: Vec<Value>,
    ) -> AdapterResult<InvokeOutcome>;

    async fn invoke_static(
        &self,
        thread: &ThreadRef,
        type_ref: &TypeRef,
        method: &MethodRef,
        args: Vec<Value>,
    ) -> AdapterResult<InvokeOutcome>;

    // Event delivery

    /// Pull the next event set, waiting up to `timeout`. `Ok(None)` on
    /// timeout; `Err(Disconnected)` once the target is gone.
    async fn pull_events(&self, timeout: Duration) -> AdapterResult<Option<EventSet>>;

    /// Release the threads suspended by a delivered set.
    async fn resume_event_set(&self, set: &EventSet) -> AdapterResult<()>;
}
