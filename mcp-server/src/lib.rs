// jdb-mcp broker core
//
// A debug-control broker exposing a symbolic debugger to LLM agents over
// stdio JSON-RPC. The upstream client speaks request/response; the
// downstream target produces asynchronous events. The session's pump and
// the wait_for_stop primitive reconcile the two.

pub mod async_stack;
pub mod breakpoints;
pub mod clock;
pub mod connector;
pub mod error;
pub mod eval;
pub mod event_monitor;
pub mod exception_breakpoints;
pub mod handlers;
pub mod ids;
pub mod launch;
pub mod method_breakpoints;
pub mod protocol;
pub mod session;
pub mod stop_reason;
pub mod thread_ops;
pub mod tools;
pub mod watch_exprs;
pub mod watchpoints;

pub use error::{DebugError, DebugResult};
pub use handlers::RequestHandler;
pub use session::Debugger;
