// MCP request handlers
//
// Routes initialize / tools list / tool calls into the debugger core.
// Tool failures become isError envelopes; the JSON-RPC error channel is
// reserved for protocol-level problems.

mod breakpoint_tools;
mod event_tools;
mod exception_tools;
mod execution;
mod inspection;
mod mutation;
mod session_tools;
mod watch_tools;

use crate::error::{DebugError, DebugResult};
use crate::protocol::*;
use crate::session::Debugger;
use crate::tools;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RequestHandler {
    debugger: Arc<Debugger>,
}

impl RequestHandler {
    pub fn new(debugger: Arc<Debugger>) -> Self {
        Self { debugger }
    }

    pub fn debugger(&self) -> &Arc<Debugger> {
        &self.debugger
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "shutdown" => Ok(Value::Null),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", request.method),
                data: None,
            }),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: Some(value),
                error: None,
            },
            Err(error) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(error),
            },
        }
    }

    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                info!("client initialized");
            }
            "notifications/cancelled" => {
                debug!("request cancelled");
            }
            other => {
                warn!("unknown notification: {}", other);
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let _params: InitializeParams = serde_json::from_value(params.unwrap_or(json!({})))
            .map_err(|e| JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Invalid initialize params: {}", e),
                data: None,
            })?;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
            },
            server_info: ServerInfo {
                name: "jdb-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Debug-control broker for JVM targets. Start with debug_launch or \
                 debug_attach_socket, set breakpoints, then resume and wait_for_stop."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(internal_error)
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: tools::get_tools(),
        };
        serde_json::to_value(result).map_err(internal_error)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let call: CallToolParams = serde_json::from_value(params.unwrap_or(json!({})))
            .map_err(|e| JsonRpcError {
                code: INVALID_PARAMS,
                message: format!("Invalid tool call params: {}", e),
                data: None,
            })?;

        debug!("tool call: {}", call.name);

        let result = match self.dispatch(&call.name, &call.arguments).await {
            Ok(text) => CallToolResult::success(text),
            Err(error) => CallToolResult::error(error.to_string()),
        };

        serde_json::to_value(result).map_err(internal_error)
    }

    async fn dispatch(&self, name: &str, args: &Value) -> DebugResult<String> {
        let d = &self.debugger;
        match name {
            // Session
            "debug_launch" => session_tools::debug_launch(d, args).await,
            "debug_launch_gradle_test" => session_tools::debug_launch_gradle_test(d, args).await,
            "debug_attach_socket" => session_tools::debug_attach_socket(d, args).await,
            "debug_attach_pid" => session_tools::debug_attach_pid(d, args).await,
            "debug_disconnect" => session_tools::debug_disconnect(d).await,
            "debug_status" => session_tools::debug_status(d).await,
            "vm_info" => session_tools::vm_info(d).await,
            "ping" => Ok("pong".to_string()),

            // Execution
            "resume" => execution::resume(d).await,
            "suspend" => execution::suspend(d).await,
            "step_into" => execution::step(d, args, debug_adapter::StepDepth::Into).await,
            "step_over" => execution::step(d, args, debug_adapter::StepDepth::Over).await,
            "step_out" => execution::step(d, args, debug_adapter::StepDepth::Out).await,
            "wait_for_stop" => execution::wait_for_stop(d, args).await,
            "run_to_line" => execution::run_to_line(d, args).await,
            "smart_step_into" => execution::smart_step_into(d, args).await,
            "execution_location" => execution::execution_location(d, args).await,

            // Line breakpoints
            "breakpoint_set" => breakpoint_tools::set(d, args).await,
            "breakpoint_remove" => breakpoint_tools::remove(d, args).await,
            "breakpoint_list" => breakpoint_tools::list(d).await,
            "breakpoint_enable" => breakpoint_tools::set_enabled(d, args, true).await,
            "breakpoint_disable" => breakpoint_tools::set_enabled(d, args, false).await,

            // Watchpoints
            "watchpoint_access" => {
                breakpoint_tools::watchpoint(d, args, crate::watchpoints::WatchKind::Access).await
            }
            "watchpoint_modification" => {
                breakpoint_tools::watchpoint(d, args, crate::watchpoints::WatchKind::Modify).await
            }
            "watchpoint_remove" => breakpoint_tools::watchpoint_remove(d, args).await,
            "watchpoint_list" => breakpoint_tools::watchpoint_list(d).await,

            // Method breakpoints
            "method_entry_break" => {
                breakpoint_tools::method_break(
                    d,
                    args,
                    crate::method_breakpoints::MethodBreakKind::Entry,
                )
                .await
            }
            "method_exit_break" => {
                breakpoint_tools::method_break(
                    d,
                    args,
                    crate::method_breakpoints::MethodBreakKind::Exit,
                )
                .await
            }
            "method_breakpoint_remove" => breakpoint_tools::method_break_remove(d, args).await,
            "method_breakpoint_list" => breakpoint_tools::method_break_list(d).await,

            // Exception breakpoints
            "exception_break_on" => exception_tools::break_on(d, args).await,
            "exception_break_remove" => exception_tools::break_remove(d, args).await,
            "exception_break_list" => exception_tools::break_list(d).await,
            "exception_info" => exception_tools::info(d).await,

            // Inspection
            "threads_list" => inspection::threads_list(d).await,
            "thread_suspend" => inspection::thread_suspend(d, args).await,
            "thread_resume" => inspection::thread_resume(d, args).await,
            "stack_frames" => inspection::stack_frames(d, args).await,
            "variables_local" => inspection::variables(d, args, inspection::Scope::Locals).await,
            "variables_arguments" => {
                inspection::variables(d, args, inspection::Scope::Arguments).await
            }
            "variable_inspect" => inspection::variable_inspect(d, args).await,
            "this_object" => inspection::this_object(d, args).await,
            "object_fields" => inspection::object_fields(d, args).await,
            "array_elements" => inspection::array_elements(d, args).await,
            "async_stack_trace" => inspection::async_stack_trace(d, args).await,

            // Mutation / evaluation
            "evaluate_expression" => mutation::evaluate_expression(d, args).await,
            "set_variable" => mutation::set_variable(d, args).await,
            "invoke_method" => mutation::invoke_method(d, args).await,
            "invoke_static" => mutation::invoke_static(d, args).await,

            // Watch expressions
            "watch_add" => watch_tools::add(d, args).await,
            "watch_remove" => watch_tools::remove(d, args).await,
            "watch_list" => watch_tools::list(d).await,
            "watch_evaluate_all" => watch_tools::evaluate_all(d, args).await,

            // Event monitoring
            "class_prepare_watch" => event_tools::class_prepare_watch(d, args).await,
            "class_unload_watch" => event_tools::class_unload_watch(d, args).await,
            "thread_start_watch" => event_tools::thread_start_watch(d).await,
            "thread_death_watch" => event_tools::thread_death_watch(d).await,
            "monitor_contention_watch" => event_tools::monitor_contention_watch(d).await,
            "events_pending" => event_tools::events_pending(d, args).await,
            "event_watch_remove" => event_tools::event_watch_remove(d, args).await,

            other => Err(DebugError::NotFound(format!("tool {}", other))),
        }
    }
}

fn internal_error(e: serde_json::Error) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message: e.to_string(),
        data: None,
    }
}

// Parameter extraction helpers shared by the tool shims

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> DebugResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DebugError::InvalidParams(format!("{} is required", key)))
}

pub(crate) fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn required_u64(args: &Value, key: &str) -> DebugResult<u64> {
    args.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| DebugError::InvalidParams(format!("{} is required", key)))
}

pub(crate) fn required_i64(args: &Value, key: &str) -> DebugResult<i64> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| DebugError::InvalidParams(format!("{} is required", key)))
}

pub(crate) fn opt_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

pub(crate) fn opt_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

/// Seconds parameter capped at `max`, with a default. Zero passes
/// through: a zero-timeout wait returns immediately.
pub(crate) fn timeout_secs(args: &Value, key: &str, default: u64, max: u64) -> u64 {
    opt_u64(args, key).unwrap_or(default).min(max)
}

pub(crate) fn detail_lines(details: &[(String, String)]) -> String {
    details
        .iter()
        .map(|(k, v)| format!("  {}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}
