// Transport-facing dispatch tests
//
// Drives RequestHandler with raw JSON-RPC values: protocol failures use
// the error channel, tool failures come back as isError envelopes.

use debug_adapter::testkit::{ScriptedConnector, ScriptedTarget};
use jdb_mcp::protocol::{JsonRpcRequest, METHOD_NOT_FOUND};
use jdb_mcp::{Debugger, RequestHandler};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn handler_with_target() -> (Arc<ScriptedTarget>, RequestHandler) {
    let target = Arc::new(ScriptedTarget::new());
    let debugger = Arc::new(Debugger::new(Arc::new(ScriptedConnector::new(
        target.clone(),
    ))));
    (target, RequestHandler::new(debugger))
}

fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    }))
    .unwrap()
}

fn call(id: i64, tool: &str, arguments: Value) -> JsonRpcRequest {
    request(id, "tools/call", json!({ "name": tool, "arguments": arguments }))
}

fn result_text(response: &Value) -> &str {
    response["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn initialize_advertises_tools_capability() {
    let (_target, handler) = handler_with_target();
    let response = handler
        .handle_request(request(1, "initialize", json!({})))
        .await;

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], json!("2024-11-05"));
    assert_eq!(result["serverInfo"]["name"], json!("jdb-mcp"));
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_contains_the_whole_surface() {
    let (_target, handler) = handler_with_target();
    let response = handler.handle_request(request(2, "tools/list", json!({}))).await;

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "debug_launch",
        "debug_attach_socket",
        "wait_for_stop",
        "breakpoint_set",
        "watchpoint_modification",
        "method_entry_break",
        "exception_break_on",
        "variables_local",
        "evaluate_expression",
        "watch_evaluate_all",
        "events_pending",
        "async_stack_trace",
        "smart_step_into",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
}

#[tokio::test]
async fn unknown_method_uses_the_error_channel() {
    let (_target, handler) = handler_with_target();
    let response = handler.handle_request(request(3, "nope", json!({}))).await;
    assert!(response.result.is_none());
    assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
}

#[tokio::test]
async fn tool_failures_are_is_error_envelopes_not_rpc_errors() {
    let (_target, handler) = handler_with_target();

    // Not connected yet: tool-level failure
    let response = handler
        .handle_request(call(4, "breakpoint_set", json!({"className": "C", "lineNumber": 15})))
        .await;
    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));
    assert!(result_text(&result).contains("Not connected"));

    // Unknown tool: also a tool-level failure
    let response = handler.handle_request(call(5, "no_such_tool", json!({}))).await;
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["isError"], json!(true));
}

#[tokio::test]
async fn ping_answers_pong() {
    let (_target, handler) = handler_with_target();
    let response = handler.handle_request(call(6, "ping", json!({}))).await;
    let result = response.result.unwrap();
    assert_eq!(result_text(&result), "pong");
    assert!(result.get("isError").is_none());
}

#[tokio::test]
async fn breakpoint_tools_roundtrip_through_the_envelope() {
    let (target, handler) = handler_with_target();
    target.add_class("C", &[15]);
    handler
        .debugger()
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();

    let response = handler
        .handle_request(call(7, "breakpoint_set", json!({"className": "C", "lineNumber": 15})))
        .await;
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());
    let text = result_text(&result);
    assert!(text.contains("bp-1"));
    assert!(text.contains("C:15"));

    let response = handler.handle_request(call(8, "breakpoint_list", json!({}))).await;
    assert!(result_text(&response.result.unwrap()).contains("[bp-1] C:15 (enabled)"));

    let response = handler
        .handle_request(call(9, "breakpoint_remove", json!({"breakpointId": "bp-1"})))
        .await;
    assert!(result_text(&response.result.unwrap()).contains("removed"));

    let response = handler
        .handle_request(call(10, "breakpoint_remove", json!({"breakpointId": "bp-1"})))
        .await;
    assert_eq!(response.result.unwrap()["isError"], json!(true));
}

#[tokio::test]
async fn status_reports_running_and_stopped() {
    let (target, handler) = handler_with_target();
    target.add_thread(1, "main", false);
    handler
        .debugger()
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();

    let response = handler.handle_request(call(11, "debug_status", json!({}))).await;
    assert!(result_text(&response.result.unwrap()).contains("state: RUNNING"));

    target.push_stop_event(debug_adapter::EventKind::VmStart {
        thread: debug_adapter::ThreadRef {
            id: 1,
            name: "main".into(),
        },
    });
    handler
        .debugger()
        .wait_for_stop(Duration::from_secs(2))
        .await;

    let response = handler.handle_request(call(12, "debug_status", json!({}))).await;
    assert!(result_text(&response.result.unwrap()).contains("state: STOPPED"));
}

#[tokio::test]
async fn wait_for_stop_with_zero_timeout_returns_immediately() {
    let (target, handler) = handler_with_target();
    target.add_thread(1, "main", false);
    handler
        .debugger()
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();

    // Nothing has stopped: the tool must come back at once, not block
    let started = std::time::Instant::now();
    let response = handler
        .handle_request(call(20, "wait_for_stop", json!({"timeout": 0})))
        .await;
    let elapsed = started.elapsed();

    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());
    let text = result_text(&result);
    assert!(text.contains("stopped: false"), "got: {}", text);
    assert!(elapsed < Duration::from_millis(500), "waited {:?}", elapsed);

    let waited_ms: u64 = text
        .lines()
        .find_map(|l| l.strip_prefix("waited_ms: "))
        .unwrap()
        .parse()
        .unwrap();
    assert!(waited_ms < 500, "waited_ms was {}", waited_ms);

    // Already stopped: the same call reports the current stop reason
    target.push_stop_event(debug_adapter::EventKind::VmStart {
        thread: debug_adapter::ThreadRef {
            id: 1,
            name: "main".into(),
        },
    });
    handler
        .debugger()
        .wait_for_stop(Duration::from_secs(2))
        .await;

    let response = handler
        .handle_request(call(21, "wait_for_stop", json!({"timeout": 0})))
        .await;
    let text = result_text(&response.result.unwrap()).to_string();
    assert!(text.contains("stopped: true"), "got: {}", text);
    assert!(text.contains("type: VM_START"), "got: {}", text);
}

#[tokio::test]
async fn object_fields_lists_instance_and_static_fields() {
    let (target, handler) = handler_with_target();
    target.add_class("com.example.Cart", &[10]);
    target.add_field("com.example.Cart", "total", "int");
    target.add_static_field(
        "com.example.Cart",
        "MAX_ITEMS",
        "int",
        debug_adapter::Value::Int(99),
    );
    target.add_thread(1, "main", true);
    target.push_frame(1, "com.example.Cart", "run", 10);
    let cart = target.add_object(500, "com.example.Cart");
    target.add_object_field(500, "total", debug_adapter::Value::Int(7));
    target.add_local(1, 0, "cart", debug_adapter::Value::Object(cart));
    handler
        .debugger()
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();

    let response = handler
        .handle_request(call(15, "object_fields", json!({"objectId": 500})))
        .await;
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());
    let text = result_text(&result);
    assert!(text.contains("total = (int) 7"));
    assert!(text.contains("MAX_ITEMS (static) = (int) 99"));

    // Unknown id comes back as the object-not-found error
    let response = handler
        .handle_request(call(16, "object_fields", json!({"objectId": 12345})))
        .await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));
    assert!(result_text(&result).contains("12345"));
}

#[tokio::test]
async fn evaluate_expression_over_the_wire() {
    let (target, handler) = handler_with_target();
    target.add_class("C", &[10]);
    target.add_thread(1, "main", true);
    target.push_frame(1, "C", "run", 10);
    target.add_local(1, 0, "count", debug_adapter::Value::Int(3));
    handler
        .debugger()
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();

    let response = handler
        .handle_request(call(
            13,
            "evaluate_expression",
            json!({"threadId": 1, "expression": "count"}),
        ))
        .await;
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());
    let text = result_text(&result);
    assert!(text.contains("Value: (int) 3"));
    assert!(text.contains("Type: int"));

    let response = handler
        .handle_request(call(
            14,
            "evaluate_expression",
            json!({"threadId": 1, "expression": "ghost"}),
        ))
        .await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));
    assert!(result_text(&result).contains("Cannot resolve"));
}
