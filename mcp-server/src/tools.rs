// Tool schema catalog
//
// One entry per tool the broker exposes. Handlers in handlers/ must
// cover every name listed here.

use crate::protocol::Tool;
use serde_json::{json, Value};

fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub fn get_tools() -> Vec<Tool> {
    let mut tools = Vec::new();
    tools.extend(session_tools());
    tools.extend(execution_tools());
    tools.extend(breakpoint_tools());
    tools.extend(watchpoint_tools());
    tools.extend(method_breakpoint_tools());
    tools.extend(exception_tools());
    tools.extend(inspection_tools());
    tools.extend(mutation_tools());
    tools.extend(watch_tools());
    tools.extend(event_tools());
    tools
}

fn session_tools() -> Vec<Tool> {
    vec![
        tool(
            "debug_launch",
            "Launch a JVM with debugging enabled and attach to it.",
            json!({
                "type": "object",
                "properties": {
                    "mainClass": { "type": "string", "description": "Fully qualified main class" },
                    "classpath": { "type": "string", "description": "Classpath for the debuggee" },
                    "jvmArgs": { "type": "string", "description": "Extra JVM arguments (space separated)" },
                    "suspend": { "type": "boolean", "description": "Suspend the VM until the first resume", "default": true }
                },
                "required": ["mainClass"]
            }),
        ),
        tool(
            "debug_launch_gradle_test",
            "Run tests under gradle --debug-jvm and attach to the forked test JVM.",
            json!({
                "type": "object",
                "properties": {
                    "projectDir": { "type": "string", "description": "Gradle project directory" },
                    "testFilter": { "type": "string", "description": "Test filter passed to --tests" },
                    "port": { "type": "integer", "description": "Debug port the test JVM opens", "default": 5005 },
                    "waitTimeout": { "type": "integer", "description": "Seconds to wait for the port (default: 120)", "default": 120 },
                    "gradleArgs": { "type": "string", "description": "Extra gradle arguments (space separated)" },
                    "useWrapper": { "type": "boolean", "description": "Use ./gradlew instead of gradle", "default": true },
                    "clean": { "type": "boolean", "description": "Run clean before test", "default": false }
                }
            }),
        ),
        tool(
            "debug_attach_socket",
            "Attach to a running JVM listening for a debugger on a socket.",
            json!({
                "type": "object",
                "properties": {
                    "host": { "type": "string", "description": "Host name", "default": "localhost" },
                    "port": { "type": "integer", "description": "Debug port" },
                    "waitForPort": { "type": "boolean", "description": "Poll until the port opens", "default": false },
                    "waitTimeout": { "type": "integer", "description": "Seconds to wait for the port (default: 60, max: 300)", "default": 60 }
                },
                "required": ["port"]
            }),
        ),
        tool(
            "debug_attach_pid",
            "Attach to a running JVM by process id.",
            json!({
                "type": "object",
                "properties": {
                    "pid": { "type": "integer", "description": "Process id of the JVM" }
                },
                "required": ["pid"]
            }),
        ),
        tool("debug_disconnect", "Disconnect from the debug session.", no_args()),
        tool(
            "debug_status",
            "Show connection state, stop reason and pending breakpoint counts.",
            no_args(),
        ),
        tool("vm_info", "Show target VM name, version and capabilities.", no_args()),
        tool("ping", "Liveness check; returns pong.", no_args()),
    ]
}

fn execution_tools() -> Vec<Tool> {
    vec![
        tool("resume", "Resume the VM. Use wait_for_stop to observe the next stop.", no_args()),
        tool("suspend", "Suspend all threads.", no_args()),
        tool(
            "step_into",
            "Step one line, entering calls. Use wait_for_stop afterwards.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread to step (default: first suspended)" }
                }
            }),
        ),
        tool(
            "step_over",
            "Step one line, over calls. Use wait_for_stop afterwards.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread to step (default: first suspended)" }
                }
            }),
        ),
        tool(
            "step_out",
            "Step out of the current method. Use wait_for_stop afterwards.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread to step (default: first suspended)" }
                }
            }),
        ),
        tool(
            "wait_for_stop",
            "Block until the VM stops (breakpoint, step, exception). Returns immediately if already stopped.",
            json!({
                "type": "object",
                "properties": {
                    "timeout": { "type": "integer", "description": "Seconds to wait (default: 30, max: 300)", "default": 30 }
                }
            }),
        ),
        tool(
            "run_to_line",
            "Run until a line is hit: temporary breakpoint + resume + wait + removal.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "lineNumber": { "type": "integer", "description": "Line to run to" },
                    "timeout": { "type": "integer", "description": "Seconds to wait (default: 30, max: 300)", "default": 30 }
                },
                "required": ["className", "lineNumber"]
            }),
        ),
        tool(
            "smart_step_into",
            "Step into a specific method on the current line. Without targetMethod, lists candidates.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (default: first suspended)" },
                    "targetMethod": { "type": "string", "description": "Method to step into; omit to list" },
                    "targetClass": { "type": "string", "description": "Class filter for the step" }
                }
            }),
        ),
        tool(
            "execution_location",
            "Show where a suspended thread currently is.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (default: first suspended)" }
                }
            }),
        ),
    ]
}

fn breakpoint_tools() -> Vec<Tool> {
    vec![
        tool(
            "breakpoint_set",
            "Set a line breakpoint. Defers automatically when the class is not loaded yet.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "lineNumber": { "type": "integer", "description": "Line number" }
                },
                "required": ["className", "lineNumber"]
            }),
        ),
        tool(
            "breakpoint_remove",
            "Remove a breakpoint by id.",
            json!({
                "type": "object",
                "properties": {
                    "breakpointId": { "type": "string", "description": "Id from breakpoint_set/breakpoint_list" }
                },
                "required": ["breakpointId"]
            }),
        ),
        tool("breakpoint_list", "List all line breakpoints with state.", no_args()),
        tool(
            "breakpoint_enable",
            "Enable a breakpoint.",
            json!({
                "type": "object",
                "properties": {
                    "breakpointId": { "type": "string", "description": "Breakpoint id" }
                },
                "required": ["breakpointId"]
            }),
        ),
        tool(
            "breakpoint_disable",
            "Disable a breakpoint without removing it.",
            json!({
                "type": "object",
                "properties": {
                    "breakpointId": { "type": "string", "description": "Breakpoint id" }
                },
                "required": ["breakpointId"]
            }),
        ),
    ]
}

fn watchpoint_tools() -> Vec<Tool> {
    vec![
        tool(
            "watchpoint_access",
            "Break whenever a field is read.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "fieldName": { "type": "string", "description": "Field to watch" }
                },
                "required": ["className", "fieldName"]
            }),
        ),
        tool(
            "watchpoint_modification",
            "Break whenever a field is written.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "fieldName": { "type": "string", "description": "Field to watch" }
                },
                "required": ["className", "fieldName"]
            }),
        ),
        tool(
            "watchpoint_remove",
            "Remove a watchpoint by id.",
            json!({
                "type": "object",
                "properties": {
                    "watchpointId": { "type": "string", "description": "Id from watchpoint_list" }
                },
                "required": ["watchpointId"]
            }),
        ),
        tool("watchpoint_list", "List all watchpoints with state.", no_args()),
    ]
}

fn method_breakpoint_tools() -> Vec<Tool> {
    vec![
        tool(
            "method_entry_break",
            "Break when entering a method. Use \"*\" for any method of the class.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "methodName": { "type": "string", "description": "Method name or \"*\"" }
                },
                "required": ["className", "methodName"]
            }),
        ),
        tool(
            "method_exit_break",
            "Break when exiting a method. Use \"*\" for any method of the class.",
            json!({
                "type": "object",
                "properties": {
                    "className": { "type": "string", "description": "Fully qualified class name" },
                    "methodName": { "type": "string", "description": "Method name or \"*\"" }
                },
                "required": ["className", "methodName"]
            }),
        ),
        tool(
            "method_breakpoint_remove",
            "Remove a method breakpoint by id.",
            json!({
                "type": "object",
                "properties": {
                    "breakpointId": { "type": "string", "description": "Id from method_breakpoint_list" }
                },
                "required": ["breakpointId"]
            }),
        ),
        tool("method_breakpoint_list", "List all method breakpoints.", no_args()),
    ]
}

fn exception_tools() -> Vec<Tool> {
    vec![
        tool(
            "exception_break_on",
            "Break when an exception is thrown. Use \"*\" for all throwables.",
            json!({
                "type": "object",
                "properties": {
                    "exceptionClass": { "type": "string", "description": "Exception class or \"*\"", "default": "*" },
                    "caught": { "type": "boolean", "description": "Break on caught exceptions", "default": true },
                    "uncaught": { "type": "boolean", "description": "Break on uncaught exceptions", "default": true }
                }
            }),
        ),
        tool(
            "exception_break_remove",
            "Remove an exception breakpoint by id.",
            json!({
                "type": "object",
                "properties": {
                    "breakpointId": { "type": "string", "description": "Id from exception_break_list" }
                },
                "required": ["breakpointId"]
            }),
        ),
        tool("exception_break_list", "List exception breakpoints.", no_args()),
        tool(
            "exception_info",
            "Details of the exception the VM is currently stopped on.",
            no_args(),
        ),
    ]
}

fn inspection_tools() -> Vec<Tool> {
    vec![
        tool("threads_list", "List threads with suspension state.", no_args()),
        tool(
            "thread_suspend",
            "Suspend a single thread.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" }
                },
                "required": ["threadId"]
            }),
        ),
        tool(
            "thread_resume",
            "Resume a single thread.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" }
                },
                "required": ["threadId"]
            }),
        ),
        tool(
            "stack_frames",
            "Stack frames of a suspended thread.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (default: first suspended)" },
                    "maxFrames": { "type": "integer", "description": "Maximum frames to show", "default": 20 }
                }
            }),
        ),
        tool(
            "variables_local",
            "Visible local variables of a frame.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 }
                },
                "required": ["threadId"]
            }),
        ),
        tool(
            "variables_arguments",
            "Method arguments of a frame.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 }
                },
                "required": ["threadId"]
            }),
        ),
        tool(
            "variable_inspect",
            "Inspect a single variable by name.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 },
                    "name": { "type": "string", "description": "Variable name" }
                },
                "required": ["threadId", "name"]
            }),
        ),
        tool(
            "this_object",
            "The `this` object of a frame.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 }
                },
                "required": ["threadId"]
            }),
        ),
        tool(
            "object_fields",
            "Fields of an object found by @id.",
            json!({
                "type": "object",
                "properties": {
                    "objectId": { "type": "integer", "description": "Object unique id" }
                },
                "required": ["objectId"]
            }),
        ),
        tool(
            "array_elements",
            "Elements of an array found by @id.",
            json!({
                "type": "object",
                "properties": {
                    "objectId": { "type": "integer", "description": "Array unique id" },
                    "startIndex": { "type": "integer", "description": "First element to show", "default": 0 },
                    "count": { "type": "integer", "description": "Number of elements", "default": 20 }
                },
                "required": ["objectId"]
            }),
        ),
        tool(
            "async_stack_trace",
            "Async/reactive stack analysis across threads.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (default: first suspended)" },
                    "showAllSuspended": { "type": "boolean", "description": "Include every suspended thread", "default": false },
                    "maxFrames": { "type": "integer", "description": "Maximum frames per thread", "default": 15 }
                }
            }),
        ),
    ]
}

fn mutation_tools() -> Vec<Tool> {
    vec![
        tool(
            "evaluate_expression",
            "Evaluate an expression in a suspended frame. Supports vars, a.b, obj.method(), literals.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (must be suspended)" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 },
                    "expression": { "type": "string", "description": "Expression to evaluate" }
                },
                "required": ["threadId", "expression"]
            }),
        ),
        tool(
            "set_variable",
            "Assign a frame variable from text: primitive, \"string\", null or @id.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 },
                    "name": { "type": "string", "description": "Variable name" },
                    "value": { "type": "string", "description": "New value" }
                },
                "required": ["threadId", "name", "value"]
            }),
        ),
        tool(
            "invoke_method",
            "Invoke an instance method on an object (@id) in a suspended thread.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (must be suspended)" },
                    "objectId": { "type": "integer", "description": "Receiver object id" },
                    "methodName": { "type": "string", "description": "Method to invoke" },
                    "args": { "type": "array", "description": "JSON arguments", "default": [] }
                },
                "required": ["threadId", "objectId", "methodName"]
            }),
        ),
        tool(
            "invoke_static",
            "Invoke a static method in a suspended thread.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (must be suspended)" },
                    "className": { "type": "string", "description": "Declaring class" },
                    "methodName": { "type": "string", "description": "Method to invoke" },
                    "args": { "type": "array", "description": "JSON arguments", "default": [] }
                },
                "required": ["threadId", "className", "methodName"]
            }),
        ),
    ]
}

fn watch_tools() -> Vec<Tool> {
    vec![
        tool(
            "watch_add",
            "Add a persistent watch expression.",
            json!({
                "type": "object",
                "properties": {
                    "expression": { "type": "string", "description": "Expression to watch" }
                },
                "required": ["expression"]
            }),
        ),
        tool(
            "watch_remove",
            "Remove a watch expression by id.",
            json!({
                "type": "object",
                "properties": {
                    "watchId": { "type": "string", "description": "Id from watch_list" }
                },
                "required": ["watchId"]
            }),
        ),
        tool("watch_list", "List watch expressions with last results.", no_args()),
        tool(
            "watch_evaluate_all",
            "Evaluate every watch expression against a suspended frame.",
            json!({
                "type": "object",
                "properties": {
                    "threadId": { "type": "integer", "description": "Thread id (default: first suspended)" },
                    "frameIndex": { "type": "integer", "description": "Frame index (0 = top)", "default": 0 }
                }
            }),
        ),
    ]
}

fn event_tools() -> Vec<Tool> {
    vec![
        tool(
            "class_prepare_watch",
            "Monitor class preparation events (never stops the VM).",
            json!({
                "type": "object",
                "properties": {
                    "classFilter": { "type": "string", "description": "Class name filter, \"*\" for all" }
                }
            }),
        ),
        tool(
            "class_unload_watch",
            "Monitor class unload events.",
            json!({
                "type": "object",
                "properties": {
                    "classFilter": { "type": "string", "description": "Class name filter, \"*\" for all" }
                }
            }),
        ),
        tool("thread_start_watch", "Monitor thread start events.", no_args()),
        tool("thread_death_watch", "Monitor thread death events.", no_args()),
        tool(
            "monitor_contention_watch",
            "Monitor lock contention events (requires VM support).",
            no_args(),
        ),
        tool(
            "events_pending",
            "Captured monitor events since the last drain.",
            json!({
                "type": "object",
                "properties": {
                    "peek": { "type": "boolean", "description": "Look without draining", "default": false }
                }
            }),
        ),
        tool(
            "event_watch_remove",
            "Remove an event watch by id.",
            json!({
                "type": "object",
                "properties": {
                    "watchId": { "type": "string", "description": "Id from the watch tools (cp-/cu-/ts-/td-/mc-)" }
                },
                "required": ["watchId"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_unique_names() {
        let tools = get_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
        assert!(names.contains("breakpoint_set"));
        assert!(names.contains("wait_for_stop"));
        assert!(names.contains("events_pending"));
    }

    #[test]
    fn every_schema_is_an_object() {
        for tool in get_tools() {
            assert_eq!(
                tool.input_schema["type"], "object",
                "schema of {} must be an object",
                tool.name
            );
        }
    }
}
