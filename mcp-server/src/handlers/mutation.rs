// Evaluation, assignment and invocation tools

use super::{opt_u64, required_str, required_u64};
use crate::error::{DebugError, DebugResult};
use crate::eval::Evaluator;
use crate::session::Debugger;
use crate::thread_ops::{frame_at, json_kind, require_suspended, thread_by_id};
use debug_adapter::InvokeOutcome;
use serde_json::Value;
use std::fmt::Write;

pub async fn evaluate_expression(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let expression = required_str(args, "expression")?;
    let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

    let evaluator = Evaluator::new(target.as_ref(), &thread, &frame);
    let value = evaluator.evaluate(expression).await?;

    let mut out = String::new();
    let _ = writeln!(out, "Expression: {}", expression.trim());
    let _ = writeln!(out, "Value: {}", value.format());
    let _ = writeln!(out, "Type: {}", value.type_name());
    Ok(out)
}

pub async fn set_variable(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let thread_id = required_u64(args, "threadId")?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let name = required_str(args, "name")?;
    let value_text = required_str(args, "value")?;

    let value = debugger
        .set_variable(thread_id, frame_index, name, value_text)
        .await?;
    Ok(format!("{} = {}", name, value.format()))
}

fn render_invocation(
    label: &str,
    receiver: &str,
    method: &debug_adapter::MethodRef,
    outcome: InvokeOutcome,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", label);
    let _ = writeln!(out, "method: {}.{}{}", receiver, method.name, method.signature);
    match outcome {
        InvokeOutcome::Returned(value) => {
            let _ = writeln!(out, "returned: {}", value.format());
        }
        InvokeOutcome::Thrown {
            exception_type,
            exception_id,
        } => {
            let _ = writeln!(out, "threw: {} (@{})", exception_type, exception_id);
            let _ = writeln!(
                out,
                "\nInspect it with object_fields(objectId={}).",
                exception_id
            );
        }
    }
    out
}

fn json_args(args: &Value) -> DebugResult<Vec<Value>> {
    match args.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => Ok(values.clone()),
        Some(other) => Err(DebugError::InvalidParams(format!(
            "args must be a JSON array, got {}",
            json_kind(other)
        ))),
    }
}

pub async fn invoke_method(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let thread_id = required_u64(args, "threadId")?;
    let object_id = required_u64(args, "objectId")?;
    let method_name = required_str(args, "methodName")?;
    let call_args = json_args(args)?;

    let (method, outcome) = debugger
        .invoke_on_object(thread_id, object_id, method_name, &call_args)
        .await?;
    Ok(render_invocation(
        "Invocation Result",
        &format!("@{}", object_id),
        &method,
        outcome,
    ))
}

pub async fn invoke_static(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let thread_id = required_u64(args, "threadId")?;
    let class_name = required_str(args, "className")?;
    let method_name = required_str(args, "methodName")?;
    let call_args = json_args(args)?;

    let (method, outcome) = debugger
        .invoke_on_class(thread_id, class_name, method_name, &call_args)
        .await?;
    Ok(render_invocation(
        "Static Invocation Result",
        class_name,
        &method,
        outcome,
    ))
}
