// Watch expression tools

use super::{opt_u64, required_str};
use crate::error::DebugResult;
use crate::eval::Evaluator;
use crate::session::Debugger;
use crate::thread_ops::{frame_at, pick_thread, require_suspended};
use serde_json::Value;
use std::fmt::Write;

pub async fn add(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let expression = required_str(args, "expression")?;
    let watch = debugger.watches().add(expression)?;
    Ok(format!(
        "Watch added: {}\nexpression: {}\n\nEvaluate with watch_evaluate_all while stopped.",
        watch.id, watch.expression
    ))
}

pub async fn remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let id = required_str(args, "watchId")?;
    debugger.watches().remove(id)?;
    Ok(format!("Watch removed: {}", id))
}

pub async fn list(debugger: &Debugger) -> DebugResult<String> {
    let watches = debugger.watches().list();
    if watches.is_empty() {
        return Ok("No watch expressions.".to_string());
    }

    let mut out = format!("{} watch expression(s):\n\n", watches.len());
    for watch in watches {
        let _ = writeln!(out, "  [{}] {}", watch.id, watch.expression);
        if let Some(value) = &watch.last_value {
            let _ = writeln!(out, "      last value: {}", value);
        }
        if let Some(error) = &watch.last_error {
            let _ = writeln!(out, "      last error: {}", error);
        }
        if !watch.has_been_evaluated() {
            let _ = writeln!(out, "      (not yet evaluated)");
        }
    }
    Ok(out)
}

/// Evaluate every watch against one suspended frame, memoising results.
pub async fn evaluate_all(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = pick_thread(target.as_ref(), opt_u64(args, "threadId")).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

    let watches = debugger.watches().list();
    if watches.is_empty() {
        return Ok("No watch expressions to evaluate.".to_string());
    }

    let evaluator = Evaluator::new(target.as_ref(), &thread, &frame);
    let mut out = format!(
        "Evaluating {} watch(es) in frame #{} of {}:\n\n",
        watches.len(),
        frame_index,
        thread.name
    );

    for watch in watches {
        match evaluator.evaluate(&watch.expression).await {
            Ok(value) => {
                let rendered = value.format();
                debugger.watches().record_value(&watch.id, rendered.clone());
                let _ = writeln!(out, "  [{}] {} = {}", watch.id, watch.expression, rendered);
            }
            Err(e) => {
                let rendered = e.to_string();
                debugger.watches().record_error(&watch.id, rendered.clone());
                let _ = writeln!(out, "  [{}] {} ! {}", watch.id, watch.expression, rendered);
            }
        }
    }
    Ok(out)
}
