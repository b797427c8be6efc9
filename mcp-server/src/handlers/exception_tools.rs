// Exception breakpoint tools

use super::{detail_lines, opt_bool, opt_str, required_str};
use crate::error::{DebugError, DebugResult};
use crate::session::Debugger;
use crate::stop_reason::StopKind;
use serde_json::Value;
use std::fmt::Write;

pub async fn break_on(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let exception_class = opt_str(args, "exceptionClass");
    let caught = opt_bool(args, "caught").unwrap_or(true);
    let uncaught = opt_bool(args, "uncaught").unwrap_or(true);

    let target = debugger.target().await?;
    let record = debugger
        .exceptions()
        .set(target.as_ref(), exception_class, caught, uncaught)
        .await?;

    let mut out = String::new();
    let _ = writeln!(out, "Exception breakpoint set: {}", record.id);
    let _ = writeln!(out, "exception: {}", record.exception_class);
    let _ = writeln!(
        out,
        "caught: {}, uncaught: {}",
        record.catch_caught, record.catch_uncaught
    );
    Ok(out)
}

pub async fn break_remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let id = required_str(args, "breakpointId")?;
    let target = debugger.target().await?;
    debugger.exceptions().remove(target.as_ref(), id).await?;
    Ok(format!("Exception breakpoint removed: {}", id))
}

pub async fn break_list(debugger: &Debugger) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let records = debugger.exceptions().list();
    if records.is_empty() {
        return Ok("No exception breakpoints set.".to_string());
    }

    let mut out = format!("{} exception breakpoint(s):\n\n", records.len());
    for r in records {
        let _ = writeln!(
            out,
            "  [{}] {} (caught: {}, uncaught: {}) {}",
            r.id,
            r.exception_class,
            r.catch_caught,
            r.catch_uncaught,
            if r.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(out)
}

/// Details of the exception the VM is currently stopped on.
pub async fn info(debugger: &Debugger) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let stop = debugger.current_stop();

    if stop.kind != StopKind::ExceptionThrown {
        return Err(DebugError::InvalidParams(
            "not stopped on an exception; current stop is not EXCEPTION_THROWN".to_string(),
        ));
    }

    let mut out = String::new();
    let _ = writeln!(out, "=== Exception ===");
    if let Some(thread) = &stop.thread {
        let _ = writeln!(out, "thread: {} (id: {})", thread.name, thread.id);
    }
    if let Some(location) = &stop.location {
        let _ = writeln!(out, "thrown_at: {}", location);
    }
    let _ = writeln!(out, "\n{}", detail_lines(&stop.details));

    if let Some(id) = stop.detail("exceptionId") {
        let _ = writeln!(
            out,
            "\nInspect the exception object with object_fields(objectId={}).",
            id
        );
    }
    Ok(out)
}
