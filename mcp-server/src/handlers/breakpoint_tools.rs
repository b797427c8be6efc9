// Breakpoint, watchpoint and method-breakpoint tools

use super::{required_i64, required_str};
use crate::error::DebugResult;
use crate::method_breakpoints::MethodBreakKind;
use crate::session::Debugger;
use crate::watchpoints::WatchKind;
use serde_json::Value;
use std::fmt::Write;

fn state_word(enabled: bool, pending: bool) -> &'static str {
    if pending {
        "pending"
    } else if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

pub async fn set(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let class_name = required_str(args, "className")?;
    let line = required_i64(args, "lineNumber")? as i32;

    let target = debugger.target().await?;
    let record = debugger
        .breakpoints()
        .set(target.as_ref(), class_name, line)
        .await?;

    let mut out = String::new();
    let _ = writeln!(out, "Breakpoint set: {}", record.id);
    let _ = writeln!(out, "location: {}:{}", record.class_name, record.line);
    let _ = writeln!(out, "state: {}", state_word(record.enabled, record.pending));
    if record.pending {
        let _ = writeln!(
            out,
            "\nThe class is not loaded yet; the breakpoint activates when it prepares."
        );
    }
    Ok(out)
}

pub async fn remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let id = required_str(args, "breakpointId")?;
    let target = debugger.target().await?;
    debugger.breakpoints().remove(target.as_ref(), id).await?;
    Ok(format!("Breakpoint removed: {}", id))
}

pub async fn set_enabled(debugger: &Debugger, args: &Value, enabled: bool) -> DebugResult<String> {
    let id = required_str(args, "breakpointId")?;
    let target = debugger.target().await?;
    debugger
        .breakpoints()
        .set_enabled(target.as_ref(), id, enabled)
        .await?;
    Ok(format!(
        "Breakpoint {}: {}",
        if enabled { "enabled" } else { "disabled" },
        id
    ))
}

pub async fn list(debugger: &Debugger) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let records = debugger.breakpoints().list();
    if records.is_empty() {
        return Ok("No breakpoints set.".to_string());
    }

    let mut out = format!("{} breakpoint(s):\n\n", records.len());
    for r in records {
        let _ = writeln!(
            out,
            "  [{}] {}:{} ({})",
            r.id,
            r.class_name,
            r.line,
            state_word(r.enabled, r.pending)
        );
        if r.hit_count > 0 {
            let _ = writeln!(out, "      hits: {}", r.hit_count);
        }
    }
    Ok(out)
}

pub async fn watchpoint(debugger: &Debugger, args: &Value, kind: WatchKind) -> DebugResult<String> {
    let class_name = required_str(args, "className")?;
    let field_name = required_str(args, "fieldName")?;

    let target = debugger.target().await?;
    let record = debugger
        .watchpoints()
        .set(target.as_ref(), class_name, field_name, kind)
        .await?;

    let mut out = String::new();
    let _ = writeln!(out, "Watchpoint set: {}", record.id);
    let _ = writeln!(out, "field: {}.{}", record.class_name, record.field_name);
    let _ = writeln!(out, "kind: {}", record.kind.name());
    let _ = writeln!(out, "state: {}", state_word(record.enabled, record.pending));
    Ok(out)
}

pub async fn watchpoint_remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let id = required_str(args, "watchpointId")?;
    let target = debugger.target().await?;
    debugger.watchpoints().remove(target.as_ref(), id).await?;
    Ok(format!("Watchpoint removed: {}", id))
}

pub async fn watchpoint_list(debugger: &Debugger) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let records = debugger.watchpoints().list();
    if records.is_empty() {
        return Ok("No watchpoints set.".to_string());
    }

    let mut out = format!("{} watchpoint(s):\n\n", records.len());
    for r in records {
        let _ = writeln!(
            out,
            "  [{}] {}.{} {} ({})",
            r.id,
            r.class_name,
            r.field_name,
            r.kind.name(),
            state_word(r.enabled, r.pending)
        );
    }
    Ok(out)
}

pub async fn method_break(
    debugger: &Debugger,
    args: &Value,
    kind: MethodBreakKind,
) -> DebugResult<String> {
    let class_name = required_str(args, "className")?;
    let method_name = required_str(args, "methodName")?;

    let target = debugger.target().await?;
    let record = debugger
        .method_breakpoints()
        .set(target.as_ref(), class_name, method_name, kind)
        .await?;

    let mut out = String::new();
    let _ = writeln!(out, "Method breakpoint set: {}", record.id);
    let _ = writeln!(out, "method: {}.{}", record.class_name, record.method_name);
    let _ = writeln!(out, "kind: {}", record.kind.name());
    let _ = writeln!(out, "state: {}", state_word(record.enabled, record.pending));
    Ok(out)
}

pub async fn method_break_remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let id = required_str(args, "breakpointId")?;
    let target = debugger.target().await?;
    debugger
        .method_breakpoints()
        .remove(target.as_ref(), id)
        .await?;
    Ok(format!("Method breakpoint removed: {}", id))
}

pub async fn method_break_list(debugger: &Debugger) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let records = debugger.method_breakpoints().list();
    if records.is_empty() {
        return Ok("No method breakpoints set.".to_string());
    }

    let mut out = format!("{} method breakpoint(s):\n\n", records.len());
    for r in records {
        let _ = writeln!(
            out,
            "  [{}] {}.{} {} ({})",
            r.id,
            r.class_name,
            r.method_name,
            r.kind.name(),
            state_word(r.enabled, r.pending)
        );
    }
    Ok(out)
}
