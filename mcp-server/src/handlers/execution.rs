// Execution control tools

use super::{detail_lines, opt_str, opt_u64, required_i64, required_str, timeout_secs};
use crate::clock::epoch_ms;
use crate::error::DebugResult;
use crate::session::Debugger;
use crate::stop_reason::StopKind;
use crate::thread_ops::{pick_thread, require_suspended, SmartStepOutcome};
use debug_adapter::StepDepth;
use serde_json::Value;
use std::fmt::Write;
use std::time::Duration;

pub async fn resume(debugger: &Debugger) -> DebugResult<String> {
    debugger.resume().await?;
    Ok("Execution resumed. Use wait_for_stop to observe the next stop.".to_string())
}

pub async fn suspend(debugger: &Debugger) -> DebugResult<String> {
    debugger.suspend().await?;
    Ok("All threads suspended. Use threads_list and stack_frames to inspect.".to_string())
}

pub async fn step(debugger: &Debugger, args: &Value, depth: StepDepth) -> DebugResult<String> {
    let thread = debugger.step(opt_u64(args, "threadId"), depth).await?;
    let verb = match depth {
        StepDepth::Into => "into",
        StepDepth::Over => "over",
        StepDepth::Out => "out",
    };
    Ok(format!(
        "Stepping {} on thread {} ({}). Use wait_for_stop to see where it lands.",
        verb, thread.name, thread.id
    ))
}

pub async fn wait_for_stop(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    // Reject early so the wait itself cannot mask a dead session
    let _ = debugger.target().await?;

    let timeout = timeout_secs(args, "timeout", 30, 300);
    let started = epoch_ms();
    let stop = debugger.wait_for_stop(Duration::from_secs(timeout)).await;
    let waited_ms = epoch_ms().saturating_sub(started);

    if stop.kind == StopKind::VmDisconnect {
        return Err(crate::error::DebugError::VmDisconnected);
    }

    let mut out = String::new();
    if stop.is_stopped() {
        let _ = writeln!(out, "stopped: true");
        let _ = writeln!(out, "waited_ms: {}", waited_ms);
        let _ = writeln!(out, "\n=== Stop Reason ===");
        let _ = writeln!(out, "type: {}", stop.kind.name());
        if let Some(thread) = &stop.thread {
            let _ = writeln!(out, "thread: {} (id: {})", thread.name, thread.id);
        }
        if let Some(location) = &stop.location {
            let _ = writeln!(out, "\nlocation:");
            let _ = writeln!(out, "  class: {}", location.type_name);
            let _ = writeln!(out, "  method: {}", location.method_name);
            let _ = writeln!(out, "  line: {}", location.line);
        }
        if !stop.details.is_empty() {
            let _ = writeln!(out, "\ndetails:\n{}", detail_lines(&stop.details));
        }

        let _ = writeln!(out, "\n=== Next Steps ===");
        let hint = match stop.kind {
            StopKind::BreakpointHit => {
                "Use variables_local, stack_frames, or step_* to inspect and continue."
            }
            StopKind::StepComplete => {
                "Use variables_local to see the current state, or step_* to keep stepping."
            }
            StopKind::ExceptionThrown => "Use exception_info for details, stack_frames for context.",
            StopKind::WatchpointAccess | StopKind::WatchpointModify => {
                "Field access detected. Use variables_local or object_fields to inspect."
            }
            _ => "Use debug_status for more info, resume() to continue.",
        };
        let _ = writeln!(out, "{}", hint);
    } else {
        let _ = writeln!(out, "stopped: false");
        let _ = writeln!(out, "state: RUNNING");
        let _ = writeln!(out, "waited_ms: {}", waited_ms);
        let _ = writeln!(out, "timeout_seconds: {}", timeout);
        let _ = writeln!(
            out,
            "\nTimeout waiting for the VM to stop. It is still running; wait again, \
             call suspend(), or check breakpoint_list."
        );
    }
    Ok(out)
}

pub async fn run_to_line(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let class_name = required_str(args, "className")?;
    let line = required_i64(args, "lineNumber")? as i32;
    let timeout = timeout_secs(args, "timeout", 30, 300);

    let outcome = debugger
        .run_to_line(class_name, line, Duration::from_secs(timeout))
        .await?;

    let mut out = String::new();
    if outcome.stop.kind == StopKind::VmDisconnect {
        return Err(crate::error::DebugError::VmDisconnected);
    }

    if outcome.stop.is_stopped() {
        if outcome.hit_target {
            let _ = writeln!(out, "=== Run to Line Complete ===");
            let _ = writeln!(out, "Stopped at target: {}:{}", class_name, line);
        } else {
            let _ = writeln!(out, "=== Stopped Before Target ===");
            let _ = writeln!(out, "reason: {}", outcome.stop.kind.name());
            if let Some(location) = &outcome.stop.location {
                let _ = writeln!(out, "location: {}:{}", location.type_name, location.line);
            }
            let _ = writeln!(out, "\nDid not reach {}:{}", class_name, line);
        }
        let _ = writeln!(out, "\n=== Stop Details ===\n{}", outcome.stop);
    } else {
        let _ = writeln!(out, "=== Timeout ===");
        let _ = writeln!(out, "target: {}:{}", class_name, line);
        let _ = writeln!(out, "timeout_seconds: {}", timeout);
        let _ = writeln!(out, "\nThe VM is still running; the line was not reached.");
    }
    let _ = writeln!(
        out,
        "\ntemporary_breakpoint_removed: {}",
        outcome.breakpoint_removed
    );
    Ok(out)
}

pub async fn smart_step_into(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let outcome = debugger
        .smart_step_into(
            opt_u64(args, "threadId"),
            opt_str(args, "targetMethod"),
            opt_str(args, "targetClass"),
        )
        .await?;

    match outcome {
        SmartStepOutcome::Candidates {
            location,
            methods,
            truncated,
        } => {
            let mut out = String::new();
            let _ = writeln!(out, "=== Smart Step Into ===");
            let _ = writeln!(out, "Current location: {}", location);
            if methods.is_empty() {
                let _ = writeln!(
                    out,
                    "\nNo callable methods detected here. Use step_into for a plain step."
                );
            } else {
                let _ = writeln!(out, "\nPotential methods to step into:\n");
                for m in &methods {
                    let _ = writeln!(out, "  - {} ({})", m.method_name, m.class_name);
                }
                if truncated {
                    let _ = writeln!(out, "  ... and more");
                }
                let _ = writeln!(
                    out,
                    "\nStep into one with smart_step_into(targetMethod=\"name\")."
                );
            }
            Ok(out)
        }
        SmartStepOutcome::Stepping {
            target_method,
            target_class,
        } => {
            let mut out = format!("Stepping into: {}", target_method);
            if let Some(class) = target_class {
                let _ = write!(out, " in {}", class);
            }
            out.push_str("\n\nVM resumed. Use wait_for_stop, then debug_status.");
            Ok(out)
        }
    }
}

pub async fn execution_location(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = pick_thread(target.as_ref(), opt_u64(args, "threadId")).await?;
    require_suspended(target.as_ref(), &thread).await?;

    let frames = target.frames(&thread).await?;
    let Some(top) = frames.first() else {
        return Ok(format!(
            "Thread {} ({}) has no stack frames.",
            thread.name, thread.id
        ));
    };

    let mut out = String::new();
    let _ = writeln!(out, "thread: {} (id: {})", thread.name, thread.id);
    let _ = writeln!(out, "class: {}", top.location.type_name);
    let _ = writeln!(out, "method: {}", top.location.method_name);
    let _ = writeln!(out, "line: {}", top.location.line);
    if top.location.is_native() {
        let _ = writeln!(out, "note: native frame");
    }
    let _ = writeln!(out, "frames_total: {}", frames.len());
    Ok(out)
}
