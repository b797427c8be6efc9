// Session lifecycle tools

use super::{opt_bool, opt_str, required_str, required_u64, timeout_secs};
use crate::error::DebugResult;
use crate::launch::GradleTestLaunch;
use crate::session::Debugger;
use serde_json::Value;
use std::fmt::Write;
use std::time::Duration;

pub async fn debug_launch(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let main_class = required_str(args, "mainClass")?;
    let classpath = opt_str(args, "classpath");
    let jvm_args: Vec<String> = opt_str(args, "jvmArgs")
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let suspend = opt_bool(args, "suspend").unwrap_or(true);

    let details = debugger
        .launch(main_class, classpath, &jvm_args, suspend)
        .await?;

    Ok(format!(
        "=== Debug Launch ===\n{}\nsuspended_on_start: {}\n\n\
         Set breakpoints now, then resume() and wait_for_stop().",
        details, suspend
    ))
}

pub async fn debug_launch_gradle_test(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let config = GradleTestLaunch {
        project_dir: opt_str(args, "projectDir").map(str::to_string),
        test_filter: opt_str(args, "testFilter").map(str::to_string),
        port: super::opt_u64(args, "port").unwrap_or(5005) as u16,
        wait_timeout: Duration::from_secs(timeout_secs(args, "waitTimeout", 120, 300)),
        gradle_args: opt_str(args, "gradleArgs")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        use_wrapper: opt_bool(args, "useWrapper").unwrap_or(true),
        clean: opt_bool(args, "clean").unwrap_or(false),
    };

    let details = debugger.launch_gradle_test(config).await?;
    Ok(format!(
        "=== Gradle Test Launch ===\n{}\n\n\
         The test JVM is suspended. Set breakpoints, then resume().",
        details
    ))
}

pub async fn debug_attach_socket(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let host = opt_str(args, "host").unwrap_or("localhost");
    let port = required_u64(args, "port")? as u16;
    let wait = opt_bool(args, "waitForPort").unwrap_or(false);
    let wait_timeout = Duration::from_secs(timeout_secs(args, "waitTimeout", 60, 300));

    let details = debugger.attach_socket(host, port, wait, wait_timeout).await?;
    Ok(format!(
        "{}\n\nUse debug_status to inspect, breakpoint_set to plant breakpoints.",
        details
    ))
}

pub async fn debug_attach_pid(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let pid = required_u64(args, "pid")? as u32;
    let details = debugger.attach_pid(pid).await?;
    Ok(format!(
        "{}\n\nUse debug_status to inspect, breakpoint_set to plant breakpoints.",
        details
    ))
}

pub async fn debug_disconnect(debugger: &Debugger) -> DebugResult<String> {
    let was_connected = debugger.is_connected().await;
    debugger.disconnect().await;
    if was_connected {
        Ok("Disconnected. All breakpoints, watches and captured events were cleared.".to_string())
    } else {
        Ok("No active debug session.".to_string())
    }
}

pub async fn debug_status(debugger: &Debugger) -> DebugResult<String> {
    let Some(status) = debugger.status().await else {
        return Ok(
            "state: NOT_CONNECTED\n\nUse debug_launch or debug_attach_socket to start.".to_string(),
        );
    };

    let mut out = String::new();
    let state = if status.stop.is_stopped() {
        "STOPPED"
    } else {
        "RUNNING"
    };
    let _ = writeln!(out, "state: {}", state);
    let _ = writeln!(out, "connection: {}", status.connection_kind);
    let _ = writeln!(out, "details: {}", status.details);
    let _ = writeln!(out, "connected_at_ms: {}", status.connected_at_ms);
    if let Some(event) = &status.last_event {
        let _ = writeln!(out, "last_event: {}", event);
    }

    if status.stop.is_stopped() {
        let _ = writeln!(out, "\n=== Stop Reason ===\n{}", status.stop);
    }

    let _ = writeln!(
        out,
        "\npending_breakpoints: {}\npending_watchpoints: {}\npending_method_breakpoints: {}\ncaptured_events: {}",
        debugger.breakpoints().pending_count(),
        debugger.watchpoints().pending_count(),
        debugger.method_breakpoints().pending_count(),
        debugger.monitor().pending_count(),
    );

    Ok(out)
}

pub async fn vm_info(debugger: &Debugger) -> DebugResult<String> {
    let target = debugger.target().await?;
    let vm = target.vm_description().await?;
    let classes = target.loaded_class_count().await?;
    let threads = target.all_threads().await?.len();

    Ok(format!(
        "=== VM Info ===\nname: {}\nversion: {}\ndescription: {}\nloaded_classes: {}\nthreads: {}\nmonitor_events: {}",
        vm.name, vm.version, vm.description, classes, threads, vm.capabilities.monitor_events
    ))
}
