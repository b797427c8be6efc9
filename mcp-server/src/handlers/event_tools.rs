// Event monitoring tools

use super::{opt_bool, opt_str, required_str};
use crate::error::DebugResult;
use crate::session::Debugger;
use serde_json::Value;
use std::fmt::Write;

pub async fn class_prepare_watch(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let filter = opt_str(args, "classFilter");
    let id = debugger
        .monitor()
        .watch_class_prepare(target.as_ref(), filter)
        .await?;
    Ok(watch_created(&id, "class prepare", filter))
}

pub async fn class_unload_watch(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let filter = opt_str(args, "classFilter");
    let id = debugger
        .monitor()
        .watch_class_unload(target.as_ref(), filter)
        .await?;
    Ok(watch_created(&id, "class unload", filter))
}

pub async fn thread_start_watch(debugger: &Debugger) -> DebugResult<String> {
    let target = debugger.target().await?;
    let id = debugger.monitor().watch_thread_start(target.as_ref()).await?;
    Ok(watch_created(&id, "thread start", None))
}

pub async fn thread_death_watch(debugger: &Debugger) -> DebugResult<String> {
    let target = debugger.target().await?;
    let id = debugger.monitor().watch_thread_death(target.as_ref()).await?;
    Ok(watch_created(&id, "thread death", None))
}

pub async fn monitor_contention_watch(debugger: &Debugger) -> DebugResult<String> {
    let target = debugger.target().await?;
    let id = debugger
        .monitor()
        .watch_monitor_contention(target.as_ref())
        .await?;
    Ok(watch_created(&id, "monitor contention", None))
}

fn watch_created(id: &str, kind: &str, filter: Option<&str>) -> String {
    let mut out = format!("Event watch created: {}\nkind: {}\n", id, kind);
    if let Some(filter) = filter {
        let _ = writeln!(out, "filter: {}", filter);
    }
    out.push_str("\nEvents accumulate without stopping the VM; drain with events_pending.");
    out
}

pub async fn events_pending(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let _ = debugger.target().await?;
    let peek = opt_bool(args, "peek").unwrap_or(false);

    let events = if peek {
        debugger.monitor().peek_pending()
    } else {
        debugger.monitor().drain_pending()
    };

    if events.is_empty() {
        return Ok("No pending events.".to_string());
    }

    let mut out = format!(
        "{} pending event(s){}:\n\n",
        events.len(),
        if peek { " (peek)" } else { "" }
    );
    for event in events {
        let _ = writeln!(out, "  {}", event.render());
    }
    Ok(out)
}

pub async fn event_watch_remove(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let id = required_str(args, "watchId")?;
    debugger.monitor().remove_watch(target.as_ref(), id).await?;
    Ok(format!("Event watch removed: {}", id))
}
