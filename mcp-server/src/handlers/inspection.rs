// Thread, frame and object inspection tools

use super::{opt_bool, opt_u64, required_str, required_u64};
use crate::async_stack::async_stack_summary;
use crate::error::DebugResult;
use crate::session::Debugger;
use crate::thread_ops::{
    array_elements as read_array, frame_at, is_system_thread, object_by_id, pick_thread,
    require_suspended, resolve_class, thread_by_id,
};
use serde_json::Value;
use std::fmt::Write;

pub async fn threads_list(debugger: &Debugger) -> DebugResult<String> {
    let target = debugger.target().await?;
    let threads = target.all_threads().await?;

    let mut out = format!("{} thread(s):\n\n", threads.len());
    for thread in threads {
        let suspended = target.is_suspended(&thread).await.unwrap_or(false);
        let _ = writeln!(
            out,
            "  {} (id: {}) [{}]{}",
            thread.name,
            thread.id,
            if suspended { "suspended" } else { "running" },
            if is_system_thread(&thread) {
                " (system)"
            } else {
                ""
            }
        );
    }
    Ok(out)
}

pub async fn thread_suspend(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    target.suspend_thread(&thread).await?;
    Ok(format!("Thread suspended: {} (id: {})", thread.name, thread.id))
}

pub async fn thread_resume(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    target.resume_thread(&thread).await?;
    Ok(format!("Thread resumed: {} (id: {})", thread.name, thread.id))
}

pub async fn stack_frames(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = pick_thread(target.as_ref(), opt_u64(args, "threadId")).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let max_frames = opt_u64(args, "maxFrames").unwrap_or(20) as usize;

    let frames = target.frames(&thread).await?;
    if frames.is_empty() {
        return Ok(format!(
            "Thread {} (id: {}) has no stack frames.",
            thread.name, thread.id
        ));
    }

    let mut out = format!(
        "Stack of {} (id: {}), {} frame(s):\n\n",
        thread.name,
        thread.id,
        frames.len()
    );
    for frame in frames.iter().take(max_frames) {
        let _ = writeln!(out, "  #{} {}", frame.index, frame.location);
    }
    if frames.len() > max_frames {
        let _ = writeln!(out, "  ... {} more frames", frames.len() - max_frames);
    }
    Ok(out)
}

pub enum Scope {
    Locals,
    Arguments,
}

pub async fn variables(debugger: &Debugger, args: &Value, scope: Scope) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

    let (label, bindings) = match scope {
        Scope::Locals => ("local variable", target.visible_locals(&frame).await?),
        Scope::Arguments => ("argument", target.arguments(&frame).await?),
    };

    if bindings.is_empty() {
        return Ok(format!(
            "No {}s visible in frame #{} of {}.",
            label, frame_index, thread.name
        ));
    }

    let mut out = format!(
        "{}(s) in frame #{} ({}):\n\n",
        label,
        frame_index,
        frame.location
    );
    for binding in bindings {
        match target.get_local(&frame, &binding.name).await {
            Ok(value) => {
                let _ = writeln!(out, "  {} = {}", binding.name, value.format());
            }
            Err(e) => {
                let _ = writeln!(out, "  {} = (unavailable: {})", binding.name, e);
            }
        }
    }
    Ok(out)
}

pub async fn variable_inspect(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let name = required_str(args, "name")?;
    let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

    let value = target.get_local(&frame, name).await?;

    let mut out = String::new();
    let _ = writeln!(out, "{} = {}", name, value.format());
    let _ = writeln!(out, "type: {}", value.type_name());
    if let Some(object) = value.as_object() {
        let _ = writeln!(
            out,
            "\nDrill in with object_fields(objectId={}) or array_elements(objectId={}).",
            object.id, object.id
        );
    }
    Ok(out)
}

pub async fn this_object(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread = thread_by_id(target.as_ref(), required_u64(args, "threadId")?).await?;
    require_suspended(target.as_ref(), &thread).await?;
    let frame_index = opt_u64(args, "frameIndex").unwrap_or(0) as usize;
    let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

    match target.this_object(&frame).await? {
        Some(this) => Ok(format!(
            "this = ({}) @{}\n\nUse object_fields(objectId={}) to inspect.",
            this.type_name, this.id, this.id
        )),
        None => Ok("No `this` in a static context.".to_string()),
    }
}

pub async fn object_fields(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let object = object_by_id(target.as_ref(), required_u64(args, "objectId")?).await?;
    let type_ref = resolve_class(target.as_ref(), &object.type_name).await?;
    let fields = target.fields_of(&type_ref).await?;

    let mut out = format!("({}) @{}\n\n", object.type_name, object.id);
    if fields.is_empty() {
        out.push_str("No fields.\n");
        return Ok(out);
    }

    for field in fields {
        let read = if field.is_static {
            target.get_static_field(&type_ref, &field).await
        } else {
            target.get_field(&object, &field).await
        };
        let suffix = if field.is_static { " (static)" } else { "" };
        match read {
            Ok(value) => {
                let _ = writeln!(out, "  {}{} = {}", field.name, suffix, value.format());
            }
            Err(e) => {
                let _ = writeln!(out, "  {}{} = (unavailable: {})", field.name, suffix, e);
            }
        }
    }
    Ok(out)
}

pub async fn array_elements(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let array = object_by_id(target.as_ref(), required_u64(args, "objectId")?).await?;
    let start = opt_u64(args, "startIndex").unwrap_or(0) as usize;
    let count = opt_u64(args, "count").unwrap_or(20) as usize;

    let (length, values) = read_array(target.as_ref(), &array, start, count).await?;

    let mut out = format!(
        "({}) @{}, length {}\nshowing [{}..{}):\n\n",
        array.type_name,
        array.id,
        length,
        start,
        start + values.len()
    );
    for (offset, value) in values.iter().enumerate() {
        let _ = writeln!(out, "  [{}] = {}", start + offset, value.format());
    }
    if start + values.len() < length {
        let _ = writeln!(
            out,
            "\n{} more element(s); continue with startIndex={}.",
            length - start - values.len(),
            start + values.len()
        );
    }
    Ok(out)
}

pub async fn async_stack_trace(debugger: &Debugger, args: &Value) -> DebugResult<String> {
    let target = debugger.target().await?;
    let thread_id = opt_u64(args, "threadId");
    let show_all = opt_bool(args, "showAllSuspended").unwrap_or(false);
    let max_frames = opt_u64(args, "maxFrames").unwrap_or(15) as usize;
    async_stack_summary(target.as_ref(), thread_id, show_all, max_frames).await
}
