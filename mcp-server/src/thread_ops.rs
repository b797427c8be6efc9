// Suspended-thread operations
//
// Everything here requires the named thread to be suspended: frame
// walking, variable access, object/array inspection, stepping, method
// invocation, run-to-line and smart step-into. Execution-control pieces
// coordinate with the session to clear the stop reason before resuming.

use crate::error::{DebugError, DebugResult};
use crate::session::Debugger;
use debug_adapter::{
    DebugTarget, FrameRef, InvokeOutcome, MethodRef, ObjectRef, StepDepth, SuspendPolicy,
    ThreadRef, TypeRef, Value,
};
use serde_json::Value as Json;
use std::time::Duration;
use tracing::debug;

const SMART_STEP_CANDIDATE_CAP: usize = 20;

// Threads the broker never picks implicitly
const SYSTEM_THREAD_PREFIXES: &[&str] = &[
    "Reference Handler",
    "Finalizer",
    "Signal Dispatcher",
    "Attach Listener",
    "Common-Cleaner",
    "Notification Thread",
];

pub fn is_system_thread(thread: &ThreadRef) -> bool {
    SYSTEM_THREAD_PREFIXES
        .iter()
        .any(|prefix| thread.name.starts_with(prefix))
}

pub async fn thread_by_id(target: &dyn DebugTarget, thread_id: u64) -> DebugResult<ThreadRef> {
    target
        .all_threads()
        .await?
        .into_iter()
        .find(|t| t.id == thread_id)
        .ok_or(DebugError::ThreadNotFound(thread_id))
}

/// The explicitly named thread, or the first suspended non-system one.
pub async fn pick_thread(
    target: &dyn DebugTarget,
    thread_id: Option<u64>,
) -> DebugResult<ThreadRef> {
    if let Some(id) = thread_id {
        return thread_by_id(target, id).await;
    }
    for thread in target.all_threads().await? {
        if is_system_thread(&thread) {
            continue;
        }
        if target.is_suspended(&thread).await? {
            return Ok(thread);
        }
    }
    Err(DebugError::ThreadNotSuspended(0))
}

pub async fn require_suspended(target: &dyn DebugTarget, thread: &ThreadRef) -> DebugResult<()> {
    if target.is_suspended(thread).await? {
        Ok(())
    } else {
        Err(DebugError::ThreadNotSuspended(thread.id))
    }
}

pub async fn frame_at(
    target: &dyn DebugTarget,
    thread: &ThreadRef,
    index: usize,
) -> DebugResult<FrameRef> {
    let frames = target.frames(thread).await?;
    let max = frames.len().saturating_sub(1);
    frames
        .into_iter()
        .nth(index)
        .ok_or(DebugError::FrameOutOfRange { index, max })
}

/// Object-by-id resolution: scan every suspended thread's frames,
/// checking `this` and each visible binding. Linear on purpose; the
/// adapter offers no global object index.
pub async fn find_object_by_id(
    target: &dyn DebugTarget,
    object_id: u64,
) -> DebugResult<Option<ObjectRef>> {
    for thread in target.all_threads().await? {
        if !target.is_suspended(&thread).await.unwrap_or(false) {
            continue;
        }
        let frames = match target.frames(&thread).await {
            Ok(frames) => frames,
            Err(_) => continue,
        };
        for frame in frames {
            if let Ok(Some(this)) = target.this_object(&frame).await {
                if this.id == object_id {
                    return Ok(Some(this));
                }
            }
            let mut bindings = match target.visible_locals(&frame).await {
                Ok(locals) => locals,
                Err(_) => continue,
            };
            if let Ok(arguments) = target.arguments(&frame).await {
                bindings.extend(arguments);
            }
            for binding in bindings {
                if let Ok(value) = target.get_local(&frame, &binding.name).await {
                    if let Some(object) = value.as_object() {
                        if object.id == object_id {
                            return Ok(Some(object.clone()));
                        }
                    }
                }
            }
        }
    }
    Ok(None)
}

pub async fn object_by_id(target: &dyn DebugTarget, object_id: u64) -> DebugResult<ObjectRef> {
    find_object_by_id(target, object_id)
        .await?
        .ok_or(DebugError::ObjectNotFound(object_id))
}

/// Bounds-checked array read: start == length is out of range, a count
/// running past the end yields the truncated suffix.
pub async fn array_elements(
    target: &dyn DebugTarget,
    array: &ObjectRef,
    start: usize,
    count: usize,
) -> DebugResult<(usize, Vec<Value>)> {
    let length = target.array_length(array).await?;
    if start >= length {
        return Err(DebugError::InvalidParams(format!(
            "start index {} out of range (array length {})",
            start, length
        )));
    }
    let values = target.array_slice(array, start, count).await?;
    Ok((length, values))
}

#[derive(Debug)]
pub struct RunToLineOutcome {
    pub stop: crate::stop_reason::StopReason,
    pub hit_target: bool,
    pub breakpoint_removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCandidate {
    pub class_name: String,
    pub method_name: String,
}

#[derive(Debug)]
pub enum SmartStepOutcome {
    /// List mode: plausibly callable methods at the current location.
    Candidates {
        location: debug_adapter::Location,
        methods: Vec<MethodCandidate>,
        truncated: bool,
    },
    /// Step mode: a filtered step was submitted and the target resumed.
    Stepping {
        target_method: String,
        target_class: Option<String>,
    },
}

impl Debugger {
    /// Create a one-shot line step and resume. Any stale step request on
    /// the thread is deleted first.
    pub async fn step(&self, thread_id: Option<u64>, depth: StepDepth) -> DebugResult<ThreadRef> {
        let target = self.target().await?;
        let thread = pick_thread(target.as_ref(), thread_id).await?;
        require_suspended(target.as_ref(), &thread).await?;

        let frames = target.frames(&thread).await?;
        let top = frames.first().ok_or(DebugError::NativeFrame)?;
        if top.location.is_native() {
            return Err(DebugError::NativeFrame);
        }

        target.delete_steps_for_thread(&thread).await?;
        target
            .create_step(&thread, depth, None, None, SuspendPolicy::All)
            .await?;
        self.clear_stop_reason();
        target.resume_all().await?;
        Ok(thread)
    }

    /// Temporary breakpoint + resume + wait + unconditional removal.
    pub async fn run_to_line(
        &self,
        class_name: &str,
        line: i32,
        timeout: Duration,
    ) -> DebugResult<RunToLineOutcome> {
        let target = self.target().await?;
        let record = self.breakpoints().set(target.as_ref(), class_name, line).await?;

        self.clear_stop_reason();
        if let Err(e) = target.resume_all().await {
            let _ = self.breakpoints().remove(target.as_ref(), &record.id).await;
            return Err(e.into());
        }

        let stop = self.wait_for_stop(timeout).await;

        // The breakpoint goes away on every path, including timeout.
        let breakpoint_removed = match self.breakpoints().remove(target.as_ref(), &record.id).await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("run_to_line cleanup: {}", e);
                false
            }
        };

        let hit_target = stop
            .location
            .as_ref()
            .map(|l| l.type_name == class_name && l.line == line)
            .unwrap_or(false);

        Ok(RunToLineOutcome {
            stop,
            hit_target,
            breakpoint_removed,
        })
    }

    /// Step into a specific method on the current line, or enumerate the
    /// plausible candidates when no target method is given.
    pub async fn smart_step_into(
        &self,
        thread_id: Option<u64>,
        target_method: Option<&str>,
        target_class: Option<&str>,
    ) -> DebugResult<SmartStepOutcome> {
        let target = self.target().await?;
        let thread = pick_thread(target.as_ref(), thread_id).await?;
        require_suspended(target.as_ref(), &thread).await?;

        let frames = target.frames(&thread).await?;
        let top = frames.first().ok_or(DebugError::NativeFrame)?;

        match target_method {
            None | Some("") => {
                let (methods, truncated) =
                    callable_methods(target.as_ref(), top).await?;
                Ok(SmartStepOutcome::Candidates {
                    location: top.location.clone(),
                    methods,
                    truncated,
                })
            }
            Some(method) => {
                target.delete_steps_for_thread(&thread).await?;
                target
                    .create_step(
                        &thread,
                        StepDepth::Into,
                        target_class,
                        Some(1),
                        SuspendPolicy::All,
                    )
                    .await?;
                self.clear_stop_reason();
                target.resume_all().await?;
                Ok(SmartStepOutcome::Stepping {
                    target_method: method.to_string(),
                    target_class: target_class.map(|c| c.to_string()),
                })
            }
        }
    }

    /// Invoke an instance method on an object found by id.
    pub async fn invoke_on_object(
        &self,
        thread_id: u64,
        object_id: u64,
        method_name: &str,
        json_args: &[Json],
    ) -> DebugResult<(MethodRef, InvokeOutcome)> {
        let target = self.target().await?;
        let thread = thread_by_id(target.as_ref(), thread_id).await?;
        require_suspended(target.as_ref(), &thread).await?;

        let object = object_by_id(target.as_ref(), object_id).await?;
        let type_ref = resolve_class(target.as_ref(), &object.type_name).await?;
        let method = select_method(target.as_ref(), &type_ref, method_name, json_args.len()).await?;
        let args = marshal_arguments(target.as_ref(), &method, json_args).await?;

        let outcome = target
            .invoke_instance(&thread, &object, &method, args)
            .await?;
        Ok((method, outcome))
    }

    /// Invoke a static method on a class.
    pub async fn invoke_on_class(
        &self,
        thread_id: u64,
        class_name: &str,
        method_name: &str,
        json_args: &[Json],
    ) -> DebugResult<(MethodRef, InvokeOutcome)> {
        let target = self.target().await?;
        let thread = thread_by_id(target.as_ref(), thread_id).await?;
        require_suspended(target.as_ref(), &thread).await?;

        let type_ref = resolve_class(target.as_ref(), class_name).await?;
        let method = select_method(target.as_ref(), &type_ref, method_name, json_args.len()).await?;
        let args = marshal_arguments(target.as_ref(), &method, json_args).await?;

        let outcome = target.invoke_static(&thread, &type_ref, &method, args).await?;
        Ok((method, outcome))
    }

    /// Assign a frame variable from its textual form.
    pub async fn set_variable(
        &self,
        thread_id: u64,
        frame_index: usize,
        name: &str,
        value_text: &str,
    ) -> DebugResult<Value> {
        let target = self.target().await?;
        let thread = thread_by_id(target.as_ref(), thread_id).await?;
        require_suspended(target.as_ref(), &thread).await?;
        let frame = frame_at(target.as_ref(), &thread, frame_index).await?;

        let mut bindings = target.visible_locals(&frame).await?;
        bindings.extend(target.arguments(&frame).await?);
        let variable = bindings
            .into_iter()
            .find(|v| v.name == name)
            .ok_or_else(|| DebugError::NotFound(format!("variable {}", name)))?;

        let value = parse_value_text(target.as_ref(), &variable.type_name, value_text).await?;
        target.set_local(&frame, name, value.clone()).await?;
        Ok(value)
    }
}

pub(crate) fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub async fn resolve_class(target: &dyn DebugTarget, class_name: &str) -> DebugResult<TypeRef> {
    target
        .classes_by_name(class_name)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DebugError::ClassNotFound(class_name.to_string()))
}

/// Arity-first method choice, declaration order breaking ties.
async fn select_method(
    target: &dyn DebugTarget,
    type_ref: &TypeRef,
    method_name: &str,
    arity: usize,
) -> DebugResult<MethodRef> {
    let methods = target.methods_by_name(type_ref, method_name).await?;
    if methods.is_empty() {
        return Err(DebugError::MethodNotFound {
            class: type_ref.name.clone(),
            method: method_name.to_string(),
        });
    }
    if let Some(method) = methods.iter().find(|m| m.arg_type_names.len() == arity) {
        return Ok(method.clone());
    }
    if methods.len() == 1 {
        return Ok(methods[0].clone());
    }
    Err(DebugError::OverloadAmbiguous(format!(
        "no overload of {} takes {} arguments",
        method_name, arity
    )))
}

async fn marshal_arguments(
    target: &dyn DebugTarget,
    method: &MethodRef,
    json_args: &[Json],
) -> DebugResult<Vec<Value>> {
    let mut values = Vec::with_capacity(json_args.len());
    for (i, json) in json_args.iter().enumerate() {
        let declared = method
            .arg_type_names
            .get(i)
            .map(String::as_str)
            .unwrap_or("java.lang.Object");
        values.push(decode_argument(target, json, declared).await?);
    }
    Ok(values)
}

/// JSON value + declared parameter type -> mirrored value. Unknown
/// combinations fail rather than coerce.
pub async fn decode_argument(
    target: &dyn DebugTarget,
    json: &Json,
    declared_type: &str,
) -> DebugResult<Value> {
    let mismatch = |got: &str| DebugError::TypeMismatch {
        expected: declared_type.to_string(),
        got: got.to_string(),
    };

    if json.is_null() {
        return Ok(Value::Null);
    }

    match declared_type {
        "boolean" => json.as_bool().map(Value::Boolean).ok_or_else(|| mismatch("non-boolean")),
        "byte" => json
            .as_i64()
            .and_then(|v| i8::try_from(v).ok())
            .map(Value::Byte)
            .ok_or_else(|| mismatch("non-byte")),
        "short" => json
            .as_i64()
            .and_then(|v| i16::try_from(v).ok())
            .map(Value::Short)
            .ok_or_else(|| mismatch("non-short")),
        "int" => json
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch("non-int")),
        "long" => json.as_i64().map(Value::Long).ok_or_else(|| mismatch("non-long")),
        "float" => json
            .as_f64()
            .map(|v| Value::Float(v as f32))
            .ok_or_else(|| mismatch("non-float")),
        "double" => json.as_f64().map(Value::Double).ok_or_else(|| mismatch("non-double")),
        "char" => {
            let s = json.as_str().ok_or_else(|| mismatch("non-char"))?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(mismatch("multi-char string")),
            }
        }
        "java.lang.String" => json
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| mismatch("non-string")),
        _ => {
            // Reference parameter: accept an "@id" object handle
            let s = json.as_str().ok_or_else(|| mismatch(json_kind(json)))?;
            let id_text = s.strip_prefix('@').ok_or_else(|| mismatch("plain string"))?;
            let id: u64 = id_text
                .parse()
                .map_err(|_| mismatch("malformed object handle"))?;
            let object = object_by_id(target, id).await?;
            Ok(Value::Object(object))
        }
    }
}

/// Textual assignment form: "null", "@id", a quoted or bare string for
/// String variables, or a primitive literal parsed per the declared
/// type.
pub async fn parse_value_text(
    target: &dyn DebugTarget,
    declared_type: &str,
    text: &str,
) -> DebugResult<Value> {
    let text = text.trim();
    let mismatch = || DebugError::TypeMismatch {
        expected: declared_type.to_string(),
        got: text.to_string(),
    };

    if text == "null" {
        return Ok(Value::Null);
    }
    if let Some(id_text) = text.strip_prefix('@') {
        let id: u64 = id_text.parse().map_err(|_| mismatch())?;
        return Ok(Value::Object(object_by_id(target, id).await?));
    }

    match declared_type {
        "boolean" => text.parse().map(Value::Boolean).map_err(|_| mismatch()),
        "byte" => text.parse().map(Value::Byte).map_err(|_| mismatch()),
        "short" => text.parse().map(Value::Short).map_err(|_| mismatch()),
        "int" => text.parse().map(Value::Int).map_err(|_| mismatch()),
        "long" => text
            .trim_end_matches(['L', 'l'])
            .parse()
            .map(Value::Long)
            .map_err(|_| mismatch()),
        "float" => text
            .trim_end_matches(['F', 'f'])
            .parse()
            .map(Value::Float)
            .map_err(|_| mismatch()),
        "double" => text.parse().map(Value::Double).map_err(|_| mismatch()),
        "char" => {
            let inner = text.strip_prefix('\'').and_then(|s| s.strip_suffix('\''));
            let s = inner.unwrap_or(text);
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(mismatch()),
            }
        }
        "java.lang.String" => {
            let inner = text.strip_prefix('"').and_then(|s| s.strip_suffix('"'));
            Ok(Value::Str(inner.unwrap_or(text).to_string()))
        }
        _ => Err(mismatch()),
    }
}

/// Methods plausibly callable from a frame: the declaring type's own
/// methods plus those of visible variables' types, constructors and
/// initializers excluded.
async fn callable_methods(
    target: &dyn DebugTarget,
    frame: &FrameRef,
) -> DebugResult<(Vec<MethodCandidate>, bool)> {
    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();
    let mut truncated = false;

    if let Some(declaring) = target
        .classes_by_name(&frame.location.type_name)
        .await?
        .into_iter()
        .next()
    {
        for method in target.all_methods(&declaring).await? {
            push_candidate(
                &mut seen,
                &mut candidates,
                &mut truncated,
                &frame.location.method_name,
                &declaring.name,
                &method,
            );
        }
    }

    let mut bindings = target.visible_locals(frame).await.unwrap_or_default();
    bindings.extend(target.arguments(frame).await.unwrap_or_default());
    for binding in bindings {
        if truncated {
            break;
        }
        let Some(type_ref) = target
            .classes_by_name(&binding.type_name)
            .await?
            .into_iter()
            .next()
        else {
            continue;
        };
        for method in target.all_methods(&type_ref).await? {
            push_candidate(
                &mut seen,
                &mut candidates,
                &mut truncated,
                &frame.location.method_name,
                &type_ref.name,
                &method,
            );
        }
    }

    Ok((candidates, truncated))
}

fn push_candidate(
    seen: &mut std::collections::HashSet<String>,
    out: &mut Vec<MethodCandidate>,
    truncated: &mut bool,
    current_method: &str,
    class_name: &str,
    method: &MethodRef,
) {
    if *truncated || method.name.starts_with('<') || method.name == current_method {
        return;
    }
    if seen.insert(format!("{}.{}", class_name, method.name)) {
        if out.len() >= SMART_STEP_CANDIDATE_CAP {
            *truncated = true;
            return;
        }
        out.push(MethodCandidate {
            class_name: class_name.to_string(),
            method_name: method.name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Debugger;
    use debug_adapter::testkit::{RequestKind, ScriptedConnector, ScriptedTarget};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    async fn connected() -> (Arc<ScriptedTarget>, Debugger) {
        let target = Arc::new(ScriptedTarget::new());
        let debugger = Debugger::new(Arc::new(ScriptedConnector::new(target.clone())));
        debugger
            .attach_socket("localhost", 5005, false, Duration::from_secs(1))
            .await
            .unwrap();
        (target, debugger)
    }

    #[tokio::test]
    async fn step_requires_a_suspended_java_frame() {
        let (target, debugger) = connected().await;
        target.add_thread(1, "main", false);

        let err = debugger.step(Some(1), StepDepth::Over).await.unwrap_err();
        assert!(matches!(err, DebugError::ThreadNotSuspended(1)));

        target.suspend_all().await.unwrap();
        target.push_frame(1, "libc", "native_call", -1);
        let err = debugger.step(Some(1), StepDepth::Over).await.unwrap_err();
        assert!(matches!(err, DebugError::NativeFrame));
    }

    #[tokio::test]
    async fn step_deletes_stale_requests_and_resumes() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[10]);
        let thread = target.add_thread(1, "main", true);
        target.push_frame(1, "C", "run", 10);

        // Stale step request from an earlier step
        target
            .create_step(&thread, StepDepth::Into, None, None, SuspendPolicy::All)
            .await
            .unwrap();

        debugger.step(Some(1), StepDepth::Over).await.unwrap();
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::Step { .. })),
            1
        );
        assert_eq!(target.resume_all_count(), 1);
        assert!(!debugger.is_stopped());
    }

    #[tokio::test]
    async fn find_object_scans_this_and_locals() {
        let (target, _debugger) = connected().await;
        target.add_class("C", &[10]);
        target.add_thread(1, "main", true);
        target.push_frame(1, "C", "run", 10);
        let order = target.add_object(88, "com.example.Order");
        target.add_local(1, 0, "order", Value::Object(order));

        let found = find_object_by_id(&*target, 88).await.unwrap().unwrap();
        assert_eq!(found.id, 88);
        assert!(find_object_by_id(&*target, 89).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn array_bounds_behaviour() {
        let (target, _debugger) = connected().await;
        let array = target.add_array(
            300,
            "int",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        );

        // start == length is out of range
        let err = array_elements(&*target, &array, 3, 1).await.unwrap_err();
        assert!(matches!(err, DebugError::InvalidParams(_)));

        // count past the end returns the truncated suffix
        let (length, values) = array_elements(&*target, &array, 1, 10).await.unwrap();
        assert_eq!(length, 3);
        assert_eq!(values, vec![Value::Int(2), Value::Int(3)]);
    }

    #[tokio::test]
    async fn set_variable_parses_by_declared_type() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[10]);
        target.add_thread(1, "main", true);
        target.push_frame(1, "C", "run", 10);
        target.add_local(1, 0, "count", Value::Int(3));
        target.add_local(1, 0, "label", Value::Str("old".into()));

        let value = debugger.set_variable(1, 0, "count", "42").await.unwrap();
        assert_eq!(value, Value::Int(42));

        let value = debugger
            .set_variable(1, 0, "label", "\"new\"")
            .await
            .unwrap();
        assert_eq!(value, Value::Str("new".into()));

        let err = debugger
            .set_variable(1, 0, "count", "not-a-number")
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn invocation_marshals_json_arguments() {
        let (target, debugger) = connected().await;
        target.add_class("com.example.Cart", &[10]);
        target.add_method("com.example.Cart", "add", &["int"], "void");
        target.add_thread(1, "main", true);
        target.push_frame(1, "com.example.Cart", "run", 10);
        let cart = target.add_object(500, "com.example.Cart");
        target.add_local(1, 0, "cart", Value::Object(cart));
        target.set_invoke_result(
            "com.example.Cart",
            "add",
            InvokeOutcome::Returned(Value::Null),
        );

        let (method, outcome) = debugger
            .invoke_on_object(1, 500, "add", &[json!(5)])
            .await
            .unwrap();
        assert_eq!(method.name, "add");
        assert_eq!(outcome, InvokeOutcome::Returned(Value::Null));

        let err = debugger
            .invoke_on_object(1, 500, "add", &[json!("five")])
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn run_to_line_removes_breakpoint_on_timeout() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[15, 20]);
        target.add_thread(1, "main", true);

        let outcome = debugger
            .run_to_line("C", 20, Duration::from_millis(150))
            .await
            .unwrap();
        assert!(!outcome.stop.is_stopped());
        assert!(!outcome.hit_target);
        assert!(outcome.breakpoint_removed);
        assert!(debugger.breakpoints().list().is_empty());
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::Breakpoint(_))),
            0
        );
    }

    #[tokio::test]
    async fn smart_step_listing_dedupes_and_caps() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[10]);
        target.add_method("C", "helper", &[], "void");
        target.add_method("C", "helper", &["int"], "void");
        target.add_method("C", "<init>", &[], "void");
        target.add_thread(1, "main", true);
        target.push_frame(1, "C", "run", 10);

        let outcome = debugger.smart_step_into(Some(1), None, None).await.unwrap();
        match outcome {
            SmartStepOutcome::Candidates { methods, .. } => {
                // helper deduped, constructor and current method excluded
                assert_eq!(
                    methods,
                    vec![MethodCandidate {
                        class_name: "C".into(),
                        method_name: "helper".into()
                    }]
                );
            }
            other => panic!("expected candidates, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn smart_step_submits_filtered_step() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[10]);
        target.add_thread(1, "main", true);
        target.push_frame(1, "C", "run", 10);

        let outcome = debugger
            .smart_step_into(Some(1), Some("process"), Some("C"))
            .await
            .unwrap();
        assert!(matches!(outcome, SmartStepOutcome::Stepping { .. }));
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::Step { .. })),
            1
        );
        assert_eq!(target.resume_all_count(), 1);
    }
}
