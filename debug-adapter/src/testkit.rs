// Scripted in-memory target
//
// A DebugTarget whose classes, threads, objects and event stream are
// seeded by the test. Tests drive the broker by pushing event sets and
// asserting on the requests the broker created.

use crate::adapter::{DebugConnector, DebugTarget};
use crate::error::{AdapterError, AdapterResult};
use crate::events::{Event, EventKind, EventSet};
use crate::types::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone)]
struct ScriptedClass {
    type_ref: TypeRef,
    lines: Vec<i32>,
    line_method: HashMap<i32, String>,
    fields: Vec<FieldRef>,
    methods: Vec<MethodRef>,
    statics: Vec<(FieldRef, Value)>,
    throwable: bool,
    has_line_info: bool,
}

#[derive(Debug, Clone)]
struct ScriptedFrame {
    frame: FrameRef,
    locals: Vec<(LocalVariable, Value)>,
    arguments: Vec<(LocalVariable, Value)>,
    this: Option<ObjectRef>,
}

#[derive(Debug, Clone)]
struct ScriptedThread {
    thread: ThreadRef,
    suspended: bool,
    frames: Vec<ScriptedFrame>,
}

#[derive(Debug, Clone)]
struct ScriptedObject {
    object: ObjectRef,
    fields: Vec<(FieldRef, Value)>,
    elements: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Breakpoint(Location),
    AccessWatch(String),
    ModifyWatch(String),
    MethodEntry(String),
    MethodExit(String),
    Exception(Option<String>),
    ClassPrepare,
    ClassUnload,
    ThreadStart,
    ThreadDeath,
    MonitorContended,
    Step { thread_id: ThreadId },
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub kind: RequestKind,
    pub policy: SuspendPolicy,
    pub enabled: bool,
}

#[derive(Default)]
struct State {
    classes: HashMap<String, ScriptedClass>,
    unprepared: HashMap<String, ScriptedClass>,
    threads: Vec<ScriptedThread>,
    objects: HashMap<ObjectId, ScriptedObject>,
    requests: HashMap<RequestId, RequestRecord>,
    deleted_requests: Vec<RequestId>,
    invoke_results: HashMap<(String, String), InvokeOutcome>,
    next_request: RequestId,
    next_type_id: u64,
    next_member_id: u64,
    resume_all_count: u32,
    resumed_sets: u32,
    monitor_events_supported: bool,
}

pub struct ScriptedTarget {
    state: Mutex<State>,
    events: Mutex<VecDeque<EventSet>>,
    disconnected: AtomicBool,
}

impl Default for ScriptedTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTarget {
    pub fn new() -> Self {
        let state = State {
            next_request: 1,
            next_type_id: 1,
            next_member_id: 1,
            monitor_events_supported: true,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            events: Mutex::new(VecDeque::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn set_monitor_events_supported(&self, supported: bool) {
        self.state.lock().unwrap().monitor_events_supported = supported;
    }

    fn build_class(state: &mut State, name: &str, lines: &[i32]) -> ScriptedClass {
        let id = state.next_type_id;
        state.next_type_id += 1;
        ScriptedClass {
            type_ref: TypeRef {
                id,
                name: name.to_string(),
                signature: format!("L{};", name.replace('.', "/")),
            },
            lines: lines.to_vec(),
            line_method: HashMap::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            statics: Vec::new(),
            throwable: false,
            has_line_info: true,
        }
    }

    /// Seed a class that is already prepared (visible to lookups).
    pub fn add_class(&self, name: &str, lines: &[i32]) -> TypeRef {
        let mut state = self.state.lock().unwrap();
        let class = Self::build_class(&mut state, name, lines);
        let type_ref = class.type_ref.clone();
        state.classes.insert(name.to_string(), class);
        type_ref
    }

    /// Seed a class that only becomes visible after `prepare_class`.
    pub fn add_unprepared_class(&self, name: &str, lines: &[i32]) {
        let mut state = self.state.lock().unwrap();
        let class = Self::build_class(&mut state, name, lines);
        state.unprepared.insert(name.to_string(), class);
    }

    /// Move a class to the prepared set, returning its type ref for the
    /// class-prepare event the test will push.
    pub fn prepare_class(&self, name: &str) -> TypeRef {
        let mut state = self.state.lock().unwrap();
        let class = state
            .unprepared
            .remove(name)
            .unwrap_or_else(|| panic!("class {} was not seeded as unprepared", name));
        let type_ref = class.type_ref.clone();
        state.classes.insert(name.to_string(), class);
        type_ref
    }

    pub fn mark_throwable(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.classes.get_mut(name) {
            c.throwable = true;
        }
    }

    pub fn mark_no_line_info(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(c) = state.classes.get_mut(name) {
            c.has_line_info = false;
        }
    }

    pub fn add_field(&self, class: &str, name: &str, type_name: &str) -> FieldRef {
        let mut state = self.state.lock().unwrap();
        let id = state.next_member_id;
        state.next_member_id += 1;
        let field = FieldRef {
            id,
            name: name.to_string(),
            type_name: type_name.to_string(),
            declaring_type: class.to_string(),
            is_static: false,
        };
        let c = class_mut(&mut state, class);
        c.fields.push(field.clone());
        field
    }

    pub fn add_static_field(&self, class: &str, name: &str, type_name: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_member_id;
        state.next_member_id += 1;
        let field = FieldRef {
            id,
            name: name.to_string(),
            type_name: type_name.to_string(),
            declaring_type: class.to_string(),
            is_static: true,
        };
        let c = class_mut(&mut state, class);
        c.fields.push(field.clone());
        c.statics.push((field, value));
    }

    pub fn add_method(
        &self,
        class: &str,
        name: &str,
        arg_type_names: &[&str],
        return_type_name: &str,
    ) -> MethodRef {
        let mut state = self.state.lock().unwrap();
        let id = state.next_member_id;
        state.next_member_id += 1;
        let method = MethodRef {
            id,
            name: name.to_string(),
            signature: format!("({})", arg_type_names.join(",")),
            declaring_type: class.to_string(),
            arg_type_names: arg_type_names.iter().map(|s| s.to_string()).collect(),
            return_type_name: return_type_name.to_string(),
            is_static: false,
        };
        let c = class_mut(&mut state, class);
        c.methods.push(method.clone());
        method
    }

    pub fn set_invoke_result(&self, class: &str, method: &str, outcome: InvokeOutcome) {
        self.state
            .lock()
            .unwrap()
            .invoke_results
            .insert((class.to_string(), method.to_string()), outcome);
    }

    pub fn add_thread(&self, id: ThreadId, name: &str, suspended: bool) -> ThreadRef {
        let thread = ThreadRef {
            id,
            name: name.to_string(),
        };
        self.state.lock().unwrap().threads.push(ScriptedThread {
            thread: thread.clone(),
            suspended,
            frames: Vec::new(),
        });
        thread
    }

    /// Canonical location for a class/line pair, matching what
    /// `locations_at_line` hands out.
    pub fn location(&self, class: &str, method: &str, line: i32) -> Location {
        Location {
            type_name: class.to_string(),
            method_name: method.to_string(),
            method_signature: "()V".to_string(),
            line,
            code_index: line.max(0) as u64,
        }
    }

    pub fn set_line_method(&self, class: &str, line: i32, method: &str) {
        let mut state = self.state.lock().unwrap();
        let c = class_mut(&mut state, class);
        c.line_method.insert(line, method.to_string());
    }

    /// Push a frame onto a thread's stack; frame 0 is pushed last.
    pub fn push_frame(&self, thread_id: ThreadId, class: &str, method: &str, line: i32) {
        let location = self.location(class, method, line);
        let mut state = self.state.lock().unwrap();
        let t = thread_mut(&mut state, thread_id);
        t.frames.insert(
            0,
            ScriptedFrame {
                frame: FrameRef {
                    thread_id,
                    frame_id: 0,
                    index: 0,
                    location,
                },
                locals: Vec::new(),
                arguments: Vec::new(),
                this: None,
            },
        );
        for (i, f) in t.frames.iter_mut().enumerate() {
            f.frame.index = i;
            f.frame.frame_id = (thread_id << 8) | i as u64;
        }
    }

    pub fn add_local(&self, thread_id: ThreadId, frame_index: usize, name: &str, value: Value) {
        let type_name = value.type_name().to_string();
        let mut state = self.state.lock().unwrap();
        let t = thread_mut(&mut state, thread_id);
        t.frames[frame_index].locals.push((
            LocalVariable {
                name: name.to_string(),
                type_name,
            },
            value,
        ));
    }

    pub fn add_argument(&self, thread_id: ThreadId, frame_index: usize, name: &str, value: Value) {
        let type_name = value.type_name().to_string();
        let mut state = self.state.lock().unwrap();
        let t = thread_mut(&mut state, thread_id);
        t.frames[frame_index].arguments.push((
            LocalVariable {
                name: name.to_string(),
                type_name,
            },
            value,
        ));
    }

    pub fn set_this(&self, thread_id: ThreadId, frame_index: usize, object: ObjectRef) {
        let mut state = self.state.lock().unwrap();
        let t = thread_mut(&mut state, thread_id);
        t.frames[frame_index].this = Some(object);
    }

    pub fn add_object(&self, id: ObjectId, type_name: &str) -> ObjectRef {
        let object = ObjectRef {
            id,
            type_name: type_name.to_string(),
        };
        self.state.lock().unwrap().objects.insert(
            id,
            ScriptedObject {
                object: object.clone(),
                fields: Vec::new(),
                elements: None,
            },
        );
        object
    }

    pub fn add_object_field(&self, object_id: ObjectId, name: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_member_id;
        state.next_member_id += 1;
        let obj = state.objects.get_mut(&object_id).expect("unknown object");
        let declaring = obj.object.type_name.clone();
        obj.fields.push((
            FieldRef {
                id,
                name: name.to_string(),
                type_name: value.type_name().to_string(),
                declaring_type: declaring,
                is_static: false,
            },
            value,
        ));
    }

    pub fn add_array(&self, id: ObjectId, element_type: &str, elements: Vec<Value>) -> ObjectRef {
        let object = ObjectRef {
            id,
            type_name: format!("{}[]", element_type),
        };
        self.state.lock().unwrap().objects.insert(
            id,
            ScriptedObject {
                object: object.clone(),
                fields: Vec::new(),
                elements: Some(elements),
            },
        );
        object
    }

    /// Queue a stop set (suspend-ALL) and mark every thread suspended,
    /// as a real target would.
    pub fn push_stop_event(&self, kind: EventKind) {
        self.push_stop_event_for(None, kind);
    }

    pub fn push_stop_event_for(&self, request: Option<RequestHandle>, kind: EventKind) {
        {
            let mut state = self.state.lock().unwrap();
            for t in state.threads.iter_mut() {
                t.suspended = true;
            }
        }
        self.events.lock().unwrap().push_back(EventSet {
            suspend_policy: SuspendPolicy::All,
            events: vec![Event { request, kind }],
        });
    }

    pub fn push_monitor_event(&self, kind: EventKind) {
        self.events.lock().unwrap().push_back(EventSet {
            suspend_policy: SuspendPolicy::None,
            events: vec![Event {
                request: None,
                kind,
            }],
        });
    }

    pub fn push_event_set(&self, set: EventSet) {
        self.events.lock().unwrap().push_back(set);
    }

    /// Flip the target into the disconnected state; subsequent pulls and
    /// commands fail.
    pub fn drop_connection(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    // Assertion helpers

    pub fn request(&self, handle: RequestHandle) -> Option<RequestRecord> {
        self.state.lock().unwrap().requests.get(&handle.0).cloned()
    }

    pub fn live_request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn live_requests_of(&self, pred: impl Fn(&RequestKind) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .values()
            .filter(|r| pred(&r.kind))
            .count()
    }

    pub fn deleted_request_ids(&self) -> Vec<RequestId> {
        self.state.lock().unwrap().deleted_requests.clone()
    }

    pub fn resume_all_count(&self) -> u32 {
        self.state.lock().unwrap().resume_all_count
    }

    pub fn resumed_set_count(&self) -> u32 {
        self.state.lock().unwrap().resumed_sets
    }

    fn check_connected(&self) -> AdapterResult<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            Err(AdapterError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn create_request(&self, kind: RequestKind, policy: SuspendPolicy) -> RequestHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.next_request;
        state.next_request += 1;
        state.requests.insert(
            id,
            RequestRecord {
                kind,
                policy,
                enabled: true,
            },
        );
        RequestHandle(id)
    }
}

fn class_mut<'a>(state: &'a mut State, name: &str) -> &'a mut ScriptedClass {
    if state.classes.contains_key(name) {
        state.classes.get_mut(name).unwrap()
    } else {
        state
            .unprepared
            .get_mut(name)
            .unwrap_or_else(|| panic!("class {} was not seeded", name))
    }
}

fn thread_mut(state: &mut State, id: ThreadId) -> &mut ScriptedThread {
    state
        .threads
        .iter_mut()
        .find(|t| t.thread.id == id)
        .unwrap_or_else(|| panic!("thread {} was not seeded", id))
}

#[async_trait]
impl DebugTarget for ScriptedTarget {
    async fn dispose(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    async fn vm_description(&self) -> AdapterResult<VmDescription> {
        self.check_connected()?;
        let monitor_events = self.state.lock().unwrap().monitor_events_supported;
        Ok(VmDescription {
            name: "Scripted VM".to_string(),
            version: "17.0".to_string(),
            description: "in-memory scripted target".to_string(),
            capabilities: VmCapabilities { monitor_events },
        })
    }

    async fn classes_by_name(&self, name: &str) -> AdapterResult<Vec<TypeRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(name)
            .map(|c| vec![c.type_ref.clone()])
            .unwrap_or_default())
    }

    async fn loaded_class_count(&self) -> AdapterResult<usize> {
        self.check_connected()?;
        Ok(self.state.lock().unwrap().classes.len())
    }

    async fn field_by_name(
        &self,
        type_ref: &TypeRef,
        name: &str,
    ) -> AdapterResult<Option<FieldRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(&type_ref.name)
            .and_then(|c| c.fields.iter().find(|f| f.name == name).cloned()))
    }

    async fn fields_of(&self, type_ref: &TypeRef) -> AdapterResult<Vec<FieldRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(&type_ref.name)
            .map(|c| c.fields.clone())
            .unwrap_or_default())
    }

    async fn methods_by_name(
        &self,
        type_ref: &TypeRef,
        name: &str,
    ) -> AdapterResult<Vec<MethodRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(&type_ref.name)
            .map(|c| {
                c.methods
                    .iter()
                    .filter(|m| m.name == name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn all_methods(&self, type_ref: &TypeRef) -> AdapterResult<Vec<MethodRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(&type_ref.name)
            .map(|c| c.methods.clone())
            .unwrap_or_default())
    }

    async fn locations_at_line(
        &self,
        type_ref: &TypeRef,
        line: i32,
    ) -> AdapterResult<Vec<Location>> {
        self.check_connected()?;
        let (known, method) = {
            let state = self.state.lock().unwrap();
            let class = state.classes.get(&type_ref.name);
            match class {
                Some(c) if !c.has_line_info => return Err(AdapterError::NoDebugInfo),
                Some(c) => (
                    c.lines.contains(&line),
                    c.line_method
                        .get(&line)
                        .cloned()
                        .unwrap_or_else(|| "main".to_string()),
                ),
                None => (false, String::new()),
            }
        };
        if known {
            Ok(vec![self.location(&type_ref.name, &method, line)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn is_throwable(&self, type_ref: &TypeRef) -> AdapterResult<bool> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .classes
            .get(&type_ref.name)
            .map(|c| c.throwable)
            .unwrap_or(false))
    }

    async fn create_breakpoint(
        &self,
        location: &Location,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::Breakpoint(location.clone()), policy))
    }

    async fn create_access_watch(
        &self,
        field: &FieldRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::AccessWatch(field.name.clone()), policy))
    }

    async fn create_modify_watch(
        &self,
        field: &FieldRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::ModifyWatch(field.name.clone()), policy))
    }

    async fn create_method_entry(
        &self,
        type_ref: &TypeRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::MethodEntry(type_ref.name.clone()), policy))
    }

    async fn create_method_exit(
        &self,
        type_ref: &TypeRef,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::MethodExit(type_ref.name.clone()), policy))
    }

    async fn create_exception(
        &self,
        type_ref: Option<&TypeRef>,
        _caught: bool,
        _uncaught: bool,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(
            RequestKind::Exception(type_ref.map(|t| t.name.clone())),
            policy,
        ))
    }

    async fn create_class_prepare_watch(
        &self,
        _class_filter: Option<&str>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::ClassPrepare, policy))
    }

    async fn create_class_unload_watch(
        &self,
        _class_filter: Option<&str>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::ClassUnload, policy))
    }

    async fn create_thread_start_watch(
        &self,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::ThreadStart, policy))
    }

    async fn create_thread_death_watch(
        &self,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::ThreadDeath, policy))
    }

    async fn create_monitor_contended_watch(
        &self,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        if !self.state.lock().unwrap().monitor_events_supported {
            return Err(AdapterError::Unsupported("monitor events".to_string()));
        }
        Ok(self.create_request(RequestKind::MonitorContended, policy))
    }

    async fn create_step(
        &self,
        thread: &ThreadRef,
        _depth: StepDepth,
        _class_filter: Option<&str>,
        _count: Option<u32>,
        policy: SuspendPolicy,
    ) -> AdapterResult<RequestHandle> {
        self.check_connected()?;
        Ok(self.create_request(RequestKind::Step { thread_id: thread.id }, policy))
    }

    async fn enable_request(&self, handle: RequestHandle) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        match state.requests.get_mut(&handle.0) {
            Some(r) => {
                r.enabled = true;
                Ok(())
            }
            None => Err(AdapterError::Protocol(format!(
                "unknown request {}",
                handle.0
            ))),
        }
    }

    async fn disable_request(&self, handle: RequestHandle) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        match state.requests.get_mut(&handle.0) {
            Some(r) => {
                r.enabled = false;
                Ok(())
            }
            None => Err(AdapterError::Protocol(format!(
                "unknown request {}",
                handle.0
            ))),
        }
    }

    async fn delete_request(&self, handle: RequestHandle) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.requests.remove(&handle.0);
        state.deleted_requests.push(handle.0);
        Ok(())
    }

    async fn delete_steps_for_thread(&self, thread: &ThreadRef) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        let doomed: Vec<RequestId> = state
            .requests
            .iter()
            .filter(|(_, r)| r.kind == RequestKind::Step { thread_id: thread.id })
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            state.requests.remove(&id);
            state.deleted_requests.push(id);
        }
        Ok(())
    }

    async fn all_threads(&self) -> AdapterResult<Vec<ThreadRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state.threads.iter().map(|t| t.thread.clone()).collect())
    }

    async fn resume_all(&self) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.resume_all_count += 1;
        for t in state.threads.iter_mut() {
            t.suspended = false;
        }
        Ok(())
    }

    async fn resume_thread(&self, thread: &ThreadRef) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        thread_mut(&mut state, thread.id).suspended = false;
        Ok(())
    }

    async fn suspend_all(&self) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        for t in state.threads.iter_mut() {
            t.suspended = true;
        }
        Ok(())
    }

    async fn suspend_thread(&self, thread: &ThreadRef) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        thread_mut(&mut state, thread.id).suspended = true;
        Ok(())
    }

    async fn is_suspended(&self, thread: &ThreadRef) -> AdapterResult<bool> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .threads
            .iter()
            .find(|t| t.thread.id == thread.id)
            .map(|t| t.suspended)
            .unwrap_or(false))
    }

    async fn frames(&self, thread: &ThreadRef) -> AdapterResult<Vec<FrameRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let t = state
            .threads
            .iter()
            .find(|t| t.thread.id == thread.id)
            .ok_or(AdapterError::InvalidObject(thread.id))?;
        if !t.suspended {
            return Err(AdapterError::ThreadNotSuspended(thread.id));
        }
        Ok(t.frames.iter().map(|f| f.frame.clone()).collect())
    }

    async fn visible_locals(&self, frame: &FrameRef) -> AdapterResult<Vec<LocalVariable>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let f = scripted_frame(&state, frame)?;
        Ok(f.locals.iter().map(|(v, _)| v.clone()).collect())
    }

    async fn arguments(&self, frame: &FrameRef) -> AdapterResult<Vec<LocalVariable>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let f = scripted_frame(&state, frame)?;
        Ok(f.arguments.iter().map(|(v, _)| v.clone()).collect())
    }

    async fn this_object(&self, frame: &FrameRef) -> AdapterResult<Option<ObjectRef>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(scripted_frame(&state, frame)?.this.clone())
    }

    async fn get_local(&self, frame: &FrameRef, name: &str) -> AdapterResult<Value> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let f = scripted_frame(&state, frame)?;
        f.locals
            .iter()
            .chain(f.arguments.iter())
            .find(|(v, _)| v.name == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| AdapterError::Protocol(format!("no such local: {}", name)))
    }

    async fn set_local(&self, frame: &FrameRef, name: &str, value: Value) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        let t = thread_mut(&mut state, frame.thread_id);
        let f = t
            .frames
            .get_mut(frame.index)
            .ok_or(AdapterError::InvalidFrame)?;
        let slot = f
            .locals
            .iter_mut()
            .chain(f.arguments.iter_mut())
            .find(|(v, _)| v.name == name)
            .ok_or_else(|| AdapterError::Protocol(format!("no such local: {}", name)))?;
        slot.1 = value;
        Ok(())
    }

    async fn get_field(&self, object: &ObjectRef, field: &FieldRef) -> AdapterResult<Value> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let obj = state
            .objects
            .get(&object.id)
            .ok_or(AdapterError::InvalidObject(object.id))?;
        obj.fields
            .iter()
            .find(|(f, _)| f.name == field.name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| AdapterError::Protocol(format!("no such field: {}", field.name)))
    }

    async fn get_static_field(
        &self,
        type_ref: &TypeRef,
        field: &FieldRef,
    ) -> AdapterResult<Value> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        state
            .classes
            .get(&type_ref.name)
            .and_then(|c| c.statics.iter().find(|(f, _)| f.name == field.name))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| AdapterError::Protocol(format!("no such static: {}", field.name)))
    }

    async fn array_length(&self, array: &ObjectRef) -> AdapterResult<usize> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&array.id)
            .and_then(|o| o.elements.as_ref())
            .map(|e| e.len())
            .ok_or(AdapterError::InvalidObject(array.id))
    }

    async fn array_slice(
        &self,
        array: &ObjectRef,
        start: usize,
        count: usize,
    ) -> AdapterResult<Vec<Value>> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let elements = state
            .objects
            .get(&array.id)
            .and_then(|o| o.elements.as_ref())
            .ok_or(AdapterError::InvalidObject(array.id))?;
        let end = (start + count).min(elements.len());
        Ok(elements
            .get(start..end)
            .map(|s| s.to_vec())
            .unwrap_or_default())
    }

    async fn invoke_instance(
        &self,
        thread: &ThreadRef,
        object: &ObjectRef,
        method: &MethodRef,
        _args: Vec<Value>,
    ) -> AdapterResult<InvokeOutcome> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        let suspended = state
            .threads
            .iter()
            .find(|t| t.thread.id == thread.id)
            .map(|t| t.suspended)
            .unwrap_or(false);
        if !suspended {
            return Err(AdapterError::ThreadNotSuspended(thread.id));
        }
        Ok(state
            .invoke_results
            .get(&(object.type_name.clone(), method.name.clone()))
            .cloned()
            .unwrap_or(InvokeOutcome::Returned(Value::Null)))
    }

    async fn invoke_static(
        &self,
        _thread: &ThreadRef,
        type_ref: &TypeRef,
        method: &MethodRef,
        _args: Vec<Value>,
    ) -> AdapterResult<InvokeOutcome> {
        self.check_connected()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .invoke_results
            .get(&(type_ref.name.clone(), method.name.clone()))
            .cloned()
            .unwrap_or(InvokeOutcome::Returned(Value::Null)))
    }

    async fn pull_events(&self, timeout: Duration) -> AdapterResult<Option<EventSet>> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.disconnected.load(Ordering::SeqCst) {
                return Err(AdapterError::Disconnected);
            }
            if let Some(set) = self.events.lock().unwrap().pop_front() {
                return Ok(Some(set));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(Duration::from_millis(2)).await;
        }
    }

    async fn resume_event_set(&self, set: &EventSet) -> AdapterResult<()> {
        self.check_connected()?;
        let mut state = self.state.lock().unwrap();
        state.resumed_sets += 1;
        if set.suspend_policy == SuspendPolicy::All {
            for t in state.threads.iter_mut() {
                t.suspended = false;
            }
        }
        Ok(())
    }
}

fn scripted_frame<'a>(state: &'a State, frame: &FrameRef) -> AdapterResult<&'a ScriptedFrame> {
    let t = state
        .threads
        .iter()
        .find(|t| t.thread.id == frame.thread_id)
        .ok_or(AdapterError::InvalidObject(frame.thread_id))?;
    t.frames.get(frame.index).ok_or(AdapterError::InvalidFrame)
}

/// Connector handing out one shared scripted target.
pub struct ScriptedConnector {
    target: Arc<ScriptedTarget>,
}

impl ScriptedConnector {
    pub fn new(target: Arc<ScriptedTarget>) -> Self {
        Self { target }
    }
}

#[async_trait]
impl DebugConnector for ScriptedConnector {
    async fn connect_socket(
        &self,
        _host: &str,
        _port: u16,
    ) -> AdapterResult<Arc<dyn DebugTarget>> {
        if self.target.disconnected.load(Ordering::SeqCst) {
            return Err(AdapterError::Connect("scripted target is gone".to_string()));
        }
        Ok(self.target.clone() as Arc<dyn DebugTarget>)
    }

    async fn connect_pid(&self, _pid: u32) -> AdapterResult<Arc<dyn DebugTarget>> {
        if self.target.disconnected.load(Ordering::SeqCst) {
            return Err(AdapterError::Connect("scripted target is gone".to_string()));
        }
        Ok(self.target.clone() as Arc<dyn DebugTarget>)
    }

    fn launch_command(
        &self,
        main_class: &str,
        _classpath: Option<&str>,
        _extra_args: &[String],
        _port: u16,
        _suspend: bool,
    ) -> Vec<String> {
        vec!["true".to_string(), main_class.to_string()]
    }
}
