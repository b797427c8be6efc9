// Debug session management
//
// The Debugger is the single locus of authority for the broker process:
// it owns the target handle, the event pump, the stop state and every
// registry. Tool handlers hold it behind an Arc and never touch the
// adapter directly for lifecycle concerns.

use crate::breakpoints::BreakpointRegistry;
use crate::clock::epoch_ms;
use crate::error::{DebugError, DebugResult};
use crate::event_monitor::EventMonitor;
use crate::exception_breakpoints::ExceptionBreakpointRegistry;
use crate::launch::{find_free_port, wait_for_port, GradleTestLaunch, LaunchedProcess};
use crate::method_breakpoints::MethodBreakpointRegistry;
use crate::stop_reason::StopReason;
use crate::watch_exprs::WatchStore;
use crate::watchpoints::WatchpointRegistry;
use debug_adapter::{AdapterError, DebugConnector, DebugTarget, EventKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const PUMP_POLL: Duration = Duration::from_millis(100);
const LAUNCH_PORT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Launch,
    AttachSocket,
    AttachPid,
}

impl ConnectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionKind::Launch => "LAUNCH",
            ConnectionKind::AttachSocket => "ATTACH_SOCKET",
            ConnectionKind::AttachPid => "ATTACH_PID",
        }
    }
}

/// Registries and stores shared between the pump and the tool handlers.
pub struct Registries {
    pub breakpoints: BreakpointRegistry,
    pub watchpoints: WatchpointRegistry,
    pub method_breakpoints: MethodBreakpointRegistry,
    pub exceptions: ExceptionBreakpointRegistry,
    pub watches: WatchStore,
    pub monitor: EventMonitor,
}

impl Registries {
    fn new() -> Self {
        Self {
            breakpoints: BreakpointRegistry::new(),
            watchpoints: WatchpointRegistry::new(),
            method_breakpoints: MethodBreakpointRegistry::new(),
            exceptions: ExceptionBreakpointRegistry::new(),
            watches: WatchStore::new(),
            monitor: EventMonitor::new(),
        }
    }
}

struct Connection {
    target: Arc<dyn DebugTarget>,
    kind: ConnectionKind,
    details: String,
    connected_at_ms: u64,
    child: Option<LaunchedProcess>,
    pump: JoinHandle<()>,
}

/// Stop-reason broadcast. The pump is the only writer of stop events;
/// handlers clear it before resuming.
struct StopState {
    tx: watch::Sender<StopReason>,
}

impl StopState {
    fn new() -> Self {
        let (tx, _) = watch::channel(StopReason::none());
        Self { tx }
    }

    fn set(&self, reason: StopReason) {
        let _ = self.tx.send(reason);
    }

    fn clear(&self) {
        let _ = self.tx.send(StopReason::none());
    }

    fn current(&self) -> StopReason {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<StopReason> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub connection_kind: &'static str,
    pub details: String,
    pub connected_at_ms: u64,
    pub last_event: Option<String>,
    pub stop: StopReason,
}

pub struct Debugger {
    connector: Arc<dyn DebugConnector>,
    registries: Arc<Registries>,
    stop: Arc<StopState>,
    last_event: Arc<std::sync::Mutex<Option<String>>>,
    conn: tokio::sync::Mutex<Option<Connection>>,
}

impl Debugger {
    pub fn new(connector: Arc<dyn DebugConnector>) -> Self {
        Self {
            connector,
            registries: Arc::new(Registries::new()),
            stop: Arc::new(StopState::new()),
            last_event: Arc::new(std::sync::Mutex::new(None)),
            conn: tokio::sync::Mutex::new(None),
        }
    }

    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.registries.breakpoints
    }

    pub fn watchpoints(&self) -> &WatchpointRegistry {
        &self.registries.watchpoints
    }

    pub fn method_breakpoints(&self) -> &MethodBreakpointRegistry {
        &self.registries.method_breakpoints
    }

    pub fn exceptions(&self) -> &ExceptionBreakpointRegistry {
        &self.registries.exceptions
    }

    pub fn watches(&self) -> &WatchStore {
        &self.registries.watches
    }

    pub fn monitor(&self) -> &EventMonitor {
        &self.registries.monitor
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// The live target, or NotConnected.
    pub async fn target(&self) -> DebugResult<Arc<dyn DebugTarget>> {
        self.conn
            .lock()
            .await
            .as_ref()
            .map(|c| c.target.clone())
            .ok_or(DebugError::NotConnected)
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        let conn = self.conn.lock().await;
        conn.as_ref().map(|c| SessionStatus {
            connection_kind: c.kind.name(),
            details: c.details.clone(),
            connected_at_ms: c.connected_at_ms,
            last_event: self.last_event.lock().unwrap().clone(),
            stop: self.stop.current(),
        })
    }

    // Lifecycle

    /// Launch a debuggee and attach to it over a loopback socket.
    pub async fn launch(
        &self,
        main_class: &str,
        classpath: Option<&str>,
        jvm_args: &[String],
        suspend_on_start: bool,
    ) -> DebugResult<String> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(DebugError::AlreadyConnected);
        }

        let port = find_free_port()?;
        let command =
            self.connector
                .launch_command(main_class, classpath, jvm_args, port, suspend_on_start);
        let mut child = LaunchedProcess::spawn(&command, None)?;

        if let Err(e) = wait_for_port("127.0.0.1", port, LAUNCH_PORT_TIMEOUT).await {
            let tail = child.output_tail();
            let detail = if child.is_alive() {
                format!("debug port {} never opened ({})", port, e)
            } else {
                format!("process exited before attach. Output:\n{}", tail)
            };
            child.kill().await;
            return Err(DebugError::Launch(detail));
        }

        let target = match self.connector.connect_socket("127.0.0.1", port).await {
            Ok(target) => target,
            Err(e) => {
                child.kill().await;
                return Err(DebugError::Launch(format!(
                    "failed to attach to launched VM: {}",
                    e
                )));
            }
        };

        let details = format!("Launched: {} (port {})", main_class, port);
        *conn = Some(self.install(target, ConnectionKind::Launch, details.clone(), Some(child)));
        Ok(details)
    }

    /// Attach to a JVM forked by `gradle test --debug-jvm`.
    pub async fn launch_gradle_test(&self, config: GradleTestLaunch) -> DebugResult<String> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(DebugError::AlreadyConnected);
        }

        let command = config.command();
        let cwd = config.project_dir.as_deref().map(Path::new);
        let mut child = LaunchedProcess::spawn(&command, cwd)?;

        if let Err(e) = wait_for_port("127.0.0.1", config.port, config.wait_timeout).await {
            let tail = child.output_tail();
            child.kill().await;
            return Err(DebugError::Launch(format!(
                "gradle test JVM never opened port {} ({}). Output:\n{}",
                config.port, e, tail
            )));
        }

        let target = match self.connector.connect_socket("127.0.0.1", config.port).await {
            Ok(target) => target,
            Err(e) => {
                child.kill().await;
                return Err(DebugError::Launch(format!(
                    "failed to attach to gradle test JVM: {}",
                    e
                )));
            }
        };

        let details = format!(
            "Gradle test{} (port {})",
            config
                .test_filter
                .as_deref()
                .map(|f| format!(": {}", f))
                .unwrap_or_default(),
            config.port
        );
        *conn = Some(self.install(target, ConnectionKind::Launch, details.clone(), Some(child)));
        Ok(details)
    }

    pub async fn attach_socket(
        &self,
        host: &str,
        port: u16,
        wait: bool,
        wait_timeout: Duration,
    ) -> DebugResult<String> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(DebugError::AlreadyConnected);
        }

        if wait {
            wait_for_port(host, port, wait_timeout)
                .await
                .map_err(|_| DebugError::Connect(format!("{}:{} never opened", host, port)))?;
        }

        let target = self
            .connector
            .connect_socket(host, port)
            .await
            .map_err(|e| DebugError::Connect(e.to_string()))?;

        let details = format!("Attached: {}:{}", host, port);
        *conn = Some(self.install(target, ConnectionKind::AttachSocket, details.clone(), None));
        Ok(details)
    }

    pub async fn attach_pid(&self, pid: u32) -> DebugResult<String> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(DebugError::AlreadyConnected);
        }

        let target = self
            .connector
            .connect_pid(pid)
            .await
            .map_err(|e| DebugError::Connect(e.to_string()))?;

        let details = format!("Attached PID: {}", pid);
        *conn = Some(self.install(target, ConnectionKind::AttachPid, details.clone(), None));
        Ok(details)
    }

    fn install(
        &self,
        target: Arc<dyn DebugTarget>,
        kind: ConnectionKind,
        details: String,
        child: Option<LaunchedProcess>,
    ) -> Connection {
        self.stop.clear();
        *self.last_event.lock().unwrap() = None;
        let pump = spawn_pump(
            target.clone(),
            self.registries.clone(),
            self.stop.clone(),
            self.last_event.clone(),
        );
        info!("connected: {}", details);
        Connection {
            target,
            kind,
            details,
            connected_at_ms: epoch_ms(),
            child,
            pump,
        }
    }

    /// Tear the session down. Safe to call at any time, including with
    /// waiters blocked in wait_for_stop; they observe the disconnect.
    pub async fn disconnect(&self) {
        let Some(mut connection) = self.conn.lock().await.take() else {
            return;
        };
        info!("disconnecting: {}", connection.details);

        connection.pump.abort();
        // Wake waiters before cleanup so in-flight wait_for_stop calls
        // return promptly.
        self.stop.set(StopReason::vm_disconnect());

        connection.target.dispose().await;
        if let Some(child) = connection.child.as_mut() {
            child.kill().await;
        }

        let target = connection.target.as_ref();
        self.registries.breakpoints.clear_all(target).await;
        self.registries.watchpoints.clear_all(target).await;
        self.registries.method_breakpoints.clear_all(target).await;
        self.registries.exceptions.clear_all(target).await;
        self.registries.watches.clear_all();
        self.registries.monitor.reset();
        *self.last_event.lock().unwrap() = None;

        self.stop.set(StopReason::none());
    }

    // Stop / wait primitive

    pub fn current_stop(&self) -> StopReason {
        self.stop.current()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.current().is_stopped()
    }

    pub fn set_stop_reason(&self, reason: StopReason) {
        self.stop.set(reason);
    }

    /// Called before every resume/step so a following wait_for_stop sees
    /// the next stop, never a stale one.
    pub fn clear_stop_reason(&self) {
        self.stop.clear();
    }

    /// Block until the target stops, up to `timeout`. Returns `none()`
    /// on timeout and `vm_disconnect()` when the session goes away.
    pub async fn wait_for_stop(&self, timeout: Duration) -> StopReason {
        let mut rx = self.stop.subscribe();

        let current = rx.borrow_and_update().clone();
        if current.is_stopped() {
            return current;
        }
        if !self.is_connected().await {
            return StopReason::vm_disconnect();
        }
        if timeout.is_zero() {
            return StopReason::none();
        }

        let deadline = Instant::now() + timeout;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return StopReason::none();
            };
            match tokio::time::timeout(remaining, rx.changed()).await {
                Ok(Ok(())) => {
                    let latest = rx.borrow_and_update().clone();
                    if latest.is_stopped() {
                        return latest;
                    }
                    if !self.is_connected().await {
                        return StopReason::vm_disconnect();
                    }
                }
                // Sender gone or timed out; either way the target did
                // not stop for us.
                Ok(Err(_)) => return StopReason::none(),
                Err(_) => return StopReason::none(),
            }
        }
    }

    // Execution control

    pub async fn resume(&self) -> DebugResult<()> {
        let target = self.target().await?;
        self.clear_stop_reason();
        target.resume_all().await?;
        Ok(())
    }

    pub async fn suspend(&self) -> DebugResult<()> {
        let target = self.target().await?;
        target.suspend_all().await?;
        self.stop.set(StopReason::user_suspend());
        Ok(())
    }
}

fn spawn_pump(
    target: Arc<dyn DebugTarget>,
    registries: Arc<Registries>,
    stop: Arc<StopState>,
    last_event: Arc<std::sync::Mutex<Option<String>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_pump(target, registries, stop, last_event).await;
    })
}

/// The event pump: sole consumer of the adapter's event queue, sole
/// writer of stop events, sole driver of deferred resolution.
async fn run_pump(
    target: Arc<dyn DebugTarget>,
    registries: Arc<Registries>,
    stop: Arc<StopState>,
    last_event: Arc<std::sync::Mutex<Option<String>>>,
) {
    info!("event pump started");
    loop {
        match target.pull_events(PUMP_POLL).await {
            Ok(None) => continue,
            Ok(Some(set)) => {
                let mut saw_stop = false;

                for event in &set.events {
                    *last_event.lock().unwrap() = Some(event_summary(&event.kind));
                    if event.kind.is_stop() {
                        if let EventKind::Breakpoint { location, .. } = &event.kind {
                            // Prefer the handle map; fall back to
                            // location equality for requests the
                            // registry no longer knows.
                            match event
                                .request
                                .and_then(|h| registries.breakpoints.id_for_handle(h))
                            {
                                Some(id) => registries.breakpoints.record_hit_by_id(&id),
                                None => registries.breakpoints.record_hit(location),
                            }
                        }
                        if let Some(reason) =
                            StopReason::from_event(&event.kind, &registries.breakpoints)
                        {
                            debug!("stop event: {}", reason);
                            stop.set(reason);
                            saw_stop = true;
                        }
                    } else {
                        handle_monitor_event(target.as_ref(), &registries, &event.kind).await;
                    }

                    // A step request fires once; drop it so the thread
                    // can be stepped again.
                    if matches!(event.kind, EventKind::Step { .. }) {
                        if let Some(request) = event.request {
                            if let Err(e) = target.delete_request(request).await {
                                debug!("step request already gone: {}", e);
                            }
                        }
                    }
                }

                // A set containing any stop event leaves the target
                // suspended until an explicit resume or step.
                if !saw_stop {
                    match target.resume_event_set(&set).await {
                        Ok(()) => {}
                        Err(AdapterError::Disconnected) => {
                            stop.set(StopReason::vm_disconnect());
                            break;
                        }
                        Err(e) => warn!("failed to resume event set: {}", e),
                    }
                }
            }
            Err(AdapterError::Disconnected) => {
                info!("target disconnected; pump exiting");
                stop.set(StopReason::vm_disconnect());
                break;
            }
            Err(e) => {
                warn!("event pump error: {}", e);
            }
        }
    }
}

fn event_summary(kind: &EventKind) -> String {
    match kind {
        EventKind::VmStart { .. } => "vm start".to_string(),
        EventKind::Breakpoint { location, .. } => format!("breakpoint at {}", location),
        EventKind::Step { location, .. } => format!("step to {}", location),
        EventKind::Exception { exception_type, .. } => format!("exception {}", exception_type),
        EventKind::AccessWatchpoint { field, .. } => format!("field read {}", field.name),
        EventKind::ModificationWatchpoint { field, .. } => {
            format!("field write {}", field.name)
        }
        EventKind::MethodEntry { method, .. } => format!("entered {}", method.name),
        EventKind::MethodExit { method, .. } => format!("exited {}", method.name),
        EventKind::ClassPrepare { type_ref, .. } => format!("class prepared {}", type_ref.name),
        EventKind::ClassUnload { class_name } => format!("class unloaded {}", class_name),
        EventKind::ThreadStart { thread } => format!("thread started {}", thread.name),
        EventKind::ThreadDeath { thread } => format!("thread died {}", thread.name),
        EventKind::MonitorContended { monitor_class, .. } => {
            format!("monitor contended {}", monitor_class)
        }
        EventKind::MonitorWait { monitor_class, .. } => {
            format!("monitor wait {}", monitor_class)
        }
    }
}

async fn handle_monitor_event(
    target: &dyn DebugTarget,
    registries: &Registries,
    kind: &EventKind,
) {
    registries.monitor.capture(kind);

    if let EventKind::ClassPrepare { type_ref, .. } = kind {
        debug!("class prepared: {}", type_ref.name);
        registries.breakpoints.on_class_prepare(target, type_ref).await;
        registries.watchpoints.on_class_prepare(target, type_ref).await;
        registries
            .method_breakpoints
            .on_class_prepare(target, type_ref)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::{ScriptedConnector, ScriptedTarget};
    use debug_adapter::ThreadRef;
    use pretty_assertions::assert_eq;

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
    async fn second_connect_is_rejected() {
        let (_target, debugger) = connected().await;
        let err = debugger
            .attach_socket("localhost", 5005, false, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::AlreadyConnected));
    }

    #[tokio::test]
    async fn wait_for_stop_zero_returns_immediately() {
        let (_target, debugger) = connected().await;
        let reason = debugger.wait_for_stop(Duration::ZERO).await;
        assert!(!reason.is_stopped());
    }

    #[tokio::test]
    async fn wait_for_stop_times_out_as_none() {
        let (_target, debugger) = connected().await;
        let start = Instant::now();
        let reason = debugger.wait_for_stop(Duration::from_millis(120)).await;
        assert!(!reason.is_stopped());
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn pump_installs_stop_reason_without_resuming_the_set() {
        let (target, debugger) = connected().await;
        target.add_thread(1, "main", false);
        target.add_class("C", &[15]);
        let location = target.location("C", "main", 15);
        target.push_stop_event(EventKind::Breakpoint {
            thread: ThreadRef {
                id: 1,
                name: "main".into(),
            },
            location,
        });

        let reason = debugger.wait_for_stop(Duration::from_secs(2)).await;
        assert!(reason.is_stopped());
        assert_eq!(target.resumed_set_count(), 0);
    }

    #[tokio::test]
    async fn monitor_sets_are_resumed() {
        let (target, debugger) = connected().await;
        target.push_monitor_event(EventKind::ThreadStart {
            thread: ThreadRef {
                id: 7,
                name: "worker".into(),
            },
        });

        // Give the pump a couple of poll cycles
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(target.resumed_set_count(), 1);
        assert_eq!(debugger.monitor().pending_count(), 1);
        assert!(!debugger.is_stopped());
    }

    #[tokio::test]
    async fn resume_clears_stop_before_resuming_target() {
        let (target, debugger) = connected().await;
        target.add_thread(1, "main", true);
        debugger.set_stop_reason(StopReason::user_suspend());

        debugger.resume().await.unwrap();
        assert!(!debugger.is_stopped());
        assert_eq!(target.resume_all_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_resets_everything() {
        let (target, debugger) = connected().await;
        target.add_class("C", &[15]);
        debugger.breakpoints().set(&*target, "C", 15).await.unwrap();
        debugger.watches().add("this.counter").unwrap();

        debugger.disconnect().await;
        debugger.disconnect().await;

        assert!(!debugger.is_connected().await);
        assert!(debugger.breakpoints().list().is_empty());
        assert!(debugger.watches().list().is_empty());
        assert!(!debugger.is_stopped());
        assert!(matches!(
            debugger.target().await,
            Err(DebugError::NotConnected)
        ));
    }
}
