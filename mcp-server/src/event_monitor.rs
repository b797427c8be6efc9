// Event monitoring
//
// Subscriptions to lifecycle events that never stop the target, plus a
// bounded ring of captured events for later retrieval via events_pending.

use crate::clock::epoch_ms;
use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use debug_adapter::{DebugTarget, EventKind, RequestHandle, SuspendPolicy};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

const MAX_EVENTS: usize = 100;

pub const TYPE_CLASS_PREPARE: &str = "class_prepare";
pub const TYPE_CLASS_UNLOAD: &str = "class_unload";
pub const TYPE_THREAD_START: &str = "thread_start";
pub const TYPE_THREAD_DEATH: &str = "thread_death";
pub const TYPE_MONITOR_CONTEND: &str = "monitor_contend";
pub const TYPE_MONITOR_WAIT: &str = "monitor_wait";

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub kind: &'static str,
    pub timestamp_ms: u64,
    pub details: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Classify a monitor event for capture. Stop events yield None.
    pub fn from_event(kind: &EventKind) -> Option<Self> {
        let (name, details) = match kind {
            EventKind::ClassPrepare { thread, type_ref } => (
                TYPE_CLASS_PREPARE,
                vec![
                    ("className".to_string(), type_ref.name.clone()),
                    ("threadName".to_string(), thread.name.clone()),
                ],
            ),
            EventKind::ClassUnload { class_name } => (
                TYPE_CLASS_UNLOAD,
                vec![("className".to_string(), class_name.clone())],
            ),
            EventKind::ThreadStart { thread } => (
                TYPE_THREAD_START,
                vec![
                    ("threadId".to_string(), thread.id.to_string()),
                    ("threadName".to_string(), thread.name.clone()),
                ],
            ),
            EventKind::ThreadDeath { thread } => (
                TYPE_THREAD_DEATH,
                vec![
                    ("threadId".to_string(), thread.id.to_string()),
                    ("threadName".to_string(), thread.name.clone()),
                ],
            ),
            EventKind::MonitorContended {
                thread,
                monitor_class,
                monitor_id,
            } => (
                TYPE_MONITOR_CONTEND,
                vec![
                    ("threadId".to_string(), thread.id.to_string()),
                    ("threadName".to_string(), thread.name.clone()),
                    ("monitorClass".to_string(), monitor_class.clone()),
                    ("monitorId".to_string(), monitor_id.to_string()),
                ],
            ),
            EventKind::MonitorWait {
                thread,
                monitor_class,
                timeout_ms,
            } => (
                TYPE_MONITOR_WAIT,
                vec![
                    ("threadId".to_string(), thread.id.to_string()),
                    ("threadName".to_string(), thread.name.clone()),
                    ("monitorClass".to_string(), monitor_class.clone()),
                    ("timeout".to_string(), timeout_ms.to_string()),
                ],
            ),
            _ => return None,
        };
        Some(Self {
            kind: name,
            timestamp_ms: epoch_ms(),
            details,
        })
    }

    pub fn render(&self) -> String {
        let details: Vec<String> = self
            .details
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("[{}] {}", self.kind, details.join(", "))
    }
}

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<String, RequestHandle>,
    captured: VecDeque<CapturedEvent>,
}

pub struct EventMonitor {
    inner: Mutex<Inner>,
    ids: IdAllocator,
}

impl EventMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ids: IdAllocator::new(),
        }
    }

    pub async fn watch_class_prepare(
        &self,
        target: &dyn DebugTarget,
        class_filter: Option<&str>,
    ) -> DebugResult<String> {
        let filter = normalize_filter(class_filter);
        let handle = target
            .create_class_prepare_watch(filter, SuspendPolicy::None)
            .await?;
        Ok(self.store(ids::CLASS_PREPARE, handle))
    }

    pub async fn watch_class_unload(
        &self,
        target: &dyn DebugTarget,
        class_filter: Option<&str>,
    ) -> DebugResult<String> {
        let filter = normalize_filter(class_filter);
        let handle = target
            .create_class_unload_watch(filter, SuspendPolicy::None)
            .await?;
        Ok(self.store(ids::CLASS_UNLOAD, handle))
    }

    pub async fn watch_thread_start(&self, target: &dyn DebugTarget) -> DebugResult<String> {
        let handle = target.create_thread_start_watch(SuspendPolicy::None).await?;
        Ok(self.store(ids::THREAD_START, handle))
    }

    pub async fn watch_thread_death(&self, target: &dyn DebugTarget) -> DebugResult<String> {
        let handle = target.create_thread_death_watch(SuspendPolicy::None).await?;
        Ok(self.store(ids::THREAD_DEATH, handle))
    }

    pub async fn watch_monitor_contention(&self, target: &dyn DebugTarget) -> DebugResult<String> {
        let caps = target.vm_description().await?.capabilities;
        if !caps.monitor_events {
            return Err(DebugError::CapabilityMissing("monitor events".to_string()));
        }
        let handle = target
            .create_monitor_contended_watch(SuspendPolicy::None)
            .await?;
        Ok(self.store(ids::MONITOR_CONTEND, handle))
    }

    fn store(&self, prefix: &str, handle: RequestHandle) -> String {
        let id = self.ids.next(prefix);
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(id.clone(), handle);
        id
    }

    pub async fn remove_watch(&self, target: &dyn DebugTarget, id: &str) -> DebugResult<()> {
        let handle = self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .remove(id)
            .ok_or_else(|| DebugError::NotFound(format!("event watch {}", id)))?;
        if let Err(e) = target.delete_request(handle).await {
            debug!("event watch {} request already gone: {}", id, e);
        }
        Ok(())
    }

    pub fn active_watches(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<_> = inner.subscriptions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Append a monitor event to the ring; overflow drops the oldest.
    pub fn capture(&self, kind: &EventKind) {
        if let Some(captured) = CapturedEvent::from_event(kind) {
            let mut inner = self.inner.lock().unwrap();
            inner.captured.push_back(captured);
            while inner.captured.len() > MAX_EVENTS {
                inner.captured.pop_front();
            }
        }
    }

    /// Drain the ring in delivery order.
    pub fn drain_pending(&self) -> Vec<CapturedEvent> {
        self.inner.lock().unwrap().captured.drain(..).collect()
    }

    pub fn peek_pending(&self) -> Vec<CapturedEvent> {
        self.inner
            .lock()
            .unwrap()
            .captured
            .iter()
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().captured.len()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscriptions.clear();
        inner.captured.clear();
    }
}

impl Default for EventMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    match filter {
        Some("") | Some("*") | None => None,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::ScriptedTarget;
    use debug_adapter::ThreadRef;
    use pretty_assertions::assert_eq;

    fn thread_start(id: u64) -> EventKind {
        EventKind::ThreadStart {
            thread: ThreadRef {
                id,
                name: format!("worker-{}", id),
            },
        }
    }

    #[tokio::test]
    async fn subscriptions_use_monitor_prefixes() {
        let target = ScriptedTarget::new();
        let monitor = EventMonitor::new();

        let cp = monitor.watch_class_prepare(&target, None).await.unwrap();
        let ts = monitor.watch_thread_start(&target).await.unwrap();
        assert!(cp.starts_with("cp-"));
        assert!(ts.starts_with("ts-"));
        assert_eq!(monitor.active_watches().len(), 2);

        monitor.remove_watch(&target, &cp).await.unwrap();
        assert_eq!(monitor.active_watches(), vec![ts]);
    }

    #[tokio::test]
    async fn monitor_contention_requires_capability() {
        let target = ScriptedTarget::new();
        target.set_monitor_events_supported(false);
        let monitor = EventMonitor::new();
        let err = monitor
            .watch_monitor_contention(&target)
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::CapabilityMissing(_)));
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let monitor = EventMonitor::new();
        for i in 0..(MAX_EVENTS as u64 + 10) {
            monitor.capture(&thread_start(i));
        }
        assert_eq!(monitor.pending_count(), MAX_EVENTS);
        let drained = monitor.drain_pending();
        // The ten oldest were dropped
        assert_eq!(drained[0].details[0].1, "10");
        assert_eq!(monitor.pending_count(), 0);
    }

    #[test]
    fn peek_does_not_drain() {
        let monitor = EventMonitor::new();
        monitor.capture(&thread_start(1));
        assert_eq!(monitor.peek_pending().len(), 1);
        assert_eq!(monitor.pending_count(), 1);
    }

    #[test]
    fn stop_events_are_not_captured() {
        let monitor = EventMonitor::new();
        monitor.capture(&EventKind::VmStart {
            thread: ThreadRef {
                id: 1,
                name: "main".into(),
            },
        });
        assert_eq!(monitor.pending_count(), 0);
    }
}
