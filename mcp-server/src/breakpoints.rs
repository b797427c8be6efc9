// Line breakpoint registry
//
// Tracks breakpoints by id with deferred resolution: a breakpoint set
// against a class that is not loaded yet stays pending until the class
// prepares, at which point the pump re-resolves it.

use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use debug_adapter::{DebugTarget, Location, RequestHandle, RequestId, SuspendPolicy, TypeRef};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BreakpointRecord {
    pub id: String,
    pub class_name: String,
    pub line: i32,
    pub handle: Option<RequestHandle>,
    pub location: Option<Location>,
    pub enabled: bool,
    pub pending: bool,
    pub hit_count: u64,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, BreakpointRecord>,
    // class name -> pending record ids awaiting that class
    deferred: HashMap<String, Vec<String>>,
    by_handle: HashMap<RequestId, String>,
    class_prepare_armed: bool,
}

pub struct BreakpointRegistry {
    inner: Mutex<Inner>,
    ids: IdAllocator,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ids: IdAllocator::new(),
        }
    }

    /// Set a line breakpoint, deferring when the class is not yet loaded.
    pub async fn set(
        &self,
        target: &dyn DebugTarget,
        class_name: &str,
        line: i32,
    ) -> DebugResult<BreakpointRecord> {
        let classes = target.classes_by_name(class_name).await?;

        let Some(type_ref) = classes.into_iter().next() else {
            return self.defer(target, class_name, line).await;
        };

        let location = resolve_line(target, &type_ref, line).await?;

        // De-duplicate by resolved location
        {
            let inner = self.inner.lock().unwrap();
            if let Some(existing) = inner
                .records
                .values()
                .find(|r| r.location.as_ref() == Some(&location))
            {
                return Ok(existing.clone());
            }
        }

        let handle = target
            .create_breakpoint(&location, SuspendPolicy::All)
            .await?;

        let id = self.ids.next(ids::LINE_BREAKPOINT);
        let record = BreakpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            line,
            handle: Some(handle),
            location: Some(location),
            enabled: true,
            pending: false,
            hit_count: 0,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.by_handle.insert(handle.0, id.clone());
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn defer(
        &self,
        target: &dyn DebugTarget,
        class_name: &str,
        line: i32,
    ) -> DebugResult<BreakpointRecord> {
        let id = self.ids.next(ids::LINE_BREAKPOINT);
        let record = BreakpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            line,
            handle: None,
            location: None,
            enabled: true,
            pending: true,
            hit_count: 0,
        };

        let arm = {
            let mut inner = self.inner.lock().unwrap();
            inner.records.insert(id.clone(), record.clone());
            inner
                .deferred
                .entry(class_name.to_string())
                .or_default()
                .push(id);
            let arm = !inner.class_prepare_armed;
            inner.class_prepare_armed = true;
            arm
        };

        if arm {
            if let Err(e) = target
                .create_class_prepare_watch(None, SuspendPolicy::All)
                .await
            {
                warn!("failed to arm class-prepare watch: {}", e);
                self.inner.lock().unwrap().class_prepare_armed = false;
            }
        }

        Ok(record)
    }

    /// Re-resolve breakpoints deferred on a freshly prepared class.
    /// Individual resolution failures leave the record pending.
    pub async fn on_class_prepare(&self, target: &dyn DebugTarget, type_ref: &TypeRef) {
        let waiting = {
            let mut inner = self.inner.lock().unwrap();
            inner.deferred.remove(&type_ref.name).unwrap_or_default()
        };

        for id in waiting {
            let line = match self.inner.lock().unwrap().records.get(&id) {
                Some(r) => r.line,
                None => continue, // removed while deferred
            };

            let location = match resolve_line(target, type_ref, line).await {
                Ok(location) => location,
                Err(e) => {
                    debug!("deferred breakpoint {} did not resolve: {}", id, e);
                    continue;
                }
            };

            let handle = match target.create_breakpoint(&location, SuspendPolicy::All).await {
                Ok(handle) => handle,
                Err(e) => {
                    debug!("deferred breakpoint {} not created: {}", id, e);
                    continue;
                }
            };

            let mut inner = self.inner.lock().unwrap();
            inner.by_handle.insert(handle.0, id.clone());
            if let Some(record) = inner.records.get_mut(&id) {
                record.handle = Some(handle);
                record.location = Some(location);
                record.pending = false;
            }
        }
    }

    pub async fn remove(&self, target: &dyn DebugTarget, id: &str) -> DebugResult<()> {
        let record = {
            let mut inner = self.inner.lock().unwrap();
            let record = inner
                .records
                .remove(id)
                .ok_or_else(|| DebugError::NotFound(format!("breakpoint {}", id)))?;
            if let Some(handle) = record.handle {
                inner.by_handle.remove(&handle.0);
            }
            if let Some(list) = inner.deferred.get_mut(&record.class_name) {
                list.retain(|d| d != id);
            }
            record
        };

        if let Some(handle) = record.handle {
            if let Err(e) = target.delete_request(handle).await {
                debug!("breakpoint {} request already gone: {}", id, e);
            }
        }
        Ok(())
    }

    pub async fn set_enabled(
        &self,
        target: &dyn DebugTarget,
        id: &str,
        enabled: bool,
    ) -> DebugResult<()> {
        let handle = {
            let mut inner = self.inner.lock().unwrap();
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| DebugError::NotFound(format!("breakpoint {}", id)))?;
            record.enabled = enabled;
            record.handle
        };

        if let Some(handle) = handle {
            if enabled {
                target.enable_request(handle).await?;
            } else {
                target.disable_request(handle).await?;
            }
        }
        Ok(())
    }

    /// Breakpoint id for a hit location, by the adapter's location
    /// equality.
    pub fn find_by_location(&self, location: &Location) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .records
            .values()
            .find(|r| r.location.as_ref() == Some(location))
            .map(|r| r.id.clone())
    }

    /// O(1) id recovery for an event that carries its request handle.
    pub fn id_for_handle(&self, handle: RequestHandle) -> Option<String> {
        self.inner.lock().unwrap().by_handle.get(&handle.0).cloned()
    }

    pub fn record_hit(&self, location: &Location) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner
            .records
            .values_mut()
            .find(|r| r.location.as_ref() == Some(location))
        {
            record.hit_count += 1;
        }
    }

    pub fn record_hit_by_id(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.records.get_mut(id) {
            record.hit_count += 1;
        }
    }

    pub fn get(&self, id: &str) -> Option<BreakpointRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    pub fn list(&self) -> Vec<BreakpointRecord> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<_> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|r| r.pending)
            .count()
    }

    /// Best-effort cleanup on disconnect.
    pub async fn clear_all(&self, target: &dyn DebugTarget) {
        let handles: Vec<RequestHandle> = {
            let inner = self.inner.lock().unwrap();
            inner.records.values().filter_map(|r| r.handle).collect()
        };
        for handle in handles {
            if let Err(e) = target.delete_request(handle).await {
                debug!("breakpoint cleanup skipped a request: {}", e);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
        inner.deferred.clear();
        inner.by_handle.clear();
        inner.class_prepare_armed = false;
    }
}

impl Default for BreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn resolve_line(
    target: &dyn DebugTarget,
    type_ref: &TypeRef,
    line: i32,
) -> DebugResult<Location> {
    let locations = target.locations_at_line(type_ref, line).await?;
    locations
        .into_iter()
        .next()
        .ok_or_else(|| DebugError::NoCodeAtLine {
            class: type_ref.name.clone(),
            line,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::{RequestKind, ScriptedTarget};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn set_resolves_against_a_loaded_class() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "C", 15).await.unwrap();

        assert_eq!(record.id, "bp-1");
        assert!(!record.pending);
        assert!(record.handle.is_some());
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::Breakpoint(_))),
            1
        );
    }

    #[tokio::test]
    async fn set_on_missing_line_fails() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let err = registry.set(&target, "C", 99).await.unwrap_err();
        assert!(matches!(err, DebugError::NoCodeAtLine { line: 99, .. }));
    }

    #[tokio::test]
    async fn set_on_unloaded_class_defers_and_arms_class_prepare() {
        let target = ScriptedTarget::new();
        target.add_unprepared_class("NotYetLoaded", &[3]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "NotYetLoaded", 3).await.unwrap();

        assert!(record.pending);
        assert!(record.handle.is_none());
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::ClassPrepare)),
            1
        );

        // Second deferred set does not arm another watch
        registry.set(&target, "NotYetLoaded", 3).await.unwrap();
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::ClassPrepare)),
            1
        );
    }

    #[tokio::test]
    async fn class_prepare_activates_deferred_records() {
        let target = ScriptedTarget::new();
        target.add_unprepared_class("NotYetLoaded", &[3]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "NotYetLoaded", 3).await.unwrap();

        let type_ref = target.prepare_class("NotYetLoaded");
        registry.on_class_prepare(&target, &type_ref).await;

        let record = registry.get(&record.id).unwrap();
        assert!(!record.pending);
        assert!(record.handle.is_some());
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn unresolvable_symbol_stays_pending_after_prepare() {
        let target = ScriptedTarget::new();
        target.add_unprepared_class("NotYetLoaded", &[3]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "NotYetLoaded", 42).await.unwrap();

        let type_ref = target.prepare_class("NotYetLoaded");
        registry.on_class_prepare(&target, &type_ref).await;

        let record = registry.get(&record.id).unwrap();
        assert!(record.pending);
        assert!(record.handle.is_none());
    }

    #[tokio::test]
    async fn duplicate_location_returns_existing_id() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let first = registry.set(&target, "C", 15).await.unwrap();
        let second = registry.set(&target, "C", 15).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn remove_then_reinstate_allocates_a_new_id() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let first = registry.set(&target, "C", 15).await.unwrap();
        registry.remove(&target, &first.id).await.unwrap();
        let second = registry.set(&target, "C", 15).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn enable_disable_roundtrip_preserves_hit_count() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "C", 15).await.unwrap();
        let location = record.location.clone().unwrap();
        registry.record_hit(&location);

        registry.set_enabled(&target, &record.id, true).await.unwrap();
        registry
            .set_enabled(&target, &record.id, false)
            .await
            .unwrap();
        registry.set_enabled(&target, &record.id, true).await.unwrap();

        let record = registry.get(&record.id).unwrap();
        assert!(record.enabled);
        assert_eq!(record.hit_count, 1);
    }

    #[tokio::test]
    async fn handle_map_recovers_ids_until_removal() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[15]);

        let registry = BreakpointRegistry::new();
        let record = registry.set(&target, "C", 15).await.unwrap();
        let handle = record.handle.unwrap();

        assert_eq!(registry.id_for_handle(handle), Some(record.id.clone()));
        registry.remove(&target, &record.id).await.unwrap();
        assert_eq!(registry.id_for_handle(handle), None);
    }

    #[tokio::test]
    async fn remove_unknown_id_reports_not_found() {
        let target = ScriptedTarget::new();
        let registry = BreakpointRegistry::new();
        let err = registry.remove(&target, "bp-9").await.unwrap_err();
        assert!(matches!(err, DebugError::NotFound(_)));
    }
}
