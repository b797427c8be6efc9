// Field watchpoint registry
//
// Access and modification watchpoints share one registry and one
// counter; the id prefix tells them apart. Deferred resolution mirrors
// the line-breakpoint registry.

use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use debug_adapter::{DebugTarget, FieldRef, RequestHandle, SuspendPolicy, TypeRef};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Access,
    Modify,
}

impl WatchKind {
    pub fn name(&self) -> &'static str {
        match self {
            WatchKind::Access => "ACCESS",
            WatchKind::Modify => "MODIFY",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            WatchKind::Access => ids::ACCESS_WATCHPOINT,
            WatchKind::Modify => ids::MODIFY_WATCHPOINT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchpointRecord {
    pub id: String,
    pub class_name: String,
    pub field_name: String,
    pub kind: WatchKind,
    pub handle: Option<RequestHandle>,
    pub enabled: bool,
    pub pending: bool,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, WatchpointRecord>,
    deferred: HashMap<String, Vec<String>>,
}

pub struct WatchpointRegistry {
    inner: Mutex<Inner>,
    ids: IdAllocator,
}

impl WatchpointRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ids: IdAllocator::new(),
        }
    }

    pub async fn set(
        &self,
        target: &dyn DebugTarget,
        class_name: &str,
        field_name: &str,
        kind: WatchKind,
    ) -> DebugResult<WatchpointRecord> {
        let classes = target.classes_by_name(class_name).await?;

        let Some(type_ref) = classes.into_iter().next() else {
            return Ok(self.defer(class_name, field_name, kind));
        };

        let field = resolve_field(target, &type_ref, field_name).await?;

        {
            let inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.records.values().find(|r| {
                r.class_name == class_name && r.field_name == field_name && r.kind == kind
            }) {
                return Ok(existing.clone());
            }
        }

        let handle = create_watch(target, &field, kind).await?;

        let id = self.ids.next(kind.prefix());
        let record = WatchpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            field_name: field_name.to_string(),
            kind,
            handle: Some(handle),
            enabled: true,
            pending: false,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    fn defer(&self, class_name: &str, field_name: &str, kind: WatchKind) -> WatchpointRecord {
        let id = self.ids.next(kind.prefix());
        let record = WatchpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            field_name: field_name.to_string(),
            kind,
            handle: None,
            enabled: true,
            pending: true,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(id.clone(), record.clone());
        inner
            .deferred
            .entry(class_name.to_string())
            .or_default()
            .push(id);
        record
    }

    pub async fn on_class_prepare(&self, target: &dyn DebugTarget, type_ref: &TypeRef) {
        let waiting = {
            let mut inner = self.inner.lock().unwrap();
            inner.deferred.remove(&type_ref.name).unwrap_or_default()
        };

        for id in waiting {
            let (field_name, kind) = match self.inner.lock().unwrap().records.get(&id) {
                Some(r) => (r.field_name.clone(), r.kind),
                None => continue,
            };

            let field = match resolve_field(target, type_ref, &field_name).await {
                Ok(field) => field,
                Err(e) => {
                    debug!("deferred watchpoint {} did not resolve: {}", id, e);
                    continue;
                }
            };

            let handle = match create_watch(target, &field, kind).await {
                Ok(handle) => handle,
                Err(e) => {
                    debug!("deferred watchpoint {} not created: {}", id, e);
                    continue;
                }
            };

            let mut inner = self.inner.lock().unwrap();
            if let Some(record) = inner.records.get_mut(&id) {
                record.handle = Some(handle);
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
                .ok_or_else(|| DebugError::NotFound(format!("watchpoint {}", id)))?;
            if let Some(list) = inner.deferred.get_mut(&record.class_name) {
                list.retain(|d| d != id);
            }
            record
        };

        if let Some(handle) = record.handle {
            if let Err(e) = target.delete_request(handle).await {
                debug!("watchpoint {} request already gone: {}", id, e);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<WatchpointRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    pub fn list(&self) -> Vec<WatchpointRecord> {
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

    pub async fn clear_all(&self, target: &dyn DebugTarget) {
        let handles: Vec<RequestHandle> = {
            let inner = self.inner.lock().unwrap();
            inner.records.values().filter_map(|r| r.handle).collect()
        };
        for handle in handles {
            if let Err(e) = target.delete_request(handle).await {
                debug!("watchpoint cleanup skipped a request: {}", e);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
        inner.deferred.clear();
    }
}

impl Default for WatchpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn resolve_field(
    target: &dyn DebugTarget,
    type_ref: &TypeRef,
    field_name: &str,
) -> DebugResult<FieldRef> {
    target
        .field_by_name(type_ref, field_name)
        .await?
        .ok_or_else(|| DebugError::FieldNotFound {
            class: type_ref.name.clone(),
            field: field_name.to_string(),
        })
}

async fn create_watch(
    target: &dyn DebugTarget,
    field: &FieldRef,
    kind: WatchKind,
) -> DebugResult<RequestHandle> {
    let handle = match kind {
        WatchKind::Access => target.create_access_watch(field, SuspendPolicy::All).await?,
        WatchKind::Modify => target.create_modify_watch(field, SuspendPolicy::All).await?,
    };
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::{RequestKind, ScriptedTarget};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn access_and_modify_use_distinct_prefixes() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[10]);
        target.add_field("C", "counter", "int");

        let registry = WatchpointRegistry::new();
        let access = registry
            .set(&target, "C", "counter", WatchKind::Access)
            .await
            .unwrap();
        let modify = registry
            .set(&target, "C", "counter", WatchKind::Modify)
            .await
            .unwrap();

        assert!(access.id.starts_with("wa-"));
        assert!(modify.id.starts_with("wm-"));
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::AccessWatch(_))),
            1
        );
        assert_eq!(
            target.live_requests_of(|k| matches!(k, RequestKind::ModifyWatch(_))),
            1
        );
    }

    #[tokio::test]
    async fn missing_field_fails() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[10]);

        let registry = WatchpointRegistry::new();
        let err = registry
            .set(&target, "C", "ghost", WatchKind::Modify)
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::FieldNotFound { .. }));
    }

    #[tokio::test]
    async fn deferred_watchpoint_resolves_on_prepare() {
        let target = ScriptedTarget::new();
        target.add_unprepared_class("Later", &[5]);
        target.add_field("Later", "total", "long");

        let registry = WatchpointRegistry::new();
        let record = registry
            .set(&target, "Later", "total", WatchKind::Modify)
            .await
            .unwrap();
        assert!(record.pending);

        let type_ref = target.prepare_class("Later");
        registry.on_class_prepare(&target, &type_ref).await;

        let record = registry.get(&record.id).unwrap();
        assert!(!record.pending);
        assert!(record.handle.is_some());
    }

    #[tokio::test]
    async fn duplicate_field_and_kind_is_deduplicated() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[10]);
        target.add_field("C", "counter", "int");

        let registry = WatchpointRegistry::new();
        let a = registry
            .set(&target, "C", "counter", WatchKind::Access)
            .await
            .unwrap();
        let b = registry
            .set(&target, "C", "counter", WatchKind::Access)
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
    }
}
