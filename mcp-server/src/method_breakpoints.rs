// Method entry/exit breakpoint registry
//
// A method name of "*" matches every method of the class. The adapter
// request is class-filtered; the broker reports the method name when the
// event arrives.

use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use debug_adapter::{DebugTarget, RequestHandle, SuspendPolicy, TypeRef};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodBreakKind {
    Entry,
    Exit,
}

impl MethodBreakKind {
    pub fn name(&self) -> &'static str {
        match self {
            MethodBreakKind::Entry => "ENTRY",
            MethodBreakKind::Exit => "EXIT",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            MethodBreakKind::Entry => ids::METHOD_ENTRY,
            MethodBreakKind::Exit => ids::METHOD_EXIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodBreakpointRecord {
    pub id: String,
    pub class_name: String,
    pub method_name: String,
    pub kind: MethodBreakKind,
    pub handle: Option<RequestHandle>,
    pub enabled: bool,
    pub pending: bool,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, MethodBreakpointRecord>,
    deferred: HashMap<String, Vec<String>>,
}

pub struct MethodBreakpointRegistry {
    inner: Mutex<Inner>,
    ids: IdAllocator,
}

impl MethodBreakpointRegistry {
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
        method_name: &str,
        kind: MethodBreakKind,
    ) -> DebugResult<MethodBreakpointRecord> {
        let classes = target.classes_by_name(class_name).await?;

        let Some(type_ref) = classes.into_iter().next() else {
            return Ok(self.defer(class_name, method_name, kind));
        };

        validate_method(target, &type_ref, method_name).await?;

        {
            let inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.records.values().find(|r| {
                r.class_name == class_name && r.method_name == method_name && r.kind == kind
            }) {
                return Ok(existing.clone());
            }
        }

        let handle = create_request(target, &type_ref, kind).await?;

        let id = self.ids.next(kind.prefix());
        let record = MethodBreakpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            kind,
            handle: Some(handle),
            enabled: true,
            pending: false,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    fn defer(
        &self,
        class_name: &str,
        method_name: &str,
        kind: MethodBreakKind,
    ) -> MethodBreakpointRecord {
        let id = self.ids.next(kind.prefix());
        let record = MethodBreakpointRecord {
            id: id.clone(),
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
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
            let (method_name, kind) = match self.inner.lock().unwrap().records.get(&id) {
                Some(r) => (r.method_name.clone(), r.kind),
                None => continue,
            };

            if let Err(e) = validate_method(target, type_ref, &method_name).await {
                debug!("deferred method breakpoint {} did not resolve: {}", id, e);
                continue;
            }

            let handle = match create_request(target, type_ref, kind).await {
                Ok(handle) => handle,
                Err(e) => {
                    debug!("deferred method breakpoint {} not created: {}", id, e);
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
                .ok_or_else(|| DebugError::NotFound(format!("method breakpoint {}", id)))?;
            if let Some(list) = inner.deferred.get_mut(&record.class_name) {
                list.retain(|d| d != id);
            }
            record
        };

        if let Some(handle) = record.handle {
            if let Err(e) = target.delete_request(handle).await {
                debug!("method breakpoint {} request already gone: {}", id, e);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<MethodBreakpointRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    pub fn list(&self) -> Vec<MethodBreakpointRecord> {
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
                debug!("method breakpoint cleanup skipped a request: {}", e);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
        inner.deferred.clear();
    }
}

impl Default for MethodBreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn validate_method(
    target: &dyn DebugTarget,
    type_ref: &TypeRef,
    method_name: &str,
) -> DebugResult<()> {
    if method_name == WILDCARD {
        return Ok(());
    }
    let methods = target.methods_by_name(type_ref, method_name).await?;
    if methods.is_empty() {
        return Err(DebugError::MethodNotFound {
            class: type_ref.name.clone(),
            method: method_name.to_string(),
        });
    }
    Ok(())
}

async fn create_request(
    target: &dyn DebugTarget,
    type_ref: &TypeRef,
    kind: MethodBreakKind,
) -> DebugResult<RequestHandle> {
    let handle = match kind {
        MethodBreakKind::Entry => {
            target
                .create_method_entry(type_ref, SuspendPolicy::All)
                .await?
        }
        MethodBreakKind::Exit => {
            target
                .create_method_exit(type_ref, SuspendPolicy::All)
                .await?
        }
    };
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::ScriptedTarget;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn entry_and_exit_prefixes() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[10]);
        target.add_method("C", "process", &["int"], "void");

        let registry = MethodBreakpointRegistry::new();
        let entry = registry
            .set(&target, "C", "process", MethodBreakKind::Entry)
            .await
            .unwrap();
        let exit = registry
            .set(&target, "C", "process", MethodBreakKind::Exit)
            .await
            .unwrap();

        assert!(entry.id.starts_with("me-"));
        assert!(exit.id.starts_with("mx-"));
    }

    #[tokio::test]
    async fn unknown_method_fails_unless_wildcard() {
        let target = ScriptedTarget::new();
        target.add_class("C", &[10]);

        let registry = MethodBreakpointRegistry::new();
        let err = registry
            .set(&target, "C", "ghost", MethodBreakKind::Entry)
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::MethodNotFound { .. }));

        let record = registry
            .set(&target, "C", WILDCARD, MethodBreakKind::Entry)
            .await
            .unwrap();
        assert!(!record.pending);
    }

    #[tokio::test]
    async fn deferred_method_breakpoint_activates_on_prepare() {
        let target = ScriptedTarget::new();
        target.add_unprepared_class("Later", &[5]);
        target.add_method("Later", "tick", &[], "void");

        let registry = MethodBreakpointRegistry::new();
        let record = registry
            .set(&target, "Later", "tick", MethodBreakKind::Exit)
            .await
            .unwrap();
        assert!(record.pending);

        let type_ref = target.prepare_class("Later");
        registry.on_class_prepare(&target, &type_ref).await;

        let record = registry.get(&record.id).unwrap();
        assert!(!record.pending);
        assert_eq!(registry.pending_count(), 0);
    }
}
