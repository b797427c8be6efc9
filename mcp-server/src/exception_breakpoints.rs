// Exception breakpoint registry
//
// No deferral here: a named exception class must already be loaded and
// must resolve to a throwable type. "*" (or no name) is the catch-all.

use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use debug_adapter::{DebugTarget, RequestHandle, SuspendPolicy};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExceptionBreakpointRecord {
    pub id: String,
    /// "*" when catching every throwable.
    pub exception_class: String,
    pub catch_caught: bool,
    pub catch_uncaught: bool,
    pub handle: Option<RequestHandle>,
    pub enabled: bool,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, ExceptionBreakpointRecord>,
}

pub struct ExceptionBreakpointRegistry {
    inner: Mutex<Inner>,
    ids: IdAllocator,
}

impl ExceptionBreakpointRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ids: IdAllocator::new(),
        }
    }

    pub async fn set(
        &self,
        target: &dyn DebugTarget,
        exception_class: Option<&str>,
        catch_caught: bool,
        catch_uncaught: bool,
    ) -> DebugResult<ExceptionBreakpointRecord> {
        if !catch_caught && !catch_uncaught {
            return Err(DebugError::InvalidParams(
                "must catch at least caught or uncaught exceptions".to_string(),
            ));
        }

        let is_catch_all = matches!(exception_class, None | Some("") | Some("*"));
        let stored_class = if is_catch_all {
            "*".to_string()
        } else {
            exception_class.unwrap().to_string()
        };

        {
            let inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.records.values().find(|r| {
                r.exception_class == stored_class
                    && r.catch_caught == catch_caught
                    && r.catch_uncaught == catch_uncaught
            }) {
                return Ok(existing.clone());
            }
        }

        let type_ref = if is_catch_all {
            None
        } else {
            let classes = target.classes_by_name(&stored_class).await?;
            let type_ref = classes
                .into_iter()
                .next()
                .ok_or_else(|| DebugError::ClassNotFound(stored_class.clone()))?;
            if !target.is_throwable(&type_ref).await? {
                return Err(DebugError::NotThrowable(stored_class.clone()));
            }
            Some(type_ref)
        };

        let handle = target
            .create_exception(
                type_ref.as_ref(),
                catch_caught,
                catch_uncaught,
                SuspendPolicy::All,
            )
            .await?;

        let id = self.ids.next(ids::EXCEPTION);
        let record = ExceptionBreakpointRecord {
            id: id.clone(),
            exception_class: stored_class,
            catch_caught,
            catch_uncaught,
            handle: Some(handle),
            enabled: true,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    pub async fn remove(&self, target: &dyn DebugTarget, id: &str) -> DebugResult<()> {
        let record = self
            .inner
            .lock()
            .unwrap()
            .records
            .remove(id)
            .ok_or_else(|| DebugError::NotFound(format!("exception breakpoint {}", id)))?;

        if let Some(handle) = record.handle {
            if let Err(e) = target.delete_request(handle).await {
                debug!("exception breakpoint {} request already gone: {}", id, e);
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
                .ok_or_else(|| DebugError::NotFound(format!("exception breakpoint {}", id)))?;
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

    pub fn get(&self, id: &str) -> Option<ExceptionBreakpointRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    pub fn list(&self) -> Vec<ExceptionBreakpointRecord> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<_> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub async fn clear_all(&self, target: &dyn DebugTarget) {
        let handles: Vec<RequestHandle> = {
            let inner = self.inner.lock().unwrap();
            inner.records.values().filter_map(|r| r.handle).collect()
        };
        for handle in handles {
            if let Err(e) = target.delete_request(handle).await {
                debug!("exception breakpoint cleanup skipped a request: {}", e);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
    }
}

impl Default for ExceptionBreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::ScriptedTarget;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn named_exception_must_be_throwable() {
        let target = ScriptedTarget::new();
        target.add_class("java.lang.IllegalArgumentException", &[]);
        target.mark_throwable("java.lang.IllegalArgumentException");
        target.add_class("com.example.NotAnException", &[]);

        let registry = ExceptionBreakpointRegistry::new();
        let record = registry
            .set(
                &target,
                Some("java.lang.IllegalArgumentException"),
                true,
                true,
            )
            .await
            .unwrap();
        assert_eq!(record.id, "ex-1");

        let err = registry
            .set(&target, Some("com.example.NotAnException"), true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::NotThrowable(_)));
    }

    #[tokio::test]
    async fn wildcard_is_always_allowed() {
        let target = ScriptedTarget::new();
        let registry = ExceptionBreakpointRegistry::new();
        let record = registry.set(&target, Some("*"), false, true).await.unwrap();
        assert_eq!(record.exception_class, "*");
        assert!(record.handle.is_some());
    }

    #[tokio::test]
    async fn both_flags_false_is_rejected() {
        let target = ScriptedTarget::new();
        let registry = ExceptionBreakpointRegistry::new();
        let err = registry.set(&target, None, false, false).await.unwrap_err();
        assert!(matches!(err, DebugError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn enable_disable_roundtrip_is_idempotent() {
        let target = ScriptedTarget::new();
        let registry = ExceptionBreakpointRegistry::new();
        let record = registry.set(&target, Some("*"), true, true).await.unwrap();

        registry
            .set_enabled(&target, &record.id, false)
            .await
            .unwrap();
        registry
            .set_enabled(&target, &record.id, false)
            .await
            .unwrap();
        assert!(!registry.get(&record.id).unwrap().enabled);

        registry.set_enabled(&target, &record.id, true).await.unwrap();
        assert!(registry.get(&record.id).unwrap().enabled);
    }

    #[tokio::test]
    async fn equivalent_request_is_deduplicated() {
        let target = ScriptedTarget::new();
        let registry = ExceptionBreakpointRegistry::new();
        let a = registry.set(&target, None, true, true).await.unwrap();
        let b = registry.set(&target, Some("*"), true, true).await.unwrap();
        assert_eq!(a.id, b.id);

        // Different flags are a different artefact
        let c = registry.set(&target, Some("*"), false, true).await.unwrap();
        assert_ne!(a.id, c.id);
    }
}
