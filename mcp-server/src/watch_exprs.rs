// Watch expression store
//
// Named expressions that persist across debug operations. Evaluation
// happens elsewhere, against a suspended thread; this store only keeps
// the text and the memoised last outcome.

use crate::clock::epoch_ms;
use crate::error::{DebugError, DebugResult};
use crate::ids::{self, IdAllocator};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct WatchExpression {
    pub id: String,
    pub expression: String,
    pub last_value: Option<String>,
    pub last_error: Option<String>,
    pub last_evaluated_at_ms: u64,
}

impl WatchExpression {
    pub fn has_been_evaluated(&self) -> bool {
        self.last_evaluated_at_ms > 0
    }
}

pub struct WatchStore {
    watches: Mutex<HashMap<String, WatchExpression>>,
    ids: IdAllocator,
}

impl WatchStore {
    pub fn new() -> Self {
        Self {
            watches: Mutex::new(HashMap::new()),
            ids: IdAllocator::new(),
        }
    }

    pub fn add(&self, expression: &str) -> DebugResult<WatchExpression> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(DebugError::InvalidParams(
                "expression cannot be empty".to_string(),
            ));
        }
        let id = self.ids.next(ids::WATCH_EXPRESSION);
        let watch = WatchExpression {
            id: id.clone(),
            expression: expression.to_string(),
            last_value: None,
            last_error: None,
            last_evaluated_at_ms: 0,
        };
        self.watches.lock().unwrap().insert(id, watch.clone());
        Ok(watch)
    }

    pub fn remove(&self, id: &str) -> DebugResult<()> {
        self.watches
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DebugError::NotFound(format!("watch {}", id)))
    }

    pub fn get(&self, id: &str) -> Option<WatchExpression> {
        self.watches.lock().unwrap().get(id).cloned()
    }

    pub fn list(&self) -> Vec<WatchExpression> {
        let watches = self.watches.lock().unwrap();
        let mut all: Vec<_> = watches.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn record_value(&self, id: &str, value: String) {
        if let Some(watch) = self.watches.lock().unwrap().get_mut(id) {
            watch.last_value = Some(value);
            watch.last_error = None;
            watch.last_evaluated_at_ms = epoch_ms();
        }
    }

    pub fn record_error(&self, id: &str, error: String) {
        if let Some(watch) = self.watches.lock().unwrap().get_mut(id) {
            watch.last_error = Some(error);
            watch.last_value = None;
            watch.last_evaluated_at_ms = epoch_ms();
        }
    }

    pub fn clear_all(&self) {
        self.watches.lock().unwrap().clear();
    }
}

impl Default for WatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_and_remove_restore_prior_state() {
        let store = WatchStore::new();
        let watch = store.add("this.counter").unwrap();
        assert_eq!(watch.id, "w-1");
        assert_eq!(store.list().len(), 1);

        store.remove(&watch.id).unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(
            store.remove(&watch.id),
            Err(DebugError::NotFound(_))
        ));
    }

    #[test]
    fn value_and_error_are_mutually_exclusive() {
        let store = WatchStore::new();
        let watch = store.add("list.size()").unwrap();

        store.record_value(&watch.id, "(int) 3".to_string());
        let w = store.get(&watch.id).unwrap();
        assert_eq!(w.last_value.as_deref(), Some("(int) 3"));
        assert!(w.last_error.is_none());
        assert!(w.has_been_evaluated());

        store.record_error(&watch.id, "Cannot resolve: list".to_string());
        let w = store.get(&watch.id).unwrap();
        assert!(w.last_value.is_none());
        assert_eq!(w.last_error.as_deref(), Some("Cannot resolve: list"));
    }

    #[test]
    fn empty_expression_is_rejected() {
        let store = WatchStore::new();
        assert!(matches!(
            store.add("   "),
            Err(DebugError::InvalidParams(_))
        ));
    }
}
