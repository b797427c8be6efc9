// Artefact id allocation
//
// Ids are a kind prefix plus a monotonically increasing counter. Clients
// rely on the prefixes to distinguish artefact kinds, and a removed id is
// never reused.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct IdAllocator {
    counter: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    pub fn next(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", prefix, n)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

pub const LINE_BREAKPOINT: &str = "bp-";
pub const ACCESS_WATCHPOINT: &str = "wa-";
pub const MODIFY_WATCHPOINT: &str = "wm-";
pub const METHOD_ENTRY: &str = "me-";
pub const METHOD_EXIT: &str = "mx-";
pub const EXCEPTION: &str = "ex-";
pub const WATCH_EXPRESSION: &str = "w-";
pub const CLASS_PREPARE: &str = "cp-";
pub const CLASS_UNLOAD: &str = "cu-";
pub const THREAD_START: &str = "ts-";
pub const THREAD_DEATH: &str = "td-";
pub const MONITOR_CONTEND: &str = "mc-";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_prefixed() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next(LINE_BREAKPOINT), "bp-1");
        assert_eq!(ids.next(LINE_BREAKPOINT), "bp-2");
        // Mixed prefixes share the counter within one allocator
        assert_eq!(ids.next(ACCESS_WATCHPOINT), "wa-3");
    }
}
