// Adapter events
//
// Events flow from the target to the broker's pump. A delivered set is
// either a "stop" set (the target stays suspended until the broker acts)
// or a "monitor" set (informational, resumed by the pump).

use crate::types::{
    FieldRef, Location, MethodRef, ObjectId, RequestHandle, SuspendPolicy, ThreadRef, TypeRef,
    Value,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSet {
    pub suspend_policy: SuspendPolicy,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The request that produced this event, when one did.
    pub request: Option<RequestHandle>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    VmStart {
        thread: ThreadRef,
    },
    Breakpoint {
        thread: ThreadRef,
        location: Location,
    },
    Step {
        thread: ThreadRef,
        location: Location,
    },
    Exception {
        thread: ThreadRef,
        location: Location,
        exception_type: String,
        exception_id: ObjectId,
        catch_location: Option<Location>,
    },
    AccessWatchpoint {
        thread: ThreadRef,
        location: Location,
        field: FieldRef,
    },
    ModificationWatchpoint {
        thread: ThreadRef,
        location: Location,
        field: FieldRef,
        value_to_be: Value,
    },
    MethodEntry {
        thread: ThreadRef,
        location: Location,
        method: MethodRef,
    },
    MethodExit {
        thread: ThreadRef,
        location: Location,
        method: MethodRef,
    },
    ClassPrepare {
        thread: ThreadRef,
        type_ref: TypeRef,
    },
    ClassUnload {
        class_name: String,
    },
    ThreadStart {
        thread: ThreadRef,
    },
    ThreadDeath {
        thread: ThreadRef,
    },
    MonitorContended {
        thread: ThreadRef,
        monitor_class: String,
        monitor_id: ObjectId,
    },
    MonitorWait {
        thread: ThreadRef,
        monitor_class: String,
        timeout_ms: i64,
    },
}

impl EventKind {
    /// Stop events leave the target suspended until an explicit resume or
    /// step. Everything else is a monitor event.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            EventKind::VmStart { .. }
                | EventKind::Breakpoint { .. }
                | EventKind::Step { .. }
                | EventKind::Exception { .. }
                | EventKind::AccessWatchpoint { .. }
                | EventKind::ModificationWatchpoint { .. }
                | EventKind::MethodEntry { .. }
                | EventKind::MethodExit { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread() -> ThreadRef {
        ThreadRef {
            id: 1,
            name: "main".into(),
        }
    }

    #[test]
    fn stop_classification() {
        assert!(EventKind::VmStart { thread: thread() }.is_stop());
        assert!(!EventKind::ThreadStart { thread: thread() }.is_stop());
        assert!(!EventKind::ClassUnload {
            class_name: "C".into()
        }
        .is_stop());
    }
}
