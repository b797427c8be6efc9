// Stop reason tracking
//
// Records why the target stopped. This is what wait_for_stop hands back
// to the agent, so it carries enough detail to decide what to do next.

use crate::breakpoints::BreakpointRegistry;
use crate::clock::epoch_ms;
use debug_adapter::{EventKind, Location, ThreadRef};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    None,
    BreakpointHit,
    StepComplete,
    ExceptionThrown,
    WatchpointAccess,
    WatchpointModify,
    MethodEntry,
    MethodExit,
    UserSuspend,
    VmStart,
    VmDisconnect,
}

impl StopKind {
    pub fn name(&self) -> &'static str {
        match self {
            StopKind::None => "NONE",
            StopKind::BreakpointHit => "BREAKPOINT_HIT",
            StopKind::StepComplete => "STEP_COMPLETE",
            StopKind::ExceptionThrown => "EXCEPTION_THROWN",
            StopKind::WatchpointAccess => "WATCHPOINT_ACCESS",
            StopKind::WatchpointModify => "WATCHPOINT_MODIFY",
            StopKind::MethodEntry => "METHOD_ENTRY",
            StopKind::MethodExit => "METHOD_EXIT",
            StopKind::UserSuspend => "USER_SUSPEND",
            StopKind::VmStart => "VM_START",
            StopKind::VmDisconnect => "VM_DISCONNECT",
        }
    }
}

/// Immutable classification of a suspension.
#[derive(Debug, Clone, PartialEq)]
pub struct StopReason {
    pub kind: StopKind,
    pub timestamp_ms: u64,
    pub thread: Option<ThreadRef>,
    pub location: Option<Location>,
    /// Insertion-ordered key/value detail pairs.
    pub details: Vec<(String, String)>,
}

impl StopReason {
    fn new(
        kind: StopKind,
        thread: Option<ThreadRef>,
        location: Option<Location>,
        details: Vec<(String, String)>,
    ) -> Self {
        Self {
            kind,
            timestamp_ms: epoch_ms(),
            thread,
            location,
            details,
        }
    }

    pub fn none() -> Self {
        Self::new(StopKind::None, None, None, Vec::new())
    }

    pub fn user_suspend() -> Self {
        Self::new(StopKind::UserSuspend, None, None, Vec::new())
    }

    pub fn vm_start() -> Self {
        Self::new(StopKind::VmStart, None, None, Vec::new())
    }

    pub fn vm_disconnect() -> Self {
        Self::new(StopKind::VmDisconnect, None, None, Vec::new())
    }

    pub fn is_stopped(&self) -> bool {
        self.kind != StopKind::None
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Classify a stop event. Returns None for monitor events.
    ///
    /// Breakpoint events consult the line registry so the owning record's
    /// id rides along in the details.
    pub fn from_event(kind: &EventKind, breakpoints: &BreakpointRegistry) -> Option<Self> {
        match kind {
            EventKind::Breakpoint { thread, location } => {
                let mut details = location_details(location);
                if let Some(id) = breakpoints.find_by_location(location) {
                    details.push(("breakpointId".to_string(), id));
                }
                Some(Self::new(
                    StopKind::BreakpointHit,
                    Some(thread.clone()),
                    Some(location.clone()),
                    details,
                ))
            }
            EventKind::Step { thread, location } => Some(Self::new(
                StopKind::StepComplete,
                Some(thread.clone()),
                Some(location.clone()),
                location_details(location),
            )),
            EventKind::Exception {
                thread,
                location,
                exception_type,
                exception_id,
                catch_location,
            } => {
                let mut details = vec![("exceptionClass".to_string(), exception_type.clone())];
                match catch_location {
                    Some(catch) => {
                        details.push(("caught".to_string(), "true".to_string()));
                        details.push(("catchClass".to_string(), catch.type_name.clone()));
                        details.push(("catchLine".to_string(), catch.line.to_string()));
                    }
                    None => details.push(("caught".to_string(), "false".to_string())),
                }
                details.push(("exceptionId".to_string(), exception_id.to_string()));
                Some(Self::new(
                    StopKind::ExceptionThrown,
                    Some(thread.clone()),
                    Some(location.clone()),
                    details,
                ))
            }
            EventKind::AccessWatchpoint {
                thread,
                location,
                field,
            } => Some(Self::new(
                StopKind::WatchpointAccess,
                Some(thread.clone()),
                Some(location.clone()),
                vec![
                    ("field".to_string(), field.name.clone()),
                    ("fieldClass".to_string(), field.declaring_type.clone()),
                ],
            )),
            EventKind::ModificationWatchpoint {
                thread,
                location,
                field,
                value_to_be,
            } => Some(Self::new(
                StopKind::WatchpointModify,
                Some(thread.clone()),
                Some(location.clone()),
                vec![
                    ("field".to_string(), field.name.clone()),
                    ("fieldClass".to_string(), field.declaring_type.clone()),
                    ("newValue".to_string(), value_to_be.to_string()),
                ],
            )),
            EventKind::MethodEntry {
                thread,
                location,
                method,
            } => Some(Self::new(
                StopKind::MethodEntry,
                Some(thread.clone()),
                Some(location.clone()),
                vec![
                    ("method".to_string(), method.name.clone()),
                    ("class".to_string(), method.declaring_type.clone()),
                    ("signature".to_string(), method.signature.clone()),
                ],
            )),
            EventKind::MethodExit {
                thread,
                location,
                method,
            } => Some(Self::new(
                StopKind::MethodExit,
                Some(thread.clone()),
                Some(location.clone()),
                vec![
                    ("method".to_string(), method.name.clone()),
                    ("class".to_string(), method.declaring_type.clone()),
                ],
            )),
            EventKind::VmStart { .. } => Some(Self::vm_start()),
            _ => None,
        }
    }
}

fn location_details(location: &Location) -> Vec<(String, String)> {
    vec![
        ("class".to_string(), location.type_name.clone()),
        ("method".to_string(), location.method_name.clone()),
        ("line".to_string(), location.line.to_string()),
    ]
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if let Some(thread) = &self.thread {
            write!(f, " [thread: {}]", thread.name)?;
        }
        if let Some(location) = &self.location {
            write!(f, " at {}:{}", location.type_name, location.line)?;
        }
        if !self.details.is_empty() {
            write!(f, " {{")?;
            for (i, (k, v)) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::{FieldRef, Value};
    use pretty_assertions::assert_eq;

    fn thread() -> ThreadRef {
        ThreadRef {
            id: 1,
            name: "main".into(),
        }
    }

    fn location(line: i32) -> Location {
        Location {
            type_name: "C".into(),
            method_name: "run".into(),
            method_signature: "()V".into(),
            line,
            code_index: line as u64,
        }
    }

    #[test]
    fn none_is_not_stopped() {
        assert!(!StopReason::none().is_stopped());
        assert!(StopReason::vm_disconnect().is_stopped());
    }

    #[test]
    fn modification_watchpoint_captures_value_to_be() {
        let registry = BreakpointRegistry::new();
        let kind = EventKind::ModificationWatchpoint {
            thread: thread(),
            location: location(12),
            field: FieldRef {
                id: 9,
                name: "counter".into(),
                type_name: "int".into(),
                declaring_type: "C".into(),
                is_static: false,
            },
            value_to_be: Value::Int(1),
        };
        let reason = StopReason::from_event(&kind, &registry).unwrap();
        assert_eq!(reason.kind, StopKind::WatchpointModify);
        assert_eq!(reason.detail("field"), Some("counter"));
        assert_eq!(reason.detail("newValue"), Some("1"));
    }

    #[test]
    fn exception_details_carry_catch_site() {
        let registry = BreakpointRegistry::new();
        let kind = EventKind::Exception {
            thread: thread(),
            location: location(20),
            exception_type: "java.lang.IllegalArgumentException".into(),
            exception_id: 400,
            catch_location: Some(location(25)),
        };
        let reason = StopReason::from_event(&kind, &registry).unwrap();
        assert_eq!(reason.detail("caught"), Some("true"));
        assert_eq!(reason.detail("catchLine"), Some("25"));
        assert_eq!(reason.detail("exceptionId"), Some("400"));
    }

    #[test]
    fn monitor_events_are_not_stop_reasons() {
        let registry = BreakpointRegistry::new();
        let kind = EventKind::ThreadStart { thread: thread() };
        assert!(StopReason::from_event(&kind, &registry).is_none());
    }

    #[test]
    fn display_renders_kind_thread_and_details() {
        let registry = BreakpointRegistry::new();
        let kind = EventKind::Step {
            thread: thread(),
            location: location(7),
        };
        let reason = StopReason::from_event(&kind, &registry).unwrap();
        let text = reason.to_string();
        assert!(text.starts_with("STEP_COMPLETE [thread: main] at C:7"));
        assert!(text.contains("line=7"));
    }
}
