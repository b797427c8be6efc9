// End-to-end broker scenarios against the scripted target
//
// Each test constructs a fresh Debugger, attaches it to an in-memory
// target, and drives the pump by pushing event sets.

use debug_adapter::testkit::{RequestKind, ScriptedConnector, ScriptedTarget};
use debug_adapter::{EventKind, ThreadRef, Value};
use jdb_mcp::error::DebugError;
use jdb_mcp::session::Debugger;
use jdb_mcp::stop_reason::StopKind;
use jdb_mcp::watchpoints::WatchKind;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn attach() -> (Arc<ScriptedTarget>, Debugger) {
    let target = Arc::new(ScriptedTarget::new());
    let debugger = Debugger::new(Arc::new(ScriptedConnector::new(target.clone())));
    debugger
        .attach_socket("localhost", 5005, false, Duration::from_secs(1))
        .await
        .unwrap();
    (target, debugger)
}

fn main_thread() -> ThreadRef {
    ThreadRef {
        id: 1,
        name: "main".into(),
    }
}

#[tokio::test]
async fn breakpoint_hit_roundtrip() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);
    target.add_class("C", &[15]);

    let record = debugger.breakpoints().set(&*target, "C", 15).await.unwrap();
    assert_eq!(record.id, "bp-1");
    assert!(!record.pending);

    debugger.resume().await.unwrap();

    target.push_stop_event(EventKind::Breakpoint {
        thread: main_thread(),
        location: target.location("C", "main", 15),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(5)).await;
    assert_eq!(stop.kind, StopKind::BreakpointHit);
    assert_eq!(stop.detail("breakpointId"), Some("bp-1"));
    let location = stop.location.unwrap();
    assert_eq!(location.type_name, "C");
    assert_eq!(location.line, 15);

    // The stop set must not have been auto-resumed
    assert_eq!(target.resumed_set_count(), 0);
    assert_eq!(debugger.breakpoints().get("bp-1").unwrap().hit_count, 1);
}

#[tokio::test]
async fn pending_breakpoint_becomes_active_on_class_prepare() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);
    target.add_unprepared_class("NotYetLoaded", &[3]);

    let record = debugger
        .breakpoints()
        .set(&*target, "NotYetLoaded", 3)
        .await
        .unwrap();
    assert_eq!(record.id, "bp-1");
    assert!(record.pending);

    debugger.resume().await.unwrap();

    // The class prepares; the pump resolves the deferred record and
    // resumes the (monitor-only) event set.
    let type_ref = target.prepare_class("NotYetLoaded");
    target.push_monitor_event(EventKind::ClassPrepare {
        thread: main_thread(),
        type_ref,
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if !debugger.breakpoints().get("bp-1").unwrap().pending {
            break;
        }
        assert!(Instant::now() < deadline, "deferred breakpoint never resolved");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Then the line is hit
    target.push_stop_event(EventKind::Breakpoint {
        thread: main_thread(),
        location: target.location("NotYetLoaded", "main", 3),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(5)).await;
    assert_eq!(stop.kind, StopKind::BreakpointHit);
    assert_eq!(stop.detail("breakpointId"), Some("bp-1"));

    let record = debugger.breakpoints().get("bp-1").unwrap();
    assert!(!record.pending);
    assert!(record.handle.is_some());
}

#[tokio::test]
async fn modification_watchpoint_reports_value_to_be() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);
    target.add_class("C", &[12]);
    let field = target.add_field("C", "counter", "int");

    let record = debugger
        .watchpoints()
        .set(&*target, "C", "counter", WatchKind::Modify)
        .await
        .unwrap();
    assert_eq!(record.id, "wm-1");

    debugger.resume().await.unwrap();

    target.push_stop_event(EventKind::ModificationWatchpoint {
        thread: main_thread(),
        location: target.location("C", "main", 12),
        field,
        value_to_be: Value::Int(1),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(10)).await;
    assert_eq!(stop.kind, StopKind::WatchpointModify);
    assert_eq!(stop.detail("field"), Some("counter"));
    assert_eq!(stop.detail("newValue"), Some("1"));
}

#[tokio::test]
async fn exception_breakpoint_reports_caught_site() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);
    target.add_class("java.lang.IllegalArgumentException", &[]);
    target.mark_throwable("java.lang.IllegalArgumentException");
    target.add_class("C", &[20, 25]);

    let record = debugger
        .exceptions()
        .set(&*target, Some("java.lang.IllegalArgumentException"), true, true)
        .await
        .unwrap();
    assert_eq!(record.id, "ex-1");

    debugger.resume().await.unwrap();

    target.push_stop_event(EventKind::Exception {
        thread: main_thread(),
        location: target.location("C", "process", 20),
        exception_type: "java.lang.IllegalArgumentException".into(),
        exception_id: 700,
        catch_location: Some(target.location("C", "main", 25)),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(10)).await;
    assert_eq!(stop.kind, StopKind::ExceptionThrown);
    assert_eq!(
        stop.detail("exceptionClass"),
        Some("java.lang.IllegalArgumentException")
    );
    assert_eq!(stop.detail("caught"), Some("true"));
    assert_eq!(stop.detail("catchLine"), Some("25"));
}

#[tokio::test]
async fn wait_for_stop_timeout_leaves_target_running() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", true);

    debugger.resume().await.unwrap();

    let started = Instant::now();
    let stop = debugger.wait_for_stop(Duration::from_secs(1)).await;
    let waited = started.elapsed();

    assert!(!stop.is_stopped());
    assert!(waited >= Duration::from_millis(900), "waited {:?}", waited);
    assert!(waited <= Duration::from_millis(1500), "waited {:?}", waited);

    let status = debugger.status().await.unwrap();
    assert!(!status.stop.is_stopped());
}

#[tokio::test]
async fn disconnect_during_wait_unblocks_waiter_and_clears_state() {
    let (target, debugger) = attach().await;
    target.add_class("C", &[15]);
    let debugger = Arc::new(debugger);
    debugger.breakpoints().set(&*target, "C", 15).await.unwrap();

    let waiter = {
        let debugger = debugger.clone();
        tokio::spawn(async move { debugger.wait_for_stop(Duration::from_secs(30)).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    let disconnect_started = Instant::now();
    debugger.disconnect().await;

    let stop = waiter.await.unwrap();
    assert_eq!(stop.kind, StopKind::VmDisconnect);
    assert!(disconnect_started.elapsed() < Duration::from_secs(1));

    assert!(debugger.breakpoints().list().is_empty());
    assert!(debugger.watchpoints().list().is_empty());
    assert!(debugger.method_breakpoints().list().is_empty());
    assert!(debugger.exceptions().list().is_empty());
    assert!(matches!(
        debugger.target().await,
        Err(DebugError::NotConnected)
    ));
}

#[tokio::test]
async fn shared_location_surfaces_exactly_one_breakpoint_id() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);
    target.add_class("C", &[15]);

    let first = debugger.breakpoints().set(&*target, "C", 15).await.unwrap();
    let second = debugger.breakpoints().set(&*target, "C", 15).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(
        target.live_requests_of(|k| matches!(k, RequestKind::Breakpoint(_))),
        1
    );

    debugger.resume().await.unwrap();
    target.push_stop_event(EventKind::Breakpoint {
        thread: main_thread(),
        location: target.location("C", "main", 15),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(5)).await;
    assert_eq!(stop.kind, StopKind::BreakpointHit);
    assert_eq!(stop.detail("breakpointId"), Some(first.id.as_str()));
}

#[tokio::test]
async fn vm_start_is_a_stop_event() {
    let (target, debugger) = attach().await;
    target.add_thread(1, "main", false);

    target.push_stop_event(EventKind::VmStart {
        thread: main_thread(),
    });

    let stop = debugger.wait_for_stop(Duration::from_secs(5)).await;
    assert_eq!(stop.kind, StopKind::VmStart);
    assert_eq!(target.resumed_set_count(), 0);
}

#[tokio::test]
async fn step_event_deletes_its_one_shot_request() {
    let (target, debugger) = attach().await;
    target.add_class("C", &[10, 11]);
    let thread = target.add_thread(1, "main", true);
    target.push_frame(1, "C", "run", 10);

    debugger
        .step(Some(1), debug_adapter::StepDepth::Over)
        .await
        .unwrap();
    let step_requests: Vec<_> = (1u64..=10)
        .map(debug_adapter::RequestHandle)
        .filter(|h| target.request(*h).map(|r| r.kind == RequestKind::Step { thread_id: 1 }).unwrap_or(false))
        .collect();
    assert_eq!(step_requests.len(), 1);
    let handle = step_requests[0];

    target.push_stop_event_for(
        Some(handle),
        EventKind::Step {
            thread: thread.clone(),
            location: target.location("C", "run", 11),
        },
    );

    let stop = debugger.wait_for_stop(Duration::from_secs(5)).await;
    assert_eq!(stop.kind, StopKind::StepComplete);

    // The pump removed the fired request
    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if target.request(handle).is_none() {
            break;
        }
        assert!(Instant::now() < deadline, "step request was not deleted");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn captured_events_flow_into_events_pending_order() {
    let (target, debugger) = attach().await;

    for id in 0..3u64 {
        target.push_monitor_event(EventKind::ThreadStart {
            thread: ThreadRef {
                id,
                name: format!("worker-{}", id),
            },
        });
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while debugger.monitor().pending_count() < 3 {
        assert!(Instant::now() < deadline, "events never captured");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let drained = debugger.monitor().drain_pending();
    let ids: Vec<&str> = drained
        .iter()
        .map(|e| {
            e.details
                .iter()
                .find(|(k, _)| k == "threadId")
                .map(|(_, v)| v.as_str())
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
}
