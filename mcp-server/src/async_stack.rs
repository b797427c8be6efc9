// Async stack analysis
//
// Read-only heuristics over suspended threads: which other threads look
// like they belong to the same logical asynchronous task. Nothing in the
// target is mutated.

use crate::error::{DebugError, DebugResult};
use crate::thread_ops::is_system_thread;
use debug_adapter::{DebugTarget, ThreadRef};
use std::fmt::Write;

const RELATED_THREAD_CAP: usize = 5;
const FRAMEWORK_SCAN_FRAMES: usize = 10;

// Thread-name fragments typical of async frameworks and pools
const ASYNC_THREAD_PATTERNS: &[&str] = &[
    "ForkJoinPool",
    "parallel-",
    "boundedElastic-",
    "reactor-",
    "rxjava-",
    "Executor",
    "pool-",
    "AsyncTask",
    "CompletableFuture",
    "http-nio-",
    "tomcat-",
    "undertow-",
];

pub async fn async_stack_summary(
    target: &dyn DebugTarget,
    thread_id: Option<u64>,
    show_all_suspended: bool,
    max_frames: usize,
) -> DebugResult<String> {
    let all_threads = target.all_threads().await?;

    let primary = match thread_id {
        Some(id) => all_threads
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(DebugError::ThreadNotFound(id))?,
        None => {
            let mut found = None;
            for thread in &all_threads {
                if is_system_thread(thread) {
                    continue;
                }
                if target.is_suspended(thread).await.unwrap_or(false) {
                    found = Some(thread.clone());
                    break;
                }
            }
            found.ok_or(DebugError::ThreadNotSuspended(0))?
        }
    };

    let mut out = String::new();
    out.push_str("=== Async Stack Trace Analysis ===\n\n");
    out.push_str("--- Primary Thread ---\n");
    append_thread_stack(target, &mut out, &primary, max_frames).await;

    if let Some(framework) = detect_framework(target, &primary).await {
        let _ = writeln!(out, "\nDetected async framework: {}", framework);
    }

    let related = related_threads(target, &all_threads, &primary).await;
    if !related.is_empty() {
        let _ = writeln!(out, "\n--- Related Async Threads ({}) ---\n", related.len());
        for thread in &related {
            append_thread_stack(target, &mut out, thread, max_frames.min(8)).await;
            out.push('\n');
        }
    }

    if show_all_suspended {
        out.push_str("\n--- All Suspended Threads ---\n\n");
        for thread in &all_threads {
            if thread.id == primary.id || related.iter().any(|r| r.id == thread.id) {
                continue;
            }
            if target.is_suspended(thread).await.unwrap_or(false) {
                append_thread_stack(target, &mut out, thread, max_frames.min(5)).await;
                out.push('\n');
            }
        }
    }

    out.push_str("\n--- Async Debugging Tips ---\n");
    out.push_str("- Use watch_add to track async values across steps\n");
    out.push_str("- Set method breakpoints on subscribe/onNext for reactive streams\n");
    out.push_str("- Use exception_break_on to catch errors in async callbacks\n");

    Ok(out)
}

async fn append_thread_stack(
    target: &dyn DebugTarget,
    out: &mut String,
    thread: &ThreadRef,
    max_frames: usize,
) {
    let _ = writeln!(out, "[{}] (ID: {})", thread.name, thread.id);

    if !target.is_suspended(thread).await.unwrap_or(false) {
        out.push_str("  (thread not suspended)\n");
        return;
    }

    let frames = match target.frames(thread).await {
        Ok(frames) => frames,
        Err(e) => {
            let _ = writeln!(out, "  (unable to get frames: {})", e);
            return;
        }
    };

    if frames.is_empty() {
        out.push_str("  (no stack frames)\n");
        return;
    }

    for frame in frames.iter().take(max_frames) {
        let marker = if is_async_class(&frame.location.type_name) {
            "> "
        } else {
            "  "
        };
        let _ = writeln!(
            out,
            "{}#{} {}.{}:{}",
            marker,
            frame.index,
            shorten_class_name(&frame.location.type_name),
            frame.location.method_name,
            frame.location.line
        );
    }

    if frames.len() > max_frames {
        let _ = writeln!(out, "  ... {} more frames", frames.len() - max_frames);
    }
}

async fn detect_framework(target: &dyn DebugTarget, thread: &ThreadRef) -> Option<&'static str> {
    let name = thread.name.as_str();
    if name.contains("ForkJoinPool") {
        return Some("Java ForkJoinPool (CompletableFuture)");
    }
    if name.contains("boundedElastic") || name.contains("parallel") {
        return Some("Project Reactor");
    }
    if name.contains("rxjava") || name.contains("RxComputation") {
        return Some("RxJava");
    }
    if name.contains("http-nio") {
        return Some("Tomcat NIO");
    }
    if name.contains("undertow") {
        return Some("Undertow Async");
    }

    // Fall back to class names near the top of the stack
    if target.is_suspended(thread).await.unwrap_or(false) {
        if let Ok(frames) = target.frames(thread).await {
            for frame in frames.iter().take(FRAMEWORK_SCAN_FRAMES) {
                let class = frame.location.type_name.as_str();
                if class.contains("CompletableFuture") {
                    return Some("Java CompletableFuture");
                }
                if class.contains("reactor.core") {
                    return Some("Project Reactor");
                }
                if class.contains("io.reactivex") {
                    return Some("RxJava");
                }
                if class.contains("kotlinx.coroutines") {
                    return Some("Kotlin Coroutines");
                }
            }
        }
    }

    None
}

async fn related_threads(
    target: &dyn DebugTarget,
    all_threads: &[ThreadRef],
    primary: &ThreadRef,
) -> Vec<ThreadRef> {
    let pool_prefix = extract_pool_prefix(&primary.name);
    let mut related = Vec::new();

    for thread in all_threads {
        if thread.id == primary.id || is_system_thread(thread) {
            continue;
        }
        if !target.is_suspended(thread).await.unwrap_or(false) {
            continue;
        }

        let same_pool = pool_prefix
            .as_deref()
            .map(|prefix| thread.name.starts_with(prefix))
            .unwrap_or(false);
        let looks_async = ASYNC_THREAD_PATTERNS
            .iter()
            .any(|p| thread.name.contains(p));

        if same_pool || looks_async {
            related.push(thread.clone());
            if related.len() >= RELATED_THREAD_CAP {
                break;
            }
        }
    }

    related
}

/// "ForkJoinPool-1-worker-3" -> "ForkJoinPool-1-worker"
fn extract_pool_prefix(thread_name: &str) -> Option<String> {
    let (prefix, suffix) = thread_name.rsplit_once('-')?;
    if suffix.chars().all(|c| c.is_ascii_digit()) && !suffix.is_empty() {
        Some(prefix.to_string())
    } else {
        None
    }
}

fn is_async_class(class_name: &str) -> bool {
    class_name.contains("CompletableFuture")
        || class_name.contains("FutureTask")
        || class_name.starts_with("reactor.core")
        || class_name.starts_with("io.reactivex")
        || class_name.contains("Lambda")
        || class_name.contains("$$")
        || class_name.to_ascii_lowercase().contains("async")
}

/// "com.example.MyClass" -> "c.e.MyClass"
fn shorten_class_name(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split('.').collect();
    if parts.len() <= 2 {
        return full_name.to_string();
    }
    let mut short = String::new();
    for part in &parts[..parts.len() - 1] {
        if let Some(first) = part.chars().next() {
            short.push(first);
            short.push('.');
        }
    }
    short.push_str(parts[parts.len() - 1]);
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_adapter::testkit::ScriptedTarget;
    use pretty_assertions::assert_eq;

    #[test]
    fn pool_prefix_extraction() {
        assert_eq!(
            extract_pool_prefix("ForkJoinPool-1-worker-3").as_deref(),
            Some("ForkJoinPool-1-worker")
        );
        assert_eq!(extract_pool_prefix("main"), None);
        assert_eq!(extract_pool_prefix("worker-abc"), None);
    }

    #[test]
    fn class_name_shortening() {
        assert_eq!(shorten_class_name("com.example.MyClass"), "c.e.MyClass");
        assert_eq!(shorten_class_name("MyClass"), "MyClass");
    }

    #[tokio::test]
    async fn summary_groups_pool_siblings() {
        let target = ScriptedTarget::new();
        target.add_class("com.example.Task", &[10]);
        target.add_thread(1, "pool-1-thread-1", true);
        target.push_frame(1, "com.example.Task", "call", 10);
        target.add_thread(2, "pool-1-thread-2", true);
        target.push_frame(2, "com.example.Task", "call", 12);
        target.add_thread(3, "Finalizer", true);

        let summary = async_stack_summary(&target, Some(1), false, 15)
            .await
            .unwrap();
        assert!(summary.contains("--- Primary Thread ---"));
        assert!(summary.contains("pool-1-thread-1"));
        assert!(summary.contains("Related Async Threads (1)"));
        assert!(summary.contains("pool-1-thread-2"));
        assert!(!summary.contains("Finalizer"));
    }

    #[tokio::test]
    async fn summary_without_suspended_thread_fails() {
        let target = ScriptedTarget::new();
        target.add_thread(1, "main", false);
        let err = async_stack_summary(&target, None, false, 15)
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::ThreadNotSuspended(_)));
    }
}
