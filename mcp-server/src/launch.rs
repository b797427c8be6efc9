// Debuggee process supervision
//
// Launching spawns the debuggee ourselves and attaches over a local
// socket. Stdout and stderr are drained continuously so the child can
// never dead-lock on a full pipe; the last lines are retained for
// launch-failure diagnostics.

use crate::error::{DebugError, DebugResult};
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

const OUTPUT_TAIL_LINES: usize = 100;
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ask the OS for a free local TCP port.
pub fn find_free_port() -> DebugResult<u16> {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|_| DebugError::PortUnavailable)
}

/// Poll until `host:port` accepts connections or the timeout elapses.
pub async fn wait_for_port(host: &str, port: u16, timeout: Duration) -> DebugResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if TcpStream::connect((host, port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DebugError::Timeout);
        }
        sleep(PORT_POLL_INTERVAL).await;
    }
}

/// A spawned debuggee (or build tool) under broker supervision.
pub struct LaunchedProcess {
    child: Child,
    output: Arc<Mutex<VecDeque<String>>>,
}

impl LaunchedProcess {
    pub fn spawn(command: &[String], cwd: Option<&Path>) -> DebugResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DebugError::Launch("empty launch command".to_string()))?;

        info!("spawning debuggee: {}", command.join(" "));

        let mut builder = Command::new(program);
        builder
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            builder.current_dir(dir);
        }

        let mut child = builder
            .spawn()
            .map_err(|e| DebugError::Launch(format!("{}: {}", program, e)))?;

        let output = Arc::new(Mutex::new(VecDeque::new()));
        if let Some(stdout) = child.stdout.take() {
            spawn_drainer(stdout, output.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_drainer(stderr, output.clone());
        }

        Ok(Self { child, output })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// The retained tail of the child's combined output.
    pub fn output_tail(&self) -> String {
        let lines = self.output.lock().unwrap();
        lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("debuggee already gone: {}", e);
        }
    }
}

fn spawn_drainer(stream: impl AsyncRead + Unpin + Send + 'static, sink: Arc<Mutex<VecDeque<String>>>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut sink = sink.lock().unwrap();
            sink.push_back(line);
            while sink.len() > OUTPUT_TAIL_LINES {
                sink.pop_front();
            }
        }
    });
}

/// Configuration for a gradle-assisted test launch.
///
/// `--debug-jvm` makes the forked test JVM wait for a debugger on the
/// standard port; the broker then attaches to it like any socket target.
#[derive(Debug, Clone)]
pub struct GradleTestLaunch {
    pub project_dir: Option<String>,
    pub test_filter: Option<String>,
    pub port: u16,
    pub wait_timeout: Duration,
    pub gradle_args: Vec<String>,
    pub use_wrapper: bool,
    pub clean: bool,
}

impl Default for GradleTestLaunch {
    fn default() -> Self {
        Self {
            project_dir: None,
            test_filter: None,
            port: 5005,
            wait_timeout: Duration::from_secs(120),
            gradle_args: Vec::new(),
            use_wrapper: true,
            clean: false,
        }
    }
}

impl GradleTestLaunch {
    pub fn command(&self) -> Vec<String> {
        let mut command = Vec::new();
        command.push(if self.use_wrapper {
            "./gradlew".to_string()
        } else {
            "gradle".to_string()
        });
        if self.clean {
            command.push("clean".to_string());
        }
        command.push("test".to_string());
        if let Some(filter) = &self.test_filter {
            command.push("--tests".to_string());
            command.push(filter.clone());
        }
        command.push("--debug-jvm".to_string());
        command.extend(self.gradle_args.iter().cloned());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn free_ports_are_distinct_from_zero() {
        let port = find_free_port().unwrap();
        assert!(port > 0);
    }

    #[tokio::test]
    async fn wait_for_port_times_out_on_closed_port() {
        let port = find_free_port().unwrap();
        let err = wait_for_port("127.0.0.1", port, Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(matches!(err, DebugError::Timeout));
    }

    #[tokio::test]
    async fn wait_for_port_sees_a_listener() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        wait_for_port("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn spawn_retains_output_tail() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo one; echo two >&2".to_string(),
        ];
        let process = LaunchedProcess::spawn(&command, None).unwrap();
        sleep(Duration::from_millis(200)).await;
        let tail = process.output_tail();
        assert!(tail.contains("one"));
        assert!(tail.contains("two"));
    }

    #[test]
    fn gradle_command_shape() {
        let launch = GradleTestLaunch {
            test_filter: Some("com.example.CartTest".to_string()),
            clean: true,
            use_wrapper: false,
            ..GradleTestLaunch::default()
        };
        assert_eq!(
            launch.command(),
            vec![
                "gradle",
                "clean",
                "test",
                "--tests",
                "com.example.CartTest",
                "--debug-jvm"
            ]
        );
    }
}
