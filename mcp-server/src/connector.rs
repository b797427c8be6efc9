// Wire backend selection
//
// The broker core is wire-agnostic: everything goes through the
// debug-adapter traits. This build ships without a concrete backend
// linked in; connect attempts say so instead of failing obscurely.
// Tests inject the scripted testkit connector here instead.

use async_trait::async_trait;
use debug_adapter::{AdapterError, AdapterResult, DebugConnector, DebugTarget};
use std::sync::Arc;

const NO_BACKEND: &str = "no debug-wire backend is linked into this build";

pub struct UnlinkedConnector;

#[async_trait]
impl DebugConnector for UnlinkedConnector {
    async fn connect_socket(
        &self,
        _host: &str,
        _port: u16,
    ) -> AdapterResult<Arc<dyn DebugTarget>> {
        Err(AdapterError::Unsupported(NO_BACKEND.to_string()))
    }

    async fn connect_pid(&self, _pid: u32) -> AdapterResult<Arc<dyn DebugTarget>> {
        Err(AdapterError::Unsupported(NO_BACKEND.to_string()))
    }

    fn launch_command(
        &self,
        main_class: &str,
        classpath: Option<&str>,
        extra_args: &[String],
        port: u16,
        suspend: bool,
    ) -> Vec<String> {
        let mut command = vec![
            "java".to_string(),
            format!(
                "-agentlib:jdwp=transport=dt_socket,server=y,suspend={},address=127.0.0.1:{}",
                if suspend { "y" } else { "n" },
                port
            ),
        ];
        if let Some(classpath) = classpath {
            command.push("-cp".to_string());
            command.push(classpath.to_string());
        }
        command.extend(extra_args.iter().cloned());
        command.push(main_class.to_string());
        command
    }
}

pub fn default_connector() -> Arc<dyn DebugConnector> {
    Arc::new(UnlinkedConnector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn launch_command_points_the_agent_at_the_loopback_port() {
        let connector = UnlinkedConnector;
        let command = connector.launch_command(
            "com.example.Main",
            Some("build/classes"),
            &["-Xmx256m".to_string()],
            5105,
            true,
        );
        assert_eq!(command[0], "java");
        assert!(command[1].contains("suspend=y"));
        assert!(command[1].contains("address=127.0.0.1:5105"));
        assert_eq!(command[2], "-cp");
        assert_eq!(command[3], "build/classes");
        assert_eq!(command[4], "-Xmx256m");
        assert_eq!(command[5], "com.example.Main");
    }
}
