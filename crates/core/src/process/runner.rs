//! Spawns external commands through a shell and registers them for cleanup.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::registry::ProcessRegistry;
use super::types::{ProcessError, ProcessHandle, ProcessState};

/// Spawns external commands. Every child is registered with the registry
/// before its handle is returned, so no exit path can leave a spawned
/// process untracked.
#[derive(Clone)]
pub struct CommandRunner {
    registry: ProcessRegistry,
}

impl CommandRunner {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    /// Spawns `command_line` through `sh -c`. When `env` is given the child
    /// sees exactly that environment instead of the inherited one.
    pub async fn spawn(
        &self,
        label: &str,
        command_line: &str,
        env: Option<&HashMap<String, String>>,
    ) -> Result<ProcessHandle, ProcessError> {
        debug!("Spawning {}: {}", label, command_line);
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::inherit());

        if let Some(env) = env {
            command.env_clear().envs(env);
        }

        #[cfg(unix)]
        {
            // New session per child so the registry can signal the whole
            // process tree, not just the shell.
            unsafe {
                command.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let child = command.spawn().map_err(|source| ProcessError::Spawn {
            label: label.to_string(),
            source,
        })?;

        Ok(self.registry.register(label, child).await)
    }

    /// Spawns and waits to completion. A non-zero exit is an error carrying
    /// the child's code so the caller can abort the whole run with it.
    pub async fn run_to_completion(
        &self,
        label: &str,
        command_line: &str,
    ) -> Result<(), ProcessError> {
        let handle = self.spawn(label, command_line, None).await?;
        match handle.wait().await {
            ProcessState::Exited(Some(0)) => {
                debug!("{} completed", label);
                Ok(())
            }
            ProcessState::Exited(Some(code)) => Err(ProcessError::CommandFailed {
                label: label.to_string(),
                code,
            }),
            ProcessState::Exited(None) | ProcessState::Killed | ProcessState::Running => {
                Err(ProcessError::Interrupted {
                    label: label.to_string(),
                })
            }
        }
    }
}
