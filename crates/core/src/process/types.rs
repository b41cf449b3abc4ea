//! Types for process tracking.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

/// Errors from spawning or waiting on external commands.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The underlying program could not be started.
    #[error("failed to spawn {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    /// A fatal-on-failure command exited non-zero.
    #[error("{label} exited with code {code}")]
    CommandFailed { label: String, code: i32 },

    /// The command died without reporting an exit code (signal, or killed
    /// by the registry while we were waiting on it).
    #[error("{label} was terminated before completing")]
    Interrupted { label: String },
}

/// Registry-assigned identifier for a tracked process, distinct from the
/// OS pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a tracked process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// Exited on its own; `None` when the OS reports no code (signal death).
    Exited(Option<i32>),
    /// Terminated by the registry.
    Killed,
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }

    /// The exit code, when the process exited on its own with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessState::Exited(code) => *code,
            _ => None,
        }
    }
}

/// Handle to a spawned external process. Cloneable; waiting observes the
/// terminal state published by the registry's reaper task.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub id: ProcessId,
    pub label: String,
    pub pid: Option<u32>,
    pub(crate) exit_rx: watch::Receiver<ProcessState>,
}

impl ProcessHandle {
    /// Current state as last published by the reaper.
    pub fn state(&self) -> ProcessState {
        *self.exit_rx.borrow()
    }

    /// Waits until the process leaves the `Running` state.
    pub async fn wait(&self) -> ProcessState {
        let mut rx = self.exit_rx.clone();
        loop {
            let state = *rx.borrow();
            if !state.is_running() {
                return state;
            }
            if rx.changed().await.is_err() {
                // The reaper is gone without publishing a terminal state;
                // the child is no longer observable.
                return ProcessState::Killed;
            }
        }
    }
}

/// Point-in-time view of a registry entry.
#[derive(Debug, Clone)]
pub struct ProcessStatus {
    pub id: ProcessId,
    pub label: String,
    pub pid: Option<u32>,
    pub state: ProcessState,
    pub spawned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_state_exit_code() {
        assert_eq!(ProcessState::Exited(Some(3)).exit_code(), Some(3));
        assert_eq!(ProcessState::Exited(None).exit_code(), None);
        assert_eq!(ProcessState::Killed.exit_code(), None);
        assert_eq!(ProcessState::Running.exit_code(), None);
    }

    #[test]
    fn test_process_state_is_running() {
        assert!(ProcessState::Running.is_running());
        assert!(!ProcessState::Exited(Some(0)).is_running());
        assert!(!ProcessState::Killed.is_running());
    }

    #[test]
    fn test_error_display() {
        let err = ProcessError::CommandFailed {
            label: "gradle setup".to_string(),
            code: 3,
        };
        assert_eq!(err.to_string(), "gradle setup exited with code 3");
    }
}
