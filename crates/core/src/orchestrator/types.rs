//! Types for run sequencing.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::logscan::LogScanResult;
use crate::process::ProcessError;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A fatal-on-failure setup step exited non-zero; the run stops and the
    /// launcher exits with the step's own code.
    #[error("{step} failed with exit code {code}")]
    FatalCommand { step: String, code: i32 },

    /// A fatal-on-failure step was terminated before completing.
    #[error("{step} was interrupted")]
    StepInterrupted { step: String },

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The working-directory layout could not be prepared.
    #[error("failed to prepare {path}: {source}")]
    Bootstrap {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// The process exit code this error should produce. A failing setup
    /// step's own code is forwarded; everything else is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::FatalCommand { code, .. } => *code,
            RunError::Process(ProcessError::CommandFailed { code, .. }) => *code,
            _ => 1,
        }
    }
}

/// Phases of a run, in order. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Setup,
    AwaitingLogin,
    Training,
    AwaitingConfirmation,
    ShuttingDown,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Setup => "setup",
            RunPhase::AwaitingLogin => "awaiting-login",
            RunPhase::Training => "training",
            RunPhase::AwaitingConfirmation => "awaiting-confirmation",
            RunPhase::ShuttingDown => "shutting-down",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Exit code of the training command, when it reported one.
    pub training_exit: Option<i32>,
    pub scan: LogScanResult,
}

impl RunSummary {
    pub fn model_path(&self) -> Option<&str> {
        self.scan.upload.as_ref().and_then(|u| u.model_path())
    }

    pub fn model_size(&self) -> Option<&str> {
        self.scan.upload.as_ref().and_then(|u| u.size())
    }
}
