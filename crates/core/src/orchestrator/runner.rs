//! Sequences a full training run from setup to shutdown.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::{CredentialWaiter, Credentials};
use crate::logscan::LogTailScanner;
use crate::process::{CommandRunner, ProcessError, ProcessHandle, ProcessRegistry, ProcessState};

use super::cleanup::CleanupHandler;
use super::types::{RunError, RunPhase, RunSummary};

/// Drives one run through its phases: setup scripts, login wait, training,
/// confirmation scan, shutdown. Setup failures abort with the step's exit
/// code; a failed or missing confirmation is reported, never fatal.
pub struct RunOrchestrator {
    config: Config,
    registry: ProcessRegistry,
    runner: CommandRunner,
    cleanup: CleanupHandler,
    phase: RunPhase,
}

impl RunOrchestrator {
    pub fn new(config: Config, registry: ProcessRegistry, cleanup: CleanupHandler) -> Self {
        let runner = CommandRunner::new(registry.clone());
        Self {
            config,
            registry,
            runner,
            cleanup,
            phase: RunPhase::Setup,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        debug_assert!(phase >= self.phase, "phase transitions are forward-only");
        info!("Entering phase: {}", phase);
        self.phase = phase;
    }

    /// Runs the whole sequence. On success the front-end has been terminated
    /// and cleanup has run; on error the orchestrator moves to the
    /// shutting-down phase and the caller owns cleanup.
    pub async fn run(&mut self) -> Result<RunSummary, RunError> {
        match self.run_phases().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.enter(RunPhase::ShuttingDown);
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<RunSummary, RunError> {
        let started_at = Utc::now();

        self.enter(RunPhase::Setup);
        self.bootstrap_directories().await?;
        let scripts = self.config.scripts.clone();
        self.run_fatal("venv setup", &scripts.venv_setup).await?;
        self.run_fatal("gradle setup", &scripts.gradle_setup).await?;
        self.run_fatal("yarn setup", &scripts.yarn_setup).await?;

        self.enter(RunPhase::AwaitingLogin);
        let frontend = self.start_frontend().await?;
        let credentials = self.await_login().await;

        self.enter(RunPhase::Training);
        let training_exit = self.run_training(&credentials).await?;

        self.enter(RunPhase::AwaitingConfirmation);
        let scanner = LogTailScanner::new(
            self.config.paths.train_log.clone().into(),
            self.config.confirmation.window_lines,
            self.config.confirmation.attempts,
            self.config.confirmation.interval(),
        );
        let scan = scanner.poll().await;
        match (&scan.upload, &scan.transaction) {
            (Some(_), Some(_)) => info!("Upload and transaction both confirmed"),
            (Some(_), None) => warn!("Upload confirmed but no transaction response was seen"),
            (None, Some(_)) => warn!("Transaction response seen without an upload confirmation"),
            (None, None) => warn!("No upload confirmation found in the training log"),
        }

        self.enter(RunPhase::ShuttingDown);
        self.registry
            .terminate(frontend.id, self.config.shutdown.grace())
            .await;
        self.cleanup.run().await;

        self.enter(RunPhase::Done);
        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            training_exit,
            scan,
        })
    }

    /// Clears the logs directory and creates the directories a run writes
    /// into.
    async fn bootstrap_directories(&self) -> Result<(), RunError> {
        let logs_dir = Path::new(&self.config.paths.logs_dir);
        if logs_dir.exists() {
            tokio::fs::remove_dir_all(logs_dir)
                .await
                .map_err(|source| RunError::Bootstrap {
                    path: self.config.paths.logs_dir.clone(),
                    source,
                })?;
        }
        tokio::fs::create_dir_all(logs_dir)
            .await
            .map_err(|source| RunError::Bootstrap {
                path: self.config.paths.logs_dir.clone(),
                source,
            })?;
        tokio::fs::create_dir_all(&self.config.paths.evaluate_dir)
            .await
            .map_err(|source| RunError::Bootstrap {
                path: self.config.paths.evaluate_dir.clone(),
                source,
            })?;
        Ok(())
    }

    /// Runs a setup step to completion; a non-zero exit aborts the run with
    /// that step's code.
    async fn run_fatal(&self, step: &str, command_line: &str) -> Result<(), RunError> {
        info!("Running {}", step);
        self.runner
            .run_to_completion(step, command_line)
            .await
            .map_err(|e| match e {
                ProcessError::CommandFailed { code, .. } => RunError::FatalCommand {
                    step: step.to_string(),
                    code,
                },
                ProcessError::Interrupted { .. } => RunError::StepInterrupted {
                    step: step.to_string(),
                },
                other => RunError::Process(other),
            })
    }

    /// Spawns the login front-end and, when no login artifact exists yet,
    /// the browser helper. The browser helper is best-effort: headless
    /// machines simply get the URL logged instead.
    async fn start_frontend(&self) -> Result<ProcessHandle, RunError> {
        let frontend = self
            .runner
            .spawn("frontend", &self.config.scripts.frontend, None)
            .await?;

        tokio::time::sleep(self.config.login.frontend_settle()).await;

        if Path::new(&self.config.paths.user_data).exists() {
            info!("Existing login artifact found, skipping browser");
        } else {
            info!("Please log in at {}", self.config.login.login_url);
            if let Err(e) = self
                .runner
                .spawn("browser", &self.config.scripts.open_browser, None)
                .await
            {
                warn!("Could not open a browser ({}), log in manually", e);
            }
        }
        Ok(frontend)
    }

    async fn await_login(&self) -> Credentials {
        let waiter = CredentialWaiter::new(
            self.config.paths.user_data.clone().into(),
            self.config.paths.user_api_key.clone().into(),
            self.config.login.poll_interval(),
        );
        waiter.wait().await
    }

    /// Runs the training command with the credential-derived environment and
    /// waits for it. An abnormal exit is logged but the run proceeds to the
    /// confirmation scan, which reports what actually landed.
    async fn run_training(&self, credentials: &Credentials) -> Result<Option<i32>, RunError> {
        let env = credentials.to_env();
        let handle = self
            .runner
            .spawn("training", &self.config.scripts.train, Some(&env))
            .await?;
        info!("Training started (pid {:?})", handle.pid);

        let state = handle.wait().await;
        let exit = state.exit_code();
        match state {
            ProcessState::Exited(Some(0)) => info!("Training completed"),
            other => warn!("Training ended abnormally: {:?}", other),
        }
        Ok(exit)
    }
}
