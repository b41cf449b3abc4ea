//! Run sequencing: drives one training session through its phases.
//!
//! - **Setup**: directory bootstrap plus the fatal-on-failure setup scripts
//! - **Login**: front-end spawn and unbounded credential wait
//! - **Training**: the training command under the derived environment
//! - **Confirmation**: bounded tail scan of the training log
//! - **Shutdown**: front-end termination and registry-wide cleanup

mod cleanup;
mod runner;
mod types;

pub use cleanup::CleanupHandler;
pub use runner::RunOrchestrator;
pub use types::{RunError, RunPhase, RunSummary};
