//! Process supervision: spawning, tracking and bulk termination of the
//! external programs a run depends on.

mod registry;
mod runner;
mod types;

pub use registry::ProcessRegistry;
pub use runner::CommandRunner;
pub use types::{ProcessError, ProcessHandle, ProcessId, ProcessState, ProcessStatus};
