pub mod config;
pub mod credentials;
pub mod logscan;
pub mod logwatch;
pub mod orchestrator;
pub mod process;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use credentials::{CredentialWaiter, Credentials};
pub use logscan::{LogScanResult, LogTailScanner, UploadConfirmation};
pub use logwatch::{LogFailure, LogWatcher};
pub use orchestrator::{CleanupHandler, RunError, RunOrchestrator, RunPhase, RunSummary};
pub use process::{CommandRunner, ProcessHandle, ProcessRegistry, ProcessState};
