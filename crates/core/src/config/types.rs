//! Launcher configuration. Every section and field has a default matching
//! the stock repository layout, so an empty config file is a valid one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// Filesystem layout, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_evaluate_dir")]
    pub evaluate_dir: String,
    #[serde(default = "default_user_data")]
    pub user_data: String,
    #[serde(default = "default_user_api_key")]
    pub user_api_key: String,
    #[serde(default = "default_train_log")]
    pub train_log: String,
}

/// Shell command lines for each run step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default = "default_venv_setup")]
    pub venv_setup: String,
    #[serde(default = "default_gradle_setup")]
    pub gradle_setup: String,
    #[serde(default = "default_yarn_setup")]
    pub yarn_setup: String,
    #[serde(default = "default_frontend")]
    pub frontend: String,
    #[serde(default = "default_open_browser")]
    pub open_browser: String,
    #[serde(default = "default_train")]
    pub train: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    #[serde(default = "default_login_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Pause after spawning the front-end before opening the browser, so
    /// the dev server has a chance to bind its port.
    #[serde(default = "default_frontend_settle_secs")]
    pub frontend_settle_secs: u64,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirmation_attempts")]
    pub attempts: u32,
    #[serde(default = "default_confirmation_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_window_lines")]
    pub window_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_watcher_enabled")]
    pub enabled: bool,
    #[serde(default = "default_watcher_check_interval_secs")]
    pub check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    #[serde(default = "default_termination_grace_secs")]
    pub termination_grace_secs: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            evaluate_dir: default_evaluate_dir(),
            user_data: default_user_data(),
            user_api_key: default_user_api_key(),
            train_log: default_train_log(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            venv_setup: default_venv_setup(),
            gradle_setup: default_gradle_setup(),
            yarn_setup: default_yarn_setup(),
            frontend: default_frontend(),
            open_browser: default_open_browser(),
            train: default_train(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_login_poll_interval_secs(),
            frontend_settle_secs: default_frontend_settle_secs(),
            login_url: default_login_url(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            attempts: default_confirmation_attempts(),
            interval_secs: default_confirmation_interval_secs(),
            window_lines: default_window_lines(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_watcher_enabled(),
            check_interval_secs: default_watcher_check_interval_secs(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            termination_grace_secs: default_termination_grace_secs(),
        }
    }
}

impl LoginConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn frontend_settle(&self) -> Duration {
        Duration::from_secs(self.frontend_settle_secs)
    }
}

impl ConfirmationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl WatcherConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.termination_grace_secs)
    }
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

fn default_evaluate_dir() -> String {
    "data/base_checkpoint/evaluate".to_string()
}

fn default_user_data() -> String {
    "modal-login/temp-data/userData.json".to_string()
}

fn default_user_api_key() -> String {
    "modal-login/temp-data/userApiKey.json".to_string()
}

fn default_train_log() -> String {
    "logs/blockassist-train.log".to_string()
}

fn default_venv_setup() -> String {
    "./scripts/venv_setup.sh | tee logs/venv.log".to_string()
}

fn default_gradle_setup() -> String {
    "./scripts/gradle_setup.sh".to_string()
}

fn default_yarn_setup() -> String {
    "./scripts/yarn_setup.sh".to_string()
}

fn default_frontend() -> String {
    "./scripts/yarn_run.sh".to_string()
}

fn default_open_browser() -> String {
    "open http://localhost:3000 2> /dev/null".to_string()
}

fn default_train() -> String {
    "./scripts/train_blockassist.sh".to_string()
}

fn default_login_poll_interval_secs() -> u64 {
    1
}

fn default_frontend_settle_secs() -> u64 {
    5
}

fn default_login_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_confirmation_attempts() -> u32 {
    30
}

fn default_confirmation_interval_secs() -> u64 {
    1
}

fn default_window_lines() -> usize {
    15
}

fn default_watcher_enabled() -> bool {
    true
}

fn default_watcher_check_interval_secs() -> u64 {
    1
}

fn default_termination_grace_secs() -> u64 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.logs_dir, "logs");
        assert_eq!(config.paths.train_log, "logs/blockassist-train.log");
        assert_eq!(config.confirmation.attempts, 30);
        assert_eq!(config.confirmation.window_lines, 15);
        assert_eq!(config.login.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.login.frontend_settle(), Duration::from_secs(5));
        assert!(config.watcher.enabled);
        assert_eq!(config.shutdown.grace(), Duration::from_secs(3));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scripts.train, "./scripts/train_blockassist.sh");
        assert_eq!(config.confirmation.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_section_keeps_sibling_defaults() {
        let config: Config = toml::from_str(
            r#"
[confirmation]
attempts = 5
"#,
        )
        .unwrap();
        assert_eq!(config.confirmation.attempts, 5);
        assert_eq!(config.confirmation.window_lines, 15);
        assert_eq!(config.paths.logs_dir, "logs");
    }
}
