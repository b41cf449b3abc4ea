use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Confirmation scan budget and window are non-zero
/// - Poll and check intervals are non-zero
/// - Script command lines are non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.confirmation.attempts == 0 {
        return Err(ConfigError::ValidationError(
            "confirmation.attempts cannot be 0".to_string(),
        ));
    }
    if config.confirmation.window_lines == 0 {
        return Err(ConfigError::ValidationError(
            "confirmation.window_lines cannot be 0".to_string(),
        ));
    }
    if config.confirmation.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "confirmation.interval_secs cannot be 0".to_string(),
        ));
    }
    if config.login.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "login.poll_interval_secs cannot be 0".to_string(),
        ));
    }
    if config.watcher.check_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "watcher.check_interval_secs cannot be 0".to_string(),
        ));
    }

    let scripts = [
        ("scripts.venv_setup", &config.scripts.venv_setup),
        ("scripts.gradle_setup", &config.scripts.gradle_setup),
        ("scripts.yarn_setup", &config.scripts.yarn_setup),
        ("scripts.frontend", &config.scripts.frontend),
        ("scripts.open_browser", &config.scripts.open_browser),
        ("scripts.train", &config.scripts.train),
    ];
    for (name, command) in scripts {
        if command.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{name} cannot be empty"
            )));
        }
    }

    Ok(())
}
