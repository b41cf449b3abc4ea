use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("BLOCKASSIST_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[confirmation]
attempts = 12

[paths]
logs_dir = "run-logs"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.confirmation.attempts, 12);
        assert_eq!(config.paths.logs_dir, "run-logs");
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
[confirmation]
attempts = "thirty"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/blockassist.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[scripts]
train = "./scripts/train_custom.sh"

[shutdown]
termination_grace_secs = 7
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.scripts.train, "./scripts/train_custom.sh");
        assert_eq!(config.shutdown.termination_grace_secs, 7);
        // Untouched sections fall back to defaults.
        assert_eq!(config.confirmation.attempts, 30);
    }
}
