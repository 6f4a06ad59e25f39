//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GrouperDriver;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8081");
        assert_eq!(config.health_check.interval_secs, 3);
        assert_eq!(config.health_check.path, "/version");
        assert_eq!(config.health_check.unhealthy_threshold, 2);
        assert_eq!(config.health_check.healthy_threshold, 1);
        assert_eq!(config.grouper.driver, GrouperDriver::Static);
    }

    #[test]
    fn parses_sections() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [grouper]
            driver = "static"
            nodes = ["127.0.0.1:8080", "127.0.0.1:8082"]
            store_path = "/var/lib/fnproxy/nodes.json"

            [health_check]
            interval_secs = 1
            min_api_version = "0.0.200"
            "#,
        )
        .unwrap();
        assert_eq!(config.grouper.nodes.len(), 2);
        assert_eq!(config.grouper.store_path.as_deref(), Some("/var/lib/fnproxy/nodes.json"));
        assert_eq!(config.health_check.min_api_version, "0.0.200");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = parse_config("[health_check]\ninterval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_config("not toml at all [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
