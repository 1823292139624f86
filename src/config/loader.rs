//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
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
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GatewayMode;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.mode, GatewayMode::Http);
        assert_eq!(config.routes.base_path, "/admin");
        assert_eq!(config.auth.identity_header, "X-Generic-AppName");
        assert_eq!(config.forwarder.bind_address, "0.0.0.0:5000");
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let config = parse_config(
            r#"
            mode = "both"

            [backend]
            address = "localhost:9000"

            [[auth.users]]
            username = "alice"
            password = "wonderland"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, GatewayMode::Both);
        assert_eq!(config.backend.address, "localhost:9000");
        assert_eq!(config.auth.users.len(), 1);
        assert_eq!(config.auth.users[0].username, "alice");
        // untouched sections keep defaults
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse_config("mode = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn semantic_errors_are_reported() {
        let err = parse_config(
            r#"
            [routes]
            base_path = "admin"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if !errors.is_empty()));
    }

    #[test]
    fn shipped_example_is_valid() {
        let config = parse_config(include_str!("../../filegate.example.toml")).unwrap();
        assert_eq!(config.auth.users.len(), 1);
        assert_eq!(config.auth.max_payload_bytes, 65536);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
