//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{EchoConfig, LogFormat};
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
pub fn load_config(path: &Path) -> Result<EchoConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: EchoConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the recognized environment overrides on top of `config`.
///
/// Takes the variables as plain pairs so the caller decides where they come
/// from; unparsable values are logged and ignored.
pub fn apply_env_overrides<I, K, V>(mut config: EchoConfig, vars: I) -> EchoConfig
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let key = key.as_ref();
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }

        match key {
            "PORT" => config.listener.bind_address = with_port(&config.listener.bind_address, value),
            "TLS_PORT" => {
                config.listener.tls.bind_address = with_port(&config.listener.tls.bind_address, value)
            }
            "TLS_ENABLED" => match parse_bool(value) {
                Some(enabled) => config.listener.tls.enabled = enabled,
                None => ignored(key, value),
            },
            "TLS_CERT_FILE" => config.listener.tls.cert_path = value.to_string(),
            "TLS_KEY_FILE" => config.listener.tls.key_path = value.to_string(),
            "MAX_BODY_SIZE" => match value.parse::<usize>() {
                Ok(size) if size > 0 => config.inspect.max_body_size = size,
                _ => ignored(key, value),
            },
            "JWT_HEADER_NAMES" => {
                let names = split_list(value);
                if names.is_empty() {
                    ignored(key, value);
                } else {
                    config.inspect.token_headers = names;
                }
            }
            "ECHO_ENVIRONMENT_VARIABLES_DISPLAY" => {
                config.inspect.environment_display = split_list(value)
            }
            "HEALTH_READINESS_DELAY_SECONDS" => match value.parse::<u64>() {
                Ok(secs) => config.health.readiness_delay_secs = secs,
                Err(_) => ignored(key, value),
            },
            "LOG_HEALTHCHECKS" => match parse_bool(value) {
                Some(flag) => config.observability.log_healthchecks = flag,
                None => ignored(key, value),
            },
            "LOG_FORMAT" => match value.to_ascii_lowercase().as_str() {
                "json" => config.observability.log_format = LogFormat::Json,
                "pretty" | "text" => config.observability.log_format = LogFormat::Pretty,
                _ => ignored(key, value),
            },
            _ => {}
        }
    }

    config
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_port(bind_address: &str, port: &str) -> String {
    let host = bind_address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or("0.0.0.0");
    format!("{}:{}", host, port)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

fn ignored(key: &str, value: &str) {
    tracing::warn!(variable = key, value = value, "Ignoring invalid environment override");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("PORT", "9000"),
            ("TLS_ENABLED", "true"),
            ("TLS_PORT", "9443"),
            ("MAX_BODY_SIZE", "1024"),
            ("JWT_HEADER_NAMES", " X-Token , ,Authorization "),
            ("UNRELATED", "whatever"),
        ];
        let config = apply_env_overrides(EchoConfig::default(), vars);

        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.listener.tls.bind_address, "0.0.0.0:9443");
        assert!(config.listener.tls.enabled);
        assert_eq!(config.inspect.max_body_size, 1024);
        assert_eq!(config.inspect.token_headers, vec!["X-Token", "Authorization"]);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let vars = vec![
            ("MAX_BODY_SIZE", "-5"),
            ("MAX_BODY_SIZE", "0"),
            ("MAX_BODY_SIZE", "lots"),
            ("TLS_ENABLED", "maybe"),
            ("JWT_HEADER_NAMES", " , "),
        ];
        let config = apply_env_overrides(EchoConfig::default(), vars);

        assert_eq!(config.inspect.max_body_size, 10 * 1024 * 1024);
        assert!(!config.listener.tls.enabled);
        assert_eq!(config.inspect.token_headers.len(), 4);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [inspect]
            max_body_size = 2048
            token_headers = ["X-Custom"]
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.inspect.max_body_size, 2048);
        assert_eq!(config.inspect.token_headers, vec!["X-Custom"]);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[inspect]\nmax_body_size = 0").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
