//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, LogFormat, WaymarkConfig};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```no_run
/// use waymark_config::ConfigLoader;
///
/// # fn main() -> Result<(), waymark_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("waymark.toml")?
///     .with_env_prefix("WAYMARK")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: WaymarkConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: WaymarkConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = WaymarkConfig::default();
        self
    }

    /// Start with development preset configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use waymark_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = WaymarkConfig::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = WaymarkConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// `format` is either "toml" or "json".
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use waymark_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [router]
    ///     base_path = "/api"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.router.base_path, "/api");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "WAYMARK":
    /// - `WAYMARK__ROUTER__BASE_PATH=/api`
    /// - `WAYMARK__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file from the working directory, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Load a specific `.env` file.
    ///
    /// Variables already present in the environment are not overwritten.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_path<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::Dotenv(e.to_string()))?;
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - Configuration validation fails
    pub fn load(mut self) -> Result<WaymarkConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> WaymarkConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<WaymarkConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let env_vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        // Keys sharing the prefix without the separator (e.g. WAYMARK_HOME) are not ours.
        let Some(key_without_prefix) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            // Router section
            ["ROUTER", "BASE_PATH"] => {
                self.config.router.base_path = value.to_string();
            }

            // Docs section
            ["DOCS", "TITLE"] => {
                self.config.docs.title = value.to_string();
            }
            ["DOCS", "VERSION"] => {
                self.config.docs.version = value.to_string();
            }
            ["DOCS", "DESCRIPTION"] => {
                self.config.docs.description = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }

            // Logging section
            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SERVICE_NAME"] => {
                self.config.logging.service_name = value.to_string();
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, WaymarkConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"docs": {"title": "Orders", "version": "2.0.0"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.docs.title, "Orders");
        assert_eq!(config.docs.version, "2.0.0");
    }

    #[test]
    fn test_loader_with_string_unknown_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waymark.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[router]\nbase_path = \"/v1\"").unwrap();

        let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
        assert_eq!(config.router.base_path, "/v1");
    }

    #[test]
    fn test_loader_with_file_bad_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waymark.ini");
        fs::write(&path, "base_path=/v1").unwrap();

        let result = ConfigLoader::new().with_file(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/waymark.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/waymark.toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config, WaymarkConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[router]\nbase_path = \"api\"", "toml")
            .unwrap()
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_unvalidated() {
        let config = ConfigLoader::new()
            .with_string("[router]\nbase_path = \"api\"", "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.router.base_path, "api");
    }

    #[test]
    fn test_dotenv_path_feeds_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "WAYMARK_DOTENV_TEST__DOCS__TITLE=From Dotenv\n").unwrap();

        let config = ConfigLoader::new()
            .with_dotenv_path(&path)
            .unwrap()
            .with_env_prefix("WAYMARK_DOTENV_TEST")
            .load()
            .unwrap();

        assert_eq!(config.docs.title, "From Dotenv");
    }

    #[test]
    fn test_dotenv_path_missing() {
        let result = ConfigLoader::new().with_dotenv_path("/nonexistent/.env");
        assert!(matches!(result, Err(ConfigError::Dotenv(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_apply_env_var_router_and_docs() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__ROUTER__BASE_PATH", "/api", "TEST").unwrap();
        loader.apply_env_var("TEST__DOCS__DESCRIPTION", "Order service", "TEST").unwrap();
        assert_eq!(loader.config.router.base_path, "/api");
        assert_eq!(loader.config.docs.description.as_deref(), Some("Order service"));
    }

    #[test]
    fn test_apply_env_var_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "pretty", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__ENABLED", "off", "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__SERVICE_NAME", "orders", "TEST").unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert!(!loader.config.logging.enabled);
        assert_eq!(loader.config.logging.service_name, "orders");
    }

    #[test]
    fn test_apply_env_var_invalid_boolean() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__LOGGING__ENABLED", "sometimes", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_ignores_foreign_keys() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST_HOME", "/home/x", "TEST").unwrap();
        loader.apply_env_var("TEST__UNKNOWN__KEY", "x", "TEST").unwrap();
        assert_eq!(loader.config, WaymarkConfig::default());
    }

    #[test]
    fn test_complete_toml_config() {
        let toml = r#"
            [router]
            base_path = "/api"

            [router.security_schemes.bearer]
            type = "http"
            scheme = "bearer"
            bearer_format = "JWT"

            [docs]
            title = "Orders API"
            version = "1.2.0"
            description = "Order management"

            [[docs.servers]]
            url = "https://orders.example.com"
            description = "Production"

            [logging]
            enabled = true
            level = "waymark_middleware=debug,info"
            format = "pretty"
            service_name = "orders"
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.router.base_path, "/api");
        assert!(config.router.security_schemes.contains_key("bearer"));
        assert_eq!(config.docs.servers[0].url, "https://orders.example.com");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.service_name, "orders");
    }
}
