//! Main configuration types.
//!
//! This module provides the top-level [`WaymarkConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DocsConfig, LogFormat, LoggingConfig, RouterConfig, SecuritySchemeConfig};

/// Complete Waymark configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use waymark_config::WaymarkConfig;
///
/// let config = WaymarkConfig::default();
/// assert_eq!(config.router.base_path, "");
/// assert_eq!(config.docs.title, "Waymark API");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct WaymarkConfig {
    /// Routing configuration.
    #[serde(default)]
    pub router: RouterConfig,

    /// Documentation configuration.
    #[serde(default)]
    pub docs: DocsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WaymarkConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> WaymarkConfigBuilder {
        WaymarkConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The base path is neither empty nor starts with `/`
    /// - The docs title or version is empty
    /// - The log level does not parse as a filter directive
    /// - An HTTP security scheme has an empty scheme name
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_path = &self.router.base_path;
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "router.base_path",
                format!("must start with '/': {base_path}"),
            ));
        }

        for (name, scheme) in &self.router.security_schemes {
            if let SecuritySchemeConfig::Http { scheme, .. } = scheme {
                if scheme.trim().is_empty() {
                    return Err(ConfigError::invalid_value(
                        format!("router.security_schemes.{name}.scheme"),
                        "must not be empty",
                    ));
                }
            }
        }

        if self.docs.title.trim().is_empty() {
            return Err(ConfigError::invalid_value("docs.title", "must not be empty"));
        }

        if self.docs.version.trim().is_empty() {
            return Err(ConfigError::invalid_value("docs.version", "must not be empty"));
        }

        self.logging
            .to_log_config()
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty debug logs with source locations.
    ///
    /// ```
    /// use waymark_config::WaymarkConfig;
    ///
    /// let config = WaymarkConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.include_location = false;
        config
    }
}

/// Builder for [`WaymarkConfig`].
#[derive(Debug, Default)]
pub struct WaymarkConfigBuilder {
    router: Option<RouterConfig>,
    docs: Option<DocsConfig>,
    logging: Option<LoggingConfig>,
}

impl WaymarkConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the router configuration.
    #[must_use]
    pub fn router(mut self, router: RouterConfig) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the docs configuration.
    #[must_use]
    pub fn docs(mut self, docs: DocsConfig) -> Self {
        self.docs = Some(docs);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> WaymarkConfig {
        WaymarkConfig {
            router: self.router.unwrap_or_default(),
            docs: self.docs.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<WaymarkConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = WaymarkConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.logging.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_builder_sections() {
        let config = WaymarkConfig::builder()
            .router(RouterConfig {
                base_path: "/api".to_string(),
                ..Default::default()
            })
            .docs(DocsConfig {
                title: "Orders".to_string(),
                servers: vec![ServerConfig {
                    url: "https://orders.example.com".to_string(),
                    description: None,
                }],
                ..Default::default()
            })
            .build();

        assert_eq!(config.router.base_path, "/api");
        assert_eq!(config.docs.title, "Orders");
        assert_eq!(config.docs.servers.len(), 1);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_validate_base_path() {
        let result = WaymarkConfig::builder()
            .router(RouterConfig {
                base_path: "api".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("base_path"));
    }

    #[test]
    fn test_validate_empty_title() {
        let result = WaymarkConfig::builder()
            .docs(DocsConfig {
                title: " ".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("docs.title"));
    }

    #[test]
    fn test_validate_log_level() {
        let result = WaymarkConfig::builder()
            .logging(LoggingConfig {
                level: "waymark=loudest".to_string(),
                ..Default::default()
            })
            .build_validated();

        assert!(result.unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_validate_http_scheme() {
        let mut router = RouterConfig::default();
        router.security_schemes.insert(
            "broken".to_string(),
            SecuritySchemeConfig::Http {
                scheme: String::new(),
                bearer_format: None,
                description: None,
            },
        );
        let result = WaymarkConfig::builder().router(router).build_validated();

        assert!(result.unwrap_err().to_string().contains("security_schemes.broken"));
    }

    #[test]
    fn test_presets() {
        let dev = WaymarkConfig::development();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.logging.include_location);

        let prod = WaymarkConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert_eq!(prod.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = WaymarkConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[docs]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [router]
            base_path = "/api"
            unknown_field = "value"
        "#;

        let result: Result<WaymarkConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
