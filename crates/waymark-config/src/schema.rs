//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use waymark_telemetry::LogConfig;

/// Routing configuration section.
///
/// # Example
///
/// ```
/// use waymark_config::RouterConfig;
///
/// let config = RouterConfig {
///     base_path: "/api".to_string(),
///     ..Default::default()
/// };
/// assert!(config.security_schemes.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Prefix joined in front of every route pattern (e.g., "/api").
    #[serde(default)]
    pub base_path: String,

    /// Security schemes endpoints may reference, by name.
    #[serde(default)]
    pub security_schemes: IndexMap<String, SecuritySchemeConfig>,
}

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// In a request header.
    Header,
    /// In the query string.
    Query,
    /// In a cookie.
    Cookie,
}

impl ApiKeyLocation {
    /// Returns the OpenAPI `in` value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Cookie => "cookie",
        }
    }
}

/// A named security scheme.
///
/// ```toml
/// [router.security_schemes.bearer]
/// type = "http"
/// scheme = "bearer"
/// bearer_format = "JWT"
///
/// [router.security_schemes.api_key]
/// type = "api_key"
/// in = "header"
/// name = "X-Api-Key"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecuritySchemeConfig {
    /// HTTP authentication (`bearer`, `basic`, ...).
    Http {
        /// Authentication scheme name.
        scheme: String,
        /// Hint for the bearer token format.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        /// Human-readable description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// An API key in a header, query parameter or cookie.
    ApiKey {
        /// Where the key is carried.
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        /// Header, parameter or cookie name.
        name: String,
        /// Human-readable description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecuritySchemeConfig {
    /// Creates a bearer-token scheme.
    pub fn bearer(format: Option<&str>) -> Self {
        Self::Http {
            scheme: "bearer".to_string(),
            bearer_format: format.map(str::to_string),
            description: None,
        }
    }

    /// Creates an API-key scheme.
    pub fn api_key(location: ApiKeyLocation, name: impl Into<String>) -> Self {
        Self::ApiKey {
            location,
            name: name.into(),
            description: None,
        }
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Http { description, .. } | Self::ApiKey { description, .. } => {
                description.as_deref()
            }
        }
    }
}

/// Documentation configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// API title.
    #[serde(default = "default_title")]
    pub title: String,

    /// API version.
    #[serde(default = "default_version")]
    pub version: String,

    /// API description.
    #[serde(default)]
    pub description: Option<String>,

    /// Servers listed in the document.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
            description: None,
            servers: Vec::new(),
        }
    }
}

fn default_title() -> String {
    "Waymark API".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// A server entry in the documentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server URL.
    pub url: String,

    /// Server description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info", "waymark_middleware=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Service name attached to log events.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            service_name: default_service_name(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the telemetry crate's logging configuration.
    ///
    /// ```
    /// use waymark_config::{LogFormat, LoggingConfig};
    ///
    /// let config = LoggingConfig {
    ///     format: LogFormat::Pretty,
    ///     ..Default::default()
    /// };
    /// assert!(!config.to_log_config().json_format);
    /// ```
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            file_line_info: self.include_location,
            service_name: self.service_name.clone(),
            ..base
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "waymark".to_string()
}
