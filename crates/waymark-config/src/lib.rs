//! Typed configuration for Waymark.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! [`WaymarkConfig`] groups three sections:
//!
//! - [`RouterConfig`] - base path and named security schemes
//! - [`DocsConfig`] - title, version and servers of the generated OpenAPI document
//! - [`LoggingConfig`] - log level and format, convertible to a telemetry `LogConfig`
//!
//! # Example
//!
//! ```no_run
//! use waymark_config::{ConfigLoader, WaymarkConfig};
//!
//! # fn main() -> Result<(), waymark_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("waymark.toml")?
//!     .with_env_prefix("WAYMARK")
//!     .load()?;
//!
//! println!("Routes mounted under: {}", config.router.base_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [router]
//! base_path = "/api"
//!
//! [router.security_schemes.bearer]
//! type = "http"
//! scheme = "bearer"
//! bearer_format = "JWT"
//!
//! [docs]
//! title = "Orders API"
//! version = "1.0.0"
//!
//! [[docs.servers]]
//! url = "https://orders.example.com"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Scalar values can be overridden via environment variables using the
//! format `PREFIX__SECTION__KEY`. For example:
//!
//! - `WAYMARK__ROUTER__BASE_PATH=/v2`
//! - `WAYMARK__DOCS__TITLE=Orders`
//! - `WAYMARK__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
