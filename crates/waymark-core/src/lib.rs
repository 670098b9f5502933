//! # Waymark Core
//!
//! Core types for the Waymark endpoint pipeline.
//!
//! This crate provides the values every other Waymark crate passes around:
//!
//! - [`Schema`] - Value-level schemas used to parse params, query and body
//! - [`Resource`] / [`response_mapper`] - Named output shapes and the mapping applied to responses
//! - [`ResponseSet`] / [`merge`] - Declared responses per status and their merge algebra
//! - [`MiddlewareOutcome`] / [`TerminalResponse`] / [`ExtraParams`] - What a step resolves to
//! - [`ResponseCookie`] / [`CookieOptions`] - Cookie instructions on terminal responses
//! - [`RouteDescriptor`] - Method, path pattern and path-parameter schema
//! - [`RouteRequest`] / [`ResponseWriter`] / [`BufferedResponse`] - The transport boundary
//! - [`WaymarkError`] - Standard error type

#![doc(html_root_url = "https://docs.rs/waymark-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cookie;
mod error;
pub mod outcome;
pub mod resource;
pub mod responses;
pub mod route;
pub mod schema;
pub mod transport;

pub use cookie::{
    clear_cookie_header, set_cookie_header, CookieOptions, CookiePriority, ResponseCookie,
    SameSite,
};
pub use error::{
    ErrorCategory, InputFailure, InputSource, ValidationError, WaymarkError, WaymarkResult,
};
pub use outcome::{
    ExtraParams, IntoOutcome, MiddlewareOutcome, ParamKey, ParamValue, TerminalResponse,
    REDIRECT_URL, REDIRECT_URL_QUERY,
};
pub use resource::{response_mapper, Resource, ResponseMapper};
pub use responses::{merge, merge_all, merge_schema, ResponseSchema, ResponseSet};
pub use route::{compare_priority, join_path, sort_by_priority, RouteDescriptor};
pub use schema::Schema;
pub use transport::{BoxFuture, BufferedResponse, ResponseWriter, RouteRequest};
