//! # Waymark
//!
//! **Typed endpoint configuration with composable middleware**
//!
//! Waymark describes each HTTP endpoint as an immutable configuration:
//!
//! - **Typed input** – path parameters, query and body are parsed against schemas
//!   before any application middleware runs
//! - **Declared responses** – every middleware states the statuses it may answer
//!   with; the endpoint's response set is the merge of all of them
//! - **Composable chains** – adding middleware returns a new configuration and
//!   never disturbs the one it was built from
//! - **Resource mapping** – response bodies declared as resources are mapped to
//!   their public shape before they are sent
//! - **OpenAPI for free** – the same configuration projects into an OpenAPI 3.1
//!   document
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::Bytes;
//! use serde_json::json;
//! use waymark::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let show = endpoint(
//!     RouteDescriptor::get("/users/:id")
//!         .params(Schema::object([("id", Schema::coerce(Schema::integer()))])),
//!     EndpointInput::new(
//!         ResponseSet::new()
//!             .status(StatusCode::OK, Schema::object([("id", Schema::integer())]))
//!             .no_body(StatusCode::NOT_FOUND),
//!     ),
//! );
//!
//! let dispatcher = Dispatcher::builder(show, |bag| async move {
//!     let id = bag.params().map(|p| p["id"].clone()).unwrap_or_default();
//!     Ok(TerminalResponse::ok(json!({ "id": id })))
//! })
//! .build();
//!
//! let registry = Registry::new().route(dispatcher);
//! let request = http::Request::get("/users/7").body(Bytes::new()).unwrap();
//! let response = registry.handle(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! http::Request ─▶ Registry ─▶ Dispatcher
//!                                 │
//!   pre middleware ─▶ input parsing ─▶ middleware ... ─▶ handler
//!                                 │
//!          Terminal ─▶ cookies ─▶ resource mapping ─▶ redirect | status + body
//! ```

#![doc(html_root_url = "https://docs.rs/waymark/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod registry;

pub use registry::{HttpResponse, Registry};

// Re-export core types
pub use waymark_core as core;

// Re-export middleware types
pub use waymark_middleware as middleware;

// Re-export telemetry types
pub use waymark_telemetry as telemetry;

// Re-export configuration types
pub use waymark_config as config;

// Re-export documentation types
pub use waymark_docs as docs;

pub use waymark_core::{
    merge, merge_all, CookieOptions, ExtraParams, MiddlewareOutcome, ParamKey, Resource,
    ResponseSet, RouteDescriptor, RouteRequest, Schema, TerminalResponse, WaymarkError,
    WaymarkResult,
};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use waymark::prelude::*;
///
/// let route = RouteDescriptor::get("/health");
/// assert_eq!(route.method(), &http::Method::GET);
/// ```
pub mod prelude {
    pub use crate::registry::Registry;

    pub use http::StatusCode;

    pub use waymark_core::{
        CookieOptions, ExtraParams, MiddlewareOutcome, ParamKey, Resource, ResponseSchema,
        ResponseSet, RouteDescriptor, RouteRequest, Schema, TerminalResponse, WaymarkError,
        WaymarkResult,
    };

    pub use waymark_middleware::{
        endpoint, security_requirement, DispatchOutcome, Dispatcher, EndpointConfig,
        EndpointFactory, EndpointInput, LegacyMiddleware, MiddlewareUnit, ParameterBag,
    };

    pub use waymark_config::{ConfigLoader, WaymarkConfig};

    pub use waymark_docs::OpenApiGenerator;

    pub use waymark_telemetry::{init_logging, LogConfig};
}
