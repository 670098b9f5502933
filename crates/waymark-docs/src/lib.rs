//! # Waymark Docs
//!
//! OpenAPI 3.1 documents generated from endpoint configurations.
//!
//! An endpoint configuration already carries everything a document needs:
//! the route, the input schemas, the merged response set of every
//! middleware and the security requirements they declare. This crate only
//! projects that data.
//!
//! ## Quick Start
//!
//! ```rust
//! use http::StatusCode;
//! use waymark_config::WaymarkConfig;
//! use waymark_core::{Resource, ResponseSet, RouteDescriptor, Schema};
//! use waymark_docs::OpenApiGenerator;
//! use waymark_middleware::{endpoint, EndpointInput};
//!
//! let user = Resource::identity("User", Schema::object([("id", Schema::integer())]));
//! let show = endpoint(
//!     RouteDescriptor::get("/users/:id"),
//!     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::resource(user))),
//! );
//!
//! let json = OpenApiGenerator::from_config(&WaymarkConfig::default())
//!     .generate_json(&[&show])
//!     .unwrap();
//! assert!(json.contains("#/components/schemas/User"));
//! ```

mod error;
mod generator;
mod openapi;

pub use error::{DocsError, DocsResult};
pub use generator::{project, OpenApiGenerator};
pub use openapi::{
    Components, Contact, Info, JsonSchema, License, MediaType, OpenApi, Operation, Parameter,
    ParameterIn, PathItem, RequestBody, Response, SchemaType, SecurityRequirement,
    SecurityScheme, Server, Tag,
};
