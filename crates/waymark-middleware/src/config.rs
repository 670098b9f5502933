//! Endpoint configuration.
//!
//! [`endpoint`] turns a route and its declared inputs and responses into an
//! [`EndpointConfig`]. Each [`EndpointConfig::middleware`] call returns a
//! new configuration with the unit's responses merged in and its step
//! appended; the original is left untouched.
//!
//! The chain a dispatcher runs is, in order:
//!
//! 1. pre middleware registered on an [`EndpointFactory`]
//! 2. the input parsing step
//! 3. middleware added with [`EndpointConfig::middleware`]
//! 4. the terminal handler
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use waymark_core::{ExtraParams, ResponseSet, RouteDescriptor, Schema};
//! use waymark_middleware::{endpoint, EndpointInput, MiddlewareUnit};
//!
//! let base = endpoint(
//!     RouteDescriptor::get("/users/:id"),
//!     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
//! );
//!
//! let audited = base.middleware(MiddlewareUnit::new(
//!     "audit",
//!     ResponseSet::new().no_body(StatusCode::FORBIDDEN),
//!     |_bag| async { Ok(ExtraParams::new()) },
//! ));
//!
//! assert_eq!(base.chain_len(), 1);
//! assert_eq!(audited.chain_len(), 2);
//! assert!(!base.responses().contains(StatusCode::FORBIDDEN));
//! assert!(audited.responses().contains(StatusCode::FORBIDDEN));
//! ```

use crate::chain::MiddlewareChain;
use crate::input::InputSchemas;
use crate::middleware::{MiddlewareUnit, SecurityRequirement};
use waymark_core::{merge, ResponseSet, RouteDescriptor, Schema};

/// Inputs and metadata declared for an endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointInput {
    /// Query schema; without one the parsed query is `{}`.
    pub query: Option<Schema>,
    /// Body schema; without one the parsed body is `{}`.
    pub body: Option<Schema>,
    /// Responses the handler may answer with.
    pub responses: ResponseSet,
    /// Short summary for documentation.
    pub summary: Option<String>,
    /// Longer description for documentation.
    pub description: Option<String>,
    /// Documentation tags; defaults to the first path segment when empty.
    pub tags: Vec<String>,
    /// Security requirements of the endpoint itself.
    pub security: Vec<SecurityRequirement>,
    /// Explicit OpenAPI operation id.
    pub operation_id: Option<String>,
    /// Whether the endpoint is deprecated.
    pub deprecated: bool,
}

impl EndpointInput {
    /// Creates inputs declaring only the handler's responses.
    pub fn new(responses: ResponseSet) -> Self {
        Self {
            responses,
            ..Self::default()
        }
    }

    /// Sets the query schema.
    #[must_use]
    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }

    /// Sets the body schema.
    #[must_use]
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds a security requirement.
    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security.push(requirement);
        self
    }

    /// Sets the operation id.
    #[must_use]
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Marks the endpoint deprecated.
    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }
}

/// Documentation metadata of an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMeta {
    /// Short summary.
    pub summary: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Operation id.
    pub operation_id: Option<String>,
    /// Deprecation flag.
    pub deprecated: bool,
}

/// Creates endpoint configurations that share a set of pre middleware.
///
/// Pre middleware runs before input parsing, so it sees only the request,
/// the response and what earlier pre middleware contributed.
///
/// ```
/// use http::StatusCode;
/// use waymark_core::{ResponseSet, RouteDescriptor, Schema, TerminalResponse};
/// use waymark_middleware::{EndpointFactory, EndpointInput, MiddlewareUnit};
///
/// let authenticated = EndpointFactory::new().pre(MiddlewareUnit::new(
///     "session",
///     ResponseSet::new().no_body(StatusCode::UNAUTHORIZED),
///     |bag| async move {
///         Ok(bag
///             .request()
///             .header("cookie")
///             .is_none()
///             .then(|| TerminalResponse::new(StatusCode::UNAUTHORIZED)))
///     },
/// ));
///
/// let config = authenticated.configure(
///     RouteDescriptor::get("/me"),
///     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
/// );
/// assert_eq!(config.step_names(), vec!["session", "input"]);
/// assert!(config.responses().contains(StatusCode::UNAUTHORIZED));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EndpointFactory {
    pre: MiddlewareChain,
}

impl EndpointFactory {
    /// Creates a factory without pre middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new factory with `unit` appended to the pre middleware.
    #[must_use]
    pub fn pre(&self, unit: MiddlewareUnit) -> Self {
        Self {
            pre: self.pre.push(unit),
        }
    }

    /// Returns the number of pre middleware.
    pub fn pre_len(&self) -> usize {
        self.pre.len()
    }

    /// Builds an endpoint configuration.
    pub fn configure(&self, route: RouteDescriptor, input: EndpointInput) -> EndpointConfig {
        let mut responses = input.responses;
        let mut security = input.security;
        for unit in &self.pre {
            responses = merge(&responses, unit.responses());
            security.extend(unit.security_requirements().iter().cloned());
        }

        let parsing = InputSchemas::new(
            route.pattern(),
            route.params_schema().clone(),
            input.query.clone(),
            input.body.clone(),
        )
        .into_unit();

        EndpointConfig {
            route,
            query: input.query,
            body: input.body,
            responses,
            chain: self.pre.push(parsing),
            security,
            meta: EndpointMeta {
                summary: input.summary,
                description: input.description,
                tags: input.tags,
                operation_id: input.operation_id,
                deprecated: input.deprecated,
            },
        }
    }
}

/// Builds an endpoint configuration without pre middleware.
pub fn endpoint(route: RouteDescriptor, input: EndpointInput) -> EndpointConfig {
    EndpointFactory::new().configure(route, input)
}

/// The immutable configuration of one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    route: RouteDescriptor,
    query: Option<Schema>,
    body: Option<Schema>,
    responses: ResponseSet,
    chain: MiddlewareChain,
    security: Vec<SecurityRequirement>,
    meta: EndpointMeta,
}

impl EndpointConfig {
    /// Returns a new configuration with `unit` appended.
    ///
    /// The unit's declared responses are merged into the endpoint's set and
    /// its security requirements are added.
    #[must_use]
    pub fn middleware(&self, unit: MiddlewareUnit) -> Self {
        let mut security = self.security.clone();
        security.extend(unit.security_requirements().iter().cloned());
        Self {
            route: self.route.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            responses: merge(&self.responses, unit.responses()),
            chain: self.chain.push(unit),
            security,
            meta: self.meta.clone(),
        }
    }

    /// Returns the route.
    pub fn route(&self) -> &RouteDescriptor {
        &self.route
    }

    /// Returns the declared responses.
    pub fn responses(&self) -> &ResponseSet {
        &self.responses
    }

    /// Returns the middleware chain, input parsing included.
    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }

    /// Returns the chain length.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Returns the query schema.
    pub fn query(&self) -> Option<&Schema> {
        self.query.as_ref()
    }

    /// Returns the body schema.
    pub fn body(&self) -> Option<&Schema> {
        self.body.as_ref()
    }

    /// Returns the security requirements.
    pub fn security(&self) -> &[SecurityRequirement] {
        &self.security
    }

    /// Returns the documentation metadata.
    pub fn meta(&self) -> &EndpointMeta {
        &self.meta
    }
}
