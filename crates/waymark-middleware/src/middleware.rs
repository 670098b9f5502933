//! Middleware units.
//!
//! A [`MiddlewareUnit`] is one step of an endpoint's chain: a name, the
//! responses the step may answer with, optional security requirements for
//! documentation, and the async step function itself.
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use waymark_core::{ExtraParams, MiddlewareOutcome, ParamKey, ResponseSet, TerminalResponse};
//! use waymark_middleware::MiddlewareUnit;
//!
//! const USER: ParamKey<String> = ParamKey::new("user");
//!
//! let auth = MiddlewareUnit::new(
//!     "auth",
//!     ResponseSet::new().no_body(StatusCode::UNAUTHORIZED),
//!     |bag| async move {
//!         match bag.request().header("authorization") {
//!             Some(token) => Ok(MiddlewareOutcome::ExtraParams(
//!                 ExtraParams::new().with(USER, token.to_string()),
//!             )),
//!             None => Ok(TerminalResponse::new(StatusCode::UNAUTHORIZED).into()),
//!         }
//!     },
//! );
//! assert_eq!(auth.name(), "auth");
//! ```

use crate::bag::ParameterBag;
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use waymark_core::{
    BoxFuture, ExtraParams, IntoOutcome, MiddlewareOutcome, ResponseSet, WaymarkResult,
};

/// Scheme name to required scopes, as in an OpenAPI security requirement.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Builds a security requirement for one scheme.
pub fn security_requirement<I, S>(scheme: impl Into<String>, scopes: I) -> SecurityRequirement
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut requirement = IndexMap::new();
    requirement.insert(scheme.into(), scopes.into_iter().map(Into::into).collect());
    requirement
}

/// A type-erased step function.
pub type Step =
    Arc<dyn Fn(ParameterBag) -> BoxFuture<'static, WaymarkResult<MiddlewareOutcome>> + Send + Sync>;

/// One step of an endpoint chain.
#[derive(Clone)]
pub struct MiddlewareUnit {
    name: String,
    responses: ResponseSet,
    security: Vec<SecurityRequirement>,
    step: Step,
}

impl MiddlewareUnit {
    /// Creates a unit that may answer with any of `responses`.
    pub fn new<F, Fut, O>(name: impl Into<String>, responses: ResponseSet, f: F) -> Self
    where
        F: Fn(ParameterBag) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WaymarkResult<O>> + Send + 'static,
        O: IntoOutcome,
    {
        Self {
            name: name.into(),
            responses,
            security: Vec::new(),
            step: Arc::new(move |bag| {
                let fut = f(bag);
                Box::pin(async move { fut.await.map(IntoOutcome::into_outcome) })
            }),
        }
    }

    /// Creates a unit from a plain parameter transform.
    ///
    /// The unit declares no responses and always continues the chain.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ParameterBag) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WaymarkResult<ExtraParams>> + Send + 'static,
    {
        Self::new(name, ResponseSet::new(), f)
    }

    /// Creates a unit from an already type-erased step.
    pub fn from_step(name: impl Into<String>, responses: ResponseSet, step: Step) -> Self {
        Self {
            name: name.into(),
            responses,
            security: Vec::new(),
            step,
        }
    }

    /// Declares a security requirement for this unit.
    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security.push(requirement);
        self
    }

    /// Returns the unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared responses.
    pub fn responses(&self) -> &ResponseSet {
        &self.responses
    }

    /// Returns the declared security requirements.
    pub fn security_requirements(&self) -> &[SecurityRequirement] {
        &self.security
    }

    /// Runs the step.
    pub fn run(&self, bag: ParameterBag) -> BoxFuture<'static, WaymarkResult<MiddlewareOutcome>> {
        (self.step)(bag)
    }
}

impl fmt::Debug for MiddlewareUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareUnit")
            .field("name", &self.name)
            .field("responses", &self.responses.statuses())
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}
