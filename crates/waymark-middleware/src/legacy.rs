//! Adapter for transport-level middleware.
//!
//! Some middleware predates the chain and works directly on the request and
//! response (session loaders, body limiters, CSRF checks). A
//! [`LegacyMiddleware`] runs such a function as a chain step. If the
//! transport connection closes before the function completes, the step
//! fails with [`WaymarkError::ResponseClosed`] instead of waiting forever.
//!
//! A legacy function that answers the request itself simply returns; the
//! dispatcher notices the sent response and stops before the next step.

use crate::bag::ParameterBag;
use crate::middleware::MiddlewareUnit;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use waymark_core::{
    BoxFuture, ExtraParams, MiddlewareOutcome, ResponseSet, ResponseWriter, RouteRequest,
    WaymarkError, WaymarkResult,
};

type LegacyFn = Arc<
    dyn Fn(Arc<RouteRequest>, Arc<dyn ResponseWriter>) -> BoxFuture<'static, WaymarkResult<()>>
        + Send
        + Sync,
>;

type ResolveFn = Arc<dyn Fn(&ParameterBag) -> WaymarkResult<ExtraParams> + Send + Sync>;

/// A transport-level async function wrapped as a middleware step.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use waymark_core::{ExtraParams, ParamKey, ResponseSet};
/// use waymark_middleware::LegacyMiddleware;
///
/// const LOCALE: ParamKey<String> = ParamKey::new("locale");
///
/// let unit = LegacyMiddleware::new("locale", |request, response| async move {
///     if request.header("accept-language").is_none() {
///         response.set_status(StatusCode::BAD_REQUEST);
///         response.send(None);
///     }
///     Ok(())
/// })
/// .responses(ResponseSet::new().no_body(StatusCode::BAD_REQUEST))
/// .resolve(|bag| {
///     let locale = bag.request().header("accept-language").unwrap_or("en").to_string();
///     Ok(ExtraParams::new().with(LOCALE, locale))
/// })
/// .into_unit();
///
/// assert_eq!(unit.name(), "locale");
/// ```
#[derive(Clone)]
pub struct LegacyMiddleware {
    name: String,
    handler: LegacyFn,
    resolve: Option<ResolveFn>,
    responses: ResponseSet,
}

impl LegacyMiddleware {
    /// Wraps a transport-level function.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<RouteRequest>, Arc<dyn ResponseWriter>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WaymarkResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |request, response| Box::pin(f(request, response))),
            resolve: None,
            responses: ResponseSet::new(),
        }
    }

    /// Derives extra parameters once the function has completed.
    #[must_use]
    pub fn resolve<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParameterBag) -> WaymarkResult<ExtraParams> + Send + Sync + 'static,
    {
        self.resolve = Some(Arc::new(f));
        self
    }

    /// Declares the responses the function may send itself, for documentation.
    #[must_use]
    pub fn responses(mut self, responses: ResponseSet) -> Self {
        self.responses = responses;
        self
    }

    /// Converts into a chain step.
    pub fn into_unit(self) -> MiddlewareUnit {
        let Self {
            name,
            handler,
            resolve,
            responses,
        } = self;
        let step_name = name.clone();

        MiddlewareUnit::new(name, responses, move |bag: ParameterBag| {
            let handler = Arc::clone(&handler);
            let resolve = resolve.clone();
            let name = step_name.clone();
            async move {
                let response = Arc::clone(bag.response());
                let closed = response.closed();

                tokio::select! {
                    biased;
                    result = handler(bag.request_arc(), response) => result?,
                    () = closed => {
                        tracing::debug!(middleware = %name, "response closed while middleware was running");
                        return Err(WaymarkError::ResponseClosed { middleware: name });
                    }
                }

                match resolve {
                    Some(resolve) => resolve(&bag).map(MiddlewareOutcome::ExtraParams),
                    None => Ok(MiddlewareOutcome::Passthrough),
                }
            }
        })
    }
}

impl fmt::Debug for LegacyMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyMiddleware")
            .field("name", &self.name)
            .field("resolves", &self.resolve.is_some())
            .finish_non_exhaustive()
    }
}
