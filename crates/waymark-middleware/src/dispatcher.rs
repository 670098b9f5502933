//! The request dispatcher.
//!
//! A [`Dispatcher`] runs one endpoint's chain for each request:
//!
//! ```text
//!  ┌──────────┐   Passthrough / ExtraParams   ┌──────────┐
//!  │  step i  │ ────────────────────────────▶ │ step i+1 │ ──▶ ... ──▶ Unanswered
//!  └────┬─────┘                               └──────────┘
//!       │ Terminal
//!       ▼
//!  undeclared status ──▶ Unanswered (warning, nothing sent)
//!  cookies ──▶ resource mapping ──▶ 3xx: redirect (or 500 if no redirect_url)
//!                                └─▶ otherwise: status + body ──▶ Sent
//! ```
//!
//! A step error or panic answers `500` with an empty body (unless something
//! was already sent) and is handed to the error callback.

use crate::bag::ParameterBag;
use crate::config::EndpointConfig;
use crate::middleware::MiddlewareUnit;
use futures_util::FutureExt;
use http::StatusCode;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use waymark_core::{
    response_mapper, IntoOutcome, MiddlewareOutcome, ResponseCookie, ResponseMapper,
    ResponseSet, ResponseWriter, RouteRequest, TerminalResponse, WaymarkError, WaymarkResult,
    REDIRECT_URL, REDIRECT_URL_QUERY,
};
use waymark_telemetry::{
    record_dispatch, record_input_rejection, Diagnostic, Diagnostics, InFlightGuard,
    TracingDiagnostics,
};

/// Name of the terminal handler in step listings.
pub const HANDLER_STEP: &str = "handler";

/// Receives errors that aborted a request.
///
/// Returning `Ok` swallows the error; returning `Err` propagates it out of
/// [`Dispatcher::dispatch`].
pub type ErrorCallback = Arc<dyn Fn(WaymarkError) -> Result<(), WaymarkError> + Send + Sync>;

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// A response was sent by this dispatcher.
    Sent,
    /// The response had already been sent before a step started.
    SentElsewhere,
    /// Nothing was sent: an undeclared status, or the chain ran out.
    Unanswered,
    /// A step failed and the error callback accepted the error.
    Failed,
}

impl DispatchOutcome {
    /// Returns the metric label for this outcome.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::SentElsewhere => "sent_elsewhere",
            Self::Unanswered => "unanswered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs an endpoint's chain and answers through a [`ResponseWriter`].
///
/// Dispatchers are immutable once built and can serve any number of
/// concurrent requests.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::{Method, StatusCode};
/// use serde_json::json;
/// use waymark_core::{
///     BufferedResponse, ResponseSet, ResponseWriter, RouteDescriptor, RouteRequest, Schema,
///     TerminalResponse,
/// };
/// use waymark_middleware::{endpoint, DispatchOutcome, Dispatcher, EndpointInput};
///
/// # tokio_test::block_on(async {
/// let config = endpoint(
///     RouteDescriptor::get("/hello/:name"),
///     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
/// );
///
/// let dispatcher = Dispatcher::builder(config, |bag| async move {
///     let name = bag.params().and_then(|p| p["name"].as_str()).unwrap_or("world").to_string();
///     Ok(TerminalResponse::ok(json!(format!("hello {name}"))))
/// })
/// .build();
///
/// let response = Arc::new(BufferedResponse::new());
/// let request = RouteRequest::new(Method::GET, "/hello/ada").with_param("name", "ada");
/// let outcome = dispatcher.dispatch(Arc::new(request), response.clone()).await.unwrap();
///
/// assert_eq!(outcome, DispatchOutcome::Sent);
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.body(), "hello ada");
/// # });
/// ```
pub struct Dispatcher {
    config: EndpointConfig,
    steps: Vec<MiddlewareUnit>,
    mappers: HashMap<StatusCode, ResponseMapper>,
    on_error: Option<ErrorCallback>,
    diagnostics: Arc<dyn Diagnostics>,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    config: EndpointConfig,
    handler: MiddlewareUnit,
    on_error: Option<ErrorCallback>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl DispatcherBuilder {
    /// Sets the callback that receives step errors.
    ///
    /// Without one, errors are returned from [`Dispatcher::dispatch`].
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(WaymarkError) -> Result<(), WaymarkError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Sets the diagnostics observer (defaults to [`TracingDiagnostics`]).
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Builds the dispatcher, precomputing one response mapper per status.
    pub fn build(self) -> Dispatcher {
        let mappers = build_mappers(self.config.responses());
        let mut steps = self.config.chain().to_vec();
        steps.push(self.handler);

        tracing::debug!(
            route = %self.config.route().pattern(),
            steps = steps.len(),
            mapped_statuses = mappers.len(),
            "dispatcher built"
        );

        Dispatcher {
            config: self.config,
            steps,
            mappers,
            on_error: self.on_error,
            diagnostics: self.diagnostics,
        }
    }
}

fn build_mappers(responses: &ResponseSet) -> HashMap<StatusCode, ResponseMapper> {
    responses
        .iter()
        .filter_map(|(status, response)| {
            let mapper = response_mapper(response.schema()?)?;
            Some((*status, mapper))
        })
        .collect()
}

impl Dispatcher {
    /// Starts building a dispatcher for `config` with the terminal `handler`.
    pub fn builder<H, Fut, O>(config: EndpointConfig, handler: H) -> DispatcherBuilder
    where
        H: Fn(ParameterBag) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WaymarkResult<O>> + Send + 'static,
        O: IntoOutcome,
    {
        DispatcherBuilder {
            config,
            handler: MiddlewareUnit::new(HANDLER_STEP, ResponseSet::new(), handler),
            on_error: None,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Returns the endpoint configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Returns the step names, terminal handler included.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(MiddlewareUnit::name).collect()
    }

    /// Returns whether a response mapper exists for the status.
    pub fn has_mapper(&self, status: StatusCode) -> bool {
        self.mappers.contains_key(&status)
    }

    /// Dispatches one request.
    ///
    /// # Errors
    ///
    /// Returns the step error when a step fails and no error callback is
    /// installed, or when the callback returns `Err`.
    pub async fn dispatch(
        &self,
        request: Arc<RouteRequest>,
        response: Arc<dyn ResponseWriter>,
    ) -> WaymarkResult<DispatchOutcome> {
        let route = self.config.route().pattern();
        let method = request.method().as_str().to_string();
        let span = tracing::info_span!("dispatch", route = %route, method = %method);

        let _in_flight = InFlightGuard::new();
        let started = Instant::now();

        let result = self.run(request, response).instrument(span).await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "error",
        };
        record_dispatch(route, &method, label, started.elapsed());
        result
    }

    async fn run(
        &self,
        request: Arc<RouteRequest>,
        response: Arc<dyn ResponseWriter>,
    ) -> WaymarkResult<DispatchOutcome> {
        let mut bag = ParameterBag::new(request, Arc::clone(&response));

        for step in &self.steps {
            if response.headers_sent() {
                tracing::debug!(step = step.name(), "response already sent, halting");
                return Ok(DispatchOutcome::SentElsewhere);
            }

            tracing::debug!(step = step.name(), "running step");
            // The step closure runs inside the guarded future so panics raised
            // before its first await are caught too.
            let run = async { step.run(bag.clone()).await };
            let outcome = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => return self.fail(step.name(), err, response.as_ref()),
                Err(payload) => {
                    let err = WaymarkError::StepPanicked {
                        step: step.name().to_string(),
                        message: panic_message(payload.as_ref()),
                    };
                    return self.fail(step.name(), err, response.as_ref());
                }
            };

            match outcome {
                MiddlewareOutcome::Passthrough => {}
                MiddlewareOutcome::ExtraParams(params) => bag.extend(params),
                MiddlewareOutcome::Terminal(terminal) => {
                    return match self.respond(terminal, response.as_ref()) {
                        Ok(outcome) => Ok(outcome),
                        Err(err) => self.fail(step.name(), err, response.as_ref()),
                    };
                }
            }
        }

        tracing::debug!("chain finished without a terminal response");
        Ok(DispatchOutcome::Unanswered)
    }

    /// Answers a terminal response.
    fn respond(
        &self,
        terminal: TerminalResponse,
        response: &dyn ResponseWriter,
    ) -> WaymarkResult<DispatchOutcome> {
        let route = self.config.route().pattern();
        let status = terminal.status;

        if !self.config.responses().contains(status) {
            self.diagnostics
                .emit(&Diagnostic::unknown_status(route, status));
            return Ok(DispatchOutcome::Unanswered);
        }

        for (name, cookie) in &terminal.cookies {
            match cookie {
                ResponseCookie::Clear => response.clear_cookie(name),
                ResponseCookie::Value(value) => response.set_cookie(name, value, None),
                ResponseCookie::WithOptions { value, options } => {
                    response.set_cookie(name, value, Some(options));
                }
            }
        }

        let data = match (self.mappers.get(&status), terminal.data) {
            (Some(mapper), Some(data)) => Some(
                mapper(data).map_err(|source| WaymarkError::ResponseMapping { status, source })?,
            ),
            (_, data) => data,
        };

        if status.is_redirection() {
            match redirect_target(data.as_ref()) {
                Some(url) => {
                    tracing::debug!(status = status.as_u16(), %url, "redirecting");
                    response.redirect(status, &url);
                }
                None => {
                    self.diagnostics
                        .emit(&Diagnostic::malformed_redirect(route, status));
                    response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                    response.send(None);
                }
            }
            return Ok(DispatchOutcome::Sent);
        }

        tracing::debug!(status = status.as_u16(), "sending response");
        response.set_status(status);
        response.send(data);
        Ok(DispatchOutcome::Sent)
    }

    /// Handles a failed step.
    fn fail(
        &self,
        step: &str,
        err: WaymarkError,
        response: &dyn ResponseWriter,
    ) -> WaymarkResult<DispatchOutcome> {
        let route = self.config.route().pattern();

        if !response.headers_sent() {
            response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
            response.send(None);
        }

        for failure in err.input_failures() {
            record_input_rejection(route, &failure.source.to_string());
            self.diagnostics.emit(&Diagnostic::input_rejected(
                route,
                failure.source,
                failure.error.to_string(),
            ));
        }
        self.diagnostics
            .emit(&Diagnostic::step_failed(route, step, err.to_string()));

        match &self.on_error {
            Some(callback) => callback(err).map(|()| DispatchOutcome::Failed),
            None => Err(err),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("route", &self.config.route().pattern())
            .field("steps", &self.step_names())
            .field("has_error_callback", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds the redirect URL from mapped response data.
///
/// Query values that are not strings are rendered as JSON.
fn redirect_target(data: Option<&Value>) -> Option<String> {
    let object = data?.as_object()?;
    let url = object.get(REDIRECT_URL)?.as_str()?;

    let pairs: Vec<(&str, String)> = object
        .get(REDIRECT_URL_QUERY)
        .and_then(Value::as_object)
        .map(|query| {
            query
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.as_str(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    if query.is_empty() {
        Some(url.to_string())
    } else {
        Some(format!("{url}?{query}"))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
