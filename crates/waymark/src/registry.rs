//! Routing table in front of the dispatchers.
//!
//! A [`Registry`] owns one [`Dispatcher`] per endpoint and turns a buffered
//! `http::Request` into a dispatch:
//!
//! ```text
//! http::Request ─▶ strip base path ─▶ match route (priority order)
//!                                        │
//!               404 ◀── no pattern ──────┤
//!               405 ◀── other method ────┤
//!                                        ▼
//!                 parse query + body ─▶ Dispatcher ─▶ BufferedResponse ─▶ http::Response
//! ```
//!
//! Literal segments win over parameters, so `/users/me` is tried before
//! `/users/:id` no matter which was registered first.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use serde_json::{Map, Value};
use std::sync::Arc;
use waymark_config::WaymarkConfig;
use waymark_core::{compare_priority, BufferedResponse, ResponseWriter, RouteRequest};
use waymark_docs::{DocsResult, OpenApi, OpenApiGenerator};
use waymark_middleware::{DispatchOutcome, Dispatcher, EndpointConfig};

/// HTTP response produced by [`Registry::handle`].
pub type HttpResponse = http::Response<Full<Bytes>>;

/// A set of dispatchers addressed by method and path.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::StatusCode;
/// use serde_json::json;
/// use waymark::{Registry, ResponseSet, RouteDescriptor, Schema, TerminalResponse};
/// use waymark_middleware::{endpoint, Dispatcher, EndpointInput};
///
/// # tokio_test::block_on(async {
/// let ping = endpoint(
///     RouteDescriptor::get("/ping"),
///     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
/// );
/// let registry = Registry::new()
///     .base_path("/api")
///     .route(Dispatcher::builder(ping, |_bag| async { Ok(TerminalResponse::ok(json!("pong"))) }).build());
///
/// let request = http::Request::get("/api/ping").body(Bytes::new()).unwrap();
/// let response = registry.handle(request).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
#[derive(Default)]
pub struct Registry {
    base_path: String,
    routes: Vec<Dispatcher>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry mounted at the configured base path.
    #[must_use]
    pub fn from_config(config: &WaymarkConfig) -> Self {
        Self::new().base_path(&config.router.base_path)
    }

    /// Mounts every route under `base_path`.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Adds a dispatcher, keeping routes in priority order.
    #[must_use]
    pub fn route(mut self, dispatcher: Dispatcher) -> Self {
        let pattern = dispatcher.config().route().pattern().to_string();
        let at = self
            .routes
            .partition_point(|existing| {
                compare_priority(existing.config().route().pattern(), &pattern).is_le()
            });
        self.routes.insert(at, dispatcher);
        self
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns `(method, pattern)` for every route in matching order.
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        self.routes
            .iter()
            .map(|d| (d.config().route().method(), d.config().route().pattern()))
            .collect()
    }

    /// Returns the endpoint configurations in matching order.
    pub fn endpoints(&self) -> Vec<&EndpointConfig> {
        self.routes.iter().map(Dispatcher::config).collect()
    }

    /// Generates the OpenAPI document for every route.
    ///
    /// The registry's base path replaces the generator's.
    pub fn openapi(&self, generator: OpenApiGenerator) -> DocsResult<OpenApi> {
        generator
            .base_path(self.base_path.clone())
            .generate(&self.endpoints())
    }

    /// Handles one buffered HTTP request.
    ///
    /// Always produces a response: `404` when no pattern matches, `405` when
    /// only other methods match, `400` when the query or body cannot be
    /// decoded, and `500` when dispatch fails or no step answered.
    pub async fn handle(&self, request: http::Request<Bytes>) -> HttpResponse {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();

        let Some(relative) = self.strip_base(path) else {
            return not_found(path);
        };

        let mut allowed: Vec<&Method> = Vec::new();
        let mut matched = None;
        for dispatcher in &self.routes {
            let route = dispatcher.config().route();
            let Some(params) = route.match_path(relative) else {
                continue;
            };
            if *route.method() == parts.method {
                matched = Some((dispatcher, params));
                break;
            }
            if !allowed.contains(&route.method()) {
                allowed.push(route.method());
            }
        }

        let Some((dispatcher, params)) = matched else {
            if allowed.is_empty() {
                return not_found(path);
            }
            return method_not_allowed(&allowed);
        };

        let query = match parse_query(parts.uri.query().unwrap_or_default()) {
            Ok(query) => query,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting undecodable query string");
                return error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &err.to_string());
            }
        };
        let body = match parse_body(parts.headers.get(CONTENT_TYPE), &body) {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting undecodable body");
                return error_response(StatusCode::BAD_REQUEST, "INVALID_BODY", &err.to_string());
            }
        };

        let route_request = RouteRequest::new(parts.method.clone(), path)
            .with_params(params)
            .with_query(query)
            .with_body(body)
            .with_headers(parts.headers);

        let response = Arc::new(BufferedResponse::new());
        let writer: Arc<dyn ResponseWriter> = response.clone();
        let pattern = dispatcher.config().route().pattern();

        match dispatcher.dispatch(Arc::new(route_request), writer).await {
            Ok(DispatchOutcome::Unanswered) if !response.headers_sent() => {
                tracing::warn!(route = pattern, "no step answered the request");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNANSWERED",
                    "the endpoint produced no response",
                )
            }
            Ok(_) => response.to_http(),
            Err(err) if response.headers_sent() => {
                tracing::error!(route = pattern, error = %err, "dispatch failed after response was sent");
                response.to_http()
            }
            Err(err) => {
                tracing::error!(route = pattern, error = %err, "dispatch failed");
                error_response(err.status_code(), "DISPATCH_FAILED", &err.to_string())
            }
        }
    }

    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base_path.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(self.base_path.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Decodes a query string into a JSON object.
///
/// Repeated keys collect into an array in order of appearance.
fn parse_query(raw: &str) -> Result<Value, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)?;
    let mut query = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match query.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                query.insert(key, value);
            }
        }
    }
    Ok(Value::Object(query))
}

/// Decodes a body: empty is `null`, `text/plain` is a string, anything else
/// must be JSON.
fn parse_body(content_type: Option<&HeaderValue>, body: &Bytes) -> Result<Value, BodyError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    let is_text = content_type
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/plain"));
    if is_text {
        return String::from_utf8(body.to_vec())
            .map(Value::String)
            .map_err(|_| BodyError::Utf8);
    }
    serde_json::from_slice(body).map_err(BodyError::Json)
}

#[derive(Debug, thiserror::Error)]
enum BodyError {
    #[error("request body is not valid UTF-8")]
    Utf8,
    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });

    http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
}

fn not_found(path: &str) -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", &format!("no route for {path}"))
}

fn method_not_allowed(allowed: &[&Method]) -> HttpResponse {
    let allow = allowed
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        "method not allowed",
    );
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
