//! The transport boundary.
//!
//! The dispatcher never touches sockets. It reads a [`RouteRequest`] that
//! the host has already routed and answers through a [`ResponseWriter`].
//! [`BufferedResponse`] is a writer that collects the answer into an
//! `http::Response`.

use crate::cookie::{clear_cookie_header, set_cookie_header, CookieOptions};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::watch;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request as seen by the dispatcher.
///
/// Path parameters have already been extracted by the router; query and
/// body are raw JSON values that input parsing validates.
///
/// # Example
///
/// ```
/// use http::Method;
/// use serde_json::json;
/// use waymark_core::RouteRequest;
///
/// let request = RouteRequest::new(Method::POST, "/users/7")
///     .with_param("id", "7")
///     .with_query_param("notify", "true")
///     .with_body(json!({ "name": "Ada" }));
///
/// assert_eq!(request.params(), &json!({ "id": "7" }));
/// assert_eq!(request.query(), &json!({ "notify": "true" }));
/// ```
#[derive(Debug, Clone)]
pub struct RouteRequest {
    method: Method,
    path: String,
    params: Value,
    query: Value,
    body: Value,
    headers: HeaderMap,
}

impl RouteRequest {
    /// Creates a request with no parameters, an empty query and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Null,
            headers: HeaderMap::new(),
        }
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_field(&mut self.params, name.into(), Value::String(value.into()));
        self
    }

    /// Replaces all path parameters.
    #[must_use]
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params = Value::Object(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        );
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        insert_field(&mut self.query, name.into(), Value::String(value.into()));
        self
    }

    /// Replaces the raw query.
    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    /// Replaces the raw body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the routed path parameters.
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the raw query.
    pub fn query(&self) -> &Value {
        &self.query
    }

    /// Returns the raw body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn insert_field(target: &mut Value, key: String, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        map.insert(key, value);
    }
}

/// The response half of the transport boundary.
///
/// Methods take `&self`: one writer is shared between the dispatcher and
/// any legacy middleware that writes to the transport directly.
pub trait ResponseWriter: Send + Sync {
    /// Returns whether a response has already been sent.
    fn headers_sent(&self) -> bool;

    /// Sets the response status.
    fn set_status(&self, status: StatusCode);

    /// Sends the body and completes the response.
    fn send(&self, body: Option<Value>);

    /// Sets a cookie, with attributes when given.
    fn set_cookie(&self, name: &str, value: &str, options: Option<&CookieOptions>);

    /// Clears a cookie.
    fn clear_cookie(&self, name: &str);

    /// Redirects and completes the response.
    fn redirect(&self, status: StatusCode, url: &str);

    /// Resolves once the underlying connection has closed.
    fn closed(&self) -> BoxFuture<'static, ()>;
}

#[derive(Debug)]
struct BufferedState {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
}

/// A [`ResponseWriter`] that buffers the answer in memory.
///
/// Cookie signing is not supported; the `signed` option is ignored.
#[derive(Debug)]
pub struct BufferedResponse {
    state: Mutex<BufferedState>,
    closed: watch::Sender<bool>,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedResponse {
    /// Creates an unsent `200 OK` response.
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            state: Mutex::new(BufferedState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                sent: false,
            }),
            closed,
        }
    }

    /// Marks the connection as closed, waking every `closed()` future.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Returns whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Returns the current status.
    pub fn status(&self) -> StatusCode {
        self.state.lock().status
    }

    /// Returns the buffered body.
    pub fn body(&self) -> Bytes {
        self.state.lock().body.clone()
    }

    /// Returns a copy of the buffered headers.
    pub fn headers(&self) -> HeaderMap {
        self.state.lock().headers.clone()
    }

    /// Builds the HTTP response from the buffered state.
    pub fn to_http(&self) -> http::Response<Full<Bytes>> {
        let state = self.state.lock();
        let mut response = http::Response::new(Full::new(state.body.clone()));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        response
    }

    /// Consumes the writer and returns the HTTP response.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        self.to_http()
    }

    fn append_header(state: &mut BufferedState, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                state.headers.append(name, value);
            }
            Err(_) => {
                tracing::warn!(header = %name, "dropping header with invalid value");
            }
        }
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_sent(&self) -> bool {
        self.state.lock().sent
    }

    fn set_status(&self, status: StatusCode) {
        let mut state = self.state.lock();
        if !state.sent {
            state.status = status;
        }
    }

    fn send(&self, body: Option<Value>) {
        let mut state = self.state.lock();
        if state.sent {
            return;
        }
        let (content_type, bytes) = match body {
            None => (None, Bytes::new()),
            Some(Value::String(text)) => (Some("text/plain; charset=utf-8"), Bytes::from(text)),
            Some(value) => (Some("application/json"), Bytes::from(value.to_string())),
        };
        if let Some(content_type) = content_type {
            state
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        state.body = bytes;
        state.sent = true;
    }

    fn set_cookie(&self, name: &str, value: &str, options: Option<&CookieOptions>) {
        let mut state = self.state.lock();
        if !state.sent {
            Self::append_header(&mut state, SET_COOKIE, &set_cookie_header(name, value, options));
        }
    }

    fn clear_cookie(&self, name: &str) {
        let mut state = self.state.lock();
        if !state.sent {
            Self::append_header(&mut state, SET_COOKIE, &clear_cookie_header(name));
        }
    }

    fn redirect(&self, status: StatusCode, url: &str) {
        let mut state = self.state.lock();
        if state.sent {
            return;
        }
        state.status = status;
        Self::append_header(&mut state, LOCATION, url);
        state.body = Bytes::new();
        state.sent = true;
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let mut receiver = self.closed.subscribe();
        Box::pin(async move {
            // An error means the writer was dropped, which also ends the connection.
            let _ = receiver.wait_for(|closed| *closed).await;
        })
    }
}
