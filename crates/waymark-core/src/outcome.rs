//! Step outcomes.
//!
//! Every middleware step and terminal handler resolves to a
//! [`MiddlewareOutcome`]: continue unchanged, continue with extra named
//! parameters, or stop with a [`TerminalResponse`].

use crate::cookie::{CookieOptions, ResponseCookie};
use crate::error::WaymarkResult;
use http::StatusCode;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Field name carrying the redirect target in redirect-class response data.
pub const REDIRECT_URL: &str = "redirect_url";

/// Field name carrying redirect query parameters in redirect-class response data.
pub const REDIRECT_URL_QUERY: &str = "redirect_url_query";

/// A type-erased parameter value.
pub type ParamValue = Arc<dyn Any + Send + Sync>;

/// A typed name for a parameter.
///
/// Declaring keys as constants gives producers and consumers of a parameter
/// one shared, typed handle:
///
/// ```
/// use waymark_core::{ExtraParams, ParamKey};
///
/// #[derive(Debug, PartialEq)]
/// struct UserId(u64);
///
/// const USER: ParamKey<UserId> = ParamKey::new("user");
///
/// let params = ExtraParams::new().with(USER, UserId(7));
/// assert_eq!(params.get_key(USER), Some(&UserId(7)));
/// ```
pub struct ParamKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> ParamKey<T> {
    /// Creates a key.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    /// Returns the parameter name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ParamKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParamKey<T> {}

impl<T> fmt::Debug for ParamKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParamKey").field(&self.name).finish()
    }
}

/// Named parameters contributed by a step.
#[derive(Clone, Default)]
pub struct ExtraParams {
    fields: IndexMap<String, ParamValue>,
}

impl ExtraParams {
    /// Creates an empty set of parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a named value, replacing any previous value of that name.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.fields.insert(name.into(), Arc::new(value));
    }

    /// Inserts an already shared value.
    pub fn insert_shared(&mut self, name: impl Into<String>, value: ParamValue) {
        self.fields.insert(name.into(), value);
    }

    /// Adds a typed parameter.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, key: ParamKey<T>, value: T) -> Self {
        self.insert(key.name(), value);
        self
    }

    /// Adds a named parameter.
    #[must_use]
    pub fn with_named<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns a named value if it exists and has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.fields.get(name)?.downcast_ref::<T>()
    }

    /// Returns a typed value.
    pub fn get_key<T: Any>(&self, key: ParamKey<T>) -> Option<&T> {
        self.get(key.name())
    }

    /// Returns whether the name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the parameter names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl IntoIterator for ExtraParams {
    type Item = (String, ParamValue);
    type IntoIter = indexmap::map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl fmt::Debug for ExtraParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}

/// A response a step stops the chain with.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use serde_json::json;
/// use waymark_core::TerminalResponse;
///
/// let login = TerminalResponse::redirect(StatusCode::FOUND, "/login")
///     .redirect_query("next", "/account")
///     .clear_cookie("session");
///
/// assert_eq!(
///     login.data,
///     Some(json!({
///         "redirect_url": "/login",
///         "redirect_url_query": { "next": "/account" }
///     }))
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response data, before resource mapping.
    pub data: Option<Value>,
    /// Cookie instructions by cookie name.
    pub cookies: IndexMap<String, ResponseCookie>,
}

impl TerminalResponse {
    /// Creates a response without data.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            data: None,
            cookies: IndexMap::new(),
        }
    }

    /// Creates a `200 OK` response with data.
    pub fn ok(data: Value) -> Self {
        Self::new(StatusCode::OK).data(data)
    }

    /// Creates a redirect-class response to `url`.
    pub fn redirect(status: StatusCode, url: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(REDIRECT_URL.to_string(), Value::String(url.into()));
        Self::new(status).data(Value::Object(data))
    }

    /// Sets the response data.
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the response data from a serializable value.
    pub fn json<T: Serialize>(self, data: &T) -> WaymarkResult<Self> {
        Ok(self.data(serde_json::to_value(data)?))
    }

    /// Sets a plain cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies
            .insert(name.into(), ResponseCookie::Value(value.into()));
        self
    }

    /// Sets a cookie with attributes.
    #[must_use]
    pub fn cookie_with(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        options: CookieOptions,
    ) -> Self {
        self.cookies.insert(
            name.into(),
            ResponseCookie::WithOptions {
                value: value.into(),
                options,
            },
        );
        self
    }

    /// Clears a cookie.
    #[must_use]
    pub fn clear_cookie(mut self, name: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), ResponseCookie::Clear);
        self
    }

    /// Adds a redirect query parameter.
    ///
    /// Parameters keep their insertion order. Data that is not an object is
    /// replaced by an object holding only the query.
    #[must_use]
    pub fn redirect_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut data = match self.data.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let query = data
            .entry(REDIRECT_URL_QUERY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !query.is_object() {
            *query = Value::Object(Map::new());
        }
        if let Value::Object(query) = query {
            query.insert(key.into(), Value::String(value.into()));
        }
        self.data = Some(Value::Object(data));
        self
    }
}

/// What a step resolved to.
#[derive(Debug, Clone)]
pub enum MiddlewareOutcome {
    /// Continue with the parameter bag unchanged.
    Passthrough,
    /// Continue after merging these parameters into the bag.
    ExtraParams(ExtraParams),
    /// Stop and answer with this response.
    Terminal(TerminalResponse),
}

impl MiddlewareOutcome {
    /// Returns whether the outcome ends the chain.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl From<TerminalResponse> for MiddlewareOutcome {
    fn from(response: TerminalResponse) -> Self {
        Self::Terminal(response)
    }
}

impl From<ExtraParams> for MiddlewareOutcome {
    fn from(params: ExtraParams) -> Self {
        Self::ExtraParams(params)
    }
}

/// Conversion into a [`MiddlewareOutcome`].
///
/// Lets step functions return whichever shape is most natural.
pub trait IntoOutcome {
    /// Performs the conversion.
    fn into_outcome(self) -> MiddlewareOutcome;
}

impl IntoOutcome for MiddlewareOutcome {
    fn into_outcome(self) -> MiddlewareOutcome {
        self
    }
}

impl IntoOutcome for TerminalResponse {
    fn into_outcome(self) -> MiddlewareOutcome {
        MiddlewareOutcome::Terminal(self)
    }
}

impl IntoOutcome for ExtraParams {
    fn into_outcome(self) -> MiddlewareOutcome {
        MiddlewareOutcome::ExtraParams(self)
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> MiddlewareOutcome {
        MiddlewareOutcome::Passthrough
    }
}

impl IntoOutcome for Option<TerminalResponse> {
    fn into_outcome(self) -> MiddlewareOutcome {
        self.map_or(MiddlewareOutcome::Passthrough, MiddlewareOutcome::Terminal)
    }
}
