//! The per-request parameter bag.
//!
//! A [`ParameterBag`] starts with the request and response and grows as
//! steps contribute [`ExtraParams`]. Later fields override earlier fields of
//! the same name; nothing is ever removed.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use waymark_core::{
    ExtraParams, ParamKey, ParamValue, ResponseWriter, RouteRequest, WaymarkError, WaymarkResult,
};

/// Parsed path parameters, set by input parsing.
pub const PARAMS: ParamKey<Value> = ParamKey::new("params");

/// Parsed query, set by input parsing.
pub const QUERY: ParamKey<Value> = ParamKey::new("query");

/// Parsed body, set by input parsing.
pub const BODY: ParamKey<Value> = ParamKey::new("body");

/// Parameters threaded through one request's chain.
///
/// Cloning is cheap: the request, response and field values are shared.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::Method;
/// use waymark_core::{BufferedResponse, ExtraParams, ParamKey, RouteRequest};
/// use waymark_middleware::ParameterBag;
///
/// const TENANT: ParamKey<String> = ParamKey::new("tenant");
///
/// let mut bag = ParameterBag::new(
///     Arc::new(RouteRequest::new(Method::GET, "/")),
///     Arc::new(BufferedResponse::new()),
/// );
/// bag.extend(ExtraParams::new().with(TENANT, "acme".to_string()));
///
/// assert_eq!(bag.get_key(TENANT).map(String::as_str), Some("acme"));
/// ```
#[derive(Clone)]
pub struct ParameterBag {
    request: Arc<RouteRequest>,
    response: Arc<dyn ResponseWriter>,
    fields: IndexMap<String, ParamValue>,
}

impl ParameterBag {
    /// Creates a bag holding only the request and response.
    pub fn new(request: Arc<RouteRequest>, response: Arc<dyn ResponseWriter>) -> Self {
        Self {
            request,
            response,
            fields: IndexMap::new(),
        }
    }

    /// Returns the request.
    pub fn request(&self) -> &RouteRequest {
        &self.request
    }

    /// Returns a shared handle to the request.
    pub fn request_arc(&self) -> Arc<RouteRequest> {
        Arc::clone(&self.request)
    }

    /// Returns the response writer.
    pub fn response(&self) -> &Arc<dyn ResponseWriter> {
        &self.response
    }

    /// Returns a named field if present with type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.fields.get(name)?.downcast_ref::<T>()
    }

    /// Returns a typed field.
    pub fn get_key<T: Any>(&self, key: ParamKey<T>) -> Option<&T> {
        self.get(key.name())
    }

    /// Deserializes a JSON field into `T`.
    ///
    /// # Errors
    ///
    /// Fails when the field is missing, is not a JSON value, or does not
    /// deserialize into `T`.
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> WaymarkResult<T> {
        let value = self
            .get::<Value>(name)
            .ok_or_else(|| WaymarkError::msg(format!("parameter '{name}' is not a JSON value")))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Returns the parsed path parameters.
    pub fn params(&self) -> Option<&Value> {
        self.get_key(PARAMS)
    }

    /// Returns the parsed query.
    pub fn query(&self) -> Option<&Value> {
        self.get_key(QUERY)
    }

    /// Returns the parsed body.
    pub fn body(&self) -> Option<&Value> {
        self.get_key(BODY)
    }

    /// Returns whether a field of that name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the field names in the order they were first added.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether no field has been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merges contributed parameters; new values override same-named ones.
    pub fn extend(&mut self, params: ExtraParams) {
        self.fields.extend(params);
    }
}

impl fmt::Debug for ParameterBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBag")
            .field("request", &self.request)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
