//! Test request building.

use crate::error::TestError;
use http::{header, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use waymark_core::RouteRequest;

/// Entry point for building [`RouteRequest`]s in tests.
///
/// Requests skip routing: path parameters are supplied directly, the way a
/// router would have captured them.
pub struct TestRequest;

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, path)
    }

    /// Creates a new POST request.
    pub fn post(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, path)
    }

    /// Creates a new PUT request.
    pub fn put(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, path)
    }

    /// Creates a new PATCH request.
    pub fn patch(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, path)
    }

    /// Creates a new DELETE request.
    pub fn delete(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, path)
    }
}

/// Builder for constructing test requests.
#[must_use]
pub struct TestRequestBuilder {
    request: RouteRequest,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        Self {
            request: RouteRequest::new(method, path.as_ref()),
            error: None,
        }
    }

    /// Adds a captured path parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_param(name, value);
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_query_param(name, value);
        self
    }

    /// Replaces the raw query with an arbitrary JSON value.
    pub fn raw_query(mut self, query: Value) -> Self {
        self.request = self.request.with_query(query);
        self
    }

    /// Sets a header on the request.
    ///
    /// # Example
    ///
    /// ```
    /// use waymark_test::TestRequest;
    ///
    /// let request = TestRequest::get("/users")
    ///     .header("X-Request-ID", "12345")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.header("x-request-id"), Some("12345"));
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let value = value.as_ref();
        if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err() {
            self.error
                .get_or_insert(TestError::InvalidHeader(format!("{name}: {value}")));
            return self;
        }
        self.request = self.request.with_header(name, value);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(header::AUTHORIZATION.as_str(), format!("Bearer {}", token.as_ref()))
    }

    /// Sets the request body to a JSON value.
    pub fn body(mut self, body: Value) -> Self {
        self.request = self.request.with_body(body);
        self
    }

    /// Serializes a value as the request body.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => {
                self.request = self.request.with_body(body);
                self.header(header::CONTENT_TYPE.as_str(), "application/json")
            }
            Err(e) => {
                self.error.get_or_insert(TestError::Json(e));
                self
            }
        }
    }

    /// Builds the shared request.
    pub fn build(self) -> Result<Arc<RouteRequest>, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.request.path().is_empty() {
            return Err(TestError::RequestBuild("empty path".to_string()));
        }
        Ok(Arc::new(self.request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/users").build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/users");
        assert_eq!(request.body(), &Value::Null);
    }

    #[test]
    fn test_methods() {
        assert_eq!(TestRequest::post("/a").build().unwrap().method(), Method::POST);
        assert_eq!(TestRequest::put("/a").build().unwrap().method(), Method::PUT);
        assert_eq!(TestRequest::patch("/a").build().unwrap().method(), Method::PATCH);
        assert_eq!(TestRequest::delete("/a").build().unwrap().method(), Method::DELETE);
    }

    #[test]
    fn test_params_and_query() {
        let request = TestRequest::get("/users/7")
            .param("id", "7")
            .query("page", "2")
            .build()
            .unwrap();

        assert_eq!(request.params(), &json!({ "id": "7" }));
        assert_eq!(request.query(), &json!({ "page": "2" }));
    }

    #[test]
    fn test_bearer_token() {
        let request = TestRequest::get("/users")
            .bearer_token("my_token")
            .build()
            .unwrap();

        assert_eq!(request.header("authorization"), Some("Bearer my_token"));
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/users")
            .json(&json!({ "name": "Alice" }))
            .build()
            .unwrap();

        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body(), &json!({ "name": "Alice" }));
    }

    #[test]
    fn test_invalid_header() {
        let result = TestRequest::get("/users").header("bad header", "x").build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_empty_path() {
        let result = TestRequest::get("").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }
}
