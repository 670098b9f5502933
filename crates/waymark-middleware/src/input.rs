//! The input parsing step.
//!
//! Every endpoint gets one internal unit that parses path parameters, query
//! and body against the declared schemas and stores the results under
//! [`PARAMS`], [`QUERY`] and [`BODY`]. All three parses run even when an
//! earlier one fails, so a single rejection reports every bad part.

use crate::bag::{BODY, PARAMS, QUERY};
use crate::middleware::MiddlewareUnit;
use serde_json::{Map, Value};
use std::sync::Arc;
use waymark_core::{
    ExtraParams, InputFailure, InputSource, ResponseSet, RouteRequest, Schema, WaymarkError,
    WaymarkResult,
};

/// Name of the input parsing unit in step listings.
pub const INPUT_STEP: &str = "input";

/// Schemas the input parsing step applies.
#[derive(Debug, Clone)]
pub struct InputSchemas {
    route: String,
    params: Schema,
    query: Option<Schema>,
    body: Option<Schema>,
}

impl InputSchemas {
    /// Creates the schema set for one endpoint.
    pub fn new(
        route: impl Into<String>,
        params: Schema,
        query: Option<Schema>,
        body: Option<Schema>,
    ) -> Self {
        Self {
            route: route.into(),
            params,
            query,
            body,
        }
    }

    /// Parses the request, collecting every failure.
    ///
    /// # Errors
    ///
    /// Returns `WaymarkError::InvalidInput` listing each failed part.
    pub fn parse(&self, request: &RouteRequest) -> WaymarkResult<ExtraParams> {
        let mut failures = Vec::new();

        let mut attempt = |source: InputSource, schema: Option<&Schema>, raw: &Value| -> Value {
            let Some(schema) = schema else {
                return Value::Object(Map::new());
            };
            match schema.parse(raw) {
                Ok(parsed) => parsed,
                Err(error) => {
                    tracing::debug!(route = %self.route, %source, %error, "input rejected");
                    failures.push(InputFailure { source, error });
                    Value::Null
                }
            }
        };

        let params = attempt(InputSource::Params, Some(&self.params), request.params());
        let query = attempt(InputSource::Query, self.query.as_ref(), request.query());
        let body = attempt(InputSource::Body, self.body.as_ref(), request.body());

        if !failures.is_empty() {
            return Err(WaymarkError::InvalidInput {
                route: self.route.clone(),
                failures,
            });
        }

        Ok(ExtraParams::new()
            .with(PARAMS, params)
            .with(QUERY, query)
            .with(BODY, body))
    }

    /// Wraps the schemas in the internal parsing unit.
    pub fn into_unit(self) -> MiddlewareUnit {
        let schemas = Arc::new(self);
        MiddlewareUnit::new(INPUT_STEP, ResponseSet::new(), move |bag| {
            let schemas = Arc::clone(&schemas);
            async move { schemas.parse(bag.request()) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;
    use waymark_core::RouteDescriptor;

    fn schemas() -> InputSchemas {
        let route = RouteDescriptor::get("/users/:id")
            .params(Schema::object([("id", Schema::coerce(Schema::integer()))]));
        InputSchemas::new(
            route.pattern(),
            route.params_schema().clone(),
            Some(Schema::object([("page", Schema::coerce(Schema::integer()))])),
            Some(Schema::object([("name", Schema::string())])),
        )
    }

    #[test]
    fn test_parses_all_parts() {
        let request = RouteRequest::new(Method::GET, "/users/7")
            .with_param("id", "7")
            .with_query_param("page", "2")
            .with_body(json!({ "name": "Ada", "extra": 1 }));

        let params = schemas().parse(&request).unwrap();
        assert_eq!(params.get_key(PARAMS), Some(&json!({ "id": 7 })));
        assert_eq!(params.get_key(QUERY), Some(&json!({ "page": 2 })));
        assert_eq!(params.get_key(BODY), Some(&json!({ "name": "Ada" })));
    }

    #[test]
    fn test_reports_every_failure() {
        let request = RouteRequest::new(Method::GET, "/users/x")
            .with_param("id", "x")
            .with_query_param("page", "two")
            .with_body(json!({}));

        let err = schemas().parse(&request).unwrap_err();
        let sources: Vec<_> = err.input_failures().iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![InputSource::Params, InputSource::Query, InputSource::Body]
        );
    }

    #[test]
    fn test_missing_schemas_yield_empty_objects() {
        let schemas = InputSchemas::new("/ping", Schema::empty_object(), None, None);
        let request = RouteRequest::new(Method::POST, "/ping").with_body(json!("ignored"));

        let params = schemas.parse(&request).unwrap();
        assert_eq!(params.get_key(QUERY), Some(&json!({})));
        assert_eq!(params.get_key(BODY), Some(&json!({})));
    }
}
