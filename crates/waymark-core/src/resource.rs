//! Resources and response mapping.
//!
//! A [`Resource`] is a named schema with a transform: application code
//! hands the dispatcher an internal record (a database row, say) and the
//! resource maps it to its public shape. [`response_mapper`] derives, for a
//! declared response schema, the transform that applies every resource
//! nested inside it.

use crate::error::ValidationError;
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A transform applied to response data before it is sent.
pub type ResponseMapper = Arc<dyn Fn(Value) -> Result<Value, ValidationError> + Send + Sync>;

struct ResourceInner {
    name: String,
    output: Schema,
    map: ResponseMapper,
}

/// A named output schema with a mapping function.
///
/// Resources compare by identity: two clones of the same resource are
/// equal, two separately constructed resources are not, even when they
/// share a name.
///
/// # Example
///
/// ```
/// use waymark_core::{Resource, Schema};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct UserRow { user_id: i64, full_name: String, password_hash: String }
///
/// #[derive(Serialize)]
/// struct PublicUser { id: i64, name: String }
///
/// let user = Resource::typed(
///     "User",
///     Schema::object([("id", Schema::integer()), ("name", Schema::string())]),
///     |row: UserRow| PublicUser { id: row.user_id, name: row.full_name },
/// );
///
/// let mapped = user
///     .apply(json!({ "user_id": 1, "full_name": "Ada", "password_hash": "x" }))
///     .unwrap();
/// assert_eq!(mapped, json!({ "id": 1, "name": "Ada" }));
/// ```
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    /// Creates a resource from an untyped mapping function.
    pub fn new<F>(name: impl Into<String>, output: Schema, map: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ResourceInner {
                name: name.into(),
                output,
                map: Arc::new(map),
            }),
        }
    }

    /// Creates a resource from a typed mapping function.
    ///
    /// The input is deserialized into `I` and the result serialized from `O`.
    pub fn typed<I, O, F>(name: impl Into<String>, output: Schema, map: F) -> Self
    where
        I: DeserializeOwned,
        O: Serialize,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        let name = name.into();
        let resource_name = name.clone();
        Self::new(name, output, move |value| {
            let input: I = serde_json::from_value(value).map_err(|e| {
                ValidationError::new("$", format!("cannot read '{resource_name}' input: {e}"))
            })?;
            serde_json::to_value(map(input)).map_err(|e| {
                ValidationError::new("$", format!("cannot write '{resource_name}' output: {e}"))
            })
        })
    }

    /// Creates a resource whose mapping is the identity.
    pub fn identity(name: impl Into<String>, output: Schema) -> Self {
        Self::new(name, output, Ok)
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the output schema.
    pub fn output(&self) -> &Schema {
        &self.inner.output
    }

    /// Applies the mapping to a value.
    pub fn apply(&self, value: Value) -> Result<Value, ValidationError> {
        (self.inner.map)(value)
    }

    /// Returns the mapping as a shareable [`ResponseMapper`].
    pub fn mapper(&self) -> ResponseMapper {
        Arc::clone(&self.inner.map)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.inner.name)
            .field("output", &self.inner.output)
            .finish_non_exhaustive()
    }
}

/// Derives the mapping for a declared response schema.
///
/// - a resource maps with its own function,
/// - an object maps a shallow copy, replacing only the fields that need mapping,
/// - an array maps every item,
/// - optional and nullable schemas map their non-null values.
///
/// Everything else, unions included, needs no mapping and yields `None`.
pub fn response_mapper(schema: &Schema) -> Option<ResponseMapper> {
    match schema {
        Schema::Resource(resource) => Some(resource.mapper()),

        Schema::Described { inner, .. } | Schema::Coerce(inner) => response_mapper(inner),

        Schema::Optional(inner) | Schema::Nullable(inner) => {
            let inner = response_mapper(inner)?;
            Some(Arc::new(move |value: Value| {
                if value.is_null() {
                    Ok(value)
                } else {
                    inner(value)
                }
            }))
        }

        Schema::Object { properties } => {
            let fields: Vec<(String, ResponseMapper)> = properties
                .iter()
                .filter_map(|(key, prop)| response_mapper(prop).map(|m| (key.clone(), m)))
                .collect();
            if fields.is_empty() {
                return None;
            }
            Some(Arc::new(move |value: Value| {
                let Value::Object(mut obj) = value else {
                    return Ok(value);
                };
                for (key, mapper) in &fields {
                    if let Some(field) = obj.remove(key) {
                        let mapped = mapper(field).map_err(|err| {
                            ValidationError::new(
                                format!("$.{key}{}", err.path.trim_start_matches('$')),
                                err.message,
                            )
                        })?;
                        obj.insert(key.clone(), mapped);
                    }
                }
                Ok(Value::Object(obj))
            }))
        }

        Schema::Array { items, .. } => {
            let item_mapper = response_mapper(items)?;
            Some(Arc::new(move |value: Value| {
                let Value::Array(items) = value else {
                    return Ok(value);
                };
                items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        item_mapper(item).map_err(|err| {
                            ValidationError::new(
                                format!("$[{idx}]{}", err.path.trim_start_matches('$')),
                                err.message,
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }))
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper_name() -> Resource {
        Resource::new(
            "Named",
            Schema::object([("name", Schema::string())]),
            |value| {
                let name = value
                    .get("raw_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ValidationError::new("$.raw_name", "missing"))?;
                Ok(json!({ "name": name.to_uppercase() }))
            },
        )
    }

    #[test]
    fn test_resource_identity_equality() {
        let a = upper_name();
        let b = upper_name();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.name(), "Named");
    }

    #[test]
    fn test_mapper_for_resource() {
        let mapper = response_mapper(&Schema::resource(upper_name())).unwrap();
        assert_eq!(
            mapper(json!({ "raw_name": "ada" })).unwrap(),
            json!({ "name": "ADA" })
        );
    }

    #[test]
    fn test_mapper_for_object_maps_only_resource_fields() {
        let schema = Schema::object([
            ("owner", Schema::resource(upper_name())),
            ("count", Schema::integer()),
        ]);
        let mapper = response_mapper(&schema).unwrap();

        let mapped = mapper(json!({
            "owner": { "raw_name": "grace" },
            "count": 3,
            "extra": "kept"
        }))
        .unwrap();
        assert_eq!(
            mapped,
            json!({ "owner": { "name": "GRACE" }, "count": 3, "extra": "kept" })
        );
    }

    #[test]
    fn test_mapper_for_array_and_nullable() {
        let mapper = response_mapper(&Schema::array(Schema::resource(upper_name()))).unwrap();
        assert_eq!(
            mapper(json!([{ "raw_name": "a" }, { "raw_name": "b" }])).unwrap(),
            json!([{ "name": "A" }, { "name": "B" }])
        );

        let err = mapper(json!([{ "raw_name": "a" }, {}])).unwrap_err();
        assert_eq!(err.path, "$[1].raw_name");

        let nullable = response_mapper(&Schema::nullable(Schema::resource(upper_name()))).unwrap();
        assert_eq!(nullable(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_no_mapper_for_plain_schemas_and_unions() {
        assert!(response_mapper(&Schema::string()).is_none());
        assert!(response_mapper(&Schema::object([("a", Schema::integer())])).is_none());
        assert!(response_mapper(&Schema::union([
            Schema::resource(upper_name()),
            Schema::string()
        ]))
        .is_none());
    }

    #[test]
    fn test_typed_resource_reports_bad_input() {
        let resource = Resource::typed("Count", Schema::integer(), |n: i64| n * 2);
        assert_eq!(resource.apply(json!(21)).unwrap(), json!(42));
        let err = resource.apply(json!("nope")).unwrap_err();
        assert!(err.message.contains("cannot read 'Count' input"));
    }
}
