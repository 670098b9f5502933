//! Value-level schemas for request parsing and response declaration.
//!
//! A [`Schema`] describes the shape of a JSON value. [`Schema::parse`]
//! validates a value and returns its parsed form:
//!
//! - objects keep only declared properties (unknown keys are dropped),
//! - missing [`Schema::optional`] properties are omitted,
//! - [`Schema::coerce`] turns path/query strings into numbers or booleans,
//! - [`Schema::resource`] applies the resource's mapping.
//!
//! # Example
//!
//! ```
//! use waymark_core::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("id", Schema::coerce(Schema::integer())),
//!     ("name", Schema::string().min_length(1)),
//!     ("nickname", Schema::optional(Schema::string())),
//! ]);
//!
//! let parsed = schema
//!     .parse(&json!({ "id": "42", "name": "Alice", "extra": true }))
//!     .unwrap();
//! assert_eq!(parsed, json!({ "id": 42, "name": "Alice" }));
//!
//! assert!(schema.parse(&json!({ "id": "x", "name": "Alice" })).is_err());
//! ```

use crate::error::ValidationError;
use crate::resource::Resource;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A JSON value schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// String type.
    String {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// Integer type.
    Integer {
        /// Minimum value.
        minimum: Option<i64>,
        /// Maximum value.
        maximum: Option<i64>,
    },
    /// Number (float) type.
    Number {
        /// Minimum value.
        minimum: Option<f64>,
        /// Maximum value.
        maximum: Option<f64>,
    },
    /// Boolean type.
    Boolean,
    /// Exactly this value.
    Literal(Value),
    /// One of a fixed set of strings.
    Picklist(Vec<String>),
    /// Array type.
    Array {
        /// Schema for array items.
        items: Box<Schema>,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Maximum number of items.
        max_items: Option<usize>,
    },
    /// Object type. Properties are required unless wrapped in [`Schema::Optional`].
    Object {
        /// Properties in declaration order.
        properties: IndexMap<String, Schema>,
    },
    /// The property may be absent.
    Optional(Box<Schema>),
    /// The value may be `null`.
    Nullable(Box<Schema>),
    /// The value must match at least one member.
    Union(Vec<Schema>),
    /// Strings are converted to numbers/booleans before validation.
    Coerce(Box<Schema>),
    /// A schema carrying a human-readable description.
    Described {
        /// The description, surfaced in generated documentation.
        description: String,
        /// The described schema.
        inner: Box<Schema>,
    },
    /// Any value.
    Any,
    /// Exactly `null`.
    Null,
    /// A resource: input is mapped to the resource's output shape.
    Resource(Resource),
}

impl Schema {
    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
        }
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    /// Creates a literal schema.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a picklist schema.
    #[must_use]
    pub fn picklist<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Picklist(options.into_iter().map(Into::into).collect())
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Creates an object schema from `(name, schema)` pairs.
    #[must_use]
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Object {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        }
    }

    /// Creates an object schema with no properties.
    #[must_use]
    pub fn empty_object() -> Self {
        Self::Object {
            properties: IndexMap::new(),
        }
    }

    /// Marks a property schema as optional.
    #[must_use]
    pub fn optional(inner: Schema) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Allows `null` in addition to `inner`.
    #[must_use]
    pub fn nullable(inner: Schema) -> Self {
        Self::Nullable(Box::new(inner))
    }

    /// Creates a union of the given members.
    #[must_use]
    pub fn union(members: impl IntoIterator<Item = Schema>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// Converts string input to the scalar type of `inner` before validating.
    #[must_use]
    pub fn coerce(inner: Schema) -> Self {
        Self::Coerce(Box::new(inner))
    }

    /// Creates a schema that accepts anything.
    #[must_use]
    pub fn any() -> Self {
        Self::Any
    }

    /// Creates a null schema.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Creates a resource schema.
    #[must_use]
    pub fn resource(resource: Resource) -> Self {
        Self::Resource(resource)
    }

    /// Attaches a description.
    #[must_use]
    pub fn describe(self, description: impl Into<String>) -> Self {
        Self::Described {
            description: description.into(),
            inner: Box::new(self),
        }
    }

    /// Sets the minimum length for string schemas.
    #[must_use]
    pub fn min_length(self, len: usize) -> Self {
        match self {
            Self::String { max_length, .. } => Self::String {
                min_length: Some(len),
                max_length,
            },
            other => other,
        }
    }

    /// Sets the maximum length for string schemas.
    #[must_use]
    pub fn max_length(self, len: usize) -> Self {
        match self {
            Self::String { min_length, .. } => Self::String {
                min_length,
                max_length: Some(len),
            },
            other => other,
        }
    }

    /// Sets the minimum value for integer schemas.
    #[must_use]
    pub fn minimum_int(self, min: i64) -> Self {
        match self {
            Self::Integer { maximum, .. } => Self::Integer {
                minimum: Some(min),
                maximum,
            },
            other => other,
        }
    }

    /// Sets the maximum value for integer schemas.
    #[must_use]
    pub fn maximum_int(self, max: i64) -> Self {
        match self {
            Self::Integer { minimum, .. } => Self::Integer {
                minimum,
                maximum: Some(max),
            },
            other => other,
        }
    }

    /// Sets the minimum number of items for array schemas.
    #[must_use]
    pub fn min_items(self, min: usize) -> Self {
        match self {
            Self::Array {
                items, max_items, ..
            } => Self::Array {
                items,
                min_items: Some(min),
                max_items,
            },
            other => other,
        }
    }

    /// Sets the maximum number of items for array schemas.
    #[must_use]
    pub fn max_items(self, max: usize) -> Self {
        match self {
            Self::Array {
                items, min_items, ..
            } => Self::Array {
                items,
                min_items,
                max_items: Some(max),
            },
            other => other,
        }
    }

    /// Returns the schema with descriptions and coercion stripped.
    #[must_use]
    pub fn base(&self) -> &Schema {
        match self {
            Self::Described { inner, .. } | Self::Coerce(inner) => inner.base(),
            other => other,
        }
    }

    /// Returns the description, if one was attached.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Described { description, .. } => Some(description),
            Self::Coerce(inner) | Self::Optional(inner) => inner.description(),
            _ => None,
        }
    }

    /// Returns whether an object property with this schema may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self.base(), Self::Optional(_) | Self::Any)
    }

    /// Returns the object properties, if this is an object schema.
    #[must_use]
    pub fn properties(&self) -> Option<&IndexMap<String, Schema>> {
        match self.base() {
            Self::Object { properties } => Some(properties),
            _ => None,
        }
    }

    /// Parses a value against this schema.
    ///
    /// Returns the parsed (and possibly transformed) value.
    pub fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        self.parse_at(value, "$")
    }

    fn parse_at(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        match self {
            Self::String {
                min_length,
                max_length,
            } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(path, "string", value))?;
                let len = s.chars().count();

                if let Some(min) = min_length {
                    if len < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("string length {len} is less than minimum {min}"),
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("string length {len} is greater than maximum {max}"),
                        ));
                    }
                }
                Ok(value.clone())
            }

            Self::Integer { minimum, maximum } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch(path, "integer", value))?;

                if let Some(min) = minimum {
                    if n < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is less than minimum {min}"),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is greater than maximum {max}"),
                        ));
                    }
                }
                Ok(value.clone())
            }

            Self::Number { minimum, maximum } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| type_mismatch(path, "number", value))?;

                if let Some(min) = minimum {
                    if n < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is less than minimum {min}"),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("value {n} is greater than maximum {max}"),
                        ));
                    }
                }
                Ok(value.clone())
            }

            Self::Boolean => {
                if !value.is_boolean() {
                    return Err(type_mismatch(path, "boolean", value));
                }
                Ok(value.clone())
            }

            Self::Literal(expected) => {
                if value != expected {
                    return Err(ValidationError::new(
                        path,
                        format!("expected literal {expected}, got {value}"),
                    ));
                }
                Ok(value.clone())
            }

            Self::Picklist(options) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(path, "string", value))?;
                if !options.iter().any(|option| option == s) {
                    return Err(ValidationError::new(
                        path,
                        format!("expected one of [{}], got '{s}'", options.join(", ")),
                    ));
                }
                Ok(value.clone())
            }

            Self::Array {
                items,
                min_items,
                max_items,
            } => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| type_mismatch(path, "array", value))?;

                if let Some(min) = min_items {
                    if arr.len() < *min {
                        return Err(ValidationError::new(
                            path,
                            format!("array length {} is less than minimum {min}", arr.len()),
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if arr.len() > *max {
                        return Err(ValidationError::new(
                            path,
                            format!("array length {} is greater than maximum {max}", arr.len()),
                        ));
                    }
                }

                arr.iter()
                    .enumerate()
                    .map(|(idx, item)| items.parse_at(item, &format!("{path}[{idx}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }

            Self::Object { properties } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| type_mismatch(path, "object", value))?;

                let mut parsed = Map::new();
                for (key, prop_schema) in properties {
                    let prop_path = format!("{path}.{key}");
                    match obj.get(key) {
                        Some(prop_value) => {
                            parsed.insert(key.clone(), prop_schema.parse_at(prop_value, &prop_path)?);
                        }
                        None if prop_schema.is_optional() => {}
                        None => {
                            return Err(ValidationError::new(
                                prop_path,
                                format!("missing required property '{key}'"),
                            ));
                        }
                    }
                }
                Ok(Value::Object(parsed))
            }

            Self::Optional(inner) | Self::Described { inner, .. } => inner.parse_at(value, path),

            Self::Nullable(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    inner.parse_at(value, path)
                }
            }

            Self::Union(members) => {
                let mut reasons = Vec::with_capacity(members.len());
                for member in members {
                    match member.parse_at(value, path) {
                        Ok(parsed) => return Ok(parsed),
                        Err(err) => reasons.push(err.message),
                    }
                }
                Err(ValidationError::new(
                    path,
                    format!("value matched no union member ({})", reasons.join(" | ")),
                ))
            }

            Self::Coerce(inner) => match value {
                Value::String(s) => inner.parse_at(&coerce_string(s, inner.base()), path),
                other => inner.parse_at(other, path),
            },

            Self::Any => Ok(value.clone()),

            Self::Null => {
                if !value.is_null() {
                    return Err(type_mismatch(path, "null", value));
                }
                Ok(Value::Null)
            }

            Self::Resource(resource) => resource.apply(value.clone()).map_err(|err| {
                ValidationError::new(
                    path,
                    format!("resource '{}' rejected value: {}", resource.name(), err.message),
                )
            }),
        }
    }
}

/// Converts a string to the scalar type the target schema expects.
///
/// Strings that do not parse are returned unchanged so the target reports
/// a normal type mismatch.
/// Wrappers are unwrapped all the way down. For unions, the first member
/// that accepts its coerced form wins.
fn coerce_string(s: &str, target: &Schema) -> Value {
    match target.base() {
        Schema::Optional(inner) | Schema::Nullable(inner) => coerce_string(s, inner),
        Schema::Union(members) => members
            .iter()
            .map(|member| coerce_string(s, member))
            .zip(members)
            .find(|(coerced, member)| member.parse(coerced).is_ok())
            .map_or_else(|| Value::String(s.to_string()), |(coerced, _)| coerced),
        Schema::Integer { .. } => s
            .parse::<i64>()
            .map_or_else(|_| Value::String(s.to_string()), Value::from),
        Schema::Number { .. } => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::String(s.to_string()), Value::Number),
        Schema::Boolean => match s {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s.to_string()),
        },
        _ => Value::String(s.to_string()),
    }
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(
        path,
        format!("expected {expected}, got {}", value_type_name(value)),
    )
}

/// Returns a human-readable name for a JSON value type.
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
