//! OpenAPI 3.1 document types.
//!
//! These types serialize to the OpenAPI 3.1 format:
//! <https://spec.openapis.org/oas/v3.1.0>
//!
//! Only the parts of the format that endpoint configurations can express are
//! modelled. Optional fields are skipped when empty so generated documents
//! stay small.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// OpenAPI document root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version ("3.1.0").
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Available servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Paths and their operations.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Tags used by operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl OpenApi {
    /// Returns the operation for `method` at `path`, if documented.
    ///
    /// `path` is in OpenAPI form (`/users/{id}`).
    pub fn operation(&self, method: &http::Method, path: &str) -> Option<&Operation> {
        self.paths.get(path)?.get(method)
    }
}

/// API metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Contact information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// License information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// Contact information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License name.
    pub name: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Server information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The operations available on one path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    /// Returns the operation slot for `method`, or `None` if the method has no
    /// slot in a path item.
    pub fn slot_mut(&mut self, method: &http::Method) -> Option<&mut Option<Operation>> {
        let slot = match *method {
            http::Method::GET => &mut self.get,
            http::Method::PUT => &mut self.put,
            http::Method::POST => &mut self.post,
            http::Method::DELETE => &mut self.delete,
            http::Method::OPTIONS => &mut self.options,
            http::Method::HEAD => &mut self.head,
            http::Method::PATCH => &mut self.patch,
            _ => return None,
        };
        Some(slot)
    }

    /// Returns the operation for `method`.
    pub fn get(&self, method: &http::Method) -> Option<&Operation> {
        match *method {
            http::Method::GET => self.get.as_ref(),
            http::Method::PUT => self.put.as_ref(),
            http::Method::POST => self.post.as_ref(),
            http::Method::DELETE => self.delete.as_ref(),
            http::Method::OPTIONS => self.options.as_ref(),
            http::Method::HEAD => self.head.as_ref(),
            http::Method::PATCH => self.patch.as_ref(),
            _ => None,
        }
    }
}

/// An API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code.
    pub responses: IndexMap<String, Response>,
    /// Security requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
    /// HTTP header.
    Header,
    /// Cookie.
    Cookie,
}

/// An operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Parameter schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonSchema>,
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonSchema>,
}

/// Response definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Description (required by the format).
    pub description: String,
    /// Content by media type. Empty for responses without a body.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Named schemas, referenced as `#/components/schemas/{name}`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, JsonSchema>,
    /// Security schemes.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    #[serde(rename = "securitySchemes")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

impl Components {
    /// Returns whether there is nothing to emit.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty()
    }
}

/// Security scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// Scheme type (`http` or `apiKey`).
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP auth scheme name (type `http`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Bearer token format (type `http`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "bearerFormat")]
    pub bearer_format: Option<String>,
    /// API key location (type `apiKey`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "in")]
    pub location: Option<String>,
    /// API key name (type `apiKey`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SecurityScheme {
    /// HTTP authentication with the given scheme (`bearer`, `basic`, ...).
    pub fn http(scheme: impl Into<String>, bearer_format: Option<String>) -> Self {
        Self {
            scheme_type: "http".to_string(),
            description: None,
            scheme: Some(scheme.into()),
            bearer_format,
            location: None,
            name: None,
        }
    }

    /// An API key carried in `location` (`header`, `query` or `cookie`).
    pub fn api_key(location: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            description: None,
            scheme: None,
            bearer_format: None,
            location: Some(location.into()),
            name: Some(name.into()),
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Security requirement: scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// API tag for grouping operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// JSON Schema primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type.
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Array type.
    Array,
    /// Object type.
    Object,
    /// Null type.
    Null,
}

/// JSON Schema definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to a named component schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    /// The only accepted value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "const")]
    pub const_value: Option<Value>,
    /// Accepted values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "enum")]
    pub enum_values: Vec<Value>,
    /// Object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonSchema>,
    /// Required properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    /// Exactly one of these schemas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "oneOf")]
    pub one_of: Vec<JsonSchema>,
    /// At least one of these schemas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "anyOf")]
    pub any_of: Vec<JsonSchema>,
    /// Minimum value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    /// Maximum value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    /// Minimum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minLength")]
    pub min_length: Option<u64>,
    /// Maximum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxLength")]
    pub max_length: Option<u64>,
    /// Minimum array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minItems")]
    pub min_items: Option<u64>,
    /// Maximum array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxItems")]
    pub max_items: Option<u64>,
}

impl JsonSchema {
    /// Creates a schema of a single type.
    #[must_use]
    pub fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Default::default()
        }
    }

    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::typed(SchemaType::String)
    }

    /// Creates an object schema.
    #[must_use]
    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: JsonSchema) -> Self {
        Self {
            schema_type: Some(SchemaType::Array),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// Creates a reference to a component schema.
    #[must_use]
    pub fn component_ref(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{name}")),
            ..Default::default()
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}
