//! Projection of endpoint configurations into an OpenAPI document.
//!
//! Every [`EndpointConfig`] becomes one [`Operation`]:
//!
//! | Endpoint part          | OpenAPI                                            |
//! |------------------------|----------------------------------------------------|
//! | route pattern          | path (`:id` becomes `{id}`, base path prepended)   |
//! | route params schema    | `in: path` parameters, always required             |
//! | query schema           | `in: query` parameters, required unless optional   |
//! | body schema            | request body (`text/plain` for strings)            |
//! | merged response set    | one response per status                            |
//! | middleware security    | operation security requirements                    |
//!
//! Resources are emitted once under `#/components/schemas` and referenced
//! everywhere else.

use http::StatusCode;
use indexmap::{IndexMap, IndexSet};
use serde_json::Number;
use std::collections::HashSet;
use waymark_config::{SecuritySchemeConfig, WaymarkConfig};
use waymark_core::{join_path, ResponseSchema, Schema};
use waymark_middleware::EndpointConfig;

use crate::error::{DocsError, DocsResult};
use crate::openapi::{
    Components, Contact, Info, JsonSchema, License, MediaType, OpenApi, Operation, Parameter,
    ParameterIn, PathItem, RequestBody, Response, SchemaType, SecurityScheme, Server, Tag,
};

const OPENAPI_VERSION: &str = "3.1.0";
const JSON: &str = "application/json";
const TEXT: &str = "text/plain";

/// Builds OpenAPI documents from endpoint configurations.
///
/// ```
/// use http::StatusCode;
/// use waymark_core::{ResponseSet, RouteDescriptor, Schema};
/// use waymark_docs::OpenApiGenerator;
/// use waymark_middleware::{endpoint, EndpointInput};
///
/// let health = endpoint(
///     RouteDescriptor::get("/health"),
///     EndpointInput::new(ResponseSet::new().status(StatusCode::OK, Schema::string())),
/// );
///
/// let spec = OpenApiGenerator::new()
///     .title("Status API")
///     .version("1.0.0")
///     .generate(&[&health])
///     .unwrap();
///
/// let operation = spec.operation(&http::Method::GET, "/health").unwrap();
/// assert_eq!(operation.operation_id, "getHealth");
/// assert!(operation.responses["200"].content.contains_key("text/plain"));
/// ```
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    title: Option<String>,
    version: Option<String>,
    description: Option<String>,
    base_path: String,
    servers: Vec<Server>,
    contact: Option<Contact>,
    license: Option<License>,
    security_schemes: IndexMap<String, SecurityScheme>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: None,
            version: None,
            description: None,
            base_path: String::new(),
            servers: Vec::new(),
            contact: None,
            license: None,
            security_schemes: IndexMap::new(),
        }
    }

    /// Create a generator from the `docs` and `router` configuration sections.
    #[must_use]
    pub fn from_config(config: &WaymarkConfig) -> Self {
        let mut generator = Self::new()
            .title(&config.docs.title)
            .version(&config.docs.version)
            .base_path(&config.router.base_path);
        generator.description.clone_from(&config.docs.description);

        for server in &config.docs.servers {
            generator = generator.server(&server.url, server.description.clone());
        }
        for (name, scheme) in &config.router.security_schemes {
            generator = generator.security_scheme(name, scheme_from_config(scheme));
        }
        generator
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the prefix prepended to every path.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Add a server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Set contact information.
    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Set license information.
    #[must_use]
    pub fn license(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.license = Some(License {
            name: name.into(),
            url,
        });
        self
    }

    /// Register a security scheme under `name`.
    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.security_schemes.insert(name.into(), scheme);
        self
    }

    /// Generate the document for `endpoints`.
    ///
    /// # Errors
    ///
    /// Fails when two endpoints share a method and path or an operation id,
    /// when two different resources use the same name, or when an endpoint
    /// cannot be expressed (unsupported method, non-object query schema).
    pub fn generate(&self, endpoints: &[&EndpointConfig]) -> DocsResult<OpenApi> {
        let mut components = Components {
            schemas: IndexMap::new(),
            security_schemes: self.security_schemes.clone(),
        };
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut tags: IndexSet<String> = IndexSet::new();
        let mut operation_ids: HashSet<String> = HashSet::new();

        for config in endpoints {
            let route = config.route();
            let path = join_path([self.base_path.as_str(), route.openapi_path().as_str()]);
            let operation = self.convert_endpoint(config, &mut components.schemas)?;

            if !operation_ids.insert(operation.operation_id.clone()) {
                return Err(DocsError::DuplicateOperationId {
                    operation_id: operation.operation_id,
                });
            }
            tags.extend(operation.tags.iter().cloned());

            let item = paths.entry(path.clone()).or_default();
            let Some(slot) = item.slot_mut(route.method()) else {
                return Err(DocsError::InvalidOperation {
                    operation_id: operation.operation_id,
                    reason: format!("unsupported method {}", route.method()),
                });
            };
            if slot.is_some() {
                return Err(DocsError::DuplicateOperation {
                    method: route.method().to_string(),
                    path,
                });
            }
            *slot = Some(operation);
        }

        Ok(OpenApi {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: self.title.clone().unwrap_or_else(|| "API".to_string()),
                version: self.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
                description: self.description.clone(),
                contact: self.contact.clone(),
                license: self.license.clone(),
            },
            servers: self.servers.clone(),
            paths,
            components: (!components.is_empty()).then_some(components),
            tags: tags
                .into_iter()
                .map(|name| Tag {
                    name,
                    description: None,
                })
                .collect(),
        })
    }

    /// Generate the document as pretty-printed JSON.
    pub fn generate_json(&self, endpoints: &[&EndpointConfig]) -> DocsResult<String> {
        let spec = self.generate(endpoints)?;
        serde_json::to_string_pretty(&spec).map_err(DocsError::from)
    }

    fn convert_endpoint(
        &self,
        config: &EndpointConfig,
        components: &mut IndexMap<String, JsonSchema>,
    ) -> DocsResult<Operation> {
        let route = config.route();
        let meta = config.meta();
        let operation_id = meta
            .operation_id
            .clone()
            .unwrap_or_else(|| operation_id(route.method(), route.pattern()));

        let mut parameters = Vec::new();
        let path_properties = route.params_schema().properties();
        for name in route.placeholders() {
            let declared = path_properties.and_then(|props| props.get(name));
            let schema = match declared {
                Some(schema) => project(schema, components)?,
                None => JsonSchema::string(),
            };
            parameters.push(Parameter {
                name: name.to_string(),
                location: ParameterIn::Path,
                description: declared.and_then(Schema::description).map(str::to_string),
                required: true,
                schema: Some(schema),
            });
        }

        if let Some(query) = config.query() {
            let Some(properties) = query.properties() else {
                return Err(DocsError::InvalidOperation {
                    operation_id,
                    reason: "query schema must be an object".to_string(),
                });
            };
            for (name, schema) in properties {
                parameters.push(Parameter {
                    name: name.clone(),
                    location: ParameterIn::Query,
                    description: schema.description().map(str::to_string),
                    required: !schema.is_optional(),
                    schema: Some(project(schema, components)?),
                });
            }
        }

        let request_body = match config.body() {
            Some(body) => Some(RequestBody {
                description: body.description().map(str::to_string),
                required: !body.is_optional(),
                content: content_for(body, components)?,
            }),
            None => None,
        };

        let mut responses = IndexMap::new();
        for (status, response) in config.responses().iter() {
            let converted = convert_response(*status, response, components)?;
            responses.insert(status.as_str().to_string(), converted);
        }

        let tags = if meta.tags.is_empty() {
            route
                .first_segment()
                .filter(|segment| !segment.starts_with(':'))
                .map(|segment| vec![segment.to_string()])
                .unwrap_or_default()
        } else {
            meta.tags.clone()
        };

        Ok(Operation {
            operation_id,
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            tags,
            deprecated: meta.deprecated,
            parameters,
            request_body,
            responses,
            security: config.security().to_vec(),
        })
    }
}

fn scheme_from_config(config: &SecuritySchemeConfig) -> SecurityScheme {
    let scheme = match config {
        SecuritySchemeConfig::Http {
            scheme,
            bearer_format,
            ..
        } => SecurityScheme::http(scheme, bearer_format.clone()),
        SecuritySchemeConfig::ApiKey { location, name, .. } => {
            SecurityScheme::api_key(location.as_str(), name)
        }
    };
    match config.description() {
        Some(description) => scheme.with_description(description),
        None => scheme,
    }
}

fn convert_response(
    status: StatusCode,
    response: &ResponseSchema,
    components: &mut IndexMap<String, JsonSchema>,
) -> DocsResult<Response> {
    let description = status.canonical_reason().unwrap_or("Response").to_string();
    let content = match response {
        ResponseSchema::NoBody => IndexMap::new(),
        ResponseSchema::Body(schema) => content_for(schema, components)?,
    };
    Ok(Response {
        description,
        content,
    })
}

/// Strings travel as `text/plain`, everything else as JSON.
fn content_for(
    schema: &Schema,
    components: &mut IndexMap<String, JsonSchema>,
) -> DocsResult<IndexMap<String, MediaType>> {
    let media_type = match unwrap_optional(schema).base() {
        Schema::String { .. } => TEXT,
        _ => JSON,
    };
    let mut content = IndexMap::new();
    content.insert(
        media_type.to_string(),
        MediaType {
            schema: Some(project(schema, components)?),
        },
    );
    Ok(content)
}

fn unwrap_optional(schema: &Schema) -> &Schema {
    match schema.base() {
        Schema::Optional(inner) => unwrap_optional(inner),
        other => other,
    }
}

/// Converts a value schema to JSON Schema, registering resources as components.
#[allow(clippy::cast_precision_loss)]
pub fn project(
    schema: &Schema,
    components: &mut IndexMap<String, JsonSchema>,
) -> DocsResult<JsonSchema> {
    let projected = match schema {
        Schema::String {
            min_length,
            max_length,
        } => JsonSchema {
            min_length: min_length.map(|v| v as u64),
            max_length: max_length.map(|v| v as u64),
            ..JsonSchema::string()
        },
        Schema::Integer { minimum, maximum } => JsonSchema {
            minimum: minimum.map(Number::from),
            maximum: maximum.map(Number::from),
            ..JsonSchema::typed(SchemaType::Integer)
        },
        Schema::Number { minimum, maximum } => JsonSchema {
            minimum: minimum.and_then(Number::from_f64),
            maximum: maximum.and_then(Number::from_f64),
            ..JsonSchema::typed(SchemaType::Number)
        },
        Schema::Boolean => JsonSchema::typed(SchemaType::Boolean),
        Schema::Literal(value) => JsonSchema {
            const_value: Some(value.clone()),
            ..Default::default()
        },
        Schema::Picklist(options) => JsonSchema {
            enum_values: options.iter().cloned().map(Into::into).collect(),
            ..JsonSchema::string()
        },
        Schema::Array {
            items,
            min_items,
            max_items,
        } => JsonSchema {
            min_items: min_items.map(|v| v as u64),
            max_items: max_items.map(|v| v as u64),
            ..JsonSchema::array(project(items, components)?)
        },
        Schema::Object { properties } => {
            let mut object = JsonSchema::object();
            for (name, property) in properties {
                if !property.is_optional() {
                    object.required.push(name.clone());
                }
                object
                    .properties
                    .insert(name.clone(), project(property, components)?);
            }
            object
        }
        Schema::Optional(inner) | Schema::Coerce(inner) => project(inner, components)?,
        Schema::Nullable(inner) => JsonSchema {
            any_of: vec![
                project(inner, components)?,
                JsonSchema::typed(SchemaType::Null),
            ],
            ..Default::default()
        },
        Schema::Union(members) => JsonSchema {
            one_of: members
                .iter()
                .map(|member| project(member, components))
                .collect::<DocsResult<_>>()?,
            ..Default::default()
        },
        Schema::Described { description, inner } => {
            project(inner, components)?.with_description(description)
        }
        Schema::Any => JsonSchema::default(),
        Schema::Null => JsonSchema::typed(SchemaType::Null),
        Schema::Resource(resource) => {
            let output = project(resource.output(), components)?;
            match components.get(resource.name()) {
                Some(existing) if *existing != output => {
                    return Err(DocsError::ConflictingComponent {
                        name: resource.name().to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    components.insert(resource.name().to_string(), output);
                }
            }
            JsonSchema::component_ref(resource.name())
        }
    };
    Ok(projected)
}

/// Builds an operation id such as `getUsersById` from a method and pattern.
fn operation_id(method: &http::Method, pattern: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        let word = match segment.strip_prefix(':') {
            Some(param) => {
                id.push_str("By");
                param
            }
            None => segment,
        };
        for part in word.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                id.push(first.to_ascii_uppercase());
                id.extend(chars);
            }
        }
    }
    id
}
