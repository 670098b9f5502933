//! Route descriptors.
//!
//! A [`RouteDescriptor`] pairs an HTTP method with a path pattern such as
//! `/users/:id` and the schema used to parse its path parameters.

use crate::schema::Schema;
use http::Method;
use indexmap::IndexMap;
use std::cmp::Ordering;

/// A segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal path segment (e.g., "users").
    Literal(String),
    /// A path parameter (e.g., ":id").
    Parameter(String),
}

/// Method, path pattern and path-parameter schema of one endpoint.
///
/// # Example
///
/// ```
/// use http::Method;
/// use waymark_core::RouteDescriptor;
///
/// let route = RouteDescriptor::new(Method::GET, "/users/:id/posts/:post_id");
/// assert_eq!(route.placeholders(), vec!["id", "post_id"]);
/// assert_eq!(route.openapi_path(), "/users/{id}/posts/{post_id}");
///
/// let params = route.match_path("/users/7/posts/42").unwrap();
/// assert_eq!(params["id"], "7");
/// assert!(route.match_path("/users/7").is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    method: Method,
    pattern: String,
    params: Schema,
    segments: Vec<PathSegment>,
}

impl RouteDescriptor {
    /// Creates a route whose path parameters are all required strings.
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let segments = parse_pattern(&pattern);
        let params = Schema::object(segments.iter().filter_map(|segment| match segment {
            PathSegment::Parameter(name) => Some((name.clone(), Schema::string())),
            PathSegment::Literal(_) => None,
        }));
        Self {
            method,
            pattern,
            params,
            segments,
        }
    }

    /// Creates a `GET` route.
    pub fn get(pattern: impl Into<String>) -> Self {
        Self::new(Method::GET, pattern)
    }

    /// Creates a `POST` route.
    pub fn post(pattern: impl Into<String>) -> Self {
        Self::new(Method::POST, pattern)
    }

    /// Creates a `PUT` route.
    pub fn put(pattern: impl Into<String>) -> Self {
        Self::new(Method::PUT, pattern)
    }

    /// Creates a `PATCH` route.
    pub fn patch(pattern: impl Into<String>) -> Self {
        Self::new(Method::PATCH, pattern)
    }

    /// Creates a `DELETE` route.
    pub fn delete(pattern: impl Into<String>) -> Self {
        Self::new(Method::DELETE, pattern)
    }

    /// Replaces the path-parameter schema.
    #[must_use]
    pub fn params(mut self, schema: Schema) -> Self {
        self.params = schema;
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the path-parameter schema.
    pub fn params_schema(&self) -> &Schema {
        &self.params
    }

    /// Returns the placeholder names in order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Parameter(name) => Some(name.as_str()),
                PathSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Matches a request path, returning the captured parameters.
    pub fn match_path(&self, request_path: &str) -> Option<IndexMap<String, String>> {
        let request_segments: Vec<&str> = request_path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = IndexMap::new();

        for (pattern, actual) in self.segments.iter().zip(request_segments.iter()) {
            match pattern {
                PathSegment::Literal(lit) => {
                    if lit != *actual {
                        return None;
                    }
                }
                PathSegment::Parameter(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }

        Some(params)
    }

    /// Returns the pattern in OpenAPI form (`:id` becomes `{id}`).
    pub fn openapi_path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(lit) => format!("/{lit}"),
                PathSegment::Parameter(name) => format!("/{{{name}}}"),
            })
            .collect()
    }

    /// Returns the first literal segment, used as the default docs tag.
    pub fn first_segment(&self) -> Option<&str> {
        self.pattern
            .trim_start_matches('/')
            .split('/')
            .find(|s| !s.is_empty())
    }
}

fn parse_pattern(pattern: &str) -> Vec<PathSegment> {
    pattern
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => PathSegment::Parameter(name.to_string()),
            None => PathSegment::Literal(segment.to_string()),
        })
        .collect()
}

/// Joins path fragments into one absolute path.
///
/// Repeated slashes collapse and trailing slashes are dropped:
///
/// ```
/// use waymark_core::join_path;
///
/// assert_eq!(join_path(["/api/", "/users", ":id/"]), "/api/users/:id");
/// assert_eq!(join_path(["", "/"]), "/");
/// ```
pub fn join_path<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments: Vec<String> = parts
        .into_iter()
        .flat_map(|part| {
            part.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Orders two patterns for matching.
///
/// Walking both patterns segment by segment, the first difference decides:
/// a pattern that ends first sorts earlier, a literal segment sorts before a
/// parameter, and otherwise segments compare lexically.
pub fn compare_priority(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let right: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();

    for idx in 0..left.len().max(right.len()) {
        let ordering = match (left.get(idx), right.get(idx)) {
            (Some(l), Some(r)) if l == r => continue,
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (Some(l), Some(r)) => match (l.starts_with(':'), r.starts_with(':')) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ => l.cmp(r),
            },
            (None, None) => Ordering::Equal,
        };
        return ordering;
    }
    Ordering::Equal
}

/// Sorts route descriptors so literal routes win over parameterised ones.
pub fn sort_by_priority(routes: &mut [RouteDescriptor]) {
    routes.sort_by(|a, b| compare_priority(a.pattern(), b.pattern()));
}
