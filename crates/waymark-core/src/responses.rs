//! Declared response sets and their merge algebra.
//!
//! Every endpoint carries a [`ResponseSet`]: the closed vocabulary of status
//! codes its handler and middleware may answer with, each mapped to a body
//! schema or to [`ResponseSchema::NoBody`]. Adding a middleware merges its
//! declared responses into the endpoint's set:
//!
//! | left      | right     | merged              |
//! |-----------|-----------|---------------------|
//! | absent    | `X`       | `X`                 |
//! | `NoBody`  | `NoBody`  | `NoBody`            |
//! | `NoBody`  | `S`       | `Nullable(S)`       |
//! | `S`       | `T`       | `Union[S, T]`       |
//!
//! Unions are flattened and deduplicated, so merging is idempotent and the
//! membership of every status is independent of merge order.

use crate::schema::Schema;
use http::StatusCode;
use std::collections::btree_map::{self, BTreeMap};

/// What a response at one status carries.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSchema {
    /// The response has no body.
    NoBody,
    /// The response body must match this schema.
    Body(Schema),
}

impl ResponseSchema {
    /// Returns the body schema, if any.
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::NoBody => None,
            Self::Body(schema) => Some(schema),
        }
    }

    /// Returns whether this response has no body.
    pub fn is_no_body(&self) -> bool {
        matches!(self, Self::NoBody)
    }

    /// Splits the schema into its nullability and its distinct members.
    fn members(&self) -> (bool, Vec<Schema>) {
        let mut members = Vec::new();
        let nullable = match self {
            Self::NoBody => true,
            Self::Body(schema) => flatten(schema, &mut members),
        };
        (nullable, members)
    }

    /// Rebuilds a response schema from nullability and members.
    fn from_members(nullable: bool, mut members: Vec<Schema>) -> Self {
        let body = match members.len() {
            0 => return Self::NoBody,
            1 => members.remove(0),
            _ => Schema::Union(members),
        };
        if nullable {
            Self::Body(Schema::Nullable(Box::new(body)))
        } else {
            Self::Body(body)
        }
    }

    /// Returns whether both sides accept the same set of members.
    ///
    /// Member order inside unions is ignored.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        let (left_nullable, left) = self.members();
        let (right_nullable, right) = other.members();
        left_nullable == right_nullable
            && left.len() == right.len()
            && left.iter().all(|member| right.contains(member))
    }
}

/// Pushes the distinct union members of `schema` into `out`.
///
/// Returns whether a nullable wrapper was lifted out along the way.
fn flatten(schema: &Schema, out: &mut Vec<Schema>) -> bool {
    match schema {
        Schema::Nullable(inner) => {
            flatten(inner, out);
            true
        }
        Schema::Union(members) => members
            .iter()
            .fold(false, |nullable, member| flatten(member, out) | nullable),
        other => {
            if !out.contains(other) {
                out.push(other.clone());
            }
            false
        }
    }
}

/// Merges two response schemas declared for the same status.
pub fn merge_schema(left: &ResponseSchema, right: &ResponseSchema) -> ResponseSchema {
    if left.is_no_body() && right.is_no_body() {
        return ResponseSchema::NoBody;
    }
    let (left_nullable, mut members) = left.members();
    let (right_nullable, right_members) = right.members();
    for member in right_members {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    ResponseSchema::from_members(left_nullable || right_nullable, members)
}

/// A mapping from status code to declared response.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use waymark_core::{merge, ResponseSchema, ResponseSet, Schema};
///
/// let handler = ResponseSet::new()
///     .status(StatusCode::OK, Schema::string())
///     .no_body(StatusCode::NOT_FOUND);
/// let auth = ResponseSet::new()
///     .status(StatusCode::OK, Schema::integer())
///     .no_body(StatusCode::UNAUTHORIZED);
///
/// let merged = merge(&handler, &auth);
/// assert_eq!(merged.len(), 3);
/// assert_eq!(
///     merged.get(StatusCode::OK),
///     Some(&ResponseSchema::Body(Schema::union([Schema::string(), Schema::integer()])))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSet {
    entries: BTreeMap<StatusCode, ResponseSchema>,
}

impl ResponseSet {
    /// Creates an empty response set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a response with a body schema.
    #[must_use]
    pub fn status(mut self, status: StatusCode, schema: Schema) -> Self {
        self.entries.insert(status, ResponseSchema::Body(schema));
        self
    }

    /// Declares a response without a body.
    #[must_use]
    pub fn no_body(mut self, status: StatusCode) -> Self {
        self.entries.insert(status, ResponseSchema::NoBody);
        self
    }

    /// Declares a response, replacing any existing declaration for the status.
    pub fn insert(&mut self, status: StatusCode, response: ResponseSchema) {
        self.entries.insert(status, response);
    }

    /// Returns the declared response for a status.
    pub fn get(&self, status: StatusCode) -> Option<&ResponseSchema> {
        self.entries.get(&status)
    }

    /// Returns whether the status is declared.
    pub fn contains(&self, status: StatusCode) -> bool {
        self.entries.contains_key(&status)
    }

    /// Returns the number of declared statuses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no status is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates declared responses in ascending status order.
    pub fn iter(&self) -> btree_map::Iter<'_, StatusCode, ResponseSchema> {
        self.entries.iter()
    }

    /// Returns the declared statuses in ascending order.
    pub fn statuses(&self) -> Vec<StatusCode> {
        self.entries.keys().copied().collect()
    }

    /// Merges another set into a copy of this one.
    #[must_use]
    pub fn merge(&self, other: &ResponseSet) -> ResponseSet {
        merge(self, other)
    }

    /// Returns whether both sets declare the same statuses with equivalent schemas.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(status, response)| {
                other
                    .get(*status)
                    .is_some_and(|theirs| response.is_equivalent(theirs))
            })
    }
}

impl FromIterator<(StatusCode, ResponseSchema)> for ResponseSet {
    fn from_iter<I: IntoIterator<Item = (StatusCode, ResponseSchema)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = (&'a StatusCode, &'a ResponseSchema);
    type IntoIter = btree_map::Iter<'a, StatusCode, ResponseSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Merges two response sets.
pub fn merge(left: &ResponseSet, right: &ResponseSet) -> ResponseSet {
    let mut merged = left.clone();
    for (status, response) in right {
        let combined = match merged.entries.get(status) {
            Some(existing) => merge_schema(existing, response),
            None => response.clone(),
        };
        merged.entries.insert(*status, combined);
    }
    merged
}

/// Merges any number of response sets, left to right.
pub fn merge_all<'a, I>(sets: I) -> ResponseSet
where
    I: IntoIterator<Item = &'a ResponseSet>,
{
    sets.into_iter()
        .fold(ResponseSet::new(), |acc, set| merge(&acc, set))
}
