//! Persistent middleware chains.
//!
//! [`MiddlewareChain::push`] returns a new chain that shares every existing
//! node with the chain it was called on, so deriving many endpoint
//! configurations from one base copies nothing.

use crate::middleware::MiddlewareUnit;
use std::fmt;
use std::sync::Arc;

struct Node {
    unit: MiddlewareUnit,
    prev: Option<Arc<Node>>,
    len: usize,
}

/// An immutable, append-only list of middleware units.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    tail: Option<Arc<Node>>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new chain with `unit` appended.
    #[must_use]
    pub fn push(&self, unit: MiddlewareUnit) -> Self {
        Self {
            tail: Some(Arc::new(Node {
                unit,
                prev: self.tail.clone(),
                len: self.len() + 1,
            })),
        }
    }

    /// Returns the number of units.
    pub fn len(&self) -> usize {
        self.tail.as_ref().map_or(0, |node| node.len)
    }

    /// Returns whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }

    /// Iterates units in declaration order.
    pub fn iter(&self) -> std::vec::IntoIter<&MiddlewareUnit> {
        let mut units = Vec::with_capacity(self.len());
        let mut cursor = self.tail.as_deref();
        while let Some(node) = cursor {
            units.push(&node.unit);
            cursor = node.prev.as_deref();
        }
        units.reverse();
        units.into_iter()
    }

    /// Returns the units in declaration order.
    pub fn to_vec(&self) -> Vec<MiddlewareUnit> {
        self.iter().cloned().collect()
    }

    /// Returns the unit names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(MiddlewareUnit::name).collect()
    }
}

impl<'a> IntoIterator for &'a MiddlewareChain {
    type Item = &'a MiddlewareUnit;
    type IntoIter = std::vec::IntoIter<&'a MiddlewareUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
