//! Projected route snapshots produced by matching.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::app::AppHandle;

/// A mutable snapshot of a route node for one navigation.
///
/// Cloning is deep for params/query/meta; applications stay shared handles
/// by design (they are referenced, never owned, by routes).
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    /// This node's own path segment.
    pub path: String,

    /// Concatenation of ancestor paths.
    pub full_path: String,

    /// Applications at this position; index 0 is the main app, the rest are
    /// co-located fragment apps.
    pub apps: Vec<AppHandle>,

    /// Path parameters captured by the matched pattern, percent-decoded.
    pub params: HashMap<String, String>,

    /// Query-string parameters for this navigation.
    pub query: HashMap<String, String>,

    /// Meta bag, including ownership info for merged fragments.
    pub meta: Map<String, Value>,
}

impl MatchedRoute {
    /// The route's main application, if any.
    pub fn main_app(&self) -> Option<&AppHandle> {
        self.apps.first()
    }

    /// Fragment applications beyond the main app.
    pub fn fragment_apps(&self) -> &[AppHandle] {
        if self.apps.len() > 1 {
            &self.apps[1..]
        } else {
            &[]
        }
    }

    /// Two matched routes are equal iff they share a full path and a main
    /// app identity.
    pub fn same_route(&self, other: &MatchedRoute) -> bool {
        if self.full_path != other.full_path {
            return false;
        }
        match (self.main_app(), other.main_app()) {
            (Some(a), Some(b)) => a.name() == b.name(),
            (None, None) => true,
            _ => false,
        }
    }

    /// A copy holding only the main app, used when persisting a freshly
    /// mounted route position before its fragment apps are attached.
    pub fn with_main_only(&self) -> MatchedRoute {
        let mut clone = self.clone();
        clone.apps.truncate(1);
        clone
    }
}

/// Result of matching one URL against the route forest.
#[derive(Debug, Clone, Default)]
pub struct MatchedResult {
    /// Matched route chain, ordered ancestor → descendant.
    pub routes: Vec<MatchedRoute>,

    /// Independently matched root-fragment routes, unordered.
    pub fragment_routes: Vec<MatchedRoute>,
}

impl MatchedResult {
    /// Whether nothing matched at all.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.fragment_routes.is_empty()
    }
}
