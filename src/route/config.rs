//! Route registration input shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One route declaration inside an application's registration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteConfig {
    /// Path segment for this node. Normalized to a leading slash.
    pub path: String,

    /// Arbitrary key-value bag. Fragments must carry `parent_app_name` and
    /// `parent_container_name` here.
    pub meta: Map<String, Value>,

    /// Nested child routes.
    pub children: Vec<RouteConfig>,

    /// Slot name this node's children list accepts insertions into.
    pub slot: Option<String>,

    /// Slot name this whole node should be spliced into.
    pub fill: Option<String>,

    /// Fragment nodes merge with a main node at the same path instead of
    /// conflicting.
    pub is_fragment: bool,

    /// Root fragments mount against the top-level shell, outside the
    /// nested route hierarchy.
    pub is_root_fragment: bool,

    /// Custom path-matching options. Fragments must not set this.
    pub path_options: Option<PathOptions>,
}

/// Options for compiling a path template.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PathOptions {
    /// Match case-sensitively. Defaults to false.
    pub sensitive: bool,

    /// Reject a trailing slash instead of tolerating it. Defaults to false.
    pub strict: bool,
}
