//! Route forest: arena-backed nodes, slot/fill splicing, same-path merging.
//!
//! # Responsibilities
//! - Build route nodes from per-application route declarations
//! - Merge the forest: collect slots, splice fills, merge same-path siblings
//! - Flatten to a pre-order list the matcher walks linearly
//!
//! # Design Decisions
//! - Nodes live in an arena with integer ids; parent/child links are ids,
//!   so the bounded registration-phase mutation needs no shared ownership
//! - Fills are processed in reverse insertion order so later-registered
//!   fills still find earlier-registered slots
//! - A non-fragment node never merges with another non-fragment node at the
//!   same path; that is a fatal configuration error

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::app::AppHandle;
use crate::error::ConfigError;
use crate::route::config::{PathOptions, RouteConfig};
use crate::route::{META_PARENT_APP, META_PARENT_CONTAINER};

/// Index of a node inside its [`RouteArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One path segment in the route forest.
#[derive(Debug)]
pub struct RouteNode {
    /// Normalized path segment, leading slash.
    pub path: String,

    /// Fragment nodes merge with a main node at the same path.
    pub is_fragment: bool,

    /// Applications at this node; index 0 is the main app.
    pub apps: Vec<AppHandle>,

    /// Arbitrary key-value bag; fragment ownership info lands here.
    pub meta: Map<String, Value>,

    /// Child node ids, wildcard children always last.
    pub children: Vec<NodeId>,

    /// Back-reference to the parent node.
    pub parent: Option<NodeId>,

    /// Slot name this node's children list accepts insertions into.
    pub slot: Option<String>,

    /// Slot name this node should be spliced into.
    pub fill: Option<String>,

    /// Path-matching options for this node's template.
    pub path_options: PathOptions,
}

impl RouteNode {
    fn is_wildcard(&self) -> bool {
        self.path.ends_with("(.*)")
    }
}

/// The process-wide route forest plus the separate root-fragment list.
#[derive(Debug, Default)]
pub struct RouteArena {
    nodes: Vec<RouteNode>,
    roots: Vec<NodeId>,
    root_fragments: Vec<NodeId>,
    merged: bool,
}

impl RouteArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut RouteNode {
        &mut self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn root_fragments(&self) -> &[NodeId] {
        &self.root_fragments
    }

    /// Construct a route (recursively, for children) from one declaration
    /// and insert it into the forest or the root-fragment list.
    pub fn add_route(&mut self, config: RouteConfig, app: &AppHandle) -> Result<NodeId, ConfigError> {
        if self.merged {
            return Err(ConfigError::AlreadyStarted);
        }
        let is_root_fragment = config.is_root_fragment;
        let id = self.build_node(config, app, None)?;
        if is_root_fragment {
            self.root_fragments.push(id);
        } else {
            self.roots.push(id);
        }
        Ok(id)
    }

    fn build_node(
        &mut self,
        config: RouteConfig,
        app: &AppHandle,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ConfigError> {
        validate_config(&config, parent.is_some())?;

        let RouteConfig {
            path,
            meta,
            children,
            slot,
            fill,
            is_fragment,
            is_root_fragment,
            path_options,
        } = config;

        let node = RouteNode {
            path: normalize_path(&path),
            is_fragment: is_fragment || is_root_fragment,
            apps: vec![app.clone()],
            meta,
            children: Vec::new(),
            parent,
            slot,
            fill,
            path_options: path_options.unwrap_or_default(),
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);

        for child in children {
            let child_id = self.build_node(child, app, Some(id))?;
            self.append_child(id, child_id)?;
        }
        Ok(id)
    }

    /// Merge the forest: collect every slot name (duplicates are fatal),
    /// splice fills into their slot owners, then merge same-path roots.
    pub fn merge_forest(&mut self) -> Result<(), ConfigError> {
        if self.merged {
            return Ok(());
        }

        // Slots are collected over the whole forest before any fill moves,
        // so registration order cannot hide a slot from a fill.
        let mut slots: HashMap<String, NodeId> = HashMap::new();
        for &root in &self.roots {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if let Some(name) = &self.nodes[id.0].slot {
                    if slots.insert(name.clone(), id).is_some() {
                        return Err(ConfigError::DuplicateSlot(name.clone()));
                    }
                }
                stack.extend(self.nodes[id.0].children.iter().copied());
            }
        }

        // Splice fills, newest first.
        let mut i = self.roots.len();
        while i > 0 {
            i -= 1;
            let id = self.roots[i];
            let Some(fill) = self.nodes[id.0].fill.clone() else {
                continue;
            };
            match slots.get(&fill) {
                Some(&owner) => {
                    self.roots.remove(i);
                    self.append_child(owner, id)?;
                }
                None => {
                    tracing::warn!(fill = %fill, path = %self.nodes[id.0].path, "no slot declared for fill; route stays at forest root");
                }
            }
        }

        // Merge remaining same-path roots.
        let pending = std::mem::take(&mut self.roots);
        for id in pending {
            let path = self.nodes[id.0].path.clone();
            match self
                .roots
                .iter()
                .position(|&r| self.nodes[r.0].path == path)
            {
                Some(existing) => {
                    let kept = self.merge_nodes(self.roots[existing], id)?;
                    self.roots[existing] = kept;
                }
                None => self.roots.push(id),
            }
        }

        self.merged = true;
        Ok(())
    }

    /// Merge `from` into `into` (same path). The non-fragment side always
    /// absorbs; returns the surviving node id.
    fn merge_nodes(&mut self, into: NodeId, from: NodeId) -> Result<NodeId, ConfigError> {
        debug_assert_eq!(self.nodes[into.0].path, self.nodes[from.0].path);

        if self.nodes[into.0].is_fragment && !self.nodes[from.0].is_fragment {
            return self.merge_nodes(from, into);
        }
        if !self.nodes[into.0].is_fragment && !self.nodes[from.0].is_fragment {
            return Err(ConfigError::RouteConflict(self.nodes[into.0].path.clone()));
        }

        // `from` is a fragment here. Its meta is namespaced under its main
        // app's name so co-located fragments keep separate ownership info.
        let from_apps = std::mem::take(&mut self.node_mut(from).apps);
        let from_meta = std::mem::take(&mut self.node_mut(from).meta);
        let from_children = std::mem::take(&mut self.node_mut(from).children);
        let from_parent = self.nodes[from.0].parent;

        if let Some(owner) = from_apps.first() {
            self.node_mut(into)
                .meta
                .insert(owner.name().to_string(), Value::Object(from_meta));
        }
        self.node_mut(into).apps.extend(from_apps);

        for child in from_children {
            self.node_mut(child).parent = None;
            self.append_child(into, child)?;
        }

        // Re-point the former parent's child reference when the absorbing
        // side was rootless.
        if self.nodes[into.0].parent.is_none() {
            if let Some(parent) = from_parent {
                if let Some(slot) = self
                    .nodes[parent.0]
                    .children
                    .iter()
                    .position(|&c| c == from)
                {
                    self.node_mut(parent).children[slot] = into;
                    self.node_mut(into).parent = Some(parent);
                }
            }
        }

        Ok(into)
    }

    /// Attach `child` under `parent`, merging with a same-path sibling if
    /// one exists and keeping wildcard children last.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ConfigError> {
        let path = self.nodes[child.0].path.clone();
        if let Some(&existing) = self.nodes[parent.0]
            .children
            .iter()
            .find(|&&c| self.nodes[c.0].path == path)
        {
            self.merge_nodes(existing, child)?;
            return Ok(());
        }

        self.node_mut(child).parent = Some(parent);
        let insert_at = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| self.nodes[c.0].is_wildcard())
            .unwrap_or(self.nodes[parent.0].children.len());
        self.node_mut(parent).children.insert(insert_at, child);
        Ok(())
    }

    /// Full path of a node: concatenation of ancestor paths.
    pub fn full_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            segments.push(self.nodes[c.0].path.as_str());
            cursor = self.nodes[c.0].parent;
        }
        segments.reverse();
        let mut full = String::new();
        for segment in segments {
            if segment != "/" {
                full.push_str(segment);
            }
        }
        if full.is_empty() {
            full.push('/');
        }
        full
    }

    /// Depth-first pre-order flattening: ancestor before descendant,
    /// non-wildcard before wildcard.
    pub fn flatten(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let (normal, wildcard): (Vec<NodeId>, Vec<NodeId>) = self
            .roots
            .iter()
            .copied()
            .partition(|&id| !self.nodes[id.0].is_wildcard());
        for root in normal.into_iter().chain(wildcard) {
            self.visit(root, &mut out);
        }
        out
    }

    fn visit(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in &self.nodes[id.0].children {
            self.visit(child, out);
        }
    }
}

fn validate_config(config: &RouteConfig, is_child: bool) -> Result<(), ConfigError> {
    let path = normalize_path(&config.path);
    if config.is_root_fragment && is_child {
        return Err(ConfigError::InvalidRouteOption(path, "is_root_fragment on a child route"));
    }
    if config.is_fragment {
        for key in [META_PARENT_APP, META_PARENT_CONTAINER] {
            let present = config.meta.get(key).and_then(Value::as_str).is_some();
            if !present {
                return Err(ConfigError::MissingFragmentMeta(path, key));
            }
        }
        if config.slot.is_some() {
            return Err(ConfigError::InvalidRouteOption(path, "slot"));
        }
        if !config.children.is_empty() {
            return Err(ConfigError::InvalidRouteOption(path, "children"));
        }
        if config.path_options.is_some() {
            return Err(ConfigError::InvalidRouteOption(path, "path_options"));
        }
    }
    if config.is_root_fragment {
        if config.slot.is_some() {
            return Err(ConfigError::InvalidRouteOption(path, "slot"));
        }
        if !config.children.is_empty() {
            return Err(ConfigError::InvalidRouteOption(path, "children"));
        }
    }
    Ok(())
}

/// Normalize a declared path: leading slash, no trailing slash (except `/`).
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let mut normalized = String::from("/");
    normalized.push_str(trimmed.trim_matches('/'));
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
