//! Route lookup.
//!
//! # Responsibilities
//! - Compile the merged forest into a flat, ordered candidate list
//! - Match a path + query: first candidate wins, then the matched node's
//!   ancestor chain is projected into an ordered MatchedRoute list
//! - Match root fragments independently; every match is returned
//!
//! # Design Decisions
//! - Immutable after construction
//! - Linear scan in pre-order: ancestors and specific routes are tested
//!   before wildcards, so "first match wins" is also "most specific wins"
//! - No match is an empty result, not an error

use std::collections::HashMap;

use url::form_urlencoded;

use crate::error::ConfigError;
use crate::route::matched::{MatchedResult, MatchedRoute};
use crate::route::node::{NodeId, RouteArena};
use crate::route::pattern::CompiledPattern;
use crate::route::META_PARENT_APP;

struct CandidateRoute {
    id: NodeId,
    full_path: String,
    pattern: CompiledPattern,
}

/// Compiled, immutable view of the merged route forest.
pub struct RouteMatcher {
    arena: RouteArena,
    candidates: Vec<CandidateRoute>,
    fragment_candidates: Vec<CandidateRoute>,
}

impl RouteMatcher {
    /// Compile a merged arena. Pattern compilation failures are fatal
    /// configuration errors.
    pub fn build(arena: RouteArena) -> Result<RouteMatcher, ConfigError> {
        let mut candidates = Vec::new();
        for id in arena.flatten() {
            let full_path = arena.full_path(id);
            let pattern = CompiledPattern::compile(&full_path, arena.node(id).path_options)?;
            candidates.push(CandidateRoute {
                id,
                full_path,
                pattern,
            });
        }

        let mut fragment_candidates = Vec::new();
        for &id in arena.root_fragments() {
            let full_path = arena.full_path(id);
            let pattern = CompiledPattern::compile(&full_path, arena.node(id).path_options)?;
            fragment_candidates.push(CandidateRoute {
                id,
                full_path,
                pattern,
            });
        }

        Ok(RouteMatcher {
            arena,
            candidates,
            fragment_candidates,
        })
    }

    /// Match a URL path and raw query string against the forest.
    pub fn match_path(&self, path: &str, query: &str) -> MatchedResult {
        let query_map = parse_query(query);
        let mut result = MatchedResult::default();

        for candidate in &self.candidates {
            let Some(params) = candidate.pattern.match_path(path) else {
                continue;
            };
            tracing::debug!(path, matched = %candidate.full_path, "route matched");
            result.routes = self.project_chain(candidate.id, &params, &query_map);
            break;
        }

        for candidate in &self.fragment_candidates {
            if let Some(params) = candidate.pattern.match_path(path) {
                result
                    .fragment_routes
                    .push(self.project(candidate.id, &params, &query_map));
            }
        }

        annotate_parent_apps(&mut result.routes);
        result
    }

    /// Walk up the matched node's ancestor chain, projecting each node into
    /// a MatchedRoute, ancestor first.
    fn project_chain(
        &self,
        id: NodeId,
        params: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Vec<MatchedRoute> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            chain.push(c);
            cursor = self.arena.node(c).parent;
        }
        chain.reverse();
        chain
            .into_iter()
            .map(|nid| self.project(nid, params, query))
            .collect()
    }

    fn project(
        &self,
        id: NodeId,
        params: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> MatchedRoute {
        let node = self.arena.node(id);
        MatchedRoute {
            path: node.path.clone(),
            full_path: self.arena.full_path(id),
            apps: node.apps.clone(),
            params: params.clone(),
            query: query.clone(),
            meta: node.meta.clone(),
        }
    }
}

/// For every adjacent pair whose main app differs, record the ancestor's
/// main app on the descendant. Used downstream to resolve default mount
/// containers. Explicitly configured values win.
fn annotate_parent_apps(routes: &mut [MatchedRoute]) {
    for i in 1..routes.len() {
        let parent_name = match routes[i - 1].main_app() {
            Some(app) => app.name().to_string(),
            None => continue,
        };
        let differs = routes[i]
            .main_app()
            .map_or(true, |app| app.name() != parent_name);
        if differs && !routes[i].meta.contains_key(META_PARENT_APP) {
            routes[i]
                .meta
                .insert(META_PARENT_APP.to_string(), parent_name.into());
        }
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::app_handle;
    use crate::route::config::RouteConfig;
    use serde_json::{json, Value};

    fn build(routes: Vec<(&str, RouteConfig)>) -> RouteMatcher {
        let mut arena = RouteArena::new();
        for (app, config) in routes {
            arena.add_route(config, &app_handle(app)).unwrap();
        }
        arena.merge_forest().unwrap();
        RouteMatcher::build(arena).unwrap()
    }

    fn route(path: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ancestor_chain_ordering() {
        let mut parent = route("/a");
        parent.children.push(route("/b"));
        let matcher = build(vec![("a", parent)]);

        let result = matcher.match_path("/a/b/", "");
        let paths: Vec<_> = result.routes.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/a/b"]);
    }

    #[test]
    fn test_params_and_query() {
        let matcher = build(vec![("a", route("/path1/:id"))]);
        let result = matcher.match_path("/path1/42/", "tab=info&x=%20y");
        let matched = &result.routes[0];
        assert_eq!(matched.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(matched.query.get("tab").map(String::as_str), Some("info"));
        assert_eq!(matched.query.get("x").map(String::as_str), Some(" y"));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let matcher = build(vec![("a", route("/a"))]);
        let result = matcher.match_path("/zzz", "");
        assert!(result.is_empty());
    }

    #[test]
    fn test_specific_route_beats_wildcard() {
        let mut parent = route("/p");
        parent.children.push(route("/(.*)"));
        parent.children.push(route("/x"));
        let matcher = build(vec![("a", parent)]);

        let result = matcher.match_path("/p/x", "");
        assert_eq!(result.routes.last().unwrap().full_path, "/p/x");

        let result = matcher.match_path("/p/other/deep", "");
        assert_eq!(
            result
                .routes
                .last()
                .unwrap()
                .params
                .get("pathMatch")
                .map(String::as_str),
            Some("other/deep")
        );
    }

    #[test]
    fn test_all_root_fragments_match() {
        let mut banner = route("/(.*)");
        banner.is_root_fragment = true;
        let mut badge = route("/a");
        badge.is_root_fragment = true;

        let matcher = build(vec![
            ("main", route("/a")),
            ("banner", banner),
            ("badge", badge),
        ]);

        let result = matcher.match_path("/a", "");
        assert_eq!(result.routes.len(), 1);
        let names: Vec<_> = result
            .fragment_routes
            .iter()
            .map(|r| r.main_app().unwrap().name())
            .collect();
        assert_eq!(names, vec!["banner", "badge"]);
    }

    #[test]
    fn test_parent_app_bookkeeping() {
        let mut parent = RouteConfig {
            slot: Some("s".into()),
            ..route("/a")
        };
        parent.meta.insert("unrelated".into(), json!(true));
        let child = RouteConfig {
            fill: Some("s".into()),
            ..route("/b")
        };

        let matcher = build(vec![("parent", parent), ("child", child)]);
        let result = matcher.match_path("/a/b", "");
        assert_eq!(result.routes.len(), 2);
        assert!(result.routes[0].meta.get(META_PARENT_APP).is_none());
        assert_eq!(
            result.routes[1].meta.get(META_PARENT_APP).and_then(Value::as_str),
            Some("parent")
        );
    }

    #[test]
    fn test_first_match_wins_across_roots() {
        let matcher = build(vec![("a", route("/x/:id")), ("b", route("/x/fixed"))]);
        // "/x/:id" was registered first and also matches "/x/fixed".
        let result = matcher.match_path("/x/fixed", "");
        assert_eq!(result.routes[0].main_app().unwrap().name(), "a");
    }
}
