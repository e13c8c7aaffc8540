//! Per-navigation shared state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::AppHandle;
use crate::error::{Error, Result};
use crate::hooks::{PipelineContext, PipelineControls};
use crate::route::matched::MatchedResult;

/// Cooperative cancellation marker for one navigation. The orchestrator
/// cancels the previous token when a new navigation starts; in-flight work
/// checks the token between lifecycle steps and stops at the next check.
#[derive(Debug, Default)]
pub struct NavigationToken {
    cancelled: AtomicBool,
}

impl NavigationToken {
    pub fn new() -> Arc<NavigationToken> {
        Arc::new(NavigationToken::default())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Errors with the cancellation marker once a newer navigation took over.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where a navigation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitcherStatus {
    Init,
    Loading,
    Rendering,
    Done,
    Cancelled,
}

/// Context for the synchronous match pipeline. The default match tap fills
/// `matched`; custom taps may rewrite the path beforehand or the result
/// afterwards.
#[derive(Default)]
pub struct MatchContext {
    pub path: String,
    pub query: String,
    pub matched: MatchedResult,
    pub controls: PipelineControls,
}

impl PipelineContext for MatchContext {
    fn controls(&mut self) -> &mut PipelineControls {
        &mut self.controls
    }
}

/// Context threaded through the before-switch, load, render, and
/// after-switch pipelines of one navigation.
pub struct SwitcherContext {
    /// The match result driving this navigation.
    pub matched: MatchedResult,

    /// Applications to load, grouped by route position (ancestor first) with
    /// root-fragment apps as a trailing group. Groups load sequentially, the
    /// apps within a group in parallel. Each app appears once.
    pub apps_to_load: Vec<Vec<AppHandle>>,

    pub status: SwitcherStatus,
    pub token: Arc<NavigationToken>,
    pub controls: PipelineControls,
}

impl SwitcherContext {
    pub fn new(matched: MatchedResult, token: Arc<NavigationToken>) -> SwitcherContext {
        let apps_to_load = load_groups(&matched);
        SwitcherContext {
            matched,
            apps_to_load,
            status: SwitcherStatus::Init,
            token,
            controls: PipelineControls::default(),
        }
    }
}

impl PipelineContext for SwitcherContext {
    fn controls(&mut self) -> &mut PipelineControls {
        &mut self.controls
    }
}

fn load_groups(matched: &MatchedResult) -> Vec<Vec<AppHandle>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    for route in &matched.routes {
        let group: Vec<AppHandle> = route
            .apps
            .iter()
            .filter(|app| seen.insert(app.name().to_string()))
            .cloned()
            .collect();
        if !group.is_empty() {
            groups.push(group);
        }
    }

    let fragments: Vec<AppHandle> = matched
        .fragment_routes
        .iter()
        .filter_map(|route| route.main_app())
        .filter(|app| seen.insert(app.name().to_string()))
        .cloned()
        .collect();
    if !fragments.is_empty() {
        groups.push(fragments);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::app_handle;
    use crate::route::matched::MatchedRoute;

    fn matched(full_path: &str, apps: &[&str]) -> MatchedRoute {
        MatchedRoute {
            path: full_path.to_string(),
            full_path: full_path.to_string(),
            apps: apps.iter().map(|a| app_handle(a)).collect(),
            params: Default::default(),
            query: Default::default(),
            meta: Default::default(),
        }
    }

    fn names(groups: &[Vec<AppHandle>]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.iter().map(|a| a.name()).collect())
            .collect()
    }

    #[test]
    fn test_load_groups_by_position_with_fragment_tail() {
        let result = MatchedResult {
            routes: vec![matched("/a", &["a", "f1"]), matched("/a/b", &["b"])],
            fragment_routes: vec![matched("/(.*)", &["banner"])],
        };
        let groups = load_groups(&result);
        assert_eq!(names(&groups), vec![vec!["a", "f1"], vec!["b"], vec!["banner"]]);
    }

    #[test]
    fn test_load_groups_dedup_across_positions() {
        // A slot-owning app also matching a descendant position loads once.
        let result = MatchedResult {
            routes: vec![matched("/a", &["a"]), matched("/a/b", &["a", "f1"])],
            fragment_routes: vec![matched("/(.*)", &["f1"])],
        };
        let groups = load_groups(&result);
        assert_eq!(names(&groups), vec![vec!["a"], vec!["f1"]]);
    }

    #[test]
    fn test_token_cancellation() {
        let token = NavigationToken::new();
        assert!(token.ensure_active().is_ok());
        token.cancel();
        assert!(token.ensure_active().unwrap_err().is_cancelled());
    }
}
