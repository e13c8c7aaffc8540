//! Persistent route state between navigations.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::AppHandle;
use crate::route::matched::MatchedRoute;

/// What is currently mounted.
#[derive(Debug, Clone, Default)]
pub struct RouteState {
    /// Ordered list of currently-mounted normal routes, parallel in shape
    /// to a target `MatchedResult::routes`.
    pub current_routes: Vec<MatchedRoute>,

    /// Currently-mounted root fragment routes.
    pub current_root_fragments: Vec<MatchedRoute>,
}

/// Store for [`RouteState`]. Mutated exclusively by the renderer, after the
/// corresponding unmount/mount step completed. Routes are cloned on the way
/// in and out so callers never alias matcher-internal structures.
#[derive(Debug, Default)]
pub struct RouteStateStore {
    inner: Mutex<RouteState>,
}

fn lock(store: &RouteStateStore) -> MutexGuard<'_, RouteState> {
    store.inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RouteStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_routes(&self) -> Vec<MatchedRoute> {
        lock(self).current_routes.clone()
    }

    pub fn current_root_fragments(&self) -> Vec<MatchedRoute> {
        lock(self).current_root_fragments.clone()
    }

    pub fn route_at(&self, index: usize) -> Option<MatchedRoute> {
        lock(self).current_routes.get(index).cloned()
    }

    pub fn route_count(&self) -> usize {
        lock(self).current_routes.len()
    }

    pub(crate) fn remove_route_at(&self, index: usize) {
        let mut state = lock(self);
        if index < state.current_routes.len() {
            state.current_routes.remove(index);
        }
    }

    pub(crate) fn remove_fragment_apps(&self, index: usize, names: &[String]) {
        let mut state = lock(self);
        if let Some(route) = state.current_routes.get_mut(index) {
            route
                .apps
                .retain(|app| !names.iter().any(|n| n == app.name()));
        }
    }

    pub(crate) fn push_route(&self, route: MatchedRoute) {
        lock(self).current_routes.push(route);
    }

    pub(crate) fn add_fragment_app(&self, index: usize, app: AppHandle) {
        let mut state = lock(self);
        if let Some(route) = state.current_routes.get_mut(index) {
            if !route.apps.iter().any(|a| a.name() == app.name()) {
                route.apps.push(app);
            }
        }
    }

    pub(crate) fn push_root_fragment(&self, route: MatchedRoute) {
        lock(self).current_root_fragments.push(route);
    }

    pub(crate) fn remove_root_fragment(&self, route: &MatchedRoute) {
        lock(self)
            .current_root_fragments
            .retain(|r| !r.same_route(route));
    }

    /// Drop everything. For hosts that tear down and rebuild a shell.
    pub fn reset(&self) {
        *lock(self) = RouteState::default();
    }
}
