//! Route-list diffing primitives.

use crate::app::AppHandle;
use crate::route::matched::MatchedRoute;

/// First position at which the persisted and target route lists diverge.
///
/// Returns the list length when the lists are fully equal, and `0` when the
/// shared prefix matches entirely but the lengths differ: a depth change
/// tears down and rebuilds the whole chain.
pub fn mismatch_index(current: &[MatchedRoute], target: &[MatchedRoute]) -> usize {
    let shared = current.len().min(target.len());
    let mut index = 0;
    while index < shared && current[index].same_route(&target[index]) {
        index += 1;
    }
    if index == shared && current.len() != target.len() {
        return 0;
    }
    index
}

/// Fragment apps present on `current` but absent from `target`. A `None`
/// target removes every fragment app (the position is being torn down).
pub fn removed_fragment_apps(
    current: &MatchedRoute,
    target: Option<&MatchedRoute>,
) -> Vec<AppHandle> {
    current
        .fragment_apps()
        .iter()
        .filter(|app| {
            target.map_or(true, |t| {
                !t.fragment_apps().iter().any(|ta| ta.name() == app.name())
            })
        })
        .cloned()
        .collect()
}

/// Fragment apps `target` needs that `persisted` does not already hold.
/// A `None` persisted route needs every fragment app mounted.
pub fn missing_fragment_apps(
    target: &MatchedRoute,
    persisted: Option<&MatchedRoute>,
) -> Vec<AppHandle> {
    target
        .fragment_apps()
        .iter()
        .filter(|app| {
            persisted.map_or(true, |p| !p.apps.iter().any(|pa| pa.name() == app.name()))
        })
        .cloned()
        .collect()
}

/// Routes in `current` with no equal counterpart in `target`.
pub fn removed_routes(current: &[MatchedRoute], target: &[MatchedRoute]) -> Vec<MatchedRoute> {
    current
        .iter()
        .filter(|c| !target.iter().any(|t| t.same_route(c)))
        .cloned()
        .collect()
}
