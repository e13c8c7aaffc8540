//! Diff-and-patch execution.
//!
//! # Responsibilities
//! - Compute which applications to unmount/mount for a navigation
//! - Execute unmounts descendant-first, then mounts ancestor-first
//! - Update the persisted route state after each completed step
//!
//! # Design Decisions
//! - The mismatch index is the single pivot: positions below it keep their
//!   main app and only diff fragment apps; positions at or above it are
//!   torn down entirely
//! - A main app shared with the adjacent position is never unmounted or
//!   remounted; the route entry is still removed/appended so the persisted
//!   list mirrors the mounted tree
//! - Fragment apps at one position form a parallel group; route positions
//!   are strictly sequential

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;

use crate::app::AppHandle;
use crate::error::{Error, Result};
use crate::hooks::{AsyncPipeline, TapOptions};
use crate::host::{ContainerController, ElementHandle};
use crate::render::diff;
use crate::render::state::RouteStateStore;
use crate::route::matched::MatchedRoute;
use crate::route::META_PARENT_CONTAINER;
use crate::switcher::context::SwitcherContext;

/// Executes the route-state diff for one navigation.
pub struct Renderer {
    state: Arc<RouteStateStore>,
    container: Option<Arc<dyn ContainerController>>,
}

impl Renderer {
    pub fn new(
        state: Arc<RouteStateStore>,
        container: Option<Arc<dyn ContainerController>>,
    ) -> Renderer {
        Renderer { state, container }
    }

    /// Register the renderer's default taps on the render pipeline.
    pub fn install(self: &Arc<Self>, pipeline: &mut AsyncPipeline<SwitcherContext>) -> Result<()> {
        macro_rules! install_tap {
            ($name:literal, $method:ident) => {{
                let renderer = self.clone();
                pipeline.tap(
                    $name,
                    move |ctx: &mut SwitcherContext| {
                        let renderer = renderer.clone();
                        Box::pin(async move { renderer.$method(ctx).await })
                    },
                    TapOptions::default(),
                )?;
            }};
        }
        install_tap!("unmount-apps", unmount_apps);
        install_tap!("unmount-root-fragments", unmount_root_fragments);
        install_tap!("mount-apps", mount_apps);
        install_tap!("mount-root-fragments", mount_root_fragments);
        Ok(())
    }

    /// Reverse sweep over the persisted routes: diff fragment apps below
    /// the mismatch index, tear everything down at or above it.
    async fn unmount_apps(&self, ctx: &mut SwitcherContext) -> Result<()> {
        let current = self.state.current_routes();
        let target = &ctx.matched.routes;
        let pivot = diff::mismatch_index(&current, target);
        tracing::debug!(
            pivot,
            current = current.len(),
            target = target.len(),
            "unmount sweep"
        );

        for i in (0..current.len()).rev() {
            ctx.token.ensure_active()?;
            let route = &current[i];
            let surviving = if i < pivot { target.get(i) } else { None };

            let removed = diff::removed_fragment_apps(route, surviving);
            if !removed.is_empty() {
                let (done, failure) = self.unmount_group(route, &removed).await;
                if !done.is_empty() {
                    self.state.remove_fragment_apps(i, &done);
                }
                if let Some(e) = failure {
                    return Err(e);
                }
            }

            if i >= pivot {
                let previous_main = if i == 0 {
                    None
                } else {
                    current[i - 1].main_app().map(|a| a.name().to_string())
                };
                if let Some(main) = route.main_app() {
                    if previous_main.as_deref() != Some(main.name()) {
                        main.unmount(Some(route.clone())).await?;
                    }
                }
                // The entry goes regardless: its main app may be shared
                // with a surviving ancestor and stay mounted.
                self.state.remove_route_at(i);
            }
        }
        Ok(())
    }

    /// Unmount root fragments with no counterpart in the new match.
    async fn unmount_root_fragments(&self, ctx: &mut SwitcherContext) -> Result<()> {
        let current = self.state.current_root_fragments();
        let stale = diff::removed_routes(&current, &ctx.matched.fragment_routes);
        if stale.is_empty() {
            return Ok(());
        }
        ctx.token.ensure_active()?;

        let futures: Vec<_> = stale
            .iter()
            .map(|route| {
                let route = route.clone();
                async move {
                    match route.main_app().cloned() {
                        Some(app) => app.unmount(Some(route)).await,
                        None => Ok(()),
                    }
                }
            })
            .collect();
        let results = join_all(futures).await;
        for (route, result) in stale.iter().zip(results) {
            result?;
            self.state.remove_root_fragment(route);
        }
        Ok(())
    }

    /// Forward sweep over the target routes: fill fragment apps at
    /// surviving positions, build new positions from the mismatch onward.
    async fn mount_apps(&self, ctx: &mut SwitcherContext) -> Result<()> {
        let target = ctx.matched.routes.clone();
        for (i, route) in target.iter().enumerate() {
            ctx.token.ensure_active()?;
            match self.state.route_at(i) {
                Some(persisted) => {
                    let missing = diff::missing_fragment_apps(route, Some(&persisted));
                    self.mount_fragment_group(i, route, missing).await?;
                }
                None => {
                    let previous_main = if i == 0 {
                        None
                    } else {
                        target[i - 1].main_app().map(|a| a.name().to_string())
                    };
                    if let Some(main) = route.main_app() {
                        if previous_main.as_deref() != Some(main.name()) {
                            self.mount_main_app(main, route).await?;
                        }
                    }
                    // Appended even without a fresh mount: the shared
                    // ancestor app covers this position.
                    self.state.push_route(route.with_main_only());
                    let missing = diff::missing_fragment_apps(route, None);
                    self.mount_fragment_group(i, route, missing).await?;
                }
            }
        }
        Ok(())
    }

    /// Mount root fragments that are matched but not yet mounted.
    async fn mount_root_fragments(&self, ctx: &mut SwitcherContext) -> Result<()> {
        let current = self.state.current_root_fragments();
        let pending: Vec<MatchedRoute> = ctx
            .matched
            .fragment_routes
            .iter()
            .filter(|t| !current.iter().any(|c| c.same_route(t)))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        ctx.token.ensure_active()?;

        let futures: Vec<_> = pending
            .iter()
            .map(|route| {
                let route = route.clone();
                async move {
                    match route.main_app().cloned() {
                        Some(app) => self.mount_main_app(&app, &route).await,
                        None => Ok(()),
                    }
                }
            })
            .collect();
        let results = join_all(futures).await;
        for (route, result) in pending.iter().zip(results) {
            result?;
            self.state.push_root_fragment(route.clone());
        }
        Ok(())
    }

    async fn unmount_group(
        &self,
        route: &MatchedRoute,
        apps: &[AppHandle],
    ) -> (Vec<String>, Option<Error>) {
        let futures: Vec<_> = apps
            .iter()
            .map(|app| {
                let app = app.clone();
                let route = route.clone();
                async move { app.unmount(Some(route)).await }
            })
            .collect();
        let results = join_all(futures).await;

        let mut done = Vec::new();
        let mut failure = None;
        for (app, result) in apps.iter().zip(results) {
            match result {
                Ok(()) => done.push(app.name().to_string()),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        (done, failure)
    }

    async fn mount_fragment_group(
        &self,
        index: usize,
        route: &MatchedRoute,
        apps: Vec<AppHandle>,
    ) -> Result<()> {
        if apps.is_empty() {
            return Ok(());
        }
        let futures: Vec<_> = apps
            .iter()
            .map(|app| {
                let app = app.clone();
                let route = route.clone();
                async move {
                    let container = match fragment_container_name(&route, app.name()) {
                        Some(name) => Some(app.wait_for_child_container(&name).await?),
                        None => None,
                    };
                    app.mount(Some(route), container).await
                }
            })
            .collect();
        let results = join_all(futures).await;

        let mut failure = None;
        for (app, result) in apps.iter().zip(results) {
            match result {
                Ok(()) => self.state.add_fragment_app(index, app.clone()),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn mount_main_app(&self, app: &AppHandle, route: &MatchedRoute) -> Result<()> {
        let container = self.resolve_main_container(app, route).await?;
        app.mount(Some(route.clone()), container).await
    }

    async fn resolve_main_container(
        &self,
        app: &AppHandle,
        route: &MatchedRoute,
    ) -> Result<Option<ElementHandle>> {
        if let Some(name) = route.meta.get(META_PARENT_CONTAINER).and_then(Value::as_str) {
            return Ok(Some(app.wait_for_child_container(name).await?));
        }
        let Some(controller) = &self.container else {
            return Ok(None);
        };
        let element = controller.create_element(app.name()).await?;
        if !controller.render(app.name(), element.clone())? {
            return Err(Error::Host(format!(
                "no mount container found for application '{}'",
                app.name()
            )));
        }
        Ok(Some(element))
    }
}

/// Resolve the container a fragment app mounts into. Merged fragments keep
/// their meta namespaced under their app name; an unmerged fragment node
/// carries the keys at the top level.
fn fragment_container_name(route: &MatchedRoute, app_name: &str) -> Option<String> {
    route
        .meta
        .get(app_name)
        .and_then(Value::as_object)
        .and_then(|scoped| scoped.get(META_PARENT_CONTAINER))
        .and_then(Value::as_str)
        .or_else(|| route.meta.get(META_PARENT_CONTAINER).and_then(Value::as_str))
        .map(str::to_string)
}
