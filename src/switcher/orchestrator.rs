//! Orchestrator: registration, startup, and navigation.
//!
//! # Responsibilities
//! - Own the application registry and the route forest
//! - Compile the forest once at `start()` and install the default taps
//! - Drive a navigation through match → before-switch → load → render →
//!   after-switch, cancelling the previous navigation first
//!
//! # Design Decisions
//! - Registration is closed after `start()`; the compiled matcher is
//!   immutable so navigations need no registry lock
//! - Last navigation wins: starting a new one cancels the previous token,
//!   and a cancelled navigation resolves to `Ok(false)`, not an error
//! - The async pipelines live behind `tokio::sync::Mutex` so a superseded
//!   navigation drains out before the next one enters the same stage

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

use crate::app::timeout::resolve_timeouts;
use crate::app::{AppHandle, AppStatus, Application, ApplicationSpec};
use crate::config::schema::{AppTimeoutOverrides, OrchestratorConfig};
use crate::error::{ConfigError, Result};
use crate::hooks::{AsyncPipeline, SyncPipeline, TapOptions};
use crate::host::{ContainerController, ResourceLoader, Sandbox};
use crate::render::renderer::Renderer;
use crate::render::state::RouteStateStore;
use crate::route::config::RouteConfig;
use crate::route::matched::MatchedRoute;
use crate::route::matcher::RouteMatcher;
use crate::route::node::RouteArena;
use crate::switcher::context::{
    MatchContext, NavigationToken, SwitcherContext, SwitcherStatus,
};
use crate::switcher::loader::Loader;

/// One application's registration: its name, declared routes, props, and
/// optional per-app collaborators and timeout overrides.
#[derive(Default)]
pub struct AppRegistration {
    pub name: String,
    pub routes: Vec<RouteConfig>,
    pub props: Value,
    /// Overrides the orchestrator-wide loader for this application.
    pub loader: Option<Arc<dyn ResourceLoader>>,
    pub timeouts: AppTimeoutOverrides,
}

/// The central coordinator. Register applications, `start()`, then drive
/// navigations with `reroute()`.
pub struct Orchestrator {
    config: OrchestratorConfig,
    apps: HashMap<String, AppHandle>,
    arena: RouteArena,
    matcher: Option<Arc<RouteMatcher>>,
    state: Arc<RouteStateStore>,
    started: bool,

    loader: Option<Arc<dyn ResourceLoader>>,
    container: Option<Arc<dyn ContainerController>>,
    sandbox: Option<Arc<dyn Sandbox>>,

    match_pipeline: StdMutex<SyncPipeline<MatchContext>>,
    before_switch: TokioMutex<AsyncPipeline<SwitcherContext>>,
    load_pipeline: TokioMutex<AsyncPipeline<SwitcherContext>>,
    render_pipeline: TokioMutex<AsyncPipeline<SwitcherContext>>,
    after_switch: TokioMutex<AsyncPipeline<SwitcherContext>>,

    current_navigation: StdMutex<Option<Arc<NavigationToken>>>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Orchestrator {
        Orchestrator {
            config,
            apps: HashMap::new(),
            arena: RouteArena::new(),
            matcher: None,
            state: Arc::new(RouteStateStore::new()),
            started: false,
            loader: None,
            container: None,
            sandbox: None,
            match_pipeline: StdMutex::new(SyncPipeline::new()),
            before_switch: TokioMutex::new(AsyncPipeline::new()),
            load_pipeline: TokioMutex::new(AsyncPipeline::new()),
            render_pipeline: TokioMutex::new(AsyncPipeline::new()),
            after_switch: TokioMutex::new(AsyncPipeline::new()),
            current_navigation: StdMutex::new(None),
        }
    }

    /// Default loader for applications registered without their own.
    pub fn with_resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Container controller shared by every application.
    pub fn with_container_controller(mut self, container: Arc<dyn ContainerController>) -> Self {
        self.container = Some(container);
        self
    }

    /// Sandbox wrapped around every application's mount window.
    pub fn with_sandbox(mut self, sandbox: Arc<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Register an application and its routes. Names are unique keys;
    /// registration closes at `start()`.
    pub fn register_app(&mut self, registration: AppRegistration) -> Result<()> {
        if self.started {
            return Err(ConfigError::AlreadyStarted.into());
        }
        if self.apps.contains_key(&registration.name) {
            return Err(ConfigError::DuplicateApp(registration.name).into());
        }

        let timeouts = resolve_timeouts(&self.config.timeouts, &registration.timeouts);
        let app: AppHandle = Arc::new(Application::new(ApplicationSpec {
            name: registration.name.clone(),
            props: registration.props,
            loader: registration.loader.or_else(|| self.loader.clone()),
            sandbox: self.sandbox.clone(),
            container: self.container.clone(),
            timeouts,
        }));

        for route in registration.routes {
            self.arena.add_route(route, &app)?;
        }
        tracing::info!(app = %registration.name, "application registered");
        self.apps.insert(registration.name, app);
        Ok(())
    }

    /// Merge the route forest, compile the matcher, and install the default
    /// match/load/render taps. Idempotent only in failure: a successful start
    /// closes registration for good.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(ConfigError::AlreadyStarted.into());
        }

        self.arena.merge_forest()?;
        let arena = std::mem::take(&mut self.arena);
        let matcher = Arc::new(RouteMatcher::build(arena)?);
        self.matcher = Some(matcher.clone());

        {
            let mut pipeline = lock(&self.match_pipeline);
            let matcher = matcher.clone();
            pipeline.tap(
                "match-route",
                move |ctx: &mut MatchContext| {
                    ctx.matched = matcher.match_path(&ctx.path, &ctx.query);
                    Ok(())
                },
                TapOptions::default(),
            )?;
        }
        Loader::install(self.load_pipeline.get_mut())?;
        let renderer = Arc::new(Renderer::new(self.state.clone(), self.container.clone()));
        renderer.install(self.render_pipeline.get_mut())?;

        self.started = true;
        tracing::info!(apps = self.apps.len(), "orchestrator started");
        Ok(())
    }

    /// Navigate to a URL path. Returns `Ok(true)` when this navigation ran
    /// to completion and `Ok(false)` when a newer navigation superseded it.
    ///
    /// A `path` containing `?` is split into path and query when no explicit
    /// query is given.
    pub async fn reroute(&self, path: &str, query: &str) -> Result<bool> {
        if !self.started {
            return Err(ConfigError::NotStarted.into());
        }
        let (path, query) = match (path.split_once('?'), query.is_empty()) {
            (Some((p, q)), true) => (p, q),
            _ => (path, query),
        };

        let token = NavigationToken::new();
        if let Some(previous) = lock(&self.current_navigation).replace(token.clone()) {
            previous.cancel();
        }
        tracing::info!(path, "navigation started");

        let matched = {
            let mut pipeline = lock(&self.match_pipeline);
            let mut ctx = MatchContext {
                path: path.to_string(),
                query: query.to_string(),
                ..Default::default()
            };
            pipeline.call(&mut ctx)?;
            ctx.matched
        };

        let mut ctx = SwitcherContext::new(matched, token);
        match self.run_switch(&mut ctx).await {
            Ok(()) => {
                ctx.status = SwitcherStatus::Done;
                tracing::info!(path, "navigation finished");
                Ok(true)
            }
            Err(e) if e.is_cancelled() => {
                ctx.status = SwitcherStatus::Cancelled;
                tracing::debug!(path, "navigation superseded");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_switch(&self, ctx: &mut SwitcherContext) -> Result<()> {
        ctx.token.ensure_active()?;
        self.before_switch.lock().await.call(ctx).await?;

        ctx.token.ensure_active()?;
        ctx.status = SwitcherStatus::Loading;
        self.load_pipeline.lock().await.call(ctx).await?;

        ctx.token.ensure_active()?;
        ctx.status = SwitcherStatus::Rendering;
        self.render_pipeline.lock().await.call(ctx).await?;

        ctx.token.ensure_active()?;
        self.after_switch.lock().await.call(ctx).await
    }

    /// Register a custom tap ahead of the load stage.
    pub fn tap_before_switch<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: for<'a> Fn(&'a mut SwitcherContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.before_switch.get_mut().tap(name, callback, options)
    }

    /// Register a custom tap on the load pipeline (the default tap is named
    /// "load-apps").
    pub fn tap_load<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: for<'a> Fn(&'a mut SwitcherContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.load_pipeline.get_mut().tap(name, callback, options)
    }

    /// Register a custom tap on the render pipeline. The default taps are
    /// "unmount-apps", "unmount-root-fragments", "mount-apps", and
    /// "mount-root-fragments", usable as `before`/`after` anchors.
    pub fn tap_render<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: for<'a> Fn(&'a mut SwitcherContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.render_pipeline.get_mut().tap(name, callback, options)
    }

    /// Register a custom tap after the render stage.
    pub fn tap_after_switch<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: for<'a> Fn(&'a mut SwitcherContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.after_switch.get_mut().tap(name, callback, options)
    }

    /// Register a custom tap on the synchronous match pipeline (the default
    /// tap is named "match-route").
    pub fn tap_match<F>(&mut self, name: &str, callback: F, options: TapOptions) -> Result<()>
    where
        F: Fn(&mut MatchContext) -> Result<()> + Send + Sync + 'static,
    {
        lock(&self.match_pipeline).tap(name, callback, options)
    }

    /// Currently mounted normal routes, ancestor first.
    pub fn current_routes(&self) -> Vec<MatchedRoute> {
        self.state.current_routes()
    }

    /// Currently mounted root-fragment routes.
    pub fn current_root_fragments(&self) -> Vec<MatchedRoute> {
        self.state.current_root_fragments()
    }

    /// Status of a registered application.
    pub fn app_status(&self, name: &str) -> Option<AppStatus> {
        self.apps.get(name).map(|app| app.status())
    }
}
