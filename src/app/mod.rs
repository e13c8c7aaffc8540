//! Application state machine.
//!
//! # States
//! ```text
//! NotLoaded → LoadingSourceCode → NotMounted → Mounting → Mounted
//!                                     ↑                      │
//!                                     └──── Unmounting ←─────┘
//!
//! LoadingSourceCode → LoadError   (loader rejected; retryable)
//! Mounting/Unmounting → Broken    (lifecycle hook rejected; terminal)
//! ```
//!
//! # Design Decisions
//! - One instance per declared application, shared by reference across
//!   every route node that lists it
//! - Status transitions are serialized by callers awaiting completion;
//!   status checks are not locks
//! - Phase tasks are spawned, so a timed-out phase keeps running and may
//!   still flip the status later

pub mod timeout;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::app::timeout::with_phase_timeout;
use crate::config::schema::LifecycleTimeouts;
use crate::error::{ConfigError, Error, Result};
use crate::host::{
    ContainerController, ElementHandle, LifecycleArgs, LifecycleExports, ResourceLoader, Sandbox,
};
use crate::route::matched::MatchedRoute;

/// Shared handle to a registered application.
pub type AppHandle = Arc<Application>;

/// Lifecycle phases, used in timeout policies and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Load,
    Bootstrap,
    Mount,
    Unmount,
    WaitContainer,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LifecyclePhase::Load => "load",
            LifecyclePhase::Bootstrap => "bootstrap",
            LifecyclePhase::Mount => "mount",
            LifecyclePhase::Unmount => "unmount",
            LifecyclePhase::WaitContainer => "wait-container",
        };
        f.write_str(label)
    }
}

/// Application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    NotLoaded,
    LoadingSourceCode,
    NotMounted,
    Mounting,
    Mounted,
    Unmounting,
    LoadError,
    Broken,
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AppStatus::NotLoaded => "NotLoaded",
            AppStatus::LoadingSourceCode => "LoadingSourceCode",
            AppStatus::NotMounted => "NotMounted",
            AppStatus::Mounting => "Mounting",
            AppStatus::Mounted => "Mounted",
            AppStatus::Unmounting => "Unmounting",
            AppStatus::LoadError => "LoadError",
            AppStatus::Broken => "Broken",
        };
        f.write_str(label)
    }
}

/// Everything needed to construct an [`Application`].
pub struct ApplicationSpec {
    pub name: String,
    pub props: Value,
    pub loader: Option<Arc<dyn ResourceLoader>>,
    pub sandbox: Option<Arc<dyn Sandbox>>,
    pub container: Option<Arc<dyn ContainerController>>,
    pub timeouts: LifecycleTimeouts,
}

/// A registered application: name, config, loaded lifecycle exports, and a
/// status tracking the lifecycle state machine.
pub struct Application {
    name: String,
    props: Value,
    loader: Option<Arc<dyn ResourceLoader>>,
    sandbox: Option<Arc<dyn Sandbox>>,
    container: Option<Arc<dyn ContainerController>>,
    timeouts: LifecycleTimeouts,
    status: Mutex<AppStatus>,
    exports: Mutex<Option<Arc<LifecycleExports>>>,
    bootstrapped: AtomicBool,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Application {
    pub fn new(spec: ApplicationSpec) -> Application {
        Application {
            name: spec.name,
            props: spec.props,
            loader: spec.loader,
            sandbox: spec.sandbox,
            container: spec.container,
            timeouts: spec.timeouts,
            status: Mutex::new(AppStatus::NotLoaded),
            exports: Mutex::new(None),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AppStatus {
        *lock(&self.status)
    }

    fn set_status(&self, next: AppStatus) {
        let mut status = lock(&self.status);
        tracing::debug!(app = %self.name, from = %*status, to = %next, "status transition");
        *status = next;
    }

    fn lifecycle_args(
        &self,
        route: Option<MatchedRoute>,
        container: Option<ElementHandle>,
    ) -> LifecycleArgs {
        LifecycleArgs {
            props: self.props.clone(),
            route,
            container,
        }
    }

    /// Load the application's source through its loader.
    ///
    /// `NotLoaded → LoadingSourceCode → NotMounted`, or `LoadError` when the
    /// loader rejects (retryable on a later navigation). A missing loader is
    /// a configuration error and marks the application `Broken`.
    pub async fn load(self: &Arc<Self>) -> Result<()> {
        match self.status() {
            AppStatus::NotLoaded | AppStatus::LoadError => {}
            AppStatus::Broken => {
                return Err(Error::Lifecycle {
                    app: self.name.clone(),
                    phase: LifecyclePhase::Load,
                    message: "application is broken".into(),
                })
            }
            // Already loaded, or a load is in flight that the caller of the
            // current navigation already awaited.
            _ => return Ok(()),
        }

        let Some(loader) = self.loader.clone() else {
            self.set_status(AppStatus::Broken);
            return Err(ConfigError::MissingLoader(self.name.clone()).into());
        };

        self.set_status(AppStatus::LoadingSourceCode);
        let app = self.clone();
        let task = async move {
            match loader.load(&app.name).await {
                Ok(exports) => {
                    *lock(&app.exports) = Some(Arc::new(exports));
                    app.set_status(AppStatus::NotMounted);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(app = %app.name, error = %e, "load failed");
                    app.set_status(AppStatus::LoadError);
                    Err(e)
                }
            }
        };
        self.supervise(LifecyclePhase::Load, self.timeouts.load.clone(), task)
            .await
    }

    /// Mount the application for a matched route.
    ///
    /// `NotMounted → Mounting → Mounted`; a rejected hook marks the
    /// application `Broken`. Runs the exported `bootstrap` hook once, before
    /// the first mount.
    pub async fn mount(
        self: &Arc<Self>,
        route: Option<MatchedRoute>,
        container: Option<ElementHandle>,
    ) -> Result<()> {
        let status = self.status();
        if status != AppStatus::NotMounted {
            return Err(Error::Lifecycle {
                app: self.name.clone(),
                phase: LifecyclePhase::Mount,
                message: format!("mount requires NotMounted, status is {status}"),
            });
        }

        self.set_status(AppStatus::Mounting);
        let app = self.clone();
        let task = async move {
            if let Some(sandbox) = &app.sandbox {
                sandbox.start(&app.name);
            }
            match app.run_mount_hooks(route, container).await {
                Ok(()) => {
                    app.set_status(AppStatus::Mounted);
                    tracing::info!(app = %app.name, "mounted");
                    Ok(())
                }
                Err(e) => {
                    if let Some(sandbox) = &app.sandbox {
                        sandbox.stop(&app.name);
                    }
                    tracing::error!(app = %app.name, error = %e, "mount failed");
                    app.set_status(AppStatus::Broken);
                    Err(e)
                }
            }
        };
        self.supervise(LifecyclePhase::Mount, self.timeouts.mount.clone(), task)
            .await
    }

    async fn run_mount_hooks(
        &self,
        route: Option<MatchedRoute>,
        container: Option<ElementHandle>,
    ) -> Result<()> {
        let exports = lock(&self.exports).clone().ok_or_else(|| Error::Lifecycle {
            app: self.name.clone(),
            phase: LifecyclePhase::Mount,
            message: "application has not been loaded".into(),
        })?;

        if !self.bootstrapped.load(Ordering::Acquire) {
            if let Some(bootstrap) = &exports.bootstrap {
                with_phase_timeout(
                    &self.name,
                    LifecyclePhase::Bootstrap,
                    &self.timeouts.bootstrap,
                    bootstrap(self.lifecycle_args(route.clone(), container.clone())),
                )
                .await?;
            }
            self.bootstrapped.store(true, Ordering::Release);
        }

        if let Some(mount) = &exports.mount {
            mount(self.lifecycle_args(route, container)).await?;
        }
        Ok(())
    }

    /// Unmount the application.
    ///
    /// `Mounted → Unmounting → NotMounted`; a rejected hook marks the
    /// application `Broken`.
    pub async fn unmount(self: &Arc<Self>, route: Option<MatchedRoute>) -> Result<()> {
        let status = self.status();
        if status != AppStatus::Mounted {
            return Err(Error::Lifecycle {
                app: self.name.clone(),
                phase: LifecyclePhase::Unmount,
                message: format!("unmount requires Mounted, status is {status}"),
            });
        }

        self.set_status(AppStatus::Unmounting);
        let app = self.clone();
        let task = async move {
            let exports = lock(&app.exports).clone();
            let result = match exports.as_ref().and_then(|e| e.unmount.as_ref()) {
                Some(unmount) => unmount(app.lifecycle_args(route, None)).await,
                None => Ok(()),
            };
            match result {
                Ok(()) => {
                    if let Some(sandbox) = &app.sandbox {
                        sandbox.stop(&app.name);
                    }
                    app.set_status(AppStatus::NotMounted);
                    tracing::info!(app = %app.name, "unmounted");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(app = %app.name, error = %e, "unmount failed");
                    app.set_status(AppStatus::Broken);
                    Err(e)
                }
            }
        };
        self.supervise(LifecyclePhase::Unmount, self.timeouts.unmount.clone(), task)
            .await
    }

    /// Wait for a named child container to exist, via the external container
    /// controller, under the wait-container timeout policy.
    pub async fn wait_for_child_container(&self, name: &str) -> Result<ElementHandle> {
        let Some(controller) = self.container.clone() else {
            return Err(Error::Host(format!(
                "application '{}' has no container controller to wait on '{name}'",
                self.name
            )));
        };
        with_phase_timeout(
            &self.name,
            LifecyclePhase::WaitContainer,
            &self.timeouts.wait_container,
            controller.wait(name),
        )
        .await
    }

    /// Spawn a phase task and await it under the phase's timeout policy. The
    /// spawned task survives a timed-out await and finishes on its own.
    async fn supervise(
        &self,
        phase: LifecyclePhase,
        policy: crate::config::schema::PhaseTimeout,
        task: impl std::future::Future<Output = Result<()>> + Send + 'static,
    ) -> Result<()> {
        let handle = tokio::spawn(task);
        let name = self.name.clone();
        with_phase_timeout(&self.name, phase, &policy, async move {
            handle.await.unwrap_or_else(|e| {
                Err(Error::Lifecycle {
                    app: name,
                    phase,
                    message: format!("phase task panicked: {e}"),
                })
            })
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::time::Duration;

    fn empty_exports() -> LifecycleExports {
        LifecycleExports::default()
    }

    #[tokio::test]
    async fn test_load_success_reaches_not_mounted() {
        let app = app_with_loader("a", LifecycleTimeouts::default(), |_| {
            Box::pin(async { Ok(LifecycleExports::default()) })
        });
        assert_eq!(app.status(), AppStatus::NotLoaded);
        app.load().await.unwrap();
        assert_eq!(app.status(), AppStatus::NotMounted);
        // A second load is a no-op.
        app.load().await.unwrap();
        assert_eq!(app.status(), AppStatus::NotMounted);
    }

    #[tokio::test]
    async fn test_load_failure_is_load_error() {
        let app = app_with_loader("a", LifecycleTimeouts::default(), |_| {
            Box::pin(async { Err(Error::Host("fetch failed".into())) })
        });
        assert!(app.load().await.is_err());
        assert_eq!(app.status(), AppStatus::LoadError);
    }

    #[tokio::test]
    async fn test_missing_loader_is_broken() {
        let app = app_handle("a");
        let err = app.load().await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingLoader(_))));
        assert_eq!(app.status(), AppStatus::Broken);
    }

    #[tokio::test]
    async fn test_mount_requires_not_mounted() {
        let app = app_handle("a");
        let err = app.mount(None, None).await.unwrap_err();
        assert!(matches!(err, Error::Lifecycle { .. }));
        assert_eq!(app.status(), AppStatus::NotLoaded);
    }

    #[tokio::test]
    async fn test_mount_unmount_cycle() {
        let app = app_with_loader("a", LifecycleTimeouts::default(), |_| {
            Box::pin(async { Ok(empty_exports()) })
        });
        app.load().await.unwrap();
        app.mount(None, None).await.unwrap();
        assert_eq!(app.status(), AppStatus::Mounted);
        app.unmount(None).await.unwrap();
        assert_eq!(app.status(), AppStatus::NotMounted);
        // The cycle can repeat.
        app.mount(None, None).await.unwrap();
        assert_eq!(app.status(), AppStatus::Mounted);
    }

    #[tokio::test]
    async fn test_mount_hook_failure_is_broken() {
        let app = app_with_loader("a", LifecycleTimeouts::default(), |_| {
            Box::pin(async {
                Ok(LifecycleExports {
                    mount: Some(Box::new(|_| {
                        Box::pin(async { Err(Error::Host("render blew up".into())) })
                    })),
                    ..Default::default()
                })
            })
        });
        app.load().await.unwrap();
        assert!(app.mount(None, None).await.is_err());
        assert_eq!(app.status(), AppStatus::Broken);
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let count = Arc::new(AtomicU32::new(0));
        let count_in_loader = count.clone();
        let app = app_with_loader("a", LifecycleTimeouts::default(), move |_| {
            let count = count_in_loader.clone();
            Box::pin(async move {
                Ok(LifecycleExports {
                    bootstrap: Some(Box::new(move |_| {
                        count.fetch_add(1, Ordering::SeqCst);
                        Box::pin(async { Ok(()) })
                    })),
                    ..Default::default()
                })
            })
        });
        app.load().await.unwrap();
        app.mount(None, None).await.unwrap();
        app.unmount(None).await.unwrap();
        app.mount(None, None).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timed_out_load_still_completes_later() {
        let timeouts = LifecycleTimeouts {
            load: crate::config::schema::PhaseTimeout {
                max_time_ms: 10,
                die_on_timeout: true,
                timeout_msg: None,
            },
            ..Default::default()
        };
        let app = app_with_loader("slow", timeouts, |_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(LifecycleExports::default())
            })
        });
        let err = app.load().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(app.status(), AppStatus::LoadingSourceCode);
        // The fire-and-forget task still finishes and flips the status.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(app.status(), AppStatus::NotMounted);
    }
}
