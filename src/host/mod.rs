//! External collaborator contracts.
//!
//! # Responsibilities
//! - Define the narrow interfaces the orchestration core consumes:
//!   resource loading, container rendering, and sandboxing
//! - Define the lifecycle export shape loaded application code provides
//!
//! # Design Decisions
//! - Trait objects at the seam so hosts plug in without generics spreading
//!   through the core
//! - Lifecycle functions return boxed `'static` futures so a timed-out task
//!   can keep running after its caller stopped waiting

use std::any::Any;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::Error;
use crate::route::matched::MatchedRoute;

/// Result type shared by host-facing calls.
pub type HostResult<T> = std::result::Result<T, Error>;

/// Opaque handle to a host container element. Hosts downcast to their own
/// element type; the core only threads handles through.
pub type ElementHandle = Arc<dyn Any + Send + Sync>;

/// Arguments passed to every lifecycle function.
#[derive(Clone)]
pub struct LifecycleArgs {
    /// The application's registered props bag.
    pub props: Value,

    /// The matched route this lifecycle call is running for, if any.
    pub route: Option<MatchedRoute>,

    /// Container the application should render into, when one was resolved.
    pub container: Option<ElementHandle>,
}

/// A single lifecycle function exported by loaded application code.
pub type LifecycleFn =
    Box<dyn Fn(LifecycleArgs) -> BoxFuture<'static, HostResult<()>> + Send + Sync>;

/// The lifecycle functions an application's code exports after loading.
/// Every hook is optional; a missing hook is a no-op.
#[derive(Default)]
pub struct LifecycleExports {
    pub bootstrap: Option<LifecycleFn>,
    pub mount: Option<LifecycleFn>,
    pub unmount: Option<LifecycleFn>,
}

impl std::fmt::Debug for LifecycleExports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleExports")
            .field("bootstrap", &self.bootstrap.is_some())
            .field("mount", &self.mount.is_some())
            .field("unmount", &self.unmount.is_some())
            .finish()
    }
}

/// Fetches and executes an application's code.
pub trait ResourceLoader: Send + Sync {
    /// Load the named application, returning its lifecycle exports.
    fn load(&self, app_name: &str) -> BoxFuture<'static, HostResult<LifecycleExports>>;
}

/// Renders and resolves host container elements.
pub trait ContainerController: Send + Sync {
    /// Create a fresh container element for the named application.
    fn create_element(&self, app_name: &str) -> BoxFuture<'static, HostResult<ElementHandle>>;

    /// Attach the element to the host document. Returns whether a target
    /// container was found.
    fn render(&self, app_name: &str, element: ElementHandle) -> HostResult<bool>;

    /// Resolve an element by selector, if present.
    fn query_selector(&self, selector: &str) -> Option<ElementHandle>;

    /// Wait until the named child container exists. The caller wraps this in
    /// its own timeout policy.
    fn wait(&self, container_name: &str) -> BoxFuture<'static, HostResult<ElementHandle>>;
}

/// Isolated global scope around an application's mount/unmount window.
pub trait Sandbox: Send + Sync {
    fn start(&self, app_name: &str);
    fn stop(&self, app_name: &str);
}
