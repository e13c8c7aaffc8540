//! Error definitions.
//!
//! # Taxonomy
//! - Configuration errors: fatal, raised synchronously at registration time
//! - Lifecycle errors: raised during an async phase, mark the application
//!   `LoadError`/`Broken` and propagate to the caller
//! - Timeout errors: distinct kind, raised only when `die_on_timeout` is set
//!
//! # Design Decisions
//! - No automatic retries and no global suppression; errors surface to
//!   whoever invoked `start()`/`reroute()`
//! - Cancellation is modeled as an error internally so it can abort a
//!   pipeline call, but the orchestrator converts it to a non-error result

use thiserror::Error;

use crate::app::LifecyclePhase;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal configuration errors, surfaced synchronously at registration time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two route nodes declared the same slot name.
    #[error("duplicate slot name '{0}'")]
    DuplicateSlot(String),

    /// Two non-fragment routes share a path; merging requires a fragment side.
    #[error("conflicting routes at '{0}': neither side is a fragment")]
    RouteConflict(String),

    /// A fragment route is missing required parent metadata.
    #[error("fragment route '{0}' must declare '{1}' in meta")]
    MissingFragmentMeta(String, &'static str),

    /// A fragment or root-fragment route declared an option it must not have.
    #[error("route '{0}' must not declare {1}")]
    InvalidRouteOption(String, &'static str),

    /// An application without a loader function attempted to load.
    #[error("application '{0}' has no loader function")]
    MissingLoader(String),

    /// Application names are unique keys.
    #[error("application '{0}' is already registered")]
    DuplicateApp(String),

    /// Pipeline tap names are unique unless `replace` is set.
    #[error("tap '{0}' is already registered")]
    DuplicateTap(String),

    /// A `before`/`after` tap option referenced a name that does not exist.
    #[error("tap ordering references unknown tap '{0}'")]
    UnknownTap(String),

    /// A compiled path template was not a valid pattern.
    #[error("invalid path template '{path}': {message}")]
    InvalidPathTemplate { path: String, message: String },

    /// Registration is closed once the forest has been merged and compiled.
    #[error("cannot register after start()")]
    AlreadyStarted,

    /// `reroute()` requires a started orchestrator.
    #[error("orchestrator has not been started")]
    NotStarted,

    /// Configuration file could not be read.
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors produced by orchestration and application lifecycles.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal registration-time configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An application lifecycle phase failed or was invoked in a bad state.
    #[error("application '{app}' {phase} failed: {message}")]
    Lifecycle {
        app: String,
        phase: LifecyclePhase,
        message: String,
    },

    /// A lifecycle phase exceeded its deadline with `die_on_timeout` set.
    #[error("{0}")]
    Timeout(String),

    /// The navigation owning this work was superseded by a newer one.
    #[error("navigation cancelled")]
    Cancelled,

    /// An external collaborator (loader, container controller) failed.
    #[error("host error: {0}")]
    Host(String),
}

impl Error {
    /// Whether this error is the cooperative-cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether this error is a lifecycle timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
