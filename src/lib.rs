//! Micro-frontend orchestration library.
//!
//! Registers independently built applications, matches URL routes against a
//! merged route forest, and drives every matched application through its
//! lifecycle (load → bootstrap → mount → unmount), reusing already-mounted
//! applications wherever the old and new route lists agree.

pub mod app;
pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod observability;
pub mod render;
pub mod route;
pub mod switcher;

pub use config::schema::OrchestratorConfig;
pub use error::{ConfigError, Error, Result};
pub use route::config::RouteConfig;
pub use switcher::{AppRegistration, Orchestrator};
