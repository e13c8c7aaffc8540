//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → OrchestratorConfig (immutable)
//!     → passed to Orchestrator::new
//!
//! Per-application overrides:
//!     AppRegistration.timeouts (more specific)
//!     + OrchestratorConfig.timeouts (global defaults)
//!     → resolved per-phase policy on the Application
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so a minimal config works
//! - Timeout precedence is global < per-application registration

pub mod loader;
pub mod schema;

pub use schema::{AppTimeoutOverrides, LifecycleTimeouts, OrchestratorConfig, PhaseTimeout};
