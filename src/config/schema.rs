//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Global per-phase lifecycle timeout policies.
    pub timeouts: LifecycleTimeouts,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Per-phase timeout policies applied to every application unless the
/// application's registration overrides a phase.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleTimeouts {
    pub load: PhaseTimeout,
    pub bootstrap: PhaseTimeout,
    pub mount: PhaseTimeout,
    pub unmount: PhaseTimeout,
    pub wait_container: PhaseTimeout,
}

impl Default for LifecycleTimeouts {
    fn default() -> Self {
        Self {
            load: PhaseTimeout::soft(10_000),
            bootstrap: PhaseTimeout::soft(5_000),
            mount: PhaseTimeout::soft(5_000),
            unmount: PhaseTimeout::soft(5_000),
            wait_container: PhaseTimeout::hard(3_000),
        }
    }
}

/// Timeout policy for a single lifecycle phase.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhaseTimeout {
    /// Deadline in milliseconds. Zero disables the timer for this phase.
    pub max_time_ms: u64,

    /// When true the phase fails with a timeout error at the deadline.
    /// When false a warning is logged and the task is still awaited.
    pub die_on_timeout: bool,

    /// Message used for the timeout error / warning, if customized.
    pub timeout_msg: Option<String>,
}

impl PhaseTimeout {
    /// Warn-only policy: log at the deadline, keep waiting.
    pub fn soft(max_time_ms: u64) -> Self {
        Self {
            max_time_ms,
            die_on_timeout: false,
            timeout_msg: None,
        }
    }

    /// Failing policy: reject with a timeout error at the deadline.
    pub fn hard(max_time_ms: u64) -> Self {
        Self {
            max_time_ms,
            die_on_timeout: true,
            timeout_msg: None,
        }
    }
}

impl Default for PhaseTimeout {
    fn default() -> Self {
        Self::soft(5_000)
    }
}

/// Per-application timeout overrides. A `Some` phase replaces the global
/// policy for that phase; `None` phases inherit the global one.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppTimeoutOverrides {
    pub load: Option<PhaseTimeout>,
    pub bootstrap: Option<PhaseTimeout>,
    pub mount: Option<PhaseTimeout>,
    pub unmount: Option<PhaseTimeout>,
    pub wait_container: Option<PhaseTimeout>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
