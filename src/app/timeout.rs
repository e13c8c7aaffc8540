//! Lifecycle timeout enforcement.
//!
//! # Responsibilities
//! - Resolve per-phase policies (global config < per-application overrides)
//! - Wrap a phase future with its policy
//!
//! # Design Decisions
//! - Timeout errors are distinct from other errors
//! - `die_on_timeout: false` logs a warning at the deadline and keeps
//!   awaiting the task; its eventual result is still returned
//! - There is no task-termination primitive: a phase that "dies" on timeout
//!   only stops being awaited, the underlying task keeps running

use std::future::Future;
use std::time::Duration;

use crate::app::LifecyclePhase;
use crate::config::schema::{AppTimeoutOverrides, LifecycleTimeouts, PhaseTimeout};
use crate::error::{Error, Result};

/// Merge per-application overrides over the global per-phase policies.
/// The more specific side wins whole phases.
pub fn resolve_timeouts(
    global: &LifecycleTimeouts,
    overrides: &AppTimeoutOverrides,
) -> LifecycleTimeouts {
    LifecycleTimeouts {
        load: overrides.load.clone().unwrap_or_else(|| global.load.clone()),
        bootstrap: overrides
            .bootstrap
            .clone()
            .unwrap_or_else(|| global.bootstrap.clone()),
        mount: overrides.mount.clone().unwrap_or_else(|| global.mount.clone()),
        unmount: overrides
            .unmount
            .clone()
            .unwrap_or_else(|| global.unmount.clone()),
        wait_container: overrides
            .wait_container
            .clone()
            .unwrap_or_else(|| global.wait_container.clone()),
    }
}

fn deadline_message(app: &str, phase: LifecyclePhase, policy: &PhaseTimeout) -> String {
    policy.timeout_msg.clone().unwrap_or_else(|| {
        format!(
            "application '{}' {} exceeded {}ms",
            app, phase, policy.max_time_ms
        )
    })
}

/// Run a phase future under its timeout policy.
pub(crate) async fn with_phase_timeout<T>(
    app: &str,
    phase: LifecyclePhase,
    policy: &PhaseTimeout,
    task: impl Future<Output = Result<T>>,
) -> Result<T> {
    if policy.max_time_ms == 0 {
        return task.await;
    }
    let deadline = Duration::from_millis(policy.max_time_ms);

    if policy.die_on_timeout {
        match tokio::time::timeout(deadline, task).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(deadline_message(app, phase, policy))),
        }
    } else {
        tokio::pin!(task);
        let warn_at = tokio::time::sleep(deadline);
        tokio::pin!(warn_at);
        let mut warned = false;
        loop {
            tokio::select! {
                result = &mut task => return result,
                _ = &mut warn_at, if !warned => {
                    warned = true;
                    tracing::warn!(app = %app, phase = %phase, "{}", deadline_message(app, phase, policy));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_override_wins_over_global() {
        let global = LifecycleTimeouts::default();
        let overrides = AppTimeoutOverrides {
            mount: Some(PhaseTimeout {
                max_time_ms: 42,
                die_on_timeout: true,
                timeout_msg: Some("custom".into()),
            }),
            ..Default::default()
        };
        let resolved = resolve_timeouts(&global, &overrides);
        assert_eq!(resolved.mount.max_time_ms, 42);
        assert!(resolved.mount.die_on_timeout);
        assert_eq!(resolved.mount.timeout_msg.as_deref(), Some("custom"));
        // Phases without an override inherit the global policy.
        assert_eq!(resolved.load.max_time_ms, global.load.max_time_ms);
    }

    #[tokio::test]
    async fn test_die_on_timeout_rejects() {
        let policy = PhaseTimeout {
            max_time_ms: 20,
            die_on_timeout: true,
            timeout_msg: None,
        };
        let err = with_phase_timeout("x", LifecyclePhase::Load, &policy, async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_soft_timeout_still_returns_result() {
        let policy = PhaseTimeout {
            max_time_ms: 10,
            die_on_timeout: false,
            timeout_msg: None,
        };
        let value = with_phase_timeout("x", LifecyclePhase::Load, &policy, async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_task_error_beats_deadline() {
        let policy = PhaseTimeout {
            max_time_ms: 10_000,
            die_on_timeout: true,
            timeout_msg: None,
        };
        let err = with_phase_timeout::<()>("x", LifecyclePhase::Load, &policy, async {
            Err(Error::Host("failed first".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Host(_)));
    }

    #[tokio::test]
    async fn test_zero_deadline_disables_timer() {
        let policy = PhaseTimeout {
            max_time_ms: 0,
            die_on_timeout: true,
            timeout_msg: None,
        };
        let value = with_phase_timeout("x", LifecyclePhase::Mount, &policy, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        })
        .await
        .unwrap();
        assert_eq!(value, 1);
    }
}
