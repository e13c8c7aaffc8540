//! Rendering subsystem: route-state diffing and patching.
//!
//! # Data Flow
//! ```text
//! SwitcherContext (new MatchedResult)
//!     + RouteStateStore (what is currently mounted)
//!     → diff.rs (mismatch index, fragment set differences)
//!     → renderer.rs:
//!         reverse unmount sweep (descendant first)
//!         root-fragment unmounts
//!         forward mount sweep (ancestor first)
//!         root-fragment mounts
//!     → RouteStateStore updated after each completed step
//! ```
//!
//! # Design Decisions
//! - Share everything still valid, touch nothing unnecessarily: an app that
//!   is the main app at the same position before and after navigation is
//!   never unmounted and remounted
//! - The unmount phase fully completes before any mount starts
//! - No rollback: a failed lifecycle call aborts the rest of the phase and
//!   leaves the completed steps in place

pub mod diff;
pub mod renderer;
pub mod state;

pub use renderer::Renderer;
pub use state::{RouteState, RouteStateStore};
