//! Switcher subsystem: navigation orchestration.
//!
//! # Data Flow
//! ```text
//! reroute(path, query)
//!     → cancel the previous navigation's token
//!     → match pipeline (sync): "match-route" fills a MatchedResult
//!     → SwitcherContext built (load groups, fresh token)
//!     → before-switch pipeline
//!     → load pipeline:   "load-apps"
//!     → render pipeline: "unmount-apps" → "unmount-root-fragments"
//!                        → "mount-apps" → "mount-root-fragments"
//!     → after-switch pipeline
//! ```
//!
//! # States
//! ```text
//! Init → Loading → Rendering → Done
//!   └──────┴─────────┴──→ Cancelled   (superseded by a newer navigation)
//! ```

pub mod context;
pub mod loader;
pub mod orchestrator;

pub use context::{MatchContext, NavigationToken, SwitcherContext, SwitcherStatus};
pub use orchestrator::{AppRegistration, Orchestrator};
