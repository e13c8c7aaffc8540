//! Hook pipelines: staged, interceptable callback sequences.
//!
//! # Data Flow
//! ```text
//! tap(name, fn, options)
//!     → registry.rs (ordered insertion: before/after anchors, priority)
//!
//! call(context)
//!     → run taps strictly in order
//!     → context.controls().bail   stops the remaining taps of this call
//!     → context.controls().ignore_tap(name)   skips a tap for this call
//!     → both flags reset on every exit path, including errors
//! ```
//!
//! # Design Decisions
//! - Control flags live on the shared context struct, not ambient state,
//!   so nested pipeline calls over the same context stay isolated
//! - `once` taps deregister after the call in which they fired, even when a
//!   later tap errors or bails
//! - Two flavors: synchronous taps and awaited async-series taps

pub mod context;
pub mod registry;
pub mod series;
pub mod sync;

pub use context::{PipelineContext, PipelineControls};
pub use registry::TapOptions;
pub use series::AsyncPipeline;
pub use sync::SyncPipeline;
