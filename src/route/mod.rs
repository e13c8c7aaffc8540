//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     RouteConfig (per application)
//!     → node.rs (build nodes, insert into forest / root-fragment list)
//!     → merge_forest (collect slots, splice fills, merge same paths)
//!     → frozen RouteArena
//!
//! Navigation:
//!     path + query
//!     → matcher.rs (linear walk of the flattened forest, first match wins)
//!     → MatchedResult (ancestor→descendant routes + root fragments)
//! ```
//!
//! # Design Decisions
//! - The forest is merged once at start and immutable afterwards
//! - Registration order must not change the final tree shape: slots are
//!   collected before any fill is spliced
//! - Wildcard nodes always sort after their non-wildcard siblings so they
//!   only match when nothing more specific does

pub mod config;
pub mod matched;
pub mod matcher;
pub mod node;
pub mod pattern;

pub use config::{PathOptions, RouteConfig};
pub use matched::{MatchedResult, MatchedRoute};
pub use matcher::RouteMatcher;
pub use node::{NodeId, RouteArena};

/// Meta key naming the application that owns a fragment's parent container.
pub const META_PARENT_APP: &str = "parent_app_name";

/// Meta key naming the container a fragment app mounts into.
pub const META_PARENT_CONTAINER: &str = "parent_container_name";
