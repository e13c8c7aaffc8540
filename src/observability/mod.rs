//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; every state transition and
//!   mount/unmount decision carries fields, not formatted strings
//! - The library never installs a global subscriber on its own; hosts call
//!   `logging::init` once, or bring their own subscriber

pub mod logging;
