//! A frame-driven workflow graph runtime for Rust.
//!
//! Graphs of nodes joined by conditional port edges, a shared blackboard,
//! an injectable event bus and a machine that walks one active node per
//! tick.

pub use trellis_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_internal::prelude::*;
}
