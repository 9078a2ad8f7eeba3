//! Ambient infrastructure shared by the Trellis crates.
//!
//! - [`Clock`] - Time source used to stamp transition records, mockable for testing
//! - [`TracingConfig`] - Installs a `tracing` subscriber for hosts and demos
//!
//! # Feature Flags
//!
//! - `test-utils` - Enables [`MockClock`] for deterministic time testing
//!
//! # Architecture
//!
//! - **Layer 0** (`trellis_core`): Ambient infrastructure (this crate)
//! - **Layer 1** (`trellis_context`): Blackboard, event bus and context
//! - **Layer 2** (`trellis_graph`): Graph asset and execution machine
//! - **Layer 3** (`trellis_nodes`, `trellis_runner`): Built-in behaviors and host adapter

mod time;
mod tracing_setup;

pub use time::{Clock, ClockProvider};
pub use tracing_setup::{TracingConfig, TracingFormat};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;
