//! # Trellis Internal Library
//!
//! Re-exports the core Trellis crates for convenience.

/// Layer 0: Clock and tracing setup.
pub use trellis_core;

/// Layer 1: Blackboard, events and execution context.
pub use trellis_context;

/// Layer 2: Graph asset, registry and machine.
pub use trellis_graph;

/// Layer 3: Built-in nodes and conditions.
pub use trellis_nodes;

/// Layer 3: Host adapter.
pub use trellis_runner;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use trellis_context::{
        Blackboard, BlackboardEntry, BlackboardValue, Context, EdgeGuid, EventBus, EventSystem,
        NodeGuid, Subscription,
    };
    pub use trellis_core::{Clock, TracingConfig, TracingFormat};
    pub use trellis_graph::prelude::*;
    pub use trellis_nodes::{builtin_registry, register_builtins};
    pub use trellis_runner::{ConfigError, EventBinding, Runner, RunnerConfig};
}
