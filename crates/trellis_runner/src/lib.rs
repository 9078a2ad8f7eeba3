//! Host adapter for Trellis machines (Layer 3).
//!
//! `trellis_runner` is the piece a game loop or service actually holds. A
//! [`Runner`] wraps one [`Machine`](trellis_graph::Machine) and adds:
//!
//! - blackboard overrides merged over the graph's defaults at start
//! - external event bindings that force a node entry when an event fires
//! - pause, manual stepping and a time scale
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_context::{EventBus, EventSystem};
//! use trellis_graph::{Graph, node::EmptyNode};
//! use trellis_runner::{Runner, RunnerConfig};
//!
//! let mut graph = Graph::new();
//! graph.add_node("idle", EmptyNode).add_node("alarm", EmptyNode);
//!
//! let bus = Arc::new(EventBus::new());
//! let config = RunnerConfig::new().with_binding("intruder", "alarm");
//! let mut runner = Runner::new(Arc::new(graph), bus.clone(), config);
//! runner.start().unwrap();
//!
//! bus.publish("intruder");
//! runner.tick(0.016);
//! assert_eq!(runner.machine().current_node_guid().unwrap().as_str(), "alarm");
//! ```

/// Runner configuration.
pub mod config;

/// The host adapter.
pub mod runner;

pub use config::{ConfigError, EventBinding, RunnerConfig};
pub use runner::Runner;
