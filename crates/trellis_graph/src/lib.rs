//! Graph asset, validation and execution machine for Trellis (Layer 2).
//!
//! `trellis_graph` defines behavior as a directed graph of nodes joined by
//! port edges, and the [`Machine`] that walks it one active node at a time.
//!
//! # Core Concepts
//!
//! - [`Node`] - Unit of behavior with enter/update/fixed-update/exit callbacks
//! - [`Condition`] - Read-only predicate gating an edge
//! - [`Graph`] - Authored nodes, edges, entry point and blackboard defaults
//! - [`Registry`] / [`GraphDocument`] - JSON authoring surface
//! - [`Machine`] - Runtime engine for transitions and lifecycle
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_context::{Context, EventBus};
//! use trellis_graph::{FnCondition, Graph, Machine, node::EmptyNode};
//!
//! let mut graph = Graph::new();
//! graph
//!     .add_node("closed", EmptyNode)
//!     .add_node("open", EmptyNode)
//!     .add_conditional_edge(
//!         "closed",
//!         "Next",
//!         "open",
//!         FnCondition::new("has_key", |ctx: &Context| ctx.get("has_key", false)),
//!     );
//!
//! let mut machine = Machine::new(Arc::new(graph), Context::new(Arc::new(EventBus::new())));
//! machine.start().unwrap();
//!
//! machine.tick(0.016);
//! assert_eq!(machine.current_node_guid().unwrap().as_str(), "closed");
//!
//! machine.context_mut().set("has_key", true);
//! machine.tick(0.016);
//! assert_eq!(machine.current_node_guid().unwrap().as_str(), "open");
//! ```
//!
//! # Architecture
//!
//! - **Layer 0** (`trellis_core`): clock and tracing setup
//! - **Layer 1** (`trellis_context`): blackboard, events, context
//! - **Layer 2** (`trellis_graph`): graph and machine (this crate)
//! - **Layer 3** (`trellis_nodes`, `trellis_runner`): built-ins and host adapter

/// Edge-gating predicates.
pub mod condition;

/// Edge records.
pub mod edge;

/// Graph asset and builder API.
pub mod graph;

/// Bounded transition trail.
pub mod history;

/// Graph execution engine.
pub mod machine;

/// The node contract.
pub mod node;

/// Authored documents and type registry.
pub mod registry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::condition::{BoxedCondition, Condition, FnCondition};
    pub use crate::edge::EdgeRecord;
    pub use crate::graph::{Graph, NodeRecord, Position, ValidationError};
    pub use crate::history::{TransitionHistory, TransitionReason, TransitionRecord};
    pub use crate::machine::{
        AutoTransitionMode, Machine, MachineConfig, MachineError, MachineState, TickReport,
    };
    pub use crate::node::{BoxedNode, DEFAULT_PORT, EmptyNode, Node};
    pub use crate::registry::{ConditionSpec, GraphDocument, NodeSpec, Registry, RegistryError};
}

// Re-export key types at crate root for convenience
pub use condition::{Condition, FnCondition};
pub use graph::{Graph, ValidationError};
pub use machine::{AutoTransitionMode, Machine, MachineConfig, MachineError, TickReport};
pub use node::Node;
pub use registry::{GraphDocument, Registry, RegistryError};
