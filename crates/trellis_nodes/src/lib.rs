//! Built-in node and condition library for Trellis graphs (Layer 3).
//!
//! Every type here is registered under a short name so authored
//! [`GraphDocument`](trellis_graph::GraphDocument)s can refer to it:
//!
//! | Nodes | Conditions |
//! |-------|------------|
//! | `Log`, `Wait`, `WaitEvent`, `PublishEvent` | `WaitElapsed`, `EventFired` |
//! | `SetBlackboard`, `Branch`, `Jump`, `Empty` | `Compare`, `Not`, `All`, `Any` |
//!
//! # Example
//!
//! ```
//! use trellis_nodes::builtin_registry;
//!
//! let graph = builtin_registry()
//!     .load_json(
//!         r#"{
//!             "nodes": [
//!                 { "guid": "wait", "node": { "type": "Wait", "data": { "seconds": 1.5 } } },
//!                 { "guid": "done", "node": { "type": "Log", "data": { "message": "done" } } }
//!             ],
//!             "edges": [
//!                 { "guid": "e1", "from_node_guid": "wait", "to_node_guid": "done",
//!                   "condition": { "type": "WaitElapsed" } }
//!             ]
//!         }"#,
//!     )
//!     .unwrap();
//!
//! assert!(graph.validate().is_ok());
//! ```

pub mod conditions;
pub mod nodes;

use trellis_graph::registry::Registry;

pub use conditions::{
    AllCondition, AnyCondition, CompareCondition, CompareOp, EventFiredCondition, NotCondition,
    WaitElapsedCondition,
};
pub use nodes::{
    BranchNode, JumpNode, LogLevel, LogNode, PublishEventNode, SetBlackboardNode, WaitEventNode,
    WaitNode, wait_remaining_key,
};

/// Registers every built-in node and condition type.
pub fn register_builtins(registry: &mut Registry) {
    registry
        .register_node::<LogNode>("Log")
        .register_node::<WaitNode>("Wait")
        .register_node::<WaitEventNode>("WaitEvent")
        .register_node::<PublishEventNode>("PublishEvent")
        .register_node::<SetBlackboardNode>("SetBlackboard")
        .register_node::<BranchNode>("Branch")
        .register_node::<JumpNode>("Jump")
        .register_condition::<WaitElapsedCondition>("WaitElapsed")
        .register_condition::<EventFiredCondition>("EventFired")
        .register_condition::<CompareCondition>("Compare");
    conditions::register_combinators(registry);
}

/// Returns a registry with every built-in type registered.
#[must_use]
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    register_builtins(&mut registry);
    registry
}
