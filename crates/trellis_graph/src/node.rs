//! The node contract.
//!
//! A node is a unit of behavior that is active between its own
//! [`on_enter`](Node::on_enter) and [`on_exit`](Node::on_exit). Nodes are
//! immutable once placed in a graph; anything that changes while a node is
//! active lives in the blackboard, usually keyed by the node's guid
//! (available as [`Context::current_node_guid`]).
//!
//! # Example
//!
//! ```
//! use trellis_context::Context;
//! use trellis_graph::node::Node;
//!
//! /// Counts how many frames the node has been active.
//! struct FrameCounter;
//!
//! impl Node for FrameCounter {
//!     fn on_enter(&self, ctx: &mut Context) {
//!         ctx.set("frames", 0_i32);
//!     }
//!
//!     fn on_update(&self, ctx: &mut Context) {
//!         let frames = ctx.get("frames", 0_i32);
//!         ctx.set("frames", frames + 1);
//!     }
//! }
//! ```

use core::fmt;

use trellis_context::Context;

/// Name of the port every node declares unless it overrides [`Node::output_ports`].
pub const DEFAULT_PORT: &str = "Next";

/// A polymorphic unit of graph behavior.
///
/// All callbacks default to no-ops. Any callback may write the blackboard or
/// call [`Context::request_enter_node`].
pub trait Node: Send + Sync + 'static {
    /// Ordered output port names. Edges are resolved port by port in this order.
    ///
    /// An empty list is treated as `["Next"]`.
    fn output_ports(&self) -> Vec<String> {
        vec![DEFAULT_PORT.to_owned()]
    }

    /// Called once when the node becomes active.
    fn on_enter(&self, _ctx: &mut Context) {}

    /// Called every tick while the node is active.
    fn on_update(&self, _ctx: &mut Context) {}

    /// Called every fixed tick while the node is active.
    fn on_fixed_update(&self, _ctx: &mut Context) {}

    /// Called once when the node stops being active.
    fn on_exit(&self, _ctx: &mut Context) {}

    /// Returns the node's type name for debugging and tracing.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.type_name())
            .field("ports", &self.output_ports())
            .finish()
    }
}

/// Type alias for boxed nodes stored in node records.
pub type BoxedNode = Box<dyn Node>;

/// A node with no behavior and the default port.
///
/// Useful as a junction or terminal state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyNode;

impl Node for EmptyNode {}
