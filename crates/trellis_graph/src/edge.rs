//! Edge records.
//!
//! An edge connects a named output port of one node to another node,
//! optionally gated by a [`Condition`](crate::condition::Condition). An edge
//! without a condition is unconditional.

use core::fmt;

use trellis_context::{EdgeGuid, NodeGuid};

use crate::condition::{BoxedCondition, Condition};
use crate::node::DEFAULT_PORT;

/// Normalizes an authored port name.
///
/// Empty names map to `"Next"`. Anything else is kept verbatim: port
/// matching is exact and case-sensitive.
#[must_use]
pub fn normalize_port(port: impl Into<String>) -> String {
    let port = port.into();
    if port.is_empty() {
        DEFAULT_PORT.to_owned()
    } else {
        port
    }
}

/// A directed, optionally conditioned connection between two nodes.
pub struct EdgeRecord {
    /// Unique identifier for this edge.
    pub guid: EdgeGuid,
    /// Source node.
    pub from: NodeGuid,
    /// Source port name (never empty).
    pub from_port: String,
    /// Destination node.
    pub to: NodeGuid,
    /// Gate; `None` means always true.
    pub condition: Option<BoxedCondition>,
}

impl EdgeRecord {
    /// Creates an unconditional edge with a generated guid.
    #[must_use]
    pub fn new(from: impl Into<NodeGuid>, port: impl Into<String>, to: impl Into<NodeGuid>) -> Self {
        Self {
            guid: EdgeGuid::new(),
            from: from.into(),
            from_port: normalize_port(port),
            to: to.into(),
            condition: None,
        }
    }

    /// Sets the edge guid.
    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<EdgeGuid>) -> Self {
        self.guid = guid.into();
        self
    }

    /// Sets the gating condition.
    #[must_use]
    pub fn with_condition<C: Condition>(mut self, condition: C) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }

    /// Sets an already-boxed gating condition.
    #[must_use]
    pub fn with_boxed_condition(mut self, condition: Option<BoxedCondition>) -> Self {
        self.condition = condition;
        self
    }

    /// Returns true if the edge has no condition.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.condition.is_none()
    }
}

impl fmt::Debug for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeRecord")
            .field("guid", &self.guid)
            .field("from", &self.from)
            .field("from_port", &self.from_port)
            .field("to", &self.to)
            .field("condition", &self.condition.as_ref().map(|c| c.type_name()))
            .finish()
    }
}
