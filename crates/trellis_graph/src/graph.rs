//! Graph asset and builder API.
//!
//! The [`Graph`] is the authored, read-only definition a machine walks:
//! ordered node records, ordered edge records, an optional entry node and
//! the blackboard defaults the run starts from.
//!
//! # Example
//!
//! ```
//! use trellis_graph::graph::Graph;
//! use trellis_graph::node::EmptyNode;
//!
//! let mut graph = Graph::new();
//! graph
//!     .add_node("idle", EmptyNode)
//!     .add_node("alert", EmptyNode)
//!     .add_edge("idle", "Next", "alert")
//!     .set_entry("idle");
//!
//! assert!(graph.validate().is_ok());
//! ```

use core::fmt;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use trellis_context::{BlackboardEntry, EdgeGuid, NodeGuid};

use crate::condition::Condition;
use crate::edge::EdgeRecord;
use crate::node::{BoxedNode, Node};

/// Editor-only canvas position. Ignored at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// A node instance and its identity within a graph.
pub struct NodeRecord {
    /// Unique identifier for this node.
    pub guid: NodeGuid,
    /// Canvas position.
    pub position: Position,
    /// The behavior; `None` only for malformed assets (rejected by validation).
    pub node: Option<BoxedNode>,
}

impl NodeRecord {
    /// Creates a record for `node`.
    #[must_use]
    pub fn new<N: Node>(guid: impl Into<NodeGuid>, node: N) -> Self {
        Self {
            guid: guid.into(),
            position: Position::default(),
            node: Some(Box::new(node)),
        }
    }

    /// Creates a record for an already-boxed node, or none at all.
    #[must_use]
    pub fn from_boxed(guid: impl Into<NodeGuid>, node: Option<BoxedNode>) -> Self {
        Self {
            guid: guid.into(),
            position: Position::default(),
            node,
        }
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Position { x, y };
        self
    }
}

impl fmt::Debug for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRecord")
            .field("guid", &self.guid)
            .field("node", &self.node.as_ref().map(|n| n.type_name()))
            .finish()
    }
}

/// A directed graph of nodes connected by port edges.
#[derive(Debug, Default)]
pub struct Graph {
    /// All node records, in authored order.
    nodes: Vec<NodeRecord>,
    /// All edge records, in authored order.
    edges: Vec<EdgeRecord>,
    /// Explicit entry point.
    entry: Option<NodeGuid>,
    /// Authored blackboard defaults.
    blackboard_defaults: Vec<BlackboardEntry>,
    /// First index of each node guid.
    index: HashMap<NodeGuid, usize>,
}

impl Graph {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns all node records in authored order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Returns all edge records in authored order.
    #[must_use]
    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// Returns the explicit entry node guid, if set.
    #[must_use]
    pub fn entry(&self) -> Option<&NodeGuid> {
        self.entry.as_ref()
    }

    /// Returns the node execution starts from: the explicit entry, or the
    /// first node record.
    #[must_use]
    pub fn resolve_entry(&self) -> Option<&NodeGuid> {
        self.entry
            .as_ref()
            .or_else(|| self.nodes.first().map(|record| &record.guid))
    }

    /// Returns the authored blackboard defaults.
    #[must_use]
    pub fn blackboard_defaults(&self) -> &[BlackboardEntry] {
        &self.blackboard_defaults
    }

    /// Returns the number of node records.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edge records.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets a node record by guid.
    #[must_use]
    pub fn record(&self, guid: &str) -> Option<&NodeRecord> {
        self.index.get(guid).map(|&i| &self.nodes[i])
    }

    /// Gets a node instance by guid.
    #[must_use]
    pub fn node(&self, guid: &str) -> Option<&dyn Node> {
        self.record(guid)?.node.as_deref()
    }

    /// Returns true if a node record with `guid` exists.
    #[must_use]
    pub fn contains_node(&self, guid: &str) -> bool {
        self.index.contains_key(guid)
    }

    /// Gets an edge record by guid.
    #[must_use]
    pub fn edge(&self, guid: &str) -> Option<&EdgeRecord> {
        self.edges.iter().find(|edge| edge.guid.as_str() == guid)
    }

    /// Iterates the outgoing edges of `from` in authored order.
    pub fn edges_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges.iter().filter(move |edge| edge.from.as_str() == from)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder API
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a node and returns self for chaining.
    pub fn add_node<N: Node>(&mut self, guid: impl Into<NodeGuid>, node: N) -> &mut Self {
        self.add_node_record(NodeRecord::new(guid, node))
    }

    /// Adds a node record as-is.
    pub fn add_node_record(&mut self, record: NodeRecord) -> &mut Self {
        self.index
            .entry(record.guid.clone())
            .or_insert(self.nodes.len());
        self.nodes.push(record);
        self
    }

    /// Adds an unconditional edge from `from`'s `port` to `to`.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeGuid>,
        port: impl Into<String>,
        to: impl Into<NodeGuid>,
    ) -> &mut Self {
        self.add_edge_record(EdgeRecord::new(from, port, to))
    }

    /// Adds an edge from `from`'s `port` to `to` gated by `condition`.
    pub fn add_conditional_edge<C: Condition>(
        &mut self,
        from: impl Into<NodeGuid>,
        port: impl Into<String>,
        to: impl Into<NodeGuid>,
        condition: C,
    ) -> &mut Self {
        self.add_edge_record(EdgeRecord::new(from, port, to).with_condition(condition))
    }

    /// Adds an edge record as-is.
    pub fn add_edge_record(&mut self, record: EdgeRecord) -> &mut Self {
        self.edges.push(record);
        self
    }

    /// Sets the explicit entry node.
    pub fn set_entry(&mut self, guid: impl Into<NodeGuid>) -> &mut Self {
        self.entry = Some(guid.into());
        self
    }

    /// Sets the explicit entry node, consuming and returning the graph.
    #[must_use]
    pub fn with_entry(mut self, guid: impl Into<NodeGuid>) -> Self {
        self.entry = Some(guid.into());
        self
    }

    /// Appends an authored blackboard default.
    pub fn add_blackboard_default(&mut self, entry: BlackboardEntry) -> &mut Self {
        self.blackboard_defaults.push(entry);
        self
    }

    /// Appends an authored blackboard default, consuming and returning the graph.
    #[must_use]
    pub fn with_blackboard_default(mut self, entry: BlackboardEntry) -> Self {
        self.blackboard_defaults.push(entry);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation API
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates the graph structure.
    ///
    /// Checks that:
    /// - the graph has at least one node
    /// - node guids are non-empty and unique
    /// - every node record holds a node instance
    /// - edge guids are non-empty and unique
    /// - edge endpoints reference existing nodes
    /// - the explicit entry, if set, references an existing node
    ///
    /// # Errors
    ///
    /// Returns every problem found, in discovery order.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.nodes.is_empty() {
            errors.push(ValidationError::EmptyGraph);
        }

        let mut seen_nodes: HashSet<&str> = HashSet::new();
        for (position, record) in self.nodes.iter().enumerate() {
            if record.guid.is_empty() {
                errors.push(ValidationError::EmptyNodeGuid { position });
            } else if !seen_nodes.insert(record.guid.as_str()) {
                errors.push(ValidationError::DuplicateNodeGuid(record.guid.clone()));
            }
            if record.node.is_none() {
                errors.push(ValidationError::MissingNodeInstance {
                    position,
                    guid: record.guid.clone(),
                });
            }
        }

        let mut seen_edges: HashSet<&str> = HashSet::new();
        for (position, edge) in self.edges.iter().enumerate() {
            if edge.guid.is_empty() {
                errors.push(ValidationError::EmptyEdgeGuid { position });
            } else if !seen_edges.insert(edge.guid.as_str()) {
                errors.push(ValidationError::DuplicateEdgeGuid(edge.guid.clone()));
            }
            if !self.contains_node(edge.from.as_str()) {
                errors.push(ValidationError::InvalidEdgeSource {
                    edge: edge.guid.clone(),
                    node: edge.from.clone(),
                });
            }
            if !self.contains_node(edge.to.as_str()) {
                errors.push(ValidationError::InvalidEdgeTarget {
                    edge: edge.guid.clone(),
                    node: edge.to.clone(),
                });
            }
        }

        if let Some(entry) = &self.entry
            && !self.contains_node(entry.as_str())
        {
            errors.push(ValidationError::InvalidEntryPoint(entry.clone()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Structural problems detected by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The graph has no nodes.
    EmptyGraph,
    /// A node record has an empty guid.
    EmptyNodeGuid {
        /// Index of the record in the node list.
        position: usize,
    },
    /// Two node records share a guid.
    DuplicateNodeGuid(NodeGuid),
    /// A node record holds no node instance.
    MissingNodeInstance {
        /// Index of the record in the node list.
        position: usize,
        /// The record's guid.
        guid: NodeGuid,
    },
    /// An edge record has an empty guid.
    EmptyEdgeGuid {
        /// Index of the record in the edge list.
        position: usize,
    },
    /// Two edge records share a guid.
    DuplicateEdgeGuid(EdgeGuid),
    /// An edge's source node doesn't exist.
    InvalidEdgeSource {
        /// The edge guid.
        edge: EdgeGuid,
        /// The missing node guid.
        node: NodeGuid,
    },
    /// An edge's target node doesn't exist.
    InvalidEdgeTarget {
        /// The edge guid.
        edge: EdgeGuid,
        /// The missing node guid.
        node: NodeGuid,
    },
    /// The explicit entry point references a missing node.
    InvalidEntryPoint(NodeGuid),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyGraph => write!(f, "graph has no nodes"),
            ValidationError::EmptyNodeGuid { position } => {
                write!(f, "node record #{position} has an empty guid")
            }
            ValidationError::DuplicateNodeGuid(guid) => {
                write!(f, "duplicate node guid '{guid}'")
            }
            ValidationError::MissingNodeInstance { position, guid } => {
                write!(f, "node record #{position} ('{guid}') has no node instance")
            }
            ValidationError::EmptyEdgeGuid { position } => {
                write!(f, "edge record #{position} has an empty guid")
            }
            ValidationError::DuplicateEdgeGuid(guid) => {
                write!(f, "duplicate edge guid '{guid}'")
            }
            ValidationError::InvalidEdgeSource { edge, node } => {
                write!(f, "edge '{edge}' starts at missing node '{node}'")
            }
            ValidationError::InvalidEdgeTarget { edge, node } => {
                write!(f, "edge '{edge}' points to missing node '{node}'")
            }
            ValidationError::InvalidEntryPoint(guid) => {
                write!(f, "entry node '{guid}' does not exist")
            }
        }
    }
}

impl core::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EmptyNode;

    #[test]
    fn resolve_entry_falls_back_to_first_node() {
        let mut graph = Graph::new();
        graph.add_node("a", EmptyNode).add_node("b", EmptyNode);
        assert_eq!(graph.resolve_entry().map(NodeGuid::as_str), Some("a"));

        graph.set_entry("b");
        assert_eq!(graph.resolve_entry().map(NodeGuid::as_str), Some("b"));
    }

    #[test]
    fn blackboard_defaults_keep_authored_order() {
        let graph = Graph::new()
            .with_blackboard_default(BlackboardEntry::new("hp", 3))
            .with_blackboard_default(BlackboardEntry::new("name", "guard".to_owned()));
        let keys: Vec<&str> = graph
            .blackboard_defaults()
            .iter()
            .map(|entry| entry.key.as_str())
            .collect();
        assert_eq!(keys, ["hp", "name"]);
    }

    #[test]
    fn lookups_by_guid() {
        let mut graph = Graph::new();
        graph
            .add_node("a", EmptyNode)
            .add_node("b", EmptyNode)
            .add_edge_record(EdgeRecord::new("a", "Next", "b").with_guid("e"));

        assert!(graph.node("a").is_some());
        assert!(graph.node("zzz").is_none());
        assert_eq!(graph.edge("e").map(|e| e.to.as_str()), Some("b"));
        assert_eq!(graph.edges_from("a").count(), 1);
        assert_eq!(graph.edges_from("b").count(), 0);
    }

    #[test]
    fn duplicate_guid_keeps_first_record_for_lookup() {
        let mut graph = Graph::new();
        graph
            .add_node_record(NodeRecord::new("a", EmptyNode).at(1.0, 2.0))
            .add_node_record(NodeRecord::new("a", EmptyNode).at(5.0, 5.0));
        assert_eq!(graph.record("a").map(|r| r.position.x), Some(1.0));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::InvalidEdgeTarget {
            edge: EdgeGuid::from("e1"),
            node: NodeGuid::from("ghost"),
        };
        assert_eq!(err.to_string(), "edge 'e1' points to missing node 'ghost'");
        assert_eq!(ValidationError::EmptyGraph.to_string(), "graph has no nodes");
    }
}
