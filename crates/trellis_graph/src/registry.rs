//! Authored graph documents and the type registry that instantiates them.
//!
//! A [`GraphDocument`] is the serialized form of a graph. Nodes and
//! conditions appear as `{"type": <name>, "data": <json>}` specs; the
//! [`Registry`] maps each type name to a factory that builds the trait
//! object.
//!
//! ```json
//! {
//!   "entry_node_guid": "idle",
//!   "nodes": [
//!     { "guid": "idle", "node": { "type": "Empty" } },
//!     { "guid": "done", "node": { "type": "Empty" } }
//!   ],
//!   "edges": [
//!     { "guid": "e1", "from_node_guid": "idle", "from_port_name": "Next", "to_node_guid": "done" }
//!   ]
//! }
//! ```

use core::fmt;

use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_context::BlackboardEntry;

use crate::condition::{BoxedCondition, Condition};
use crate::edge::EdgeRecord;
use crate::graph::{Graph, NodeRecord, Position};
use crate::node::{BoxedNode, EmptyNode, Node};

/// A polymorphic node reference: registered type name plus its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl NodeSpec {
    /// Creates a spec with no data.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            data: Value::Null,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A polymorphic condition reference: registered type name plus its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ConditionSpec {
    /// Creates a spec with no data.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            data: Value::Null,
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// A node record as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Node guid.
    pub guid: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// The node; `null` leaves the record empty and fails validation.
    #[serde(default)]
    pub node: Option<NodeSpec>,
}

/// An edge record as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDocument {
    /// Edge guid.
    pub guid: String,
    /// Source node guid.
    pub from_node_guid: String,
    /// Source port; empty means `"Next"`.
    #[serde(default)]
    pub from_port_name: String,
    /// Target node guid.
    pub to_node_guid: String,
    /// Gate; absent means always true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
}

/// The serialized form of a [`Graph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Explicit entry node; absent means the first node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_node_guid: Option<String>,
    /// Node records in authored order.
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    /// Edge records in authored order.
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
    /// Blackboard defaults.
    #[serde(default)]
    pub blackboard: Vec<BlackboardEntry>,
}

impl GraphDocument {
    /// Parses a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `json` is not a valid document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload cannot be serialized.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Errors raised while instantiating a document.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The document is not valid JSON for its shape.
    #[error("failed to parse graph document: {0}")]
    Parse(#[from] serde_json::Error),
    /// A node spec names a type nobody registered.
    #[error("node '{guid}' has unknown type '{type_name}'")]
    UnknownNodeType {
        /// Node guid.
        guid: String,
        /// Unregistered type name.
        type_name: String,
    },
    /// A condition spec names a type nobody registered.
    #[error("unknown condition type '{type_name}'")]
    UnknownConditionType {
        /// Unregistered type name.
        type_name: String,
    },
    /// A spec's data doesn't fit its type.
    #[error("invalid data for '{type_name}': {source}")]
    InvalidData {
        /// Type name whose factory rejected the data.
        type_name: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// A condition inside an edge failed to build.
    #[error("edge '{edge}': {source}")]
    Edge {
        /// Edge guid.
        edge: String,
        /// What went wrong.
        #[source]
        source: Box<RegistryError>,
    },
}

type NodeFactory = Box<dyn Fn(&Value, &Registry) -> Result<BoxedNode, RegistryError> + Send + Sync>;
type ConditionFactory =
    Box<dyn Fn(&Value, &Registry) -> Result<BoxedCondition, RegistryError> + Send + Sync>;

/// Maps type names to node and condition factories.
///
/// A new registry knows one node type, `"Empty"` ([`EmptyNode`]).
pub struct Registry {
    nodes: HashMap<String, NodeFactory>,
    conditions: HashMap<String, ConditionFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with only `"Empty"` registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            nodes: HashMap::new(),
            conditions: HashMap::new(),
        };
        registry.register_node_factory("Empty", |_, _| Ok(Box::new(EmptyNode)));
        registry
    }

    /// Registers a node type deserialized from the spec's data.
    ///
    /// Missing data deserializes from an empty object, so types whose fields
    /// all have defaults can be authored without `data`.
    pub fn register_node<T>(&mut self, type_name: impl Into<String>) -> &mut Self
    where
        T: Node + DeserializeOwned,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        self.register_node_factory(type_name, move |data, _| {
            let node: T = from_data(&name, data)?;
            Ok(Box::new(node))
        })
    }

    /// Registers a node factory closure.
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_node_factory<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value, &Registry) -> Result<BoxedNode, RegistryError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.nodes.insert(type_name.clone(), Box::new(factory)).is_some() {
            tracing::warn!(type_name, "node type registered twice, replacing factory");
        }
        self
    }

    /// Registers a condition type deserialized from the spec's data.
    pub fn register_condition<T>(&mut self, type_name: impl Into<String>) -> &mut Self
    where
        T: Condition + DeserializeOwned,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        self.register_condition_factory(type_name, move |data, _| {
            let condition: T = from_data(&name, data)?;
            Ok(Box::new(condition))
        })
    }

    /// Registers a condition factory closure.
    ///
    /// The factory receives the registry so composite conditions can build
    /// nested specs.
    pub fn register_condition_factory<F>(
        &mut self,
        type_name: impl Into<String>,
        factory: F,
    ) -> &mut Self
    where
        F: Fn(&Value, &Registry) -> Result<BoxedCondition, RegistryError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self
            .conditions
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            tracing::warn!(type_name, "condition type registered twice, replacing factory");
        }
        self
    }

    /// Returns true if a node type named `type_name` is registered.
    #[must_use]
    pub fn has_node_type(&self, type_name: &str) -> bool {
        self.nodes.contains_key(type_name)
    }

    /// Returns true if a condition type named `type_name` is registered.
    #[must_use]
    pub fn has_condition_type(&self, type_name: &str) -> bool {
        self.conditions.contains_key(type_name)
    }

    /// Registered node type names, sorted.
    #[must_use]
    pub fn node_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered condition type names, sorted.
    #[must_use]
    pub fn condition_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.conditions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the node described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownNodeType`] or the factory's error.
    pub fn build_node(&self, guid: &str, spec: &NodeSpec) -> Result<BoxedNode, RegistryError> {
        let factory = self
            .nodes
            .get(spec.type_name.as_str())
            .ok_or_else(|| RegistryError::UnknownNodeType {
                guid: guid.to_owned(),
                type_name: spec.type_name.clone(),
            })?;
        factory(&spec.data, self)
    }

    /// Builds the condition described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownConditionType`] or the factory's error.
    pub fn build_condition(&self, spec: &ConditionSpec) -> Result<BoxedCondition, RegistryError> {
        let factory = self
            .conditions
            .get(spec.type_name.as_str())
            .ok_or_else(|| RegistryError::UnknownConditionType {
                type_name: spec.type_name.clone(),
            })?;
        factory(&spec.data, self)
    }

    /// Builds a [`Graph`] from an authored document.
    ///
    /// Structural problems (dangling edges, duplicate guids) are left for
    /// [`Graph::validate`]; only unknown types and bad data fail here.
    ///
    /// # Errors
    ///
    /// Returns the first node or condition that fails to build.
    pub fn instantiate(&self, document: &GraphDocument) -> Result<Graph, RegistryError> {
        let mut graph = Graph::new();

        for doc in &document.nodes {
            let node = doc
                .node
                .as_ref()
                .map(|spec| self.build_node(&doc.guid, spec))
                .transpose()?;
            graph.add_node_record(NodeRecord {
                guid: doc.guid.as_str().into(),
                position: doc.position,
                node,
            });
        }

        for doc in &document.edges {
            let condition = doc
                .condition
                .as_ref()
                .map(|spec| self.build_condition(spec))
                .transpose()
                .map_err(|source| RegistryError::Edge {
                    edge: doc.guid.clone(),
                    source: Box::new(source),
                })?;
            graph.add_edge_record(
                EdgeRecord::new(
                    doc.from_node_guid.as_str(),
                    doc.from_port_name.as_str(),
                    doc.to_node_guid.as_str(),
                )
                .with_guid(doc.guid.as_str())
                .with_boxed_condition(condition),
            );
        }

        if let Some(entry) = &document.entry_node_guid {
            graph.set_entry(entry.as_str());
        }
        for entry in &document.blackboard {
            graph.add_blackboard_default(entry.clone());
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph instantiated"
        );
        Ok(graph)
    }

    /// Parses a JSON document and instantiates it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] for malformed JSON, or any error from
    /// [`Registry::instantiate`].
    pub fn load_json(&self, json: &str) -> Result<Graph, RegistryError> {
        let document = GraphDocument::from_json(json)?;
        self.instantiate(&document)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.node_types())
            .field("conditions", &self.condition_types())
            .finish()
    }
}

/// Deserializes a spec payload, treating `null` as an empty object.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidData`] if the payload doesn't fit `T`.
pub fn from_data<T: DeserializeOwned>(type_name: &str, data: &Value) -> Result<T, RegistryError> {
    let result = if data.is_null() {
        serde_json::from_value(Value::Object(serde_json::Map::new()))
    } else {
        T::deserialize(data)
    };
    result.map_err(|source| RegistryError::InvalidData {
        type_name: type_name.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_context::Context;

    #[derive(Deserialize)]
    struct Labeled {
        #[serde(default)]
        label: String,
    }

    impl Node for Labeled {
        fn output_ports(&self) -> Vec<String> {
            vec![self.label.clone()]
        }
    }

    #[derive(Deserialize)]
    struct Flag {
        key: String,
    }

    impl Condition for Flag {
        fn evaluate(&self, ctx: &Context) -> bool {
            ctx.get(&self.key, false)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_node::<Labeled>("Labeled")
            .register_condition::<Flag>("Flag");
        registry
    }

    #[test]
    fn instantiates_nodes_edges_and_defaults() {
        let doc = GraphDocument::from_json(
            r#"{
                "entry_node_guid": "b",
                "nodes": [
                    { "guid": "a", "position": { "x": 1.0, "y": 2.0 }, "node": { "type": "Labeled", "data": { "label": "Go" } } },
                    { "guid": "b", "node": { "type": "Empty" } }
                ],
                "edges": [
                    { "guid": "e1", "from_node_guid": "a", "from_port_name": "Go", "to_node_guid": "b",
                      "condition": { "type": "Flag", "data": { "key": "armed" } } },
                    { "guid": "e2", "from_node_guid": "b", "to_node_guid": "a" }
                ],
                "blackboard": [ { "key": "armed", "value": { "type": "bool", "value": true } } ]
            }"#,
        )
        .unwrap();

        let graph = registry().instantiate(&doc).unwrap();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.entry().map(|g| g.as_str()), Some("b"));
        assert_eq!(graph.node("a").unwrap().output_ports(), vec!["Go".to_owned()]);
        assert_eq!(graph.record("a").unwrap().position.y, 2.0);
        assert!(!graph.edge("e1").unwrap().is_unconditional());
        assert_eq!(graph.edge("e2").unwrap().from_port, "Next");
        assert_eq!(graph.blackboard_defaults().len(), 1);
    }

    #[test]
    fn missing_data_uses_defaults() {
        let node = registry()
            .build_node("n", &NodeSpec::new("Labeled"))
            .unwrap();
        assert_eq!(node.output_ports(), vec![String::new()]);
    }

    #[test]
    fn unknown_node_type_is_an_error() {
        let doc = GraphDocument {
            nodes: vec![NodeDocument {
                guid: "n".into(),
                position: Position::default(),
                node: Some(NodeSpec::new("Nope")),
            }],
            ..GraphDocument::default()
        };
        let err = registry().instantiate(&doc).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownNodeType { ref type_name, .. } if type_name == "Nope"));
    }

    #[test]
    fn bad_condition_data_names_the_edge() {
        let doc = GraphDocument {
            nodes: vec![NodeDocument {
                guid: "n".into(),
                position: Position::default(),
                node: Some(NodeSpec::new("Empty")),
            }],
            edges: vec![EdgeDocument {
                guid: "e9".into(),
                from_node_guid: "n".into(),
                from_port_name: String::new(),
                to_node_guid: "n".into(),
                condition: Some(ConditionSpec::new("Flag").with_data(json!({ "key": 3 }))),
            }],
            ..GraphDocument::default()
        };
        let err = registry().instantiate(&doc).unwrap_err();
        assert!(err.to_string().starts_with("edge 'e9': invalid data for 'Flag'"));
    }

    #[test]
    fn null_node_is_left_for_validation() {
        let graph = registry()
            .load_json(r#"{ "nodes": [ { "guid": "n", "node": null } ] }"#)
            .unwrap();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            registry().load_json("{ nodes: "),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn document_survives_json() {
        let doc = GraphDocument {
            entry_node_guid: Some("a".into()),
            nodes: vec![NodeDocument {
                guid: "a".into(),
                position: Position { x: 3.0, y: 4.0 },
                node: Some(NodeSpec::new("Labeled").with_data(json!({ "label": "x" }))),
            }],
            ..GraphDocument::default()
        };
        let json = doc.to_json_pretty().unwrap();
        assert_eq!(GraphDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn lists_registered_types() {
        let registry = registry();
        assert_eq!(registry.node_types(), vec!["Empty", "Labeled"]);
        assert!(registry.has_condition_type("Flag"));
        assert!(!registry.has_node_type("Flag"));
    }
}
