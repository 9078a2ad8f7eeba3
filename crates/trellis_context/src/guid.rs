//! Opaque identifiers for graph nodes and edges.
//!
//! Guids are authored strings (usually generated by an editor). Generated
//! guids use nanoid, so graphs built in code never need to coordinate ids.
//!
//! Internally uses `Arc<str>` for cheap cloning (reference count bump only).

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

macro_rules! guid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(Arc<str>);

        impl $name {
            /// Creates a new identifier with a unique nanoid.
            #[must_use]
            pub fn new() -> Self {
                Self(nanoid::nanoid!().into())
            }

            /// Creates an identifier from a specific string value.
            #[must_use]
            pub fn from_string(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id.into())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

guid_type!(
    /// Identifier of a node record, unique within a graph.
    NodeGuid
);

guid_type!(
    /// Identifier of an edge record, unique within a graph.
    EdgeGuid
);

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn generated_guids_are_unique() {
        assert_ne!(NodeGuid::new(), NodeGuid::new());
        assert!(!EdgeGuid::new().is_empty());
    }

    #[test]
    fn display_is_the_raw_id() {
        let guid = NodeGuid::from("wait-1");
        assert_eq!(guid.to_string(), "wait-1");
        assert_eq!(guid.as_str(), "wait-1");
    }

    #[test]
    fn lookup_by_str() {
        let mut set = HashSet::new();
        set.insert(NodeGuid::from("a"));
        assert!(set.contains("a"));
        assert!(!set.contains("b"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let guid = EdgeGuid::from("e1");
        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, "\"e1\"");
        let back: EdgeGuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, guid);
    }
}
