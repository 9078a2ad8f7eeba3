//! Typed blackboard seeds.
//!
//! The blackboard itself stores arbitrary values, but authored defaults and
//! host overrides are restricted to the four types an editor can express.
//! [`BlackboardEntry`] lists are what the initial snapshot is made of.

use core::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::blackboard::Blackboard;

/// A typed value that can seed the blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BlackboardValue {
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Boolean flag.
    Bool(bool),
    /// UTF-8 string.
    String(String),
}

impl BlackboardValue {
    /// Writes this value into the blackboard under `key`, keeping its Rust type
    /// (`i32`, `f32`, `bool` or `String`).
    pub fn write_into(&self, blackboard: &mut Blackboard, key: impl Into<String>) {
        match self {
            BlackboardValue::Int(v) => blackboard.set(key, *v),
            BlackboardValue::Float(v) => blackboard.set(key, *v),
            BlackboardValue::Bool(v) => blackboard.set(key, *v),
            BlackboardValue::String(v) => blackboard.set(key, v.clone()),
        }
    }

    /// Reads `key` back as a typed value, if it holds one of the four seed types.
    #[must_use]
    pub fn read_from(blackboard: &Blackboard, key: &str) -> Option<Self> {
        if let Some(v) = blackboard.get_ref::<i32>(key) {
            return Some(BlackboardValue::Int(*v));
        }
        if let Some(v) = blackboard.get_ref::<f32>(key) {
            return Some(BlackboardValue::Float(*v));
        }
        if let Some(v) = blackboard.get_ref::<bool>(key) {
            return Some(BlackboardValue::Bool(*v));
        }
        blackboard
            .get_ref::<String>(key)
            .map(|v| BlackboardValue::String(v.clone()))
    }

    /// Returns the value as a number, if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BlackboardValue::Int(v) => Some(f64::from(*v)),
            BlackboardValue::Float(v) => Some(f64::from(*v)),
            BlackboardValue::Bool(_) | BlackboardValue::String(_) => None,
        }
    }

    /// Returns the name of the value's type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            BlackboardValue::Int(_) => "int",
            BlackboardValue::Float(_) => "float",
            BlackboardValue::Bool(_) => "bool",
            BlackboardValue::String(_) => "string",
        }
    }
}

impl fmt::Display for BlackboardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlackboardValue::Int(v) => write!(f, "{v}"),
            BlackboardValue::Float(v) => write!(f, "{v}"),
            BlackboardValue::Bool(v) => write!(f, "{v}"),
            BlackboardValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i32> for BlackboardValue {
    fn from(v: i32) -> Self {
        BlackboardValue::Int(v)
    }
}

impl From<f32> for BlackboardValue {
    fn from(v: f32) -> Self {
        BlackboardValue::Float(v)
    }
}

impl From<bool> for BlackboardValue {
    fn from(v: bool) -> Self {
        BlackboardValue::Bool(v)
    }
}

impl From<&str> for BlackboardValue {
    fn from(v: &str) -> Self {
        BlackboardValue::String(v.to_owned())
    }
}

impl From<String> for BlackboardValue {
    fn from(v: String) -> Self {
        BlackboardValue::String(v)
    }
}

/// A keyed seed for the initial blackboard snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboardEntry {
    /// Blackboard key.
    pub key: String,
    /// Typed value.
    pub value: BlackboardValue,
}

impl BlackboardEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<BlackboardValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Merges authored defaults with host overrides.
///
/// Overrides win on key collision. Keys keep the position of their first
/// appearance (defaults first, then override-only keys). Duplicate keys
/// within one list resolve to the last occurrence.
#[must_use]
pub fn merge_entries(
    defaults: &[BlackboardEntry],
    overrides: &[BlackboardEntry],
) -> Vec<BlackboardEntry> {
    let mut merged: Vec<BlackboardEntry> = Vec::with_capacity(defaults.len() + overrides.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in defaults.iter().chain(overrides) {
        match index.get(&entry.key) {
            Some(&slot) => merged[slot].value = entry.value.clone(),
            None => {
                index.insert(entry.key.clone(), merged.len());
                merged.push(entry.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_shape() {
        let entry = BlackboardEntry::new("speed", 2.5_f32);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "speed", "value": {"type": "float", "value": 2.5}})
        );
    }

    #[test]
    fn write_then_read_keeps_type() {
        let mut bb = Blackboard::new();
        BlackboardValue::Int(3).write_into(&mut bb, "lives");
        BlackboardValue::from("north").write_into(&mut bb, "heading");

        assert_eq!(bb.get("lives", 0_i32), 3);
        assert_eq!(
            BlackboardValue::read_from(&bb, "heading"),
            Some(BlackboardValue::String("north".into()))
        );
        assert_eq!(BlackboardValue::read_from(&bb, "missing"), None);
    }

    #[test]
    fn merge_overrides_win() {
        let defaults = vec![
            BlackboardEntry::new("a", 1),
            BlackboardEntry::new("b", true),
        ];
        let overrides = vec![
            BlackboardEntry::new("b", false),
            BlackboardEntry::new("c", "new"),
        ];

        let merged = merge_entries(&defaults, &overrides);
        assert_eq!(
            merged,
            vec![
                BlackboardEntry::new("a", 1),
                BlackboardEntry::new("b", false),
                BlackboardEntry::new("c", "new"),
            ]
        );
    }

    #[test]
    fn numeric_view() {
        assert_eq!(BlackboardValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(BlackboardValue::Bool(true).as_f64(), None);
    }
}
