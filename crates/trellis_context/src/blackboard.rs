//! Type-erased key/value storage shared by nodes and conditions.
//!
//! Reads are fail-soft: a missing key or a value of a different type yields
//! the caller's default instead of an error, so a graph that references a
//! renamed key degrades instead of halting the host.

use core::any::{Any, type_name};
use core::fmt;

use hashbrown::HashMap;

/// A single stored value along with its type name for diagnostics.
struct Slot {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Per-run mutable key/value store.
#[derive(Default)]
pub struct Blackboard {
    slots: HashMap<String, Slot>,
}

impl Blackboard {
    /// Creates an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value of any type.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.slots.insert(
            key.into(),
            Slot {
                value: Box::new(value),
                type_name: type_name::<T>(),
            },
        );
    }

    /// Returns a clone of the value under `key`, or `default` when the key is
    /// missing or holds a different type.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &str, default: T) -> T {
        match self.slots.get(key) {
            Some(slot) => match slot.value.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => {
                    tracing::trace!(
                        key,
                        stored = slot.type_name,
                        requested = type_name::<T>(),
                        "blackboard type mismatch, using default"
                    );
                    default
                }
            },
            None => {
                tracing::trace!(key, "blackboard key missing, using default");
                default
            }
        }
    }

    /// Returns a reference to the value under `key` if it has type `T`.
    #[must_use]
    pub fn get_ref<T: 'static>(&self, key: &str) -> Option<&T> {
        self.slots.get(key)?.value.downcast_ref::<T>()
    }

    /// Returns a mutable reference to the value under `key` if it has type `T`.
    #[must_use]
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.slots.get_mut(key)?.value.downcast_mut::<T>()
    }

    /// Returns true if any value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Returns the type name of the value under `key`.
    #[must_use]
    pub fn type_name_of(&self, key: &str) -> Option<&'static str> {
        self.slots.get(key).map(|slot| slot.type_name)
    }

    /// Removes the value under `key`. Returns true if something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over stored keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, slot) in &self.slots {
            map.entry(key, &slot.type_name);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn set_and_get() {
        let mut bb = Blackboard::new();
        bb.set("hp", 10_i32);
        assert_eq!(bb.get("hp", 0_i32), 10);
        assert_eq!(bb.type_name_of("hp"), Some("i32"));
    }

    #[test]
    fn missing_key_returns_default() {
        let bb = Blackboard::new();
        assert_eq!(bb.get("missing", 7_i32), 7);
    }

    #[test]
    fn type_mismatch_returns_default() {
        let mut bb = Blackboard::new();
        bb.set("hp", 10_i32);
        assert_eq!(bb.get("hp", 1.5_f32), 1.5);
        assert_eq!(bb.get_ref::<String>("hp"), None);
    }

    #[test]
    fn overwrite_changes_type() {
        let mut bb = Blackboard::new();
        bb.set("slot", 1_i32);
        bb.set("slot", String::from("one"));
        assert_eq!(bb.get("slot", String::new()), "one");
        assert_eq!(bb.get("slot", 0_i32), 0);
        assert_eq!(bb.len(), 1);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut bb = Blackboard::new();
        bb.set("t", 2.0_f32);
        if let Some(t) = bb.get_mut::<f32>("t") {
            *t -= 0.5;
        }
        assert_eq!(bb.get("t", 0.0_f32), 1.5);
    }

    #[test]
    fn remove_and_clear() {
        let mut bb = Blackboard::new();
        bb.set("a", true);
        bb.set("b", false);
        assert!(bb.remove("a"));
        assert!(!bb.remove("a"));
        bb.clear();
        assert!(bb.is_empty());
    }

    proptest! {
        #[test]
        fn reads_never_fail(key in ".{0,16}", default in any::<i32>(), stored in any::<bool>()) {
            let mut bb = Blackboard::new();
            prop_assert_eq!(bb.get(&key, default), default);
            bb.set(key.clone(), stored);
            prop_assert_eq!(bb.get(&key, default), default);
            prop_assert_eq!(bb.get(&key, !stored), stored);
        }
    }
}
