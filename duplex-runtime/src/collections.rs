//! A map that preserves insertion order, used for every Helper's
//! children map (spec §3: "insertion order preserved for replay").
//!
//! Child counts per Helper are small (exchanges per session, messages per
//! exchange, tool calls per message), so a linear scan on lookup is the
//! right trade-off over pulling in an external ordered-map crate.

use std::collections::HashMap;

#[derive(Debug)]
pub struct OrderedMap<V> {
    order: Vec<String>,
    entries: HashMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: V) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.order.retain(|k| k != key);
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(move |id| self.entries.get(id))
    }

    /// Removes every entry, returning them in insertion order.
    pub fn drain_in_order(&mut self) -> Vec<(String, V)> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|v| (id, v)))
            .collect()
    }
}

#[cfg(test)]
#[path = "collections.test.rs"]
mod tests;
