//! Ordered, key-unique collections used by the provider aggregate.

use crate::error::{GatewayError, GatewayResult};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An item that owns its collection key.
pub trait Keyed {
    /// Entity label used in error messages
    const ENTITY: &'static str;

    /// The unique key inside the owning collection
    fn key(&self) -> &str;
}

/// Insertion-ordered map whose only insert path rejects duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedCollection<V> {
    items: IndexMap<String, V>,
}

impl<V> Default for KeyedCollection<V> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<V: Keyed> KeyedCollection<V> {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`, failing without modification if its key is taken
    pub fn try_insert(&mut self, item: V) -> GatewayResult<()> {
        let key = item.key().to_string();
        if self.items.contains_key(&key) {
            return Err(GatewayError::conflict(format!(
                "{} with key '{key}' already exists",
                V::ENTITY
            )));
        }
        self.items.insert(key, item);
        Ok(())
    }

    /// Remove by key, preserving the order of the remaining items
    pub fn remove(&mut self, key: &str) -> GatewayResult<V> {
        self.items
            .shift_remove(key)
            .ok_or_else(|| GatewayError::not_found(V::ENTITY, key))
    }

    /// Look up by key
    pub fn get(&self, key: &str) -> Option<&V> {
        self.items.get(key)
    }

    /// Mutable lookup by key; the key itself must not change through this
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.items.get_mut(key)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// First item matching `predicate`
    pub fn find(&self, mut predicate: impl FnMut(&V) -> bool) -> Option<&V> {
        self.items.values().find(|v| predicate(v))
    }

    /// Items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.items.values()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<V: Serialize> Serialize for KeyedCollection<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

impl<'de, V: Keyed + Deserialize<'de>> Deserialize<'de> for KeyedCollection<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<V>::deserialize(deserializer)?;
        let mut collection = Self::new();
        for item in items {
            collection
                .try_insert(item)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(collection)
    }
}
