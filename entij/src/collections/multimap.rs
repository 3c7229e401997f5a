// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Keyed index of entity sets
//!
//! [`EntityMultiMap`] maps keys to [`EntitySet`]s. A key whose set becomes
//! empty is evicted at once, so no key ever maps to an empty set. The total
//! number of (key, entity) associations is tracked incrementally.

use crate::collections::EntitySet;
use crate::entity::Entity;
use crate::sync::{read, write};
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, RwLock};

static EMPTY: OnceLock<EntitySet> = OnceLock::new();

/// Shared read-only empty set returned for absent keys
pub fn empty_set() -> EntitySet {
    EMPTY.get_or_init(|| EntitySet::new().read_only()).read_only()
}

struct Index<K> {
    sets: FxHashMap<K, EntitySet>,
    size: usize,
}

impl<K: Eq + Hash> Index<K> {
    fn evict_if_empty(&mut self, key: &K) {
        if self.sets.get(key).map_or(false, EntitySet::is_empty) {
            self.sets.remove(key);
        }
    }
}

/// Index from keys to sets of entities
pub struct EntityMultiMap<K> {
    index: Arc<RwLock<Index<K>>>,
}

impl<K> EntityMultiMap<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty index
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty index with room for `capacity` keys
    pub fn with_capacity(capacity: usize) -> Self {
        let mut sets = FxHashMap::default();
        sets.reserve(capacity);
        EntityMultiMap {
            index: Arc::new(RwLock::new(Index { sets, size: 0 })),
        }
    }

    /// Read-only view of the set for `key`
    ///
    /// The view follows the key's set while the key stays present. An absent
    /// key yields a shared empty set.
    pub fn get(&self, key: &K) -> EntitySet {
        read(&self.index)
            .sets
            .get(key)
            .map(EntitySet::read_only)
            .unwrap_or_else(empty_set)
    }

    /// Associate `entity` with `key`; `false` if it already was
    pub fn add_to_key(&self, key: K, entity: &Entity) -> bool {
        let mut index = write(&self.index);
        let set = index.sets.entry(key).or_default();
        // sets held by the index are never read-only
        let added = set.add(entity).unwrap_or(false);
        if added {
            index.size += 1;
        }
        added
    }

    /// Associate every entity of `entities` with `key`, returning how many were new
    pub fn add<I>(&self, key: K, entities: I) -> usize
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut index = write(&self.index);
        let set = index.sets.entry(key.clone()).or_default();
        let added = set.add_all(entities).unwrap_or(0);
        index.size += added;
        index.evict_if_empty(&key);
        added
    }

    /// Replace the set for `key`, returning the previous one
    ///
    /// An empty `entities` leaves the key absent.
    pub fn set<I>(&self, key: K, entities: I) -> Option<EntitySet>
    where
        I: IntoIterator<Item = Entity>,
    {
        let replacement: EntitySet = entities.into_iter().collect();
        let mut index = write(&self.index);
        let previous = index.sets.remove(&key);
        if let Some(previous) = &previous {
            index.size -= previous.len();
        }
        if !replacement.is_empty() {
            index.size += replacement.len();
            index.sets.insert(key, replacement);
        }
        previous
    }

    /// Dissociate `entity` from `key`; `false` if it was not associated
    pub fn remove_from_key(&self, key: &K, entity: &Entity) -> bool {
        let mut index = write(&self.index);
        let removed = index
            .sets
            .get(key)
            .map_or(false, |set| set.remove(entity).unwrap_or(false));
        if removed {
            index.size -= 1;
            index.evict_if_empty(key);
        }
        removed
    }

    /// Remove `key` and return its former set
    pub fn remove(&self, key: &K) -> Option<EntitySet> {
        let mut index = write(&self.index);
        let removed = index.sets.remove(key)?;
        index.size -= removed.len();
        Some(removed)
    }

    /// Whether `entity` is associated with `key`
    pub fn contained_in_key(&self, key: &K, entity: &Entity) -> bool {
        read(&self.index)
            .sets
            .get(key)
            .map_or(false, |set| set.contains(entity))
    }

    /// Number of entities associated with `key`
    pub fn count_in_key(&self, key: &K) -> usize {
        read(&self.index).sets.get(key).map_or(0, EntitySet::len)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &K) -> bool {
        read(&self.index).sets.contains_key(key)
    }

    /// Total number of (key, entity) associations
    pub fn size(&self) -> usize {
        read(&self.index).size
    }

    /// Whether the index holds no associations
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of keys present
    pub fn key_count(&self) -> usize {
        read(&self.index).sets.len()
    }

    /// Snapshot of the keys present
    pub fn keys(&self) -> Vec<K> {
        read(&self.index).sets.keys().cloned().collect()
    }

    /// Remove every key
    pub fn clear(&self) {
        let mut index = write(&self.index);
        index.sets.clear();
        index.size = 0;
    }

    /// Live view over every association of the index
    pub fn all(&self) -> AllEntities<K> {
        AllEntities {
            index: Arc::clone(&self.index),
        }
    }
}

impl<K> Default for EntityMultiMap<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Live view over every entity of an [`EntityMultiMap`]
///
/// An entity associated with several keys appears once per key. Each query
/// and each call to [`AllEntities::iter`] observes the index as it is at that
/// moment.
pub struct AllEntities<K> {
    index: Arc<RwLock<Index<K>>>,
}

impl<K> AllEntities<K>
where
    K: Eq + Hash + Clone,
{
    /// Total number of associations
    pub fn len(&self) -> usize {
        read(&self.index).size
    }

    /// Whether the index holds no associations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `entity` is associated with any key
    pub fn contains(&self, entity: &Entity) -> bool {
        read(&self.index).sets.values().any(|set| set.contains(entity))
    }

    /// Flattening iterator over the current sets
    ///
    /// Keys are visited in the order they were present when iteration
    /// started; each key's set is read when the iterator reaches it.
    pub fn iter(&self) -> AllIter<K> {
        AllIter {
            index: Arc::clone(&self.index),
            keys: read(&self.index).sets.keys().cloned().collect::<Vec<_>>().into_iter(),
            current: Vec::new().into_iter(),
        }
    }
}

impl<K> IntoIterator for &AllEntities<K>
where
    K: Eq + Hash + Clone,
{
    type Item = Entity;
    type IntoIter = AllIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`AllEntities::iter`]
pub struct AllIter<K> {
    index: Arc<RwLock<Index<K>>>,
    keys: std::vec::IntoIter<K>,
    current: std::vec::IntoIter<Entity>,
}

impl<K> Iterator for AllIter<K>
where
    K: Eq + Hash,
{
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        loop {
            if let Some(entity) = self.current.next() {
                return Some(entity);
            }
            let key = self.keys.next()?;
            self.current = read(&self.index)
                .sets
                .get(&key)
                .map(EntitySet::to_vec)
                .unwrap_or_default()
                .into_iter();
        }
    }
}
