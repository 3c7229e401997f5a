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
//! Sets of entities
//!
//! An [`EntitySet`] is a handle to shared set storage. A read-only view made
//! with [`EntitySet::read_only`] shares that storage, so it reflects every
//! later mutation of the set it was made from, while its own mutators fail
//! with [`EntijError::ReadOnly`].
//!
//! Predicate queries run on a snapshot of the members; with the `parallel`
//! feature they are evaluated with rayon.

use crate::entity::Entity;
use crate::error::{EntijError, Result};
use crate::sync::{read, write};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A set of entities with algebra and live read-only views
pub struct EntitySet {
    members: Arc<RwLock<FxHashSet<Entity>>>,
    read_only: bool,
}

impl EntitySet {
    /// Create an empty, writable set
    pub fn new() -> Self {
        Self::from_members(FxHashSet::default())
    }

    /// Create an empty set with room for `capacity` members
    pub fn with_capacity(capacity: usize) -> Self {
        let mut members = FxHashSet::default();
        members.reserve(capacity);
        Self::from_members(members)
    }

    fn from_members(members: FxHashSet<Entity>) -> Self {
        EntitySet {
            members: Arc::new(RwLock::new(members)),
            read_only: false,
        }
    }

    fn writable(&self) -> Result<()> {
        if self.read_only {
            Err(EntijError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Insert `entity`; `Ok(false)` if it was already a member
    pub fn add(&self, entity: &Entity) -> Result<bool> {
        self.writable()?;
        Ok(write(&self.members).insert(entity.clone()))
    }

    /// Insert every entity of `entities`, returning how many were new
    pub fn add_all<I>(&self, entities: I) -> Result<usize>
    where
        I: IntoIterator<Item = Entity>,
    {
        self.writable()?;
        let mut members = write(&self.members);
        Ok(entities.into_iter().filter(|e| members.insert(e.clone())).count())
    }

    /// Remove `entity`; `Ok(false)` if it was not a member
    pub fn remove(&self, entity: &Entity) -> Result<bool> {
        self.writable()?;
        Ok(write(&self.members).remove(entity))
    }

    /// Remove every member
    pub fn clear(&self) -> Result<()> {
        self.writable()?;
        write(&self.members).clear();
        Ok(())
    }

    /// Whether `entity` is a member
    pub fn contains(&self, entity: &Entity) -> bool {
        read(&self.members).contains(entity)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        read(&self.members).len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        read(&self.members).is_empty()
    }

    /// Snapshot of the members, in no particular order
    pub fn to_vec(&self) -> Vec<Entity> {
        read(&self.members).iter().cloned().collect()
    }

    /// Iterate over a snapshot of the members
    pub fn iter(&self) -> std::vec::IntoIter<Entity> {
        self.to_vec().into_iter()
    }

    /// Some member, if the set is not empty
    pub fn any(&self) -> Option<Entity> {
        read(&self.members).iter().next().cloned()
    }

    /// Live view of this set that rejects mutation
    pub fn read_only(&self) -> EntitySet {
        EntitySet {
            members: Arc::clone(&self.members),
            read_only: true,
        }
    }

    /// Whether mutators are rejected
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether `other` is backed by the same storage as this set
    pub fn shares_storage(&self, other: &EntitySet) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }

    /// Members that also appear in `other`, as a new set
    pub fn and<I>(&self, other: I) -> EntitySet
    where
        I: IntoIterator<Item = Entity>,
    {
        let candidates: Vec<Entity> = other.into_iter().collect();
        let members = read(&self.members);
        let result = candidates
            .into_iter()
            .filter(|e| members.contains(e))
            .collect::<FxHashSet<_>>();
        Self::from_members(result)
    }

    /// Members of this set and of `other`, as a new set
    pub fn or<I>(&self, other: I) -> EntitySet
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut result = read(&self.members).clone();
        result.extend(other);
        Self::from_members(result)
    }

    /// Members that do not appear in `other`, as a new set
    pub fn not<I>(&self, other: I) -> EntitySet
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut result = read(&self.members).clone();
        for e in other {
            result.remove(&e);
        }
        Self::from_members(result)
    }

    /// Whether any member satisfies `predicate`
    pub fn has_any<P>(&self, predicate: P) -> bool
    where
        P: Fn(&Entity) -> bool + Send + Sync,
    {
        let snapshot = self.to_vec();

        #[cfg(feature = "parallel")]
        {
            snapshot.par_iter().any(|e| predicate(e))
        }

        #[cfg(not(feature = "parallel"))]
        {
            snapshot.iter().any(|e| predicate(e))
        }
    }

    /// Some member satisfying `predicate`
    pub fn find_any<P>(&self, predicate: P) -> Option<Entity>
    where
        P: Fn(&Entity) -> bool + Send + Sync,
    {
        let snapshot = self.to_vec();

        #[cfg(feature = "parallel")]
        {
            snapshot.into_par_iter().find_any(|e| predicate(e))
        }

        #[cfg(not(feature = "parallel"))]
        {
            snapshot.into_iter().find(|e| predicate(e))
        }
    }

    /// Members satisfying `predicate`, as a new set
    pub fn filter<P>(&self, predicate: P) -> EntitySet
    where
        P: Fn(&Entity) -> bool + Send + Sync,
    {
        let snapshot = self.to_vec();

        #[cfg(feature = "parallel")]
        let members: FxHashSet<Entity> =
            snapshot.into_par_iter().filter(|e| predicate(e)).collect();

        #[cfg(not(feature = "parallel"))]
        let members: FxHashSet<Entity> = snapshot.into_iter().filter(|e| predicate(e)).collect();

        Self::from_members(members)
    }

    /// Number of members satisfying `predicate`
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Entity) -> bool + Send + Sync,
    {
        let snapshot = self.to_vec();

        #[cfg(feature = "parallel")]
        {
            snapshot.par_iter().filter(|e| predicate(e)).count()
        }

        #[cfg(not(feature = "parallel"))]
        {
            snapshot.iter().filter(|e| predicate(e)).count()
        }
    }
}

impl Default for EntitySet {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the current members into a new writable set
impl Clone for EntitySet {
    fn clone(&self) -> Self {
        Self::from_members(read(&self.members).clone())
    }
}

impl PartialEq for EntitySet {
    fn eq(&self, other: &Self) -> bool {
        if self.shares_storage(other) {
            return true;
        }
        let ours = self.to_vec();
        let theirs = read(&other.members);
        ours.len() == theirs.len() && ours.iter().all(|e| theirs.contains(e))
    }
}

impl Eq for EntitySet {}

impl fmt::Debug for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(read(&self.members).iter()).finish()
    }
}

impl FromIterator<Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self::from_members(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = &'a Entity>>(iter: I) -> Self {
        Self::from_members(iter.into_iter().cloned().collect())
    }
}

impl IntoIterator for &EntitySet {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
