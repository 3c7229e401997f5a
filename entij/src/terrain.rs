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
//! Auto-indexing entity container
//!
//! A [`Terrain`] indexes the entities it contains by name, position and state.
//! The indices follow the entities: every contained entity carries listeners
//! that move it between index keys whenever its position or state is set, and
//! that remove it from the Terrain when it is destroyed.
//!
//! A Terrain is itself an entity (see [`AsEntity`]); its lifecycle listeners
//! are told about additions and removals, with the affected entity as the
//! event source.
//!
//! # Example
//!
//! ```
//! use entij::{Entity, Terrain};
//!
//! let board = Terrain::named("board");
//! let pawn = Entity::named("pawn");
//! board.add(&pawn);
//! pawn.set_posit(5);
//! assert!(board.get_by_posit(5).contains(&pawn));
//! assert!(board.get_by_posit(0).is_empty());
//! ```

use crate::collections::{AllEntities, EntityMultiMap, EntitySet};
use crate::entity::{AsEntity, Entity};
use crate::event::{LifecycleEvent, LifecycleKind};
use crate::listener::ListenerHandle;
use crate::sync::lock;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

struct Registration {
    posit_listener: ListenerHandle,
    state_listener: ListenerHandle,
    lifecycle_listener: ListenerHandle,
    indexed_posit: i64,
    indexed_state: i64,
}

struct TerrainInner {
    entity: Entity,
    // coarse lock: held by every index mutation, never while events fire
    members: Mutex<FxHashMap<Entity, Registration>>,
    by_name: EntityMultiMap<Option<String>>,
    by_posit: EntityMultiMap<i64>,
    by_state: EntityMultiMap<i64>,
}

impl TerrainInner {
    fn reindex_posit(&self, member: &Entity) {
        let mut members = lock(&self.members);
        let Some(registration) = members.get_mut(member) else {
            return;
        };
        let current = member.posit();
        if registration.indexed_posit != current {
            self.by_posit.remove_from_key(&registration.indexed_posit, member);
            self.by_posit.add_to_key(current, member);
            registration.indexed_posit = current;
        }
    }

    fn reindex_state(&self, member: &Entity) {
        let mut members = lock(&self.members);
        let Some(registration) = members.get_mut(member) else {
            return;
        };
        let current = member.state();
        if registration.indexed_state != current {
            self.by_state.remove_from_key(&registration.indexed_state, member);
            self.by_state.add_to_key(current, member);
            registration.indexed_state = current;
        }
    }

    fn insert(self: &Arc<Self>, member: &Entity) -> bool {
        {
            let mut members = lock(&self.members);
            if members.contains_key(member) {
                return false;
            }
            let registration = self.register(member);
            self.by_name.add_to_key(member.name().map(str::to_string), member);
            self.by_posit.add_to_key(registration.indexed_posit, member);
            self.by_state.add_to_key(registration.indexed_state, member);
            members.insert(member.clone(), registration);
        }
        debug!("terrain {} added {}", self.entity, member);
        self.entity
            .fire_lifecycle(&LifecycleEvent::new(member.clone(), LifecycleKind::Added));
        true
    }

    /// Listeners first, then the fields they guard, so no change is missed
    fn register(self: &Arc<Self>, member: &Entity) -> Registration {
        let weak = Arc::downgrade(self);
        let posit_listener = member.add_position_listener_removable(move |event| {
            with_terrain(&weak, |terrain| terrain.reindex_posit(&event.source))
        });
        let weak = Arc::downgrade(self);
        let state_listener = member.add_state_listener_removable(move |event| {
            with_terrain(&weak, |terrain| terrain.reindex_state(&event.source))
        });
        let weak = Arc::downgrade(self);
        let lifecycle_listener = member.add_lifecycle_listener_removable(move |event| {
            if event.kind != LifecycleKind::Destroyed {
                return true;
            }
            if let Some(terrain) = weak.upgrade() {
                terrain.extract(&event.source, LifecycleKind::DestroyRemoved);
            }
            false
        });
        Registration {
            posit_listener,
            state_listener,
            lifecycle_listener,
            indexed_posit: member.posit(),
            indexed_state: member.state(),
        }
    }

    fn extract(&self, member: &Entity, kind: LifecycleKind) -> bool {
        let registration = {
            let mut members = lock(&self.members);
            let Some(registration) = members.remove(member) else {
                return false;
            };
            self.by_name
                .remove_from_key(&member.name().map(str::to_string), member);
            self.by_posit
                .remove_from_key(&registration.indexed_posit, member);
            self.by_state
                .remove_from_key(&registration.indexed_state, member);
            registration
        };
        member.remove_position_listener(registration.posit_listener);
        member.remove_state_listener(registration.state_listener);
        member.remove_lifecycle_listener(registration.lifecycle_listener);
        debug!("terrain {} removed {} ({:?})", self.entity, member, kind);
        self.entity
            .fire_lifecycle(&LifecycleEvent::new(member.clone(), kind));
        true
    }
}

impl Drop for TerrainInner {
    fn drop(&mut self) {
        let members = std::mem::take(&mut *lock(&self.members));
        for (member, registration) in members {
            member.remove_position_listener(registration.posit_listener);
            member.remove_state_listener(registration.state_listener);
            member.remove_lifecycle_listener(registration.lifecycle_listener);
        }
    }
}

/// Run `update` against the terrain; `false` once it is gone so the listener is dropped
fn with_terrain<F>(weak: &Weak<TerrainInner>, update: F) -> bool
where
    F: FnOnce(&TerrainInner),
{
    match weak.upgrade() {
        Some(terrain) => {
            update(&terrain);
            true
        }
        None => false,
    }
}

/// An entity that contains and indexes other entities
///
/// Cloning yields another handle to the same Terrain.
#[derive(Clone)]
pub struct Terrain {
    inner: Arc<TerrainInner>,
}

impl Terrain {
    /// Create an anonymous, empty Terrain
    pub fn new() -> Self {
        Self::from_entity(Entity::new())
    }

    /// Create a named, empty Terrain
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_entity(Entity::named(name))
    }

    fn from_entity(entity: Entity) -> Self {
        Terrain {
            inner: Arc::new(TerrainInner {
                entity,
                members: Mutex::new(FxHashMap::default()),
                by_name: EntityMultiMap::new(),
                by_posit: EntityMultiMap::new(),
                by_state: EntityMultiMap::new(),
            }),
        }
    }

    /// The entity this Terrain is
    pub fn entity(&self) -> &Entity {
        &self.inner.entity
    }

    /// Add `member` and index it at its current name, position and state
    ///
    /// Fires [`LifecycleKind::Added`]. Returns `false` without firing if the
    /// entity is already contained, or is this Terrain itself.
    pub fn add<E: AsEntity + ?Sized>(&self, member: &E) -> bool {
        let member = member.as_entity();
        if member == &self.inner.entity {
            warn!("terrain {} cannot contain itself", self.inner.entity);
            return false;
        }
        self.inner.insert(member)
    }

    /// Remove `member` from every index
    ///
    /// Fires [`LifecycleKind::Removed`]. Returns `false` without firing if the
    /// entity is not contained.
    pub fn remove<E: AsEntity + ?Sized>(&self, member: &E) -> bool {
        self.inner.extract(member.as_entity(), LifecycleKind::Removed)
    }

    /// Remove every contained entity, firing one event per entity
    pub fn clear(&self) {
        let members: Vec<Entity> = lock(&self.inner.members).keys().cloned().collect();
        for member in members {
            self.inner.extract(&member, LifecycleKind::Removed);
        }
    }

    /// Whether `member` is contained
    pub fn contains<E: AsEntity + ?Sized>(&self, member: &E) -> bool {
        lock(&self.inner.members).contains_key(member.as_entity())
    }

    /// Number of contained entities
    pub fn entity_count(&self) -> usize {
        lock(&self.inner.members).len()
    }

    /// Contained entities called `name`, as a read-only view
    pub fn get_by_name(&self, name: &str) -> EntitySet {
        self.inner.by_name.get(&Some(name.to_string()))
    }

    /// Contained entities without a name, as a read-only view
    pub fn get_unnamed(&self) -> EntitySet {
        self.inner.by_name.get(&None)
    }

    /// Contained entities at `posit`, as a read-only view
    pub fn get_by_posit(&self, posit: i64) -> EntitySet {
        self.inner.by_posit.get(&posit)
    }

    /// Contained entities in `state`, as a read-only view
    pub fn get_by_state(&self, state: i64) -> EntitySet {
        self.inner.by_state.get(&state)
    }

    /// Live view over every contained entity
    pub fn get_all(&self) -> AllEntities<i64> {
        self.inner.by_posit.all()
    }

    /// Positions currently occupied
    pub fn occupied_posits(&self) -> Vec<i64> {
        self.inner.by_posit.keys()
    }

    /// Observe additions, removals, and this Terrain's own destruction
    pub fn add_lifecycle_listener<F>(&self, observer: F) -> ListenerHandle
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.inner.entity.add_lifecycle_listener(observer)
    }

    /// Lifecycle listener removed the first time it returns `false`
    pub fn add_lifecycle_listener_removable<F>(&self, predicate: F) -> ListenerHandle
    where
        F: Fn(&LifecycleEvent) -> bool + Send + Sync + 'static,
    {
        self.inner.entity.add_lifecycle_listener_removable(predicate)
    }

    /// Unregister a lifecycle listener
    pub fn remove_lifecycle_listener(&self, handle: ListenerHandle) -> bool {
        self.inner.entity.remove_lifecycle_listener(handle)
    }

    /// Destroy the Terrain's entity; contained entities are left untouched
    pub fn destroy(&self) {
        self.inner.entity.destroy();
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Self::new()
    }
}

impl AsEntity for Terrain {
    fn as_entity(&self) -> &Entity {
        &self.inner.entity
    }
}

impl fmt::Debug for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terrain")
            .field("entity", &self.inner.entity)
            .field("members", &self.entity_count())
            .finish()
    }
}
