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
//! Entity events
//!
//! One event type per listener category. Every event carries its `source`,
//! the entity whose field changed. For Terrain add/remove notifications the
//! source is the entity that was added or removed, not the Terrain.

use crate::entity::Entity;
use crate::value::Value;
use std::collections::HashMap;

/// Fired whenever the position of an entity is set, even to the same value
#[derive(Debug, Clone)]
pub struct PositEvent {
    /// Entity whose position was set
    pub source: Entity,
    /// Input that caused the change, if it came from a reaction
    pub input: Option<Value>,
    /// Position before the change
    pub previous: i64,
    /// Position after the change
    pub next: i64,
}

impl PositEvent {
    /// Check whether the position actually changed
    pub fn changed(&self) -> bool {
        self.previous != self.next
    }
}

/// Fired whenever the state of an entity is set, even to the same value
#[derive(Debug, Clone)]
pub struct StateEvent {
    /// Entity whose state was set
    pub source: Entity,
    /// Input that caused the change, if it came from a reaction
    pub input: Option<Value>,
    /// State before the change
    pub previous: i64,
    /// State after the change
    pub next: i64,
}

impl StateEvent {
    /// Check whether the state actually changed
    pub fn changed(&self) -> bool {
        self.previous != self.next
    }
}

/// Fired once per property mutation call, however many keys it touched
#[derive(Debug, Clone)]
pub struct PropertyEvent {
    /// Entity whose properties changed
    pub source: Entity,
    /// Old value of every touched property; `None` if it was absent before
    pub old_values: HashMap<String, Option<Value>>,
}

/// Kind of a [`LifecycleEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// The entity was destroyed
    Destroyed,
    /// The entity was added to a Terrain
    Added,
    /// The entity was removed from a Terrain by an explicit call
    Removed,
    /// The entity was removed from a Terrain because it was destroyed
    DestroyRemoved,
}

/// Lifecycle notification
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Entity the event is about
    pub source: Entity,
    /// What happened
    pub kind: LifecycleKind,
}

impl LifecycleEvent {
    pub(crate) fn new(source: Entity, kind: LifecycleKind) -> Self {
        LifecycleEvent { source, kind }
    }
}
