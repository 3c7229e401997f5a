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
//! Entity predicates
//!
//! Ready-made predicates for [`EntitySet`](crate::EntitySet) queries.
//!
//! ```
//! use entij::{filters, Entity, EntitySet};
//!
//! let set: EntitySet = [Entity::with("a", 1, 0), Entity::with("b", 2, 0)].into_iter().collect();
//! assert_eq!(set.count(filters::at(2)), 1);
//! ```

use crate::entity::Entity;

/// Entities in `state`
pub fn in_state(state: i64) -> impl Fn(&Entity) -> bool + Send + Sync + Clone {
    move |e| e.state() == state
}

/// Entities in the same state as `other` at evaluation time
pub fn in_state_of(other: &Entity) -> impl Fn(&Entity) -> bool + Send + Sync + Clone {
    let other = other.clone();
    move |e| e.state() == other.state()
}

/// Entities at `posit`
pub fn at(posit: i64) -> impl Fn(&Entity) -> bool + Send + Sync + Clone {
    move |e| e.posit() == posit
}

/// Entities at the same position as `other` at evaluation time
pub fn at_posit_of(other: &Entity) -> impl Fn(&Entity) -> bool + Send + Sync + Clone {
    let other = other.clone();
    move |e| e.posit() == other.posit()
}

/// Entities called `name`
pub fn named(name: impl Into<String>) -> impl Fn(&Entity) -> bool + Send + Sync + Clone {
    let name = name.into();
    move |e| e.name() == Some(name.as_str())
}
