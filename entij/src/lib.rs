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
//! # Entij
//!
//! A reactive entity model for simulations and games: observable entities
//! with pluggable behavior, containers that keep themselves indexed, and
//! pooled serial workers for asynchronous reactions.
//!
//! ## Features
//!
//! - **Entities**: name, position, state and a property bag, each change
//!   reported to listener chains
//! - **Logic**: injected judges turning inputs into [`Reaction`]s, with
//!   cascades to other entities and named functions
//! - **Terrain**: a container indexing its entities by name, position and
//!   state, kept current as the entities change
//! - **Entity sets**: set algebra, live read-only views and predicate queries,
//!   optionally evaluated with Rayon
//! - **Async pool**: per-entity serialized task queues on reusable workers
//!
//! ## Example
//!
//! ```rust
//! use entij::{Entity, Reaction, Terrain, Value};
//!
//! let board = Terrain::named("board");
//! let pawn = Entity::named("pawn");
//! pawn.add_logic(|e: &Entity, input: &Value| {
//!     let step = input.get::<i64>().ok()?;
//!     Some(Reaction::new().posit(e.posit() + step))
//! });
//! board.add(&pawn);
//!
//! pawn.react(5).unwrap();
//! assert_eq!(pawn.posit(), 5);
//! assert!(board.get_by_posit(5).contains(&pawn));
//! assert!(!board.get_by_posit(0).contains(&pawn));
//! ```

#![warn(missing_docs)]

mod sync;

/// Error types
pub mod error;

/// Dynamic values carried by inputs and properties
pub mod value;

/// Listener chains
pub mod listener;

/// Entity events
pub mod event;

/// Entities, reactions and logic
pub mod entity;

/// Entity sets and keyed indices
pub mod collections;

/// Auto-indexing entity container
pub mod terrain;

/// Pooled serial workers for asynchronous reactions
pub mod pool;

pub use collections::{EntityMultiMap, EntitySet};
pub use entity::{
    filters, AsEntity, Cascade, Component, Entity, EntityId, Function, FunctionRecord,
    HashFunctionRecord, InputKey, ListenerBundle, Logic, MapLogic, Reaction, WeakEntity,
};
pub use error::{EntijError, Result};
pub use event::{LifecycleEvent, LifecycleKind, PositEvent, PropertyEvent, StateEvent};
pub use listener::ListenerHandle;
pub use pool::{AsyncEntry, AsyncEntryPool, PoolConfig, PoolLifecycle, PoolStats, TaskHandle};
pub use terrain::Terrain;
pub use value::{FromValue, Value, ValueKind};
