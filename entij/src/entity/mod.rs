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
//! Entities and their behavior
//!
//! This module provides the reactive entity model:
//! - [`Entity`]: name, position, state and property bag with change listeners
//! - [`Reaction`]: the effects of an accepted input
//! - [`Logic`]: pluggable judges that turn inputs into reactions
//! - [`FunctionRecord`]: named capabilities reachable through [`Entity::func`]
//! - [`Component`]: bundles of behavior that attach to an entity

mod component;
pub mod filters;
mod function;
mod handle;
mod logic;
mod reaction;

pub use component::{Component, ListenerBundle};
pub use function::{Function, FunctionRecord, HashFunctionRecord};
pub use handle::{AsEntity, Entity, EntityId, WeakEntity};
pub use logic::{InputKey, Logic, MapLogic};
pub use reaction::{Cascade, Reaction};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::named("hero");
        assert_eq!(entity.name(), Some("hero"));
        assert_eq!(entity.posit(), 0);
        assert_eq!(entity.state(), 0);
    }

    #[test]
    fn test_reaction_defaults_to_consuming() {
        assert!(Reaction::new().consumes());
    }
}
