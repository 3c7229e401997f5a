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
//! Reactions to inputs
//!
//! A [`Reaction`] is produced by a [`Logic`](crate::Logic) that accepts an
//! input and is applied immediately by the entity that asked for it. It is
//! never retained by the entity.

use crate::entity::Entity;
use crate::error::{EntijError, Result};
use crate::value::Value;
use std::collections::HashMap;

/// A follow-up action executed after the direct effects of a reaction
#[derive(Debug, Clone)]
pub enum Cascade {
    /// Feed `input` to `target`
    React {
        /// Entity receiving the input
        target: Entity,
        /// Input to feed
        input: Value,
    },
    /// Feed `input` to every entity of `targets`, in order
    ReactEach {
        /// Entities receiving the input
        targets: Vec<Entity>,
        /// Input to feed
        input: Value,
    },
    /// Invoke a named function on the reacting entity's function record
    Call {
        /// Function name
        func: String,
        /// Call arguments
        args: Vec<Value>,
    },
}

/// Effects of an accepted input
///
/// # Example
///
/// ```
/// use entij::{Entity, Reaction};
///
/// let door = Entity::named("door");
/// let reaction = Reaction::new()
///     .state(1)
///     .set("opened_by", "hero")
///     .and_then_move(&door, "creak")
///     .unwrap();
/// assert_eq!(reaction.next_state(), Some(1));
/// assert_eq!(reaction.cascades().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Reaction {
    next_posit: Option<i64>,
    next_state: Option<i64>,
    next_props: Option<HashMap<String, Option<Value>>>,
    cascades: Vec<Cascade>,
    consume: bool,
}

impl Reaction {
    /// A consuming reaction with no effects
    pub fn new() -> Self {
        Reaction {
            next_posit: None,
            next_state: None,
            next_props: None,
            cascades: Vec::new(),
            consume: true,
        }
    }

    /// Move the reacting entity to `posit`
    pub fn posit(mut self, posit: i64) -> Self {
        self.next_posit = Some(posit);
        self
    }

    /// Put the reacting entity in `state`
    pub fn state(mut self, state: i64) -> Self {
        self.next_state = Some(state);
        self
    }

    /// Set a property of the reacting entity
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.next_props
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), Some(value.into()));
        self
    }

    /// Remove a property of the reacting entity
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        self.next_props
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), None);
        self
    }

    /// Replace the whole property delta; a `None` value removes that property
    pub fn put_all(mut self, props: HashMap<String, Option<Value>>) -> Self {
        self.next_props = Some(props);
        self
    }

    /// Whether the entity stops consulting further logics after this reaction
    pub fn consume(mut self, consume: bool) -> Self {
        self.consume = consume;
        self
    }

    /// Append an input for `target`, run after the direct effects
    pub fn and_then_move(mut self, target: &Entity, input: impl Into<Value>) -> Result<Self> {
        let input = non_nil(input.into())?;
        self.cascades.push(Cascade::React {
            target: target.clone(),
            input,
        });
        Ok(self)
    }

    /// Append an input for each of `targets`, run after the direct effects
    pub fn and_then_move_each<I>(mut self, targets: I, input: impl Into<Value>) -> Result<Self>
    where
        I: IntoIterator<Item = Entity>,
    {
        let input = non_nil(input.into())?;
        self.cascades.push(Cascade::ReactEach {
            targets: targets.into_iter().collect(),
            input,
        });
        Ok(self)
    }

    /// Append a call to a function of the reacting entity's record
    pub fn and_then_call(mut self, func: impl Into<String>, args: Vec<Value>) -> Self {
        self.cascades.push(Cascade::Call {
            func: func.into(),
            args,
        });
        self
    }

    /// Next position, if the reaction moves the entity
    pub fn next_posit(&self) -> Option<i64> {
        self.next_posit
    }

    /// Next state, if the reaction changes it
    pub fn next_state(&self) -> Option<i64> {
        self.next_state
    }

    /// Property delta, if any
    pub fn next_props(&self) -> Option<&HashMap<String, Option<Value>>> {
        self.next_props.as_ref()
    }

    /// Cascades in the order they were appended
    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    /// Whether this reaction halts the logic chain
    pub fn consumes(&self) -> bool {
        self.consume
    }
}

impl Default for Reaction {
    fn default() -> Self {
        Self::new()
    }
}

fn non_nil(input: Value) -> Result<Value> {
    if input.is_nil() {
        Err(EntijError::invalid_argument("cascade input cannot be nil"))
    } else {
        Ok(input)
    }
}
