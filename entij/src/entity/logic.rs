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
//! Behavior of entities
//!
//! A [`Logic`] judges an input against an entity and either declines it
//! (`None`) or returns the [`Reaction`] to apply. The same logic may be shared
//! by many entities. Closures with the right signature are logics.

use crate::entity::{Entity, Reaction};
use crate::value::{Value, ValueKind};
use rustc_hash::FxHashMap;

/// Judges inputs fed to an entity
pub trait Logic: Send + Sync {
    /// Return the reaction to `input`, or `None` if this logic is not interested
    ///
    /// Side effects beyond the returned reaction are allowed.
    fn reaction(&self, entity: &Entity, input: &Value) -> Option<Reaction>;
}

impl<F> Logic for F
where
    F: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync,
{
    fn reaction(&self, entity: &Entity, input: &Value) -> Option<Reaction> {
        self(entity, input)
    }
}

/// Hashable projection of an input used by [`MapLogic`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputKey {
    /// Boolean input
    Bool(bool),
    /// Integer input
    Int(i64),
    /// Text input
    Text(String),
}

impl InputKey {
    /// Key of an input, if its kind can be keyed on
    pub fn of(input: &Value) -> Option<InputKey> {
        match input {
            Value::Bool(b) => Some(InputKey::Bool(*b)),
            Value::Int(i) => Some(InputKey::Int(*i)),
            Value::Text(s) => Some(InputKey::Text(s.clone())),
            _ => None,
        }
    }
}

impl From<bool> for InputKey {
    fn from(b: bool) -> Self {
        InputKey::Bool(b)
    }
}

impl From<i64> for InputKey {
    fn from(i: i64) -> Self {
        InputKey::Int(i)
    }
}

impl From<&str> for InputKey {
    fn from(s: &str) -> Self {
        InputKey::Text(s.to_string())
    }
}

type Matcher = Box<dyn Fn(&Entity, &Value) -> bool + Send + Sync>;
type Handler = Box<dyn Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync>;

struct Rule {
    matcher: Option<Matcher>,
    handler: Handler,
}

/// First rule whose matcher accepts decides; later rules are not consulted
fn apply_matching(rules: &[Rule], entity: &Entity, input: &Value) -> Option<Reaction> {
    rules
        .iter()
        .find(|rule| rule.matcher.as_ref().map_or(true, |m| m(entity, input)))
        .and_then(|rule| (rule.handler)(entity, input))
}

/// Table-driven logic
///
/// Lookup order for an input:
/// 1. the rules registered for the exact input key,
/// 2. otherwise the rules registered for the input's kind,
/// 3. otherwise the fallback rules.
///
/// The first table that has rules for the input decides the outcome, even if
/// none of its matchers accept.
///
/// # Example
///
/// ```
/// use entij::{Entity, MapLogic, Reaction, Value, ValueKind};
///
/// let logic = MapLogic::new()
///     .map("left", |e: &Entity, _: &Value| Some(Reaction::new().posit(e.posit() - 1)))
///     .map_kind(ValueKind::Int, |e: &Entity, v: &Value| {
///         v.get::<i64>().ok().map(|step| Reaction::new().posit(e.posit() + step))
///     });
///
/// let hero = Entity::named("hero");
/// hero.add_logic(logic);
/// hero.react(3).unwrap();
/// hero.react("left").unwrap();
/// assert_eq!(hero.posit(), 2);
/// ```
#[derive(Default)]
pub struct MapLogic {
    by_key: FxHashMap<InputKey, Vec<Rule>>,
    by_kind: FxHashMap<ValueKind, Vec<Rule>>,
    fallback: Vec<Rule>,
}

impl MapLogic {
    /// Create a logic with no rules; it declines every input
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle inputs equal to `key`
    pub fn map<H>(self, key: impl Into<InputKey>, handler: H) -> Self
    where
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.insert_key(key.into(), None, Box::new(handler))
    }

    /// Handle inputs equal to `key` when `matcher` accepts them
    pub fn map_when<M, H>(self, key: impl Into<InputKey>, matcher: M, handler: H) -> Self
    where
        M: Fn(&Entity, &Value) -> bool + Send + Sync + 'static,
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.insert_key(key.into(), Some(Box::new(matcher)), Box::new(handler))
    }

    /// Handle inputs of `kind`
    pub fn map_kind<H>(mut self, kind: ValueKind, handler: H) -> Self
    where
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Rule {
            matcher: None,
            handler: Box::new(handler),
        });
        self
    }

    /// Handle inputs of `kind` when `matcher` accepts them
    pub fn map_kind_when<M, H>(mut self, kind: ValueKind, matcher: M, handler: H) -> Self
    where
        M: Fn(&Entity, &Value) -> bool + Send + Sync + 'static,
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Rule {
            matcher: Some(Box::new(matcher)),
            handler: Box::new(handler),
        });
        self
    }

    /// Fallback rule consulted when no key or kind table has rules for the input
    pub fn otherwise_when<M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: Fn(&Entity, &Value) -> bool + Send + Sync + 'static,
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.fallback.push(Rule {
            matcher: Some(Box::new(matcher)),
            handler: Box::new(handler),
        });
        self
    }

    /// Unconditional fallback rule
    pub fn otherwise<H>(mut self, handler: H) -> Self
    where
        H: Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static,
    {
        self.fallback.push(Rule {
            matcher: None,
            handler: Box::new(handler),
        });
        self
    }

    fn insert_key(mut self, key: InputKey, matcher: Option<Matcher>, handler: Handler) -> Self {
        self.by_key.entry(key).or_default().push(Rule { matcher, handler });
        self
    }
}

impl Logic for MapLogic {
    fn reaction(&self, entity: &Entity, input: &Value) -> Option<Reaction> {
        if let Some(rules) = InputKey::of(input).and_then(|key| self.by_key.get(&key)) {
            return apply_matching(rules, entity, input);
        }
        if let Some(rules) = self.by_kind.get(&input.kind()) {
            return apply_matching(rules, entity, input);
        }
        apply_matching(&self.fallback, entity, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to(posit: i64) -> impl Fn(&Entity, &Value) -> Option<Reaction> + Send + Sync + 'static {
        move |_, _| Some(Reaction::new().posit(posit))
    }

    #[test]
    fn test_closure_is_logic() {
        let logic = |e: &Entity, _: &Value| Some(Reaction::new().state(e.state() + 1));
        let e = Entity::new();
        let r = logic.reaction(&e, &Value::Int(0)).unwrap();
        assert_eq!(r.next_state(), Some(1));
    }

    #[test]
    fn test_exact_key_before_kind() {
        let logic = MapLogic::new().map(5_i64, to(50)).map_kind(ValueKind::Int, to(1));
        let e = Entity::new();
        assert_eq!(logic.reaction(&e, &Value::Int(5)).unwrap().next_posit(), Some(50));
        assert_eq!(logic.reaction(&e, &Value::Int(6)).unwrap().next_posit(), Some(1));
    }

    #[test]
    fn test_key_table_decides_even_without_match() {
        let logic = MapLogic::new()
            .map_when("jump", |e: &Entity, _: &Value| e.state() == 1, to(9))
            .otherwise(to(0));
        let e = Entity::new();
        assert!(logic.reaction(&e, &Value::from("jump")).is_none());
        e.set_state(1);
        assert_eq!(logic.reaction(&e, &Value::from("jump")).unwrap().next_posit(), Some(9));
        assert_eq!(logic.reaction(&e, &Value::from("duck")).unwrap().next_posit(), Some(0));
    }

    #[test]
    fn test_rules_for_one_key_tried_in_order() {
        let logic = MapLogic::new()
            .map_when(true, |_: &Entity, _: &Value| false, to(1))
            .map(true, to(2))
            .map(true, to(3));
        let e = Entity::new();
        assert_eq!(logic.reaction(&e, &Value::Bool(true)).unwrap().next_posit(), Some(2));
    }

    #[test]
    fn test_fallback_matchers() {
        let logic = MapLogic::new()
            .otherwise_when(|_: &Entity, v: &Value| v.kind() == ValueKind::List, to(7));
        let e = Entity::new();
        assert_eq!(logic.reaction(&e, &Value::List(vec![])).unwrap().next_posit(), Some(7));
        assert!(logic.reaction(&e, &Value::Float(1.0)).is_none());
    }

    #[test]
    fn test_empty_map_logic_declines() {
        let e = Entity::new();
        assert!(MapLogic::new().reaction(&e, &Value::Int(1)).is_none());
    }
}
