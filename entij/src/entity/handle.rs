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
//! The entity handle
//!
//! An [`Entity`] is a cheap, cloneable handle to shared state. Clones refer to
//! the same entity; equality and hashing use the process-unique [`EntityId`].
//!
//! Field locks are never held while listeners or logics run, so callbacks may
//! freely read and mutate the entity that notified them.

use crate::entity::{Cascade, Component, FunctionRecord, Logic, Reaction};
use crate::error::{EntijError, Result};
use crate::event::{LifecycleEvent, LifecycleKind, PositEvent, PropertyEvent, StateEvent};
use crate::listener::{fire_shared, ListenerHandle, ListenerList};
use crate::pool::{AsyncEntry, AsyncEntryPool, TaskHandle};
use crate::sync::lock;
use crate::value::{FromValue, Value};
use log::trace;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Core {
    posit: i64,
    state: i64,
    properties: Option<HashMap<String, Value>>,
    logics: VecDeque<Arc<dyn Logic>>,
    functions: Option<Arc<dyn FunctionRecord>>,
    destroyed: bool,
}

struct EntityInner {
    id: EntityId,
    name: Option<String>,
    core: Mutex<Core>,
    posit_listeners: Mutex<ListenerList<PositEvent>>,
    state_listeners: Mutex<ListenerList<StateEvent>>,
    property_listeners: Mutex<ListenerList<PropertyEvent>>,
    lifecycle_listeners: Mutex<ListenerList<LifecycleEvent>>,
    async_slot: Mutex<Option<AsyncEntry>>,
}

/// Addressable, observable object with position, state, properties and logic
#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
}

/// Non-owning reference to an entity
#[derive(Clone)]
pub struct WeakEntity {
    inner: Weak<EntityInner>,
}

impl WeakEntity {
    /// The entity, if any handle to it is still alive
    pub fn upgrade(&self) -> Option<Entity> {
        self.inner.upgrade().map(|inner| Entity { inner })
    }
}

/// Anything that is, or wraps, an entity
pub trait AsEntity {
    /// The underlying entity
    fn as_entity(&self) -> &Entity;
}

impl AsEntity for Entity {
    fn as_entity(&self) -> &Entity {
        self
    }
}

impl Entity {
    /// Anonymous entity at posit 0, state 0
    pub fn new() -> Self {
        Self::build(None, 0, 0)
    }

    /// Named entity at posit 0, state 0
    pub fn named(name: impl Into<String>) -> Self {
        Self::build(Some(name.into()), 0, 0)
    }

    /// Named entity with an initial posit and state
    pub fn with(name: impl Into<String>, posit: i64, state: i64) -> Self {
        Self::build(Some(name.into()), posit, state)
    }

    fn build(name: Option<String>, posit: i64, state: i64) -> Self {
        Entity {
            inner: Arc::new(EntityInner {
                id: EntityId::next(),
                name,
                core: Mutex::new(Core {
                    posit,
                    state,
                    properties: None,
                    logics: VecDeque::new(),
                    functions: None,
                    destroyed: false,
                }),
                posit_listeners: Mutex::new(ListenerList::new()),
                state_listeners: Mutex::new(ListenerList::new()),
                property_listeners: Mutex::new(ListenerList::new()),
                lifecycle_listeners: Mutex::new(ListenerList::new()),
                async_slot: Mutex::new(None),
            }),
        }
    }

    /// Name given at construction
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Identity of this entity
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// Non-owning reference to this entity
    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Current position
    pub fn posit(&self) -> i64 {
        lock(&self.inner.core).posit
    }

    /// Current state
    pub fn state(&self) -> i64 {
        lock(&self.inner.core).state
    }

    /// Move to `posit`; position listeners fire even if the value is unchanged
    pub fn set_posit(&self, posit: i64) {
        self.update_posit(posit, None);
    }

    /// Enter `state`; state listeners fire even if the value is unchanged
    pub fn set_state(&self, state: i64) {
        self.update_state(state, None);
    }

    fn update_posit(&self, next: i64, input: Option<Value>) {
        let previous = std::mem::replace(&mut lock(&self.inner.core).posit, next);
        let event = PositEvent {
            source: self.clone(),
            input,
            previous,
            next,
        };
        fire_shared(&self.inner.posit_listeners, &event);
    }

    fn update_state(&self, next: i64, input: Option<Value>) {
        let previous = std::mem::replace(&mut lock(&self.inner.core).state, next);
        let event = StateEvent {
            source: self.clone(),
            input,
            previous,
            next,
        };
        fire_shared(&self.inner.state_listeners, &event);
    }

    /// Mark the entity destroyed and notify lifecycle listeners
    ///
    /// Only the first call fires [`LifecycleKind::Destroyed`].
    pub fn destroy(&self) {
        {
            let mut core = lock(&self.inner.core);
            if core.destroyed {
                return;
            }
            core.destroyed = true;
        }
        trace!("entity {} destroyed", self.id());
        let event = LifecycleEvent::new(self.clone(), LifecycleKind::Destroyed);
        fire_shared(&self.inner.lifecycle_listeners, &event);
    }

    /// Whether [`Entity::destroy`] has been called
    pub fn is_destroyed(&self) -> bool {
        lock(&self.inner.core).destroyed
    }

    /// Typed property lookup
    ///
    /// Returns `Ok(None)` when the property is absent and
    /// [`EntijError::Cast`] when it holds another kind of value.
    pub fn get_prop<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        self.prop_value(name).map(|value| value.get::<T>()).transpose()
    }

    /// Raw property lookup
    pub fn prop_value(&self, name: &str) -> Option<Value> {
        lock(&self.inner.core)
            .properties
            .as_ref()
            .and_then(|props| props.get(name).cloned())
    }

    /// Whether the property is present
    pub fn has_prop(&self, name: &str) -> bool {
        lock(&self.inner.core)
            .properties
            .as_ref()
            .map_or(false, |props| props.contains_key(name))
    }

    /// Names of all properties, in no particular order
    pub fn prop_names(&self) -> Vec<String> {
        lock(&self.inner.core)
            .properties
            .as_ref()
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Set one property; setting [`Value::Nil`] removes it
    pub fn set_prop(&self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        let delta = HashMap::from([(name.into(), (!value.is_nil()).then_some(value))]);
        self.apply_property_delta(delta);
    }

    /// Remove one property, returning its value
    ///
    /// Property listeners fire only if the property was present.
    pub fn remove_prop(&self, name: &str) -> Option<Value> {
        let old = lock(&self.inner.core)
            .properties
            .as_mut()
            .and_then(|props| props.remove(name))?;
        let event = PropertyEvent {
            source: self.clone(),
            old_values: HashMap::from([(name.to_string(), Some(old.clone()))]),
        };
        fire_shared(&self.inner.property_listeners, &event);
        Some(old)
    }

    /// Replace the whole property bag with `props`, firing one event
    pub fn set_props(&self, props: HashMap<String, Value>) {
        let old_values = {
            let mut core = lock(&self.inner.core);
            let mut old: HashMap<String, Option<Value>> = core
                .properties
                .take()
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| (name, Some(value)))
                .collect();
            for name in props.keys() {
                old.entry(name.clone()).or_insert(None);
            }
            core.properties = Some(props);
            old
        };
        let event = PropertyEvent {
            source: self.clone(),
            old_values,
        };
        fire_shared(&self.inner.property_listeners, &event);
    }

    /// Merge `props` into the property bag, firing one event
    pub fn put_props(&self, props: HashMap<String, Value>) {
        let delta = props
            .into_iter()
            .map(|(name, value)| (name, (!value.is_nil()).then_some(value)))
            .collect();
        self.apply_property_delta(delta);
    }

    /// Apply a delta where `None` removes the property; one event per call
    fn apply_property_delta(&self, delta: HashMap<String, Option<Value>>) {
        let old_values = {
            let mut core = lock(&self.inner.core);
            let props = core.properties.get_or_insert_with(HashMap::new);
            delta
                .into_iter()
                .map(|(name, value)| {
                    let old = match value {
                        Some(value) => props.insert(name.clone(), value),
                        None => props.remove(&name),
                    };
                    (name, old)
                })
                .collect()
        };
        let event = PropertyEvent {
            source: self.clone(),
            old_values,
        };
        fire_shared(&self.inner.property_listeners, &event);
    }

    /// Observe position changes
    pub fn add_position_listener<F>(&self, observer: F) -> ListenerHandle
    where
        F: Fn(&PositEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.posit_listeners).add(observer)
    }

    /// Position listener removed the first time it returns `false`
    pub fn add_position_listener_removable<F>(&self, predicate: F) -> ListenerHandle
    where
        F: Fn(&PositEvent) -> bool + Send + Sync + 'static,
    {
        lock(&self.inner.posit_listeners).add_removable(predicate)
    }

    /// Unregister a position listener
    pub fn remove_position_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.inner.posit_listeners).remove(handle)
    }

    /// Observe state changes
    pub fn add_state_listener<F>(&self, observer: F) -> ListenerHandle
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.state_listeners).add(observer)
    }

    /// State listener removed the first time it returns `false`
    pub fn add_state_listener_removable<F>(&self, predicate: F) -> ListenerHandle
    where
        F: Fn(&StateEvent) -> bool + Send + Sync + 'static,
    {
        lock(&self.inner.state_listeners).add_removable(predicate)
    }

    /// Unregister a state listener
    pub fn remove_state_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.inner.state_listeners).remove(handle)
    }

    /// Observe property changes
    pub fn add_property_listener<F>(&self, observer: F) -> ListenerHandle
    where
        F: Fn(&PropertyEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.property_listeners).add(observer)
    }

    /// Property listener removed the first time it returns `false`
    pub fn add_property_listener_removable<F>(&self, predicate: F) -> ListenerHandle
    where
        F: Fn(&PropertyEvent) -> bool + Send + Sync + 'static,
    {
        lock(&self.inner.property_listeners).add_removable(predicate)
    }

    /// Unregister a property listener
    pub fn remove_property_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.inner.property_listeners).remove(handle)
    }

    /// Observe lifecycle events
    pub fn add_lifecycle_listener<F>(&self, observer: F) -> ListenerHandle
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        lock(&self.inner.lifecycle_listeners).add(observer)
    }

    /// Lifecycle listener removed the first time it returns `false`
    pub fn add_lifecycle_listener_removable<F>(&self, predicate: F) -> ListenerHandle
    where
        F: Fn(&LifecycleEvent) -> bool + Send + Sync + 'static,
    {
        lock(&self.inner.lifecycle_listeners).add_removable(predicate)
    }

    /// Unregister a lifecycle listener
    pub fn remove_lifecycle_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.inner.lifecycle_listeners).remove(handle)
    }

    /// Number of listeners registered across the position, state, property
    /// and lifecycle chains
    pub fn listener_count(&self) -> usize {
        lock(&self.inner.posit_listeners).len()
            + lock(&self.inner.state_listeners).len()
            + lock(&self.inner.property_listeners).len()
            + lock(&self.inner.lifecycle_listeners).len()
    }

    /// Fire a lifecycle event at this entity's lifecycle listeners
    pub(crate) fn fire_lifecycle(&self, event: &LifecycleEvent) {
        fire_shared(&self.inner.lifecycle_listeners, event);
    }

    /// Put `logic` at the front of the chain; it is consulted first
    pub fn add_logic<L: Logic + 'static>(&self, logic: L) -> Arc<dyn Logic> {
        let logic: Arc<dyn Logic> = Arc::new(logic);
        self.attach_logic(Arc::clone(&logic));
        logic
    }

    /// Put an already shared logic at the front of the chain
    pub fn attach_logic(&self, logic: Arc<dyn Logic>) {
        lock(&self.inner.core).logics.push_front(logic);
    }

    /// Put `logic` at the back of the chain; it is consulted last
    pub fn add_logic_last<L: Logic + 'static>(&self, logic: L) -> Arc<dyn Logic> {
        let logic: Arc<dyn Logic> = Arc::new(logic);
        lock(&self.inner.core).logics.push_back(Arc::clone(&logic));
        logic
    }

    /// Remove the first occurrence of `logic` from the chain
    pub fn remove_logic(&self, logic: &Arc<dyn Logic>) -> bool {
        let target = Arc::as_ptr(logic) as *const ();
        let mut core = lock(&self.inner.core);
        match core
            .logics
            .iter()
            .position(|l| Arc::as_ptr(l) as *const () == target)
        {
            Some(index) => core.logics.remove(index).is_some(),
            None => false,
        }
    }

    /// Number of logics in the chain
    pub fn logic_count(&self) -> usize {
        lock(&self.inner.core).logics.len()
    }

    /// Drop every logic
    pub fn clear_logics(&self) {
        lock(&self.inner.core).logics.clear();
    }

    /// Attach a component to this entity
    pub fn attach<C: Component + ?Sized>(&self, component: &C) {
        component.attach(self);
    }

    /// Feed `input` to the logic chain
    ///
    /// Logics are consulted front to back. Every reaction returned is applied
    /// at once: posit, then state, then properties, then cascades in the order
    /// they were appended. A consuming reaction stops the chain and is
    /// returned; otherwise the last non-consuming reaction is returned, or
    /// `None` if no logic reacted.
    ///
    /// # Errors
    ///
    /// [`EntijError::InvalidArgument`] for a [`Value::Nil`] input. Errors
    /// raised by cascades are propagated after the effects already applied.
    #[doc(alias = "move")]
    pub fn react(&self, input: impl Into<Value>) -> Result<Option<Reaction>> {
        let input = input.into();
        if input.is_nil() {
            return Err(EntijError::invalid_argument("input cannot be nil"));
        }
        let logics: Vec<Arc<dyn Logic>> = lock(&self.inner.core).logics.iter().cloned().collect();
        let mut last = None;
        for logic in logics {
            let Some(reaction) = logic.reaction(self, &input) else {
                continue;
            };
            self.apply_reaction(&reaction, &input)?;
            if reaction.consumes() {
                return Ok(Some(reaction));
            }
            last = Some(reaction);
        }
        Ok(last)
    }

    /// Same as [`Entity::react`]
    pub fn move_by(&self, input: impl Into<Value>) -> Result<Option<Reaction>> {
        self.react(input)
    }

    fn apply_reaction(&self, reaction: &Reaction, input: &Value) -> Result<()> {
        if let Some(posit) = reaction.next_posit() {
            self.update_posit(posit, Some(input.clone()));
        }
        if let Some(state) = reaction.next_state() {
            self.update_state(state, Some(input.clone()));
        }
        if let Some(delta) = reaction.next_props() {
            self.apply_property_delta(delta.clone());
        }
        for cascade in reaction.cascades() {
            match cascade {
                Cascade::React { target, input } => {
                    target.react(input.clone())?;
                }
                Cascade::ReactEach { targets, input } => {
                    for target in targets {
                        target.react(input.clone())?;
                    }
                }
                Cascade::Call { func, args } => {
                    self.func(func, args)?;
                }
            }
        }
        Ok(())
    }

    /// Install the function record and let it initialize against this entity
    pub fn set_function_record(&self, record: Arc<dyn FunctionRecord>) {
        lock(&self.inner.core).functions = Some(Arc::clone(&record));
        record.init(self);
    }

    /// Installed function record, if any
    pub fn function_record(&self) -> Option<Arc<dyn FunctionRecord>> {
        lock(&self.inner.core).functions.clone()
    }

    /// Invoke the named function of the record chain
    ///
    /// # Errors
    ///
    /// [`EntijError::FunctionNotFound`] if no record in the chain defines it.
    pub fn func(&self, name: &str, args: &[Value]) -> Result<Value> {
        let record = self
            .function_record()
            .ok_or_else(|| EntijError::FunctionNotFound(name.to_string()))?;
        record.apply(self, name, args)
    }

    /// Feed `input` to the logic chain on a pooled worker
    ///
    /// Inputs submitted while the entity still has queued work run on the
    /// same worker, in submission order. Once the queue drains the worker is
    /// handed back to `pool`.
    pub fn react_async(
        &self,
        pool: &AsyncEntryPool,
        input: impl Into<Value>,
    ) -> Result<TaskHandle<Option<Reaction>>> {
        let input = input.into();
        if input.is_nil() {
            return Err(EntijError::invalid_argument("input cannot be nil"));
        }
        let mut slot = lock(&self.inner.async_slot);
        if let Some(entry) = slot.as_ref().filter(|entry| !entry.is_shutdown()) {
            match entry.submit_action(self, input.clone()) {
                Err(EntijError::EntryShutdown) => {}
                outcome => return outcome,
            }
        }
        let entry = pool.get()?;
        *slot = Some(entry.clone());
        entry.submit_action(self, input)
    }

    /// Notify the entity that its bound async queue became empty
    ///
    /// Returns the bound entry to its pool if it is still idle. An entry
    /// already retired by a draining pool is unbound without being returned.
    pub fn signal_async_queue_empty(&self) {
        let mut slot = lock(&self.inner.async_slot);
        if slot.as_ref().map_or(false, |entry| entry.pending() == 0) {
            if let Some(entry) = slot.take() {
                if entry.is_shutdown() {
                    trace!("entity {} dropped its retired async entry", self.id());
                } else {
                    trace!("entity {} released its async entry", self.id());
                    entry.release();
                }
            }
        }
    }

    /// Whether an async entry is currently bound to this entity
    pub fn has_async_entry(&self) -> bool {
        lock(&self.inner.async_slot).is_some()
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.name {
            Some(name) => write!(f, "{}{}", name, self.inner.id),
            None => write!(f, "entity{}", self.inner.id),
        }
    }
}
