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
//! Reusable bundles of behavior

use crate::entity::{Entity, Logic};
use crate::event::{LifecycleEvent, PositEvent, PropertyEvent, StateEvent};
use crate::listener::{retained, Callback};
use std::sync::Arc;

/// Something that can be attached to an entity
pub trait Component {
    /// Install this component's behavior on `target`
    fn attach(&self, target: &Entity);
}

impl Component for Arc<dyn Logic> {
    fn attach(&self, target: &Entity) {
        target.attach_logic(Arc::clone(self));
    }
}

/// A logic plus listeners, attached together
///
/// The same bundle can be attached to many entities; every entity shares the
/// bundle's logic and callbacks.
///
/// # Example
///
/// ```
/// use entij::{Entity, ListenerBundle, Reaction, Value};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let moves = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&moves);
/// let walker = ListenerBundle::new()
///     .logic(|e: &Entity, _: &Value| Some(Reaction::new().posit(e.posit() + 1)))
///     .on_position(move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     });
///
/// let a = Entity::new();
/// let b = Entity::new();
/// a.attach(&walker);
/// b.attach(&walker);
/// a.react("step").unwrap();
/// b.react("step").unwrap();
/// assert_eq!(moves.load(Ordering::SeqCst), 2);
/// ```
#[derive(Default, Clone)]
pub struct ListenerBundle {
    logic: Option<Arc<dyn Logic>>,
    position: Vec<Callback<PositEvent>>,
    state: Vec<Callback<StateEvent>>,
    property: Vec<Callback<PropertyEvent>>,
    lifecycle: Vec<Callback<LifecycleEvent>>,
}

impl ListenerBundle {
    /// Empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Logic put at the front of the target's chain
    pub fn logic<L: Logic + 'static>(mut self, logic: L) -> Self {
        self.logic = Some(Arc::new(logic));
        self
    }

    /// Listener added to the target's position chain
    pub fn on_position<F>(mut self, observer: F) -> Self
    where
        F: Fn(&PositEvent) + Send + Sync + 'static,
    {
        self.position.push(retained(observer));
        self
    }

    /// Listener added to the target's state chain
    pub fn on_state<F>(mut self, observer: F) -> Self
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        self.state.push(retained(observer));
        self
    }

    /// Listener added to the target's property chain
    pub fn on_property<F>(mut self, observer: F) -> Self
    where
        F: Fn(&PropertyEvent) + Send + Sync + 'static,
    {
        self.property.push(retained(observer));
        self
    }

    /// Listener added to the target's lifecycle chain
    pub fn on_lifecycle<F>(mut self, observer: F) -> Self
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.lifecycle.push(retained(observer));
        self
    }
}

impl Component for ListenerBundle {
    fn attach(&self, target: &Entity) {
        if let Some(logic) = &self.logic {
            logic.attach(target);
        }
        for callback in &self.position {
            let callback = Arc::clone(callback);
            target.add_position_listener_removable(move |event| callback(event));
        }
        for callback in &self.state {
            let callback = Arc::clone(callback);
            target.add_state_listener_removable(move |event| callback(event));
        }
        for callback in &self.property {
            let callback = Arc::clone(callback);
            target.add_property_listener_removable(move |event| callback(event));
        }
        for callback in &self.lifecycle {
            let callback = Arc::clone(callback);
            target.add_lifecycle_listener_removable(move |event| callback(event));
        }
    }
}
