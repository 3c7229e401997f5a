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
//! Listener chains
//!
//! A [`ListenerList`] is a singly linked chain of predicate callbacks threaded
//! through an arena of slots. New listeners are prepended, so firing visits
//! the most recently added listener first. A callback returning `false` asks
//! to be removed.
//!
//! Removal never splices eagerly: the slot is tombstoned in O(1) and the next
//! full traversal unlinks it and recycles the slot under a new generation.
//! [`ListenerHandle`]s carry the generation they were issued with, so a stale
//! handle can never reach a recycled slot.

use crate::error::{panic_message, EntijError, Result};
use crate::sync::lock;
use log::{error, trace};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// A listener callback; returning `false` removes it from its chain
pub type Callback<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Adapt a plain observer into a callback that is never removed by firing
pub fn retained<E, F>(observer: F) -> Callback<E>
where
    F: Fn(&E) + Send + Sync + 'static,
{
    Arc::new(move |event: &E| {
        observer(event);
        true
    })
}

/// Generational handle to a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    index: u32,
    generation: u32,
}

impl ListenerHandle {
    /// Slot index of this handle
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when the listener was registered
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Node<E> {
    /// `None` marks a tombstone that is still linked
    callback: Option<Callback<E>>,
    next: Option<u32>,
}

struct Slot<E> {
    generation: u32,
    /// `None` while the slot sits on the free stack
    node: Option<Node<E>>,
}

/// Ordered chain of listener callbacks for one event category
pub struct ListenerList<E> {
    slots: Vec<Slot<E>>,
    free: Vec<u32>,
    head: Option<u32>,
    live: usize,
    tombstones: usize,
}

impl<E> ListenerList<E> {
    /// Create an empty chain
    pub fn new() -> Self {
        ListenerList {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            live: 0,
            tombstones: 0,
        }
    }

    /// Register an observer that stays until explicitly removed
    pub fn add<F>(&mut self, observer: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add_callback(retained(observer))
    }

    /// Register a predicate that is removed the first time it returns `false`
    pub fn add_removable<F>(&mut self, predicate: F) -> ListenerHandle
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.add_callback(Arc::new(predicate))
    }

    /// Prepend an already shared callback
    pub fn add_callback(&mut self, callback: Callback<E>) -> ListenerHandle {
        let node = Node {
            callback: Some(callback),
            next: self.head,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.head = Some(index);
        self.live += 1;
        ListenerHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Check whether the handle still refers to a registered listener
    pub fn contains(&self, handle: ListenerHandle) -> bool {
        self.live_node(handle).is_some()
    }

    /// Remove the listener behind `handle`
    ///
    /// Returns `false` if it was already removed.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        match slot.node.as_mut() {
            Some(node) if node.callback.is_some() => {
                node.callback = None;
                self.live -= 1;
                self.tombstones += 1;
                true
            }
            _ => false,
        }
    }

    /// Remove the first listener that is the very same allocation as `callback`
    pub fn remove_by_identity(&mut self, callback: &Callback<E>) -> bool {
        let target = Arc::as_ptr(callback) as *const ();
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index as usize];
            let Some(node) = slot.node.as_mut() else {
                break;
            };
            let matches = node
                .callback
                .as_ref()
                .map_or(false, |cb| Arc::as_ptr(cb) as *const () == target);
            if matches {
                node.callback = None;
                self.live -= 1;
                self.tombstones += 1;
                return true;
            }
            cursor = node.next;
        }
        false
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Remove every listener and recycle every slot
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        while let Some(index) = cursor {
            cursor = self.release(index);
        }
        self.live = 0;
        self.tombstones = 0;
    }

    /// Walk the whole chain, unlinking tombstones, and return the live callbacks in firing order
    pub fn snapshot(&mut self) -> Vec<(ListenerHandle, Callback<E>)> {
        let mut live = Vec::with_capacity(self.live);
        let mut prev: Option<u32> = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &self.slots[index as usize];
            let Some(node) = slot.node.as_ref() else {
                break;
            };
            let next = node.next;
            let generation = slot.generation;
            match node.callback.clone() {
                Some(callback) => {
                    live.push((ListenerHandle { index, generation }, callback));
                    prev = Some(index);
                }
                None => {
                    match prev {
                        Some(p) => {
                            if let Some(prev_node) = self.slots[p as usize].node.as_mut() {
                                prev_node.next = next;
                            }
                        }
                        None => self.head = next,
                    }
                    self.release(index);
                    self.tombstones -= 1;
                }
            }
            cursor = next;
        }
        live
    }

    /// Fire `event` at every listener of this exclusively owned chain
    ///
    /// Callbacks cannot reach the chain while it is borrowed here; use
    /// [`fire_shared`] when callbacks must be able to modify it.
    pub fn fire(&mut self, event: &E) {
        for (handle, callback) in self.snapshot() {
            if !invoke(&callback, event) {
                self.remove(handle);
            }
        }
    }

    /// Start an explicit traversal
    pub fn cursor(&self) -> Cursor {
        Cursor {
            position: Position::Start,
        }
    }

    fn live_node(&self, handle: ListenerHandle) -> Option<&Node<E>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref().filter(|node| node.callback.is_some())
    }

    /// Put a slot back on the free stack; returns the link it held
    fn release(&mut self, index: u32) -> Option<u32> {
        let slot = &mut self.slots[index as usize];
        let next = slot.node.take().and_then(|node| node.next);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        next
    }

    /// First live node at or after `start`, skipping tombstones
    fn first_live_from(&self, start: Option<u32>) -> Option<(ListenerHandle, Callback<E>)> {
        let mut cursor = start;
        while let Some(index) = cursor {
            let slot = &self.slots[index as usize];
            let node = slot.node.as_ref()?;
            if let Some(callback) = node.callback.as_ref() {
                return Some((
                    ListenerHandle {
                        index,
                        generation: slot.generation,
                    },
                    Arc::clone(callback),
                ));
            }
            cursor = node.next;
        }
        None
    }
}

impl<E> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire `event` at a chain shared behind a mutex
///
/// The chain is snapshotted and the lock released before any callback runs,
/// so callbacks may add or remove listeners on the same chain. A listener
/// removed by an earlier callback of the same firing is skipped; one added
/// during the firing is first notified by the next one. A panicking listener
/// is logged and kept.
pub fn fire_shared<E>(list: &Mutex<ListenerList<E>>, event: &E) {
    let snapshot = lock(list).snapshot();
    for (handle, callback) in snapshot {
        if !lock(list).contains(handle) {
            continue;
        }
        if !invoke(&callback, event) {
            lock(list).remove(handle);
            trace!("listener {:?} removed itself", handle);
        }
    }
}

fn invoke<E>(callback: &Callback<E>, event: &E) -> bool {
    match catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(keep) => keep,
        Err(payload) => {
            error!("listener panicked and was kept: {}", panic_message(payload.as_ref()));
            true
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Start,
    At(ListenerHandle),
    Removed(ListenerHandle),
    End,
}

/// Detached traversal state over a [`ListenerList`]
///
/// The cursor borrows the chain only for the duration of each step, so the
/// chain may be modified between steps. Stepping away from a node that was
/// removed by someone else fails with
/// [`EntijError::ConcurrentModification`].
#[derive(Debug, Clone)]
pub struct Cursor {
    position: Position,
}

impl Cursor {
    /// Move to the next live listener and return it
    pub fn advance<E>(
        &mut self,
        list: &ListenerList<E>,
    ) -> Result<Option<(ListenerHandle, Callback<E>)>> {
        let start = match self.position {
            Position::Start => list.head,
            Position::End => return Ok(None),
            Position::At(handle) => {
                list.live_node(handle)
                    .ok_or(EntijError::ConcurrentModification)?
                    .next
            }
            Position::Removed(handle) => {
                // a tombstone keeps its link until a traversal recycles it
                let slot = list
                    .slots
                    .get(handle.index as usize)
                    .filter(|slot| slot.generation == handle.generation)
                    .ok_or(EntijError::ConcurrentModification)?;
                slot.node
                    .as_ref()
                    .ok_or(EntijError::ConcurrentModification)?
                    .next
            }
        };
        let found = list.first_live_from(start);
        self.position = match &found {
            Some((handle, _)) => Position::At(*handle),
            None => Position::End,
        };
        Ok(found)
    }

    /// Remove the listener the cursor currently points at
    pub fn remove<E>(&mut self, list: &mut ListenerList<E>) -> Result<()> {
        match self.position {
            Position::Start => Err(EntijError::IllegalCursorState(
                "remove requires a previous call to advance",
            )),
            Position::Removed(_) => Err(EntijError::IllegalCursorState("remove already called")),
            Position::End => Err(EntijError::IllegalCursorState("cursor is past the end")),
            Position::At(handle) => {
                if !list.remove(handle) {
                    return Err(EntijError::ConcurrentModification);
                }
                self.position = Position::Removed(handle);
                Ok(())
            }
        }
    }
}
