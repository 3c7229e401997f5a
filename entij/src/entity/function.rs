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
//! Named capabilities of an entity
//!
//! A [`FunctionRecord`] maps names to functions invoked through
//! [`Entity::func`]. Records chain: a child record shadows its parent and
//! falls back to it for names it does not define.

use crate::entity::Entity;
use crate::error::{EntijError, Result};
use crate::sync::{read, write};
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

/// A callable capability
pub type Function = Arc<dyn Fn(&Entity, &[Value]) -> Result<Value> + Send + Sync>;

/// Chainable table of named functions
pub trait FunctionRecord: Send + Sync {
    /// Find `name` in this record or any ancestor
    fn look_up(&self, name: &str) -> Option<Function>;

    /// Invoke `name` on `entity`
    ///
    /// # Errors
    ///
    /// [`EntijError::FunctionNotFound`] if the chain has no such function,
    /// otherwise whatever the function returns.
    fn apply(&self, entity: &Entity, name: &str, args: &[Value]) -> Result<Value> {
        let function = self
            .look_up(name)
            .ok_or_else(|| EntijError::FunctionNotFound(name.to_string()))?;
        function(entity, args)
    }

    /// New empty record whose parent is this one
    fn child(self: Arc<Self>) -> Arc<dyn FunctionRecord>;

    /// Define or replace `name` in this record
    fn set_func(&self, name: &str, function: Function) -> Result<()> {
        let _ = (name, function);
        Err(EntijError::Unmodifiable("function record"))
    }

    /// Called once when the record is installed on an entity
    fn init(&self, _entity: &Entity) {}
}

/// Hash-backed function record
#[derive(Default)]
pub struct HashFunctionRecord {
    parent: Option<Arc<dyn FunctionRecord>>,
    functions: RwLock<FxHashMap<String, Function>>,
}

impl HashFunctionRecord {
    /// Root record with no functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty record shadowing `parent`
    pub fn with_parent(parent: Arc<dyn FunctionRecord>) -> Self {
        HashFunctionRecord {
            parent: Some(parent),
            functions: RwLock::new(FxHashMap::default()),
        }
    }

    /// Builder form of [`FunctionRecord::set_func`]
    pub fn define<F>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Entity, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        write(&self.functions).insert(name.into(), Arc::new(function));
        self
    }

    /// Names defined directly on this record
    pub fn local_names(&self) -> Vec<String> {
        read(&self.functions).keys().cloned().collect()
    }

    /// Record consulted for names this one lacks
    pub fn parent(&self) -> Option<&Arc<dyn FunctionRecord>> {
        self.parent.as_ref()
    }
}

impl FunctionRecord for HashFunctionRecord {
    fn look_up(&self, name: &str) -> Option<Function> {
        if let Some(function) = read(&self.functions).get(name) {
            return Some(Arc::clone(function));
        }
        self.parent.as_ref().and_then(|parent| parent.look_up(name))
    }

    fn child(self: Arc<Self>) -> Arc<dyn FunctionRecord> {
        Arc::new(HashFunctionRecord::with_parent(self))
    }

    fn set_func(&self, name: &str, function: Function) -> Result<()> {
        write(&self.functions).insert(name.to_string(), function);
        Ok(())
    }
}
