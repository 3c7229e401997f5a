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
//! Entity collections
//!
//! - [`EntitySet`]: set algebra and predicate queries over entities
//! - [`EntityMultiMap`]: keyed index of entity sets with live aggregate views

mod entity_set;
mod multimap;

pub use entity_set::EntitySet;
pub use multimap::{empty_set, AllEntities, AllIter, EntityMultiMap};
