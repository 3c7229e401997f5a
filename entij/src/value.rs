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
//! Dynamic values
//!
//! Inputs to [`Entity::react`](crate::Entity::react), property values and the
//! arguments of record functions are all [`Value`]s. Retrieval of a concrete
//! type goes through [`FromValue`] and fails with
//! [`EntijError::Cast`](crate::EntijError::Cast) when the stored variant does
//! not have the requested shape.

use crate::entity::Entity;
use crate::error::{EntijError, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Nil`]
    Nil,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Text`]
    Text,
    /// [`Value::Entity`]
    Entity,
    /// [`Value::List`]
    List,
    /// [`Value::Map`]
    Map,
    /// [`Value::Opaque`]
    Opaque,
}

/// A dynamically typed value
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Reference to an entity
    Entity(Entity),
    /// Ordered list of values
    List(Vec<Value>),
    /// String-keyed structured value
    Map(BTreeMap<String, Value>),
    /// Caller-defined payload, compared by identity
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary payload as [`Value::Opaque`]
    pub fn opaque<T: Any + Send + Sync>(payload: T) -> Self {
        Value::Opaque(Arc::new(payload))
    }

    /// Get the discriminant of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Entity(_) => ValueKind::Entity,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Check for [`Value::Nil`]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Convert into a concrete type
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Borrow the text of a [`Value::Text`]
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(cast_error("str", other)),
        }
    }

    /// Downcast an opaque payload
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        match self {
            Value::Opaque(payload) => Arc::clone(payload)
                .downcast::<T>()
                .map_err(|_| cast_error(std::any::type_name::<T>(), self)),
            other => Err(cast_error(std::any::type_name::<T>(), other)),
        }
    }
}

fn cast_error(expected: &'static str, found: &Value) -> EntijError {
    EntijError::Cast {
        expected,
        found: found.kind(),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Text(s) => write!(f, "Text({:?})", s),
            Value::Entity(e) => write!(f, "Entity({})", e.id()),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Types that can be extracted from a [`Value`]
pub trait FromValue: Sized {
    /// Extract `Self`, failing with a cast error on a shape mismatch
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner.clone()),
                    other => Err(cast_error($name, other)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(inner: $ty) -> Self {
                Value::$variant(inner)
            }
        }
    };
}

impl_from_value!(bool, Bool, "bool");
impl_from_value!(i64, Int, "i64");
impl_from_value!(f64, Float, "f64");
impl_from_value!(String, Text, "String");
impl_from_value!(Entity, Entity, "Entity");
impl_from_value!(Vec<Value>, List, "Vec<Value>");
impl_from_value!(BTreeMap<String, Value>, Map, "BTreeMap<String, Value>");

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<&Entity> for Value {
    fn from(e: &Entity) -> Self {
        Value::Entity(e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_nil() {
        assert_eq!(Value::Nil.kind(), ValueKind::Nil);
        assert!(Value::default().is_nil());
        assert_eq!(Value::from(3).kind(), ValueKind::Int);
        assert_eq!(Value::from("a").kind(), ValueKind::Text);
        assert_eq!(Value::List(vec![]).kind(), ValueKind::List);
    }

    #[test]
    fn test_typed_get() {
        let v = Value::from(42_i64);
        assert_eq!(v.get::<i64>().unwrap(), 42);
        let err = v.get::<String>().unwrap_err();
        assert!(matches!(err, EntijError::Cast { expected: "String", found: ValueKind::Int }));
    }

    #[test]
    fn test_as_str() {
        assert_eq!(Value::from("door").as_str().unwrap(), "door");
        assert!(Value::Bool(true).as_str().is_err());
    }

    #[test]
    fn test_opaque_downcast_and_identity() {
        #[derive(Debug, PartialEq)]
        struct Tile(u8);

        let v = Value::opaque(Tile(3));
        assert_eq!(*v.downcast::<Tile>().unwrap(), Tile(3));
        assert!(v.downcast::<String>().is_err());

        let same = v.clone();
        assert_eq!(v, same);
        assert_ne!(v, Value::opaque(Tile(3)));
    }

    #[test]
    fn test_float_equality() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(1.0), Value::Int(1));
    }
}
