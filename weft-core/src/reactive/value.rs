//! Container Model
//!
//! Rust has no transparently interceptable object model, so the reactive
//! wrapper layer operates on an explicit tree of plain data: leaf
//! scalars, shared map containers, and shared list containers. Containers
//! are reference-counted and interior-mutable, which gives them the
//! reference semantics the wrapper layer needs: wrapping a container and
//! unwrapping it again yields the same allocation, and equality between
//! containers is identity, not structure.
//!
//! A [`Value::Reactive`] variant holds a wrapped container. Reads and
//! writes through the wrapper are observed per key; reads and writes on
//! the shared container directly are not. The plain escape hatch is
//! always one [`unwrap_reactive`](super::unwrap_reactive) away.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::ser::{Serialize, Serializer};

use super::list::ReactiveList;
use super::map::ReactiveMap;

/// A shared, interior-mutable map container. Insertion-ordered.
pub type SharedMap = Arc<RwLock<IndexMap<String, Value>>>;

/// A shared, interior-mutable list container.
pub type SharedList = Arc<RwLock<Vec<Value>>>;

/// A property key inside a reactive container.
///
/// `Length` is the list length pseudo-property. `Shape` is the reserved
/// synthetic key standing for the container's own shape (key set and
/// identity-level state), used by enumeration tracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    Key(String),
    Index(usize),
    Length,
    Shape,
}

impl PropKey {
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }
}

/// A plain or reactive data tree node.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Map(SharedMap),
    List(SharedList),
    Reactive(ReactiveValue),
}

/// A reactively wrapped container.
#[derive(Clone, Debug)]
pub enum ReactiveValue {
    Map(ReactiveMap),
    List(ReactiveList),
}

impl ReactiveValue {
    /// Identity comparison: two handles to the same wrapper.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Build a map container from entries, preserving their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(Arc::new(RwLock::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )))
    }

    /// Build a list container from items.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::List(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    /// Whether this value is a container (plain or reactive).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Map(_) | Self::List(_) | Self::Reactive(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// A handle to the reactive map wrapper, if this is one.
    pub fn as_reactive_map(&self) -> Option<ReactiveMap> {
        match self {
            Self::Reactive(ReactiveValue::Map(map)) => Some(map.clone()),
            _ => None,
        }
    }

    /// A handle to the reactive list wrapper, if this is one.
    pub fn as_reactive_list(&self) -> Option<ReactiveList> {
        match self {
            Self::Reactive(ReactiveValue::List(list)) => Some(list.clone()),
            _ => None,
        }
    }
}

/// Scalar leaves compare by value; containers compare by identity, the
/// way the original object model compares references. A plain container
/// and its reactive wrapping are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => Arc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b),
            (Self::Reactive(a), Self::Reactive(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Serializes the data reachable through this value, looking through
/// reactive wrappers to their targets. Snapshotting is a raw read: it
/// does not register usage and does not include any wrapper state.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Map(map) => {
                let map = map.read();
                serializer.collect_map(map.iter())
            }
            Self::List(list) => {
                let list = list.read();
                serializer.collect_seq(list.iter())
            }
            Self::Reactive(ReactiveValue::Map(map)) => {
                let target = map.target();
                let map = target.read();
                serializer.collect_map(map.iter())
            }
            Self::Reactive(ReactiveValue::List(list)) => {
                let target = list.target();
                let list = target.read();
                serializer.collect_seq(list.iter())
            }
        }
    }
}
