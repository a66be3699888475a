//! Deep Property Enumeration
//!
//! Walks a value tree and yields `(path, value, owner)` tuples for the
//! properties found across nested containers, in a configurable order and
//! with a configurable value filter. The wrapper layer uses the
//! depth-first, containers-only walk to pre-wrap nested containers
//! (children are yielded before the properties of their owner, so by the
//! time an owner is wrapped its children already are); `unmake_reactive`
//! uses the same walk in reverse.
//!
//! Traversal descends through reactive wrappers by reading their targets
//! raw; enumeration here never registers usage.

use super::list::ReactiveList;
use super::map::ReactiveMap;
use super::value::{PropKey, ReactiveValue, Value};

/// Order in which properties are yielded relative to their containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Children before the properties of their owner. The default.
    DepthFirst,
    /// All properties of a container before descending into any of them.
    BreadthFirst,
    /// Each property as it is first reached, before descending into it.
    Drilldown,
}

/// Which property values are yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldFilter {
    /// Only container-valued properties (plain or reactive).
    Containers,
    /// Only leaf-valued properties. The default.
    Leaves,
    /// Everything.
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub order: TraversalOrder,
    pub filter: YieldFilter,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::DepthFirst,
            filter: YieldFilter::Leaves,
        }
    }
}

impl WalkOptions {
    pub fn containers() -> Self {
        Self {
            order: TraversalOrder::DepthFirst,
            filter: YieldFilter::Containers,
        }
    }
}

/// Path to a property: the keys from the searched subject down to the
/// property's owner, then the property's own key. Never empty.
pub type Path = Vec<PropKey>;

/// One yielded property: its path, its value, and the container that
/// immediately owns it.
pub type PropertyEntry = (Path, Value, Value);

fn raw_entries(container: &Value) -> Vec<(PropKey, Value)> {
    fn map_entries(map: &ReactiveMap) -> Vec<(PropKey, Value)> {
        map.target()
            .read()
            .iter()
            .map(|(key, value)| (PropKey::Key(key.clone()), value.clone()))
            .collect()
    }
    fn list_entries(list: &ReactiveList) -> Vec<(PropKey, Value)> {
        list.target()
            .read()
            .iter()
            .enumerate()
            .map(|(index, value)| (PropKey::Index(index), value.clone()))
            .collect()
    }

    match container {
        Value::Map(map) => map
            .read()
            .iter()
            .map(|(key, value)| (PropKey::Key(key.clone()), value.clone()))
            .collect(),
        Value::List(list) => list
            .read()
            .iter()
            .enumerate()
            .map(|(index, value)| (PropKey::Index(index), value.clone()))
            .collect(),
        Value::Reactive(ReactiveValue::Map(map)) => map_entries(map),
        Value::Reactive(ReactiveValue::List(list)) => list_entries(list),
        _ => Vec::new(),
    }
}

fn matches_filter(value: &Value, filter: YieldFilter) -> bool {
    match filter {
        YieldFilter::Containers => value.is_container(),
        YieldFilter::Leaves => !value.is_container(),
        YieldFilter::All => true,
    }
}

/// Recursively search for properties in a container and the containers
/// it contains.
pub fn search_properties_deep(subject: &Value, options: WalkOptions) -> Vec<PropertyEntry> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(subject, &mut path, options, &mut out);
    out
}

fn walk(owner: &Value, path: &mut Path, options: WalkOptions, out: &mut Vec<PropertyEntry>) {
    let entries = raw_entries(owner);

    if options.order == TraversalOrder::BreadthFirst {
        for (key, value) in &entries {
            if matches_filter(value, options.filter) {
                let mut property_path = path.clone();
                property_path.push(key.clone());
                out.push((property_path, value.clone(), owner.clone()));
            }
        }
    }

    for (key, value) in entries {
        path.push(key);
        if options.order == TraversalOrder::Drilldown && matches_filter(&value, options.filter) {
            out.push((path.clone(), value.clone(), owner.clone()));
        }
        if value.is_container() {
            walk(&value, path, options, out);
        }
        if options.order == TraversalOrder::DepthFirst && matches_filter(&value, options.filter) {
            out.push((path.clone(), value.clone(), owner.clone()));
        }
        path.pop();
    }
}

/// Follow `path` from `subject`, returning the value at the end.
///
/// Reads through reactive wrappers go through their tracked accessors;
/// reads of plain containers are raw. `None` on any missing step or when
/// a non-container is reached mid-path.
pub fn get_prop_deep(subject: &Value, path: &[PropKey]) -> Option<Value> {
    let mut current = subject.clone();
    for segment in path {
        let next = match (&current, segment) {
            (Value::Map(map), PropKey::Key(key)) => map.read().get(key).cloned()?,
            (Value::List(list), PropKey::Index(index)) => list.read().get(*index).cloned()?,
            (Value::Reactive(ReactiveValue::Map(map)), PropKey::Key(key)) => map.get(key)?,
            (Value::Reactive(ReactiveValue::List(list)), PropKey::Index(index)) => {
                list.get(*index)?
            }
            _ => return None,
        };
        current = next;
    }
    Some(current)
}
