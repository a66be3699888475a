//! Reactive Containers
//!
//! This module turns plain containers into fine-grained signal sources at
//! the level of individual properties. Wrapping a map or list yields a
//! typed wrapper whose accessors register usage per key on reads and
//! notify per key on writes: a computation that read `.a` is dirtied by
//! writes to `.a` and untouched by writes to `.b`, with nothing declared
//! by the caller.
//!
//! # Deep wrapping
//!
//! By default wrapping is deep: every nested container is wrapped first
//! (children before owners), and containers written through a wrapper are
//! wrapped on the way in, so newly attached subtrees are reactive without
//! re-running the top-level wrap. `shallow` turns both behaviors off.
//!
//! Wrapping is idempotent (an already-reactive value is returned
//! unchanged, never double-wrapped) and reversible: the original shared
//! container stays reachable through [`unwrap_reactive`], and
//! [`unmake_reactive`] restores a whole tree to plain containers.

mod list;
mod map;
mod value;
pub mod walk;

pub use list::ReactiveList;
pub use map::ReactiveMap;
pub use value::{PropKey, ReactiveValue, SharedList, SharedMap, Value};
pub use walk::{get_prop_deep, search_properties_deep, WalkOptions};

use tracing::trace;

use walk::{Path, TraversalOrder, YieldFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReactiveOptions {
    /// If `true`, nested containers are left plain and writes are stored
    /// as given.
    pub shallow: bool,
}

/// Wrap `value` (and, by default, every nested container) reactively.
///
/// Leaves pass through unchanged; an already-reactive value is returned
/// as-is.
pub fn make_reactive(value: Value) -> Value {
    make_reactive_with(value, ReactiveOptions::default())
}

/// [`make_reactive`] with explicit options.
pub fn make_reactive_with(value: Value, options: ReactiveOptions) -> Value {
    if !options.shallow {
        // Children before owners: replace every nested plain container
        // with its wrapping, in place, before the subject itself is
        // wrapped. Raw replacement; nothing observes the tree yet.
        let nested = search_properties_deep(
            &value,
            WalkOptions {
                order: TraversalOrder::DepthFirst,
                filter: YieldFilter::Containers,
            },
        );
        for (path, child, owner) in nested {
            if is_reactive(&child) {
                continue;
            }
            let wrapped = wrap_one_level(child, false);
            replace_raw(&owner, last_segment(&path), wrapped);
        }
    }
    if is_reactive(&value) {
        return value;
    }
    wrap_one_level(value, options.shallow)
}

/// `true` iff `value` is a reactive wrapper. Constant time.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// Unwrap one level: the original shared container behind a reactive
/// wrapper, identity on anything else.
pub fn unwrap_reactive(value: Value) -> Value {
    match value {
        Value::Reactive(ReactiveValue::Map(map)) => Value::Map(map.target()),
        Value::Reactive(ReactiveValue::List(list)) => Value::List(list.target()),
        other => other,
    }
}

/// Recursively unwrap `value` and every nested reactive value back to
/// plain containers.
///
/// Computations that cached a value through the reactive view keep it;
/// their per-key subscriptions simply never fire again through the
/// unwrapped path.
pub fn unmake_reactive(value: Value) -> Value {
    let plain = unwrap_reactive(value);
    let nested = search_properties_deep(
        &plain,
        WalkOptions {
            order: TraversalOrder::DepthFirst,
            filter: YieldFilter::Containers,
        },
    );
    for (path, child, owner) in nested {
        if !is_reactive(&child) {
            continue;
        }
        replace_raw(&owner, last_segment(&path), unwrap_reactive(child));
    }
    plain
}

fn wrap_one_level(value: Value, shallow: bool) -> Value {
    match value {
        Value::Map(target) => {
            trace!(shallow, "wrapping map container");
            Value::Reactive(ReactiveValue::Map(ReactiveMap::wrap(target, shallow)))
        }
        Value::List(target) => {
            trace!(shallow, "wrapping list container");
            Value::Reactive(ReactiveValue::List(ReactiveList::wrap(target, shallow)))
        }
        other => other,
    }
}

fn last_segment(path: &Path) -> &PropKey {
    path.last().expect("walk paths are never empty")
}

/// Write straight into the owner's container, bypassing notification.
/// Used only while installing or removing wrappers.
fn replace_raw(owner: &Value, key: &PropKey, value: Value) {
    match (owner, key) {
        (Value::Map(map), PropKey::Key(name)) => {
            map.write().insert(name.clone(), value);
        }
        (Value::List(list), PropKey::Index(index)) => {
            if let Some(slot) = list.write().get_mut(*index) {
                *slot = value;
            }
        }
        (Value::Reactive(ReactiveValue::Map(map)), PropKey::Key(name)) => {
            map.target().write().insert(name.clone(), value);
        }
        (Value::Reactive(ReactiveValue::List(list)), PropKey::Index(index)) => {
            if let Some(slot) = list.target().write().get_mut(*index) {
                *slot = value;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Computed;
    use std::sync::Arc;

    #[test]
    fn wraps_and_round_trips_the_same_container() {
        let plain = Value::map([("a", Value::Int(1))]);
        let original_target = match &plain {
            Value::Map(target) => Arc::clone(target),
            _ => unreachable!(),
        };

        let proxy = make_reactive(plain);
        assert!(is_reactive(&proxy));

        match unwrap_reactive(proxy) {
            Value::Map(target) => assert!(Arc::ptr_eq(&target, &original_target)),
            other => panic!("expected the original map back, got {other:?}"),
        }
    }

    #[test]
    fn make_reactive_is_idempotent() {
        let proxy = make_reactive(Value::map([("a", Value::Int(1))]));
        let map = proxy.as_reactive_map().unwrap();

        let again = make_reactive(proxy);
        assert!(map.ptr_eq(&again.as_reactive_map().unwrap()));
    }

    #[test]
    fn leaves_pass_through() {
        assert_eq!(make_reactive(Value::Int(5)), Value::Int(5));
        assert_eq!(make_reactive(Value::Null), Value::Null);
    }

    #[test]
    fn deep_wrap_reaches_nested_containers() {
        let proxy = make_reactive(Value::map([(
            "a",
            Value::map([("b", Value::Int(2))]),
        )]));

        let map = proxy.as_reactive_map().unwrap();
        let nested = map.get("a").unwrap();
        assert!(is_reactive(&nested));

        let map_clone = map.clone();
        let double_ab = Computed::new(move || {
            let nested = map_clone.get("a").unwrap().as_reactive_map().unwrap();
            nested.get("b").unwrap().as_int().unwrap() * 2
        });
        assert_eq!(double_ab.value(), 4);

        nested.as_reactive_map().unwrap().insert("b", Value::Int(3));
        assert!(double_ab.dirty());
        assert_eq!(double_ab.value(), 6);
    }

    #[test]
    fn shallow_wrap_leaves_nested_containers_plain() {
        let proxy = make_reactive_with(
            Value::map([("a", Value::map([("b", Value::Int(2))]))]),
            ReactiveOptions { shallow: true },
        );

        let map = proxy.as_reactive_map().unwrap();
        let nested = map.get("a").unwrap();
        assert!(!is_reactive(&nested));

        let map_clone = map.clone();
        let double_ab = Computed::new(move || {
            match map_clone.get("a").unwrap() {
                Value::Map(inner) => inner.read().get("b").unwrap().as_int().unwrap() * 2,
                other => panic!("expected a plain nested map, got {other:?}"),
            }
        });
        assert_eq!(double_ab.value(), 4);

        // Mutating the plain nested map is invisible to the wrapper.
        if let Value::Map(inner) = &nested {
            inner.write().insert("b".to_string(), Value::Int(3));
        }
        assert!(!double_ab.dirty());
        assert_eq!(double_ab.value(), 4);
    }

    #[test]
    fn mutation_through_the_unwrapped_container_is_unobserved() {
        let proxy = make_reactive(Value::map([("a", Value::Int(1))]));
        let map = proxy.as_reactive_map().unwrap();

        let map_clone = map.clone();
        let double_a = Computed::new(move || map_clone.get("a").unwrap().as_int().unwrap() * 2);
        assert_eq!(double_a.value(), 2);

        let unwrapped = match unwrap_reactive(proxy) {
            Value::Map(target) => target,
            _ => unreachable!(),
        };
        unwrapped.write().insert("a".to_string(), Value::Int(3));

        assert!(!double_a.dirty());
        assert_eq!(double_a.value(), 2);
    }

    #[test]
    fn unmake_reactive_restores_plain_trees() {
        let proxy = make_reactive(Value::map([
            ("a", Value::map([("b", Value::Int(2))])),
            ("items", Value::list([Value::map([("x", Value::Int(1))])])),
        ]));

        let plain = unmake_reactive(proxy);
        assert!(!is_reactive(&plain));

        let json = serde_json::to_value(&plain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "a": { "b": 2 }, "items": [{ "x": 1 }] })
        );

        // Every nested value is plain again.
        let nested = get_prop_deep(&plain, &[PropKey::key("a")]).unwrap();
        assert!(!is_reactive(&nested));
        let item = get_prop_deep(
            &plain,
            &[PropKey::key("items"), PropKey::Index(0)],
        )
        .unwrap();
        assert!(!is_reactive(&item));
    }
}
