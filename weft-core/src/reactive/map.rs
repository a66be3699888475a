//! Reactive Map Wrapper
//!
//! `ReactiveMap` wraps a shared map container so every access through its
//! typed accessors is observed per key. Reads register usage on a
//! lazily-created per-key source; writes and removals notify the matching
//! source, a no-op when nothing ever read that key.
//!
//! # Shape tracking
//!
//! Enumeration-style reads (`keys`, `entries`, `len`) register usage of
//! every present key AND the reserved `Shape` key. Inserting a brand-new
//! key notifies that key and `Shape`; overwriting notifies only the key;
//! removing notifies only the key, which suffices because every
//! enumerator holds a registration on every key that existed when it ran.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::signal::{notify_usage, SourceCore};

use super::value::{PropKey, SharedMap, Value};

/// A per-key-observable wrapper around a shared map container.
///
/// Cloning produces another handle to the same wrapper.
pub struct ReactiveMap {
    inner: Arc<MapInner>,
}

struct MapInner {
    target: SharedMap,
    sources: DashMap<PropKey, SourceCore>,
    shallow: bool,
}

impl ReactiveMap {
    pub(crate) fn wrap(target: SharedMap, shallow: bool) -> Self {
        Self {
            inner: Arc::new(MapInner {
                target,
                sources: DashMap::new(),
                shallow,
            }),
        }
    }

    /// The wrapped container. Access through it is unobserved.
    pub fn target(&self) -> SharedMap {
        Arc::clone(&self.inner.target)
    }

    /// Identity comparison: two handles to the same wrapper.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn source_for(&self, key: PropKey) -> SourceCore {
        self.inner
            .sources
            .entry(key)
            .or_insert_with(SourceCore::new)
            .value()
            .clone()
    }

    fn track(&self, key: PropKey) {
        let source = self.source_for(key);
        notify_usage(&source);
    }

    fn poke(&self, key: &PropKey) {
        // Clone the source out of the table first: notifying runs
        // arbitrary listeners, which must not observe a held shard lock.
        let source = self
            .inner
            .sources
            .get(key)
            .map(|entry| entry.value().clone());
        if let Some(source) = source {
            source.notify_change();
        }
    }

    fn track_enumeration(&self) {
        let keys: Vec<String> = self.inner.target.read().keys().cloned().collect();
        for key in keys {
            self.track(PropKey::Key(key));
        }
        self.track(PropKey::Shape);
    }

    fn adapt(&self, value: Value) -> Value {
        if self.inner.shallow {
            value
        } else {
            super::make_reactive(value)
        }
    }

    /// Read one property.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.track(PropKey::key(key));
        self.inner.target.read().get(key).cloned()
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.track(PropKey::key(key));
        self.inner.target.read().contains_key(key)
    }

    /// Write one property, wrapping container values first unless this
    /// wrapper is shallow. Returns the previous value, if any.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let value = self.adapt(value);
        let previous = self.inner.target.write().insert(key.clone(), value);
        trace!(key = %key, fresh = previous.is_none(), "reactive map write");
        let prop = PropKey::Key(key);
        self.poke(&prop);
        if previous.is_none() {
            self.poke(&PropKey::Shape);
        }
        previous
    }

    /// Remove one property, preserving the order of the remaining keys.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.target.write().shift_remove(key);
        self.poke(&PropKey::key(key));
        removed
    }

    /// Number of keys. Tracked like an enumeration: any key addition or
    /// removal invalidates the reader.
    pub fn len(&self) -> usize {
        self.track_enumeration();
        self.inner.target.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the present keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.track_enumeration();
        self.inner.target.read().keys().cloned().collect()
    }

    /// Snapshot of the present entries, in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.track_enumeration();
        self.inner
            .target
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl Clone for ReactiveMap {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ReactiveMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveMap")
            .field("len", &self.inner.target.read().len())
            .field("shallow", &self.inner.shallow)
            .finish()
    }
}
