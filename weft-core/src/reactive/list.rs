//! Reactive List Wrapper
//!
//! `ReactiveList` wraps a shared list container. Element sources are
//! indexed per position, and the list length is an ordinary
//! pseudo-property with its own source, so a computation that reads
//! `len()` is dirtied exactly when the length moves, and one that reads
//! `get(3)` is dirtied when position 3 changes, whatever operation moved
//! it.
//!
//! Bulk mutation needs no special casing: a splice is just per-index
//! writes plus a length write, which composes correctly with per-key
//! tracking at the cost of notifying several positions for one logical
//! operation. Over-notification is accepted; under-notification never.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::error::Error;
use crate::signal::{notify_usage, SourceCore};

use super::value::{PropKey, SharedList, Value};

/// A per-index-observable wrapper around a shared list container.
///
/// Cloning produces another handle to the same wrapper.
pub struct ReactiveList {
    inner: Arc<ListInner>,
}

struct ListInner {
    target: SharedList,
    sources: DashMap<PropKey, SourceCore>,
    shallow: bool,
}

impl ReactiveList {
    pub(crate) fn wrap(target: SharedList, shallow: bool) -> Self {
        Self {
            inner: Arc::new(ListInner {
                target,
                sources: DashMap::new(),
                shallow,
            }),
        }
    }

    /// The wrapped container. Access through it is unobserved.
    pub fn target(&self) -> SharedList {
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
        let source = self
            .inner
            .sources
            .get(key)
            .map(|entry| entry.value().clone());
        if let Some(source) = source {
            source.notify_change();
        }
    }

    fn adapt(&self, value: Value) -> Value {
        if self.inner.shallow {
            value
        } else {
            super::make_reactive(value)
        }
    }

    /// Read one element.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.track(PropKey::Index(index));
        self.inner.target.read().get(index).cloned()
    }

    /// Current length.
    pub fn len(&self) -> usize {
        self.track(PropKey::Length);
        self.inner.target.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write one element in place, or append when `index == len`.
    pub fn set(&self, index: usize, value: Value) -> Result<(), Error> {
        let value = self.adapt(value);
        let appended = {
            let mut target = self.inner.target.write();
            let len = target.len();
            if index < len {
                target[index] = value;
                false
            } else if index == len {
                target.push(value);
                true
            } else {
                return Err(Error::IndexOutOfBounds { index, len });
            }
        };
        trace!(index, appended, "reactive list write");
        self.poke(&PropKey::Index(index));
        if appended {
            self.poke(&PropKey::Length);
        }
        Ok(())
    }

    /// Append one element.
    pub fn push(&self, value: Value) {
        let value = self.adapt(value);
        let index = {
            let mut target = self.inner.target.write();
            target.push(value);
            target.len() - 1
        };
        self.poke(&PropKey::Index(index));
        self.poke(&PropKey::Length);
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let (popped, index) = {
            let mut target = self.inner.target.write();
            let popped = target.pop()?;
            (popped, target.len())
        };
        self.poke(&PropKey::Index(index));
        self.poke(&PropKey::Length);
        Some(popped)
    }

    /// Replace `delete_count` elements starting at `start` with `items`,
    /// returning the removed elements.
    ///
    /// Out-of-range `start` clamps to the end; `delete_count` clamps to
    /// the tail. Every position from `start` to the end of the longer of
    /// the two shapes is notified, plus the length when it changed.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Vec<Value> {
        let items: Vec<Value> = items.into_iter().map(|item| self.adapt(item)).collect();
        let (removed, old_len, new_len) = {
            let mut target = self.inner.target.write();
            let old_len = target.len();
            let start = start.min(old_len);
            let delete_count = delete_count.min(old_len - start);
            let removed: Vec<Value> = target.splice(start..start + delete_count, items).collect();
            (removed, old_len, target.len())
        };
        trace!(start, old_len, new_len, "reactive list splice");
        for index in start.min(old_len)..old_len.max(new_len) {
            self.poke(&PropKey::Index(index));
        }
        if new_len != old_len {
            self.poke(&PropKey::Length);
        }
        removed
    }

    /// Insert one element at `index`, shifting the tail.
    pub fn insert(&self, index: usize, value: Value) -> Result<(), Error> {
        let len = self.inner.target.read().len();
        if index > len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        self.splice(index, 0, vec![value]);
        Ok(())
    }

    /// Remove the element at `index`, shifting the tail.
    pub fn remove(&self, index: usize) -> Result<Value, Error> {
        let len = self.inner.target.read().len();
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        let mut removed = self.splice(index, 1, Vec::new());
        Ok(removed.remove(0))
    }

    /// Snapshot of the elements. Registers usage of every position and
    /// the length, so any mutation dirties the reader.
    pub fn to_vec(&self) -> Vec<Value> {
        let snapshot: Vec<Value> = self.inner.target.read().iter().cloned().collect();
        for index in 0..snapshot.len() {
            self.track(PropKey::Index(index));
        }
        self.track(PropKey::Length);
        snapshot
    }
}

impl Clone for ReactiveList {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ReactiveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveList")
            .field("len", &self.inner.target.read().len())
            .field("shallow", &self.inner.shallow)
            .finish()
    }
}
