//! State Implementation
//!
//! `State<T>` is the writable cell: the fundamental signal source. It
//! holds one value, settable by its owner; reads announce themselves to
//! the capture context, and writes notify dependents. A write whose new
//! value is equal to the old one under the cell's equality comparer is a
//! complete no-op. That suppression is what lets downstream sinks avoid
//! spurious dirtying.
//!
//! # Example
//!
//! ```rust,ignore
//! let count = State::new(0);
//!
//! // Read the value (tracked when inside an evaluation)
//! let value = count.get();
//!
//! // Update the value (notifies dependents)
//! count.set(5);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::EventChannel;

use super::context;
use super::source::{SignalSource, SourceCore};

/// Equality predicate used to gate a cell's writes.
pub type EqualityComparer<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Payload carried on a cell's typed change channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange<T> {
    pub new: T,
    pub old: T,
}

/// A writable reactive cell holding a value of type `T`.
///
/// Cloning produces another handle to the same cell.
pub struct State<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<StateInner<T>>,
}

struct StateInner<T> {
    core: SourceCore,
    value: RwLock<T>,
    equals: EqualityComparer<T>,
    events: EventChannel<ValueChange<T>>,
}

impl<T> State<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a cell with the default equality comparer (`PartialEq`).
    pub fn new(initial: T) -> Self {
        Self::with_comparer(initial, |a: &T, b: &T| a == b)
    }
}

impl<T> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell with a custom equality comparer.
    pub fn with_comparer<F>(initial: T, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(StateInner {
                core: SourceCore::new(),
                value: RwLock::new(initial),
                equals: Arc::new(equals),
                events: EventChannel::new(),
            }),
        }
    }

    /// Get the current value.
    ///
    /// Inside an evaluation this registers the cell as a dependency of
    /// the evaluating sink.
    pub fn get(&self) -> T {
        context::notify_usage(&self.inner.core);
        self.inner.value.read().clone()
    }

    /// Get the current value without participating in dependency capture.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Store a new value and notify dependents.
    ///
    /// If the comparer deems `new_value` equal to the stored value the
    /// write is suppressed entirely: no change fires, nothing is dirtied.
    /// The comparer runs before any mutation, so a panicking comparer
    /// leaves the stored value unchanged.
    pub fn set(&self, new_value: T) {
        let old = {
            let mut value = self.inner.value.write();
            if (self.inner.equals)(&value, &new_value) {
                return;
            }
            std::mem::replace(&mut *value, new_value.clone())
        };
        self.inner.core.notify_change();
        self.inner.events.emit(&ValueChange {
            new: new_value,
            old,
        });
    }

    /// Update the value through a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let value = self.inner.value.read();
            f(&value)
        };
        self.set(next);
    }

    /// The typed change channel, carrying `(new, old)` payloads.
    pub fn events(&self) -> &EventChannel<ValueChange<T>> {
        &self.inner.events
    }
}

impl<T> SignalSource for State<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn core(&self) -> &SourceCore {
        &self.inner.core
    }
}

impl<T> Clone for State<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for State<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.core.id())
            .field("value", &self.get_untracked())
            .finish()
    }
}
