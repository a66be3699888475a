//! Computed Implementation
//!
//! `Computed<T>` memoizes the result of a read-only computation. It is
//! both a signal sink (it consumes the sources its computation reads) and
//! a signal source (other sinks may consume it).
//!
//! # State machine
//!
//! A computed is either `clean` (cache valid) or `dirty` (cache stale).
//! It starts dirty and nothing runs at construction. Reading the value
//! while dirty evaluates synchronously before returning; reading while
//! clean returns the cache directly. When any captured dependency fires,
//! the computed announces both "change" (as a source whose value may now
//! differ) and "dirty" (as a sink), and then waits; recomputation is
//! purely lazy.
//!
//! # Failure policy
//!
//! If the computation panics the unwind propagates to the reader, the
//! dirty flag stays set, the stale cache is left untouched, and the
//! dependency set is still rewired to whatever was captured before the
//! panic. The next read retries.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::event::EventChannel;

use super::context;
use super::sink::{self, SignalSink, SinkCore};
use super::source::{SignalSource, SourceCore};

/// A memoized derived value, recomputed lazily on the next read after a
/// dependency change.
///
/// Cloning produces another handle to the same computed.
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    core: SourceCore,
    sink: Arc<SinkCore>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a computed over `compute`. Nothing is evaluated here; the
    /// computed starts dirty and runs on first read.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let core = SourceCore::new();
        Self {
            inner: Arc::new(ComputedInner {
                sink: SinkCore::new(Some(core.clone())),
                core,
                compute: Box::new(compute),
                value: RwLock::new(None),
            }),
        }
    }

    /// The current value, evaluating first if dirty.
    ///
    /// Announces this computed's own usage after any evaluation, so it
    /// participates as a dependency of enclosing evaluations whether or
    /// not it had to recompute.
    pub fn value(&self) -> T {
        if self.inner.sink.is_disposed() {
            // A disposed computed keeps serving its last cached value. If
            // it was never evaluated, evaluate once without rewiring.
            if let Some(cached) = self.inner.value.read().clone() {
                return cached;
            }
            let value = (self.inner.compute)();
            *self.inner.value.write() = Some(value.clone());
            return value;
        }
        if self.dirty() {
            self.force_reevaluation();
        }
        context::notify_usage(&self.inner.core);
        self.inner
            .value
            .read()
            .clone()
            .expect("clean computed holds a value")
    }

    pub fn dirty(&self) -> bool {
        self.inner.sink.dirty()
    }

    /// Evaluate now, regardless of the dirty flag.
    ///
    /// On success the result is cached, the computed becomes clean, and
    /// "clean" fires. The capture window closes and the dependency set is
    /// rewired before "clean" is emitted.
    pub fn force_reevaluation(&self) {
        if self.inner.sink.is_disposed() {
            return;
        }
        trace!(source = self.inner.core.id().raw(), "recomputing derived value");
        let value = sink::tracked(&self.inner.sink, || (self.inner.compute)());
        *self.inner.value.write() = Some(value);
        self.inner.sink.mark_clean_and_notify();
    }

    /// Fires when this computed transitions clean → dirty.
    pub fn dirty_events(&self) -> &EventChannel<()> {
        self.inner.sink.dirty_events()
    }

    /// Fires when an evaluation completes.
    pub fn clean_events(&self) -> &EventChannel<()> {
        self.inner.sink.clean_events()
    }

    /// Tear down dependency subscriptions and listeners; the computed
    /// keeps serving its cached value but never reacts again.
    pub fn dispose(&self) {
        self.inner.sink.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.sink.is_disposed()
    }
}

impl<T> SignalSource for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn core(&self) -> &SourceCore {
        &self.inner.core
    }
}

impl<T> SignalSink for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dirty(&self) -> bool {
        Computed::dirty(self)
    }

    fn dirty_events(&self) -> &EventChannel<()> {
        Computed::dirty_events(self)
    }

    fn clean_events(&self) -> &EventChannel<()> {
        Computed::clean_events(self)
    }

    fn force_reevaluation(&self) {
        Computed::force_reevaluation(self)
    }

    fn dispose(&self) {
        Computed::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        Computed::is_disposed(self)
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.core.id())
            .field("dirty", &self.dirty())
            .field("has_value", &self.inner.value.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::State;
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn lazy_until_first_read() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let computed = Computed::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert!(computed.dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(computed.value(), 42);
        assert!(!computed.dirty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clean_reads_hit_the_cache() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let computed = Computed::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(computed.value(), 42);
        assert_eq!(computed.value(), 42);
        assert_eq!(computed.value(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn updates_lazily_when_dependencies_change() {
        let a = State::new(2);
        let b = State::new(3);

        let a_clone = a.clone();
        let b_clone = b.clone();
        let sum = Computed::new(move || a_clone.get() + b_clone.get());

        let sum_clone = sum.clone();
        let double_sum = Computed::new(move || sum_clone.value() * 2);

        assert!(sum.dirty());
        assert_eq!(sum.value(), 5);
        assert!(!sum.dirty());

        assert!(double_sum.dirty());
        assert_eq!(double_sum.value(), 10);
        assert!(!double_sum.dirty());

        a.set(5);

        assert!(sum.dirty());
        assert_eq!(sum.value(), 8);
        assert!(!sum.dirty());

        assert!(double_sum.dirty());
        assert_eq!(double_sum.value(), 16);
        assert!(!double_sum.dirty());
    }

    #[test]
    fn equal_dependency_write_does_not_dirty() {
        let a = State::new(2);

        let a_clone = a.clone();
        let doubled = Computed::new(move || a_clone.get() * 2);
        assert_eq!(doubled.value(), 4);

        a.set(2);
        assert!(!doubled.dirty());
    }

    #[test]
    fn dependency_set_is_exact_per_evaluation() {
        let use_left = State::new(true);
        let left = State::new(1);
        let right = State::new(100);
        let calls = Arc::new(AtomicI32::new(0));

        let use_left_clone = use_left.clone();
        let left_clone = left.clone();
        let right_clone = right.clone();
        let calls_clone = calls.clone();
        let picked = Computed::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if use_left_clone.get() {
                left_clone.get()
            } else {
                right_clone.get()
            }
        });

        assert_eq!(picked.value(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // `right` was not read on the last evaluation, so writing it must
        // not dirty the computed.
        right.set(200);
        assert!(!picked.dirty());

        // Switch branches; `left` is now the stale dependency.
        use_left.set(false);
        assert!(picked.dirty());
        assert_eq!(picked.value(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        left.set(7);
        assert!(!picked.dirty());
        assert_eq!(picked.value(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dependency_change_fires_change_and_dirty() {
        let a = State::new(1);

        let a_clone = a.clone();
        let doubled = Computed::new(move || a_clone.get() * 2);
        doubled.value();

        let changes = Arc::new(AtomicI32::new(0));
        let dirties = Arc::new(AtomicI32::new(0));

        let changes_clone = changes.clone();
        doubled.changed().subscribe(move |_| {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });
        let dirties_clone = dirties.clone();
        doubled.dirty_events().subscribe(move |_| {
            dirties_clone.fetch_add(1, Ordering::SeqCst);
        });

        a.set(2);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(dirties.load(Ordering::SeqCst), 1);

        // Still dirty; further dependency writes are absorbed silently.
        a.set(3);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(dirties.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposed_computed_stops_reacting() {
        let a = State::new(1);

        let a_clone = a.clone();
        let doubled = Computed::new(move || a_clone.get() * 2);
        assert_eq!(doubled.value(), 2);

        doubled.dispose();
        a.set(10);
        assert!(!doubled.dirty());
        assert_eq!(doubled.value(), 2);
    }

    #[test]
    fn panicking_computation_leaves_dirty_and_retries() {
        let fail = State::new(true);
        let a = State::new(1);

        let fail_clone = fail.clone();
        let a_clone = a.clone();
        let computed = Computed::new(move || {
            if fail_clone.get() {
                panic!("boom");
            }
            a_clone.get() * 2
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| computed.value()));
        assert!(result.is_err());
        assert!(computed.dirty());

        // `fail` was captured before the panic, so flipping it dirties
        // the computed and the retry succeeds.
        fail.set(false);
        assert_eq!(computed.value(), 2);
        assert!(!computed.dirty());
    }

    #[test]
    fn clone_shares_cache_and_state() {
        let computed = Computed::new(|| 42);
        assert_eq!(computed.value(), 42);

        let clone = computed.clone();
        assert!(!clone.dirty());
        assert_eq!(clone.value(), 42);
    }
}
