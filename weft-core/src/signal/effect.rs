//! Effect Implementation
//!
//! `Effect` runs a computation for its side effects, tracked through the
//! same capture protocol as a derived value. It is a signal sink but not
//! a source: there is no value to consume, so a dependency change fires
//! "dirty" only, never "change".
//!
//! # Rerun policies
//!
//! - [`Effect::new`] is eager: the computation has run exactly once by
//!   the time the constructor returns.
//! - [`Effect::new_lazy`] starts dirty and never runs until driven with
//!   [`reevaluate`](Effect::reevaluate) or
//!   [`force_rerun`](Effect::force_rerun).
//! - [`Effect::new_immediate`] is eager and additionally reruns itself:
//!   whenever it goes dirty it defers a `force_rerun` onto the task
//!   queue, so multiple dependency changes in one synchronous turn
//!   coalesce into a single deferred rerun.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::event::{EventChannel, Subscription};

use super::scheduler;
use super::sink::{self, SignalSink, SinkCore};

/// A side-effecting computation rerun when its dependencies change.
///
/// Cloning produces another handle to the same effect.
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    sink: Arc<SinkCore>,
    run: Box<dyn Fn() + Send + Sync>,
    /// The self-rerun listener installed by `new_immediate`.
    auto: Mutex<Option<Subscription>>,
}

impl Effect {
    /// Create an effect and run it once immediately to establish its
    /// initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.force_rerun();
        effect
    }

    /// Create an effect without running it. It stays dirty until driven.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                sink: SinkCore::new(None),
                run: Box::new(run),
                auto: Mutex::new(None),
            }),
        }
    }

    /// Create an eager effect that reruns itself, deferred, whenever its
    /// dependencies change.
    ///
    /// The rerun happens on the next [`scheduler::drain`] on this thread,
    /// not inside the mutation that dirtied the effect. The self-rerun
    /// subscription is torn down by [`dispose`](Effect::dispose).
    pub fn new_immediate<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new(run);
        let weak: Weak<EffectInner> = Arc::downgrade(&effect.inner);
        let subscription = effect.inner.sink.dirty_events().subscribe(move |_| {
            let weak = weak.clone();
            scheduler::defer(move || {
                if let Some(inner) = weak.upgrade() {
                    rerun(&inner);
                }
            });
        });
        *effect.inner.auto.lock() = Some(subscription);
        effect
    }

    pub fn dirty(&self) -> bool {
        self.inner.sink.dirty()
    }

    /// Run the computation only if the effect is dirty.
    pub fn reevaluate(&self) {
        if self.dirty() {
            self.force_rerun();
        }
    }

    /// Run the computation now, regardless of the dirty flag.
    ///
    /// The dependency set is rewired and the effect returns to clean in
    /// the guaranteed-cleanup path, even if the computation panics. A
    /// runner has no cache to invalidate, so its cleanup always lands on
    /// clean and fires "clean".
    pub fn force_rerun(&self) {
        rerun(&self.inner);
    }

    /// Fires when the effect transitions clean → dirty.
    pub fn dirty_events(&self) -> &EventChannel<()> {
        self.inner.sink.dirty_events()
    }

    /// Fires when a run completes.
    pub fn clean_events(&self) -> &EventChannel<()> {
        self.inner.sink.clean_events()
    }

    /// Cancel dependency subscriptions, the self-rerun listener, and all
    /// lifecycle listeners. Idempotent; the effect never runs again.
    pub fn dispose(&self) {
        if let Some(subscription) = self.inner.auto.lock().take() {
            subscription.cancel();
        }
        self.inner.sink.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.sink.is_disposed()
    }
}

fn rerun(inner: &Arc<EffectInner>) {
    if inner.sink.is_disposed() {
        return;
    }

    struct FinishOnExit(Arc<SinkCore>);
    impl Drop for FinishOnExit {
        fn drop(&mut self) {
            self.0.mark_clean_and_notify();
        }
    }

    // Declared before the tracked run so it fires after the capture scope
    // has rewired the dependency set, on success and unwind alike.
    let _finish = FinishOnExit(Arc::clone(&inner.sink));
    sink::tracked(&inner.sink, || (inner.run)());
}

impl SignalSink for Effect {
    fn dirty(&self) -> bool {
        Effect::dirty(self)
    }

    fn dirty_events(&self) -> &EventChannel<()> {
        Effect::dirty_events(self)
    }

    fn clean_events(&self) -> &EventChannel<()> {
        Effect::clean_events(self)
    }

    fn force_reevaluation(&self) {
        Effect::force_rerun(self)
    }

    fn dispose(&self) {
        Effect::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        Effect::is_disposed(self)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.sink.id())
            .field("dirty", &self.dirty())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
