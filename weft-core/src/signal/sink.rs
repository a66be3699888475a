//! Signal Sinks and the Dependency Capture Protocol
//!
//! A signal sink consumes sources: it owns a dirty flag, dirty/clean
//! notification channels, and the current dependency edge set. Derived
//! values and effect runners are the two sinks in this crate; both
//! evaluate through the same protocol implemented here.
//!
//! # The protocol
//!
//! 1. [`tracked`] opens a capture frame for the duration of exactly one
//!    synchronous run of the owner's computation.
//!
//! 2. When the frame closes, on normal return or on unwind, the sink's
//!    previous edge generation is cancelled and one change listener is
//!    subscribed per captured source. This replacement is what keeps the
//!    dependency graph precise: sources no longer read stop being
//!    tracked the moment the evaluation finishes.
//!
//! 3. Each edge listener fires at most once. On the first change from any
//!    dependency the listener marks the sink dirty, cancels the whole
//!    edge generation, announces "change" when the sink is itself a
//!    source, and announces "dirty". Nothing recomputes here; sinks stay
//!    lazy until the next read or forced run.
//!
//! An empty capture set retains no token at all.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::event::{CancelToken, EventChannel};

use super::context;
use super::source::SourceCore;

/// Counter for generating unique sink IDs.
static SINK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a signal sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        Self(SINK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Capability trait for everything that consumes sources and exposes a
/// dirty/clean lifecycle.
pub trait SignalSink {
    /// Whether the sink's last result is known stale.
    fn dirty(&self) -> bool;

    /// Fires when the sink transitions clean → dirty.
    fn dirty_events(&self) -> &EventChannel<()>;

    /// Fires when an evaluation completes.
    fn clean_events(&self) -> &EventChannel<()>;

    /// Run the computation now, regardless of the dirty flag.
    fn force_reevaluation(&self);

    /// Tear down dependency subscriptions and listeners. Idempotent;
    /// the sink never reacts again afterward.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Shared sink state: the dirty flag, lifecycle channels, and the
/// current dependency edge generation.
pub(crate) struct SinkCore {
    id: SinkId,
    dirty: AtomicBool,
    disposed: AtomicBool,
    dirty_events: EventChannel<()>,
    clean_events: EventChannel<()>,
    /// One token covering every edge of the current generation.
    edges: Mutex<Option<CancelToken>>,
    /// Present when the owning sink is itself a source (a derived
    /// value): a dependency firing then also announces "change" here.
    source: Option<SourceCore>,
}

impl SinkCore {
    /// New sink state, initially dirty.
    pub fn new(source: Option<SourceCore>) -> Arc<Self> {
        Arc::new(Self {
            id: SinkId::next(),
            dirty: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            dirty_events: EventChannel::new(),
            clean_events: EventChannel::new(),
            edges: Mutex::new(None),
            source,
        })
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn dirty_events(&self) -> &EventChannel<()> {
        &self.dirty_events
    }

    pub fn clean_events(&self) -> &EventChannel<()> {
        &self.clean_events
    }

    /// Clear the dirty flag and announce "clean".
    pub fn mark_clean_and_notify(&self) {
        self.dirty.store(false, Ordering::Release);
        self.clean_events.emit(&());
    }

    /// Cancel edges, clear listeners, and go permanently inert.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(token) = self.edges.lock().take() {
            token.cancel();
        }
        self.dirty_events.clear();
        self.clean_events.clear();
        if let Some(source) = &self.source {
            source.changed().clear();
        }
        debug!(sink = self.id.raw(), "sink disposed");
    }

    /// A dependency announced a change: mark dirty, retire the whole edge
    /// generation, and notify.
    fn on_dependency_changed(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        self.dirty.store(true, Ordering::Release);
        if let Some(token) = self.edges.lock().take() {
            token.cancel();
        }
        trace!(sink = self.id.raw(), "dependency changed; sink marked dirty");
        if let Some(source) = &self.source {
            source.notify_change();
        }
        self.dirty_events.emit(&());
    }

    /// Atomically replace the dependency edge set with one listener per
    /// captured source.
    fn rewire(self: &Arc<Self>, reads: IndexSet<SourceCore>) {
        let mut edges = self.edges.lock();
        if let Some(previous) = edges.take() {
            previous.cancel();
        }
        if reads.is_empty() || self.is_disposed() {
            return;
        }
        trace!(
            sink = self.id.raw(),
            dependencies = reads.len(),
            "dependency set replaced"
        );
        let token = CancelToken::new();
        for dependency in &reads {
            let weak: Weak<SinkCore> = Arc::downgrade(self);
            dependency.changed().subscribe_scoped(&token, move |_| {
                if let Some(sink) = weak.upgrade() {
                    sink.on_dependency_changed();
                }
            });
        }
        *edges = Some(token);
    }

    /// Whether a dependency edge generation is currently held.
    #[cfg(test)]
    pub fn has_edges(&self) -> bool {
        self.edges.lock().is_some()
    }
}

/// Run `computation` inside a capture window owned by `sink`.
///
/// The window closes and the sink's edges are rewired when the scope
/// drops, on normal return and on unwind alike: a panicking computation
/// propagates to the caller but never leaves the sink with a stale or
/// half-captured subscription set.
pub(crate) fn tracked<R>(sink: &Arc<SinkCore>, computation: impl FnOnce() -> R) -> R {
    let _scope = EvalScope::begin(Arc::clone(sink));
    computation()
}

struct EvalScope {
    sink: Arc<SinkCore>,
    depth: usize,
}

impl EvalScope {
    fn begin(sink: Arc<SinkCore>) -> Self {
        let depth = context::push_frame();
        Self { sink, depth }
    }
}

impl Drop for EvalScope {
    fn drop(&mut self) {
        let reads = context::pop_frame(self.depth);
        self.sink.rewire(reads);
    }
}
