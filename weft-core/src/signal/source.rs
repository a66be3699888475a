//! Signal Sources
//!
//! A signal source is the read side of a trackable value: anything that
//! announces its reads to the capture context and exposes a change
//! channel. Firing "change" means the value reachable through the source
//! may now differ from what the last read returned; over-notifying is
//! allowed, under-notifying never is.
//!
//! Every concrete source in the crate (writable cells, derived values,
//! and the per-key sources inside reactive containers) carries a
//! [`SourceCore`]: a unique id plus the change channel. Capture sets hold
//! `SourceCore` handles directly, deduplicated by id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::EventChannel;

/// Counter for generating unique source IDs.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a signal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        Self(SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The shared identity of a signal source: a unique id and the change
/// notification channel.
///
/// Cloning produces another handle to the same source.
pub struct SourceCore {
    inner: Arc<SourceCoreInner>,
}

struct SourceCoreInner {
    id: SourceId,
    changed: EventChannel<()>,
}

impl SourceCore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SourceCoreInner {
                id: SourceId::next(),
                changed: EventChannel::new(),
            }),
        }
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// The channel that fires whenever the value behind this source may
    /// have changed.
    pub fn changed(&self) -> &EventChannel<()> {
        &self.inner.changed
    }

    /// Announce that the value behind this source changed.
    pub fn notify_change(&self) {
        self.inner.changed.emit(&());
    }
}

impl Clone for SourceCore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SourceCore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SourceCore {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SourceCore {}

impl std::hash::Hash for SourceCore {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for SourceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCore")
            .field("id", &self.id())
            .field("listener_count", &self.changed().listener_count())
            .finish()
    }
}

/// Capability trait for everything readable whose reads are tracked.
pub trait SignalSource {
    /// The source's shared identity.
    fn core(&self) -> &SourceCore;

    /// The change notification channel.
    fn changed(&self) -> &EventChannel<()> {
        self.core().changed()
    }

    fn source_id(&self) -> SourceId {
        self.core().id()
    }
}

impl SignalSource for SourceCore {
    fn core(&self) -> &SourceCore {
        self
    }
}
