//! Signal Primitives
//!
//! This module implements the core of the engine: writable cells,
//! memoized derived values, and effect runners, all sharing one
//! dependency-capture protocol.
//!
//! # Concepts
//!
//! ## Sources and sinks
//!
//! A source is the read side of a trackable value: reading it announces
//! usage to the capture context, and its change channel fires when the
//! value may have moved. A sink is a consumer: it holds a dirty flag, a
//! dirty/clean lifecycle, and the set of sources its last evaluation
//! read.
//!
//! ## Dependency capture
//!
//! While a sink evaluates, a thread-local capture frame records every
//! source read, directly or transitively through another derived value.
//! When the evaluation finishes the sink's previous subscriptions are
//! cancelled and replaced with one change listener per captured source,
//! so the tracked graph is exactly what the latest evaluation actually
//! touched. Each listener fires at most once, flipping the sink to dirty;
//! nothing recomputes until the sink is read or driven again.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is the same push-pull model used by
//! fine-grained reactive UI layers: pushes propagate dirtiness, pulls do
//! the work.

mod computed;
mod context;
mod effect;
pub mod scheduler;
mod sink;
mod source;
mod state;

pub use computed::Computed;
pub use context::{is_capturing, notify_usage};
pub use effect::Effect;
pub use sink::{SignalSink, SinkId};
pub use source::{SignalSource, SourceCore, SourceId};
pub use state::{EqualityComparer, State, ValueChange};
