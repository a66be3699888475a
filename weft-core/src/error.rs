//! Error types for the Weft core.

/// Errors surfaced by fallible operations in this crate.
///
/// User computations (the closures given to derived values and effect
/// runners) are not represented here: a panicking computation unwinds to
/// the caller that forced the evaluation, and dependency bookkeeping
/// still completes on the way out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The channel was cleared or dropped before the awaited event fired.
    #[error("event channel closed before the next event was emitted")]
    ChannelClosed,

    /// A list write addressed a position past the append slot.
    #[error("list index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
