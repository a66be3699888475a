//! Capture Context
//!
//! The capture context is how the engine discovers dependencies without
//! the programmer declaring them. While a sink evaluates its computation,
//! a capture frame is open on a thread-local stack; every signal source
//! read during that window announces itself here and is recorded into the
//! frame's ordered, deduplicated read set.
//!
//! # Nesting
//!
//! Evaluations nest (a derived value read inside another evaluation opens
//! its own frame). A read is recorded into EVERY open frame, not just the
//! innermost one: an outer evaluation depends on the sources its inner
//! evaluations read, because a change to any of them can change what the
//! outer computation would produce. The outer sink therefore subscribes
//! to the transitive leaves as well as to the derived value itself:
//! over-subscription at worst, never a missed invalidation.
//!
//! # Threading
//!
//! The stack is thread-local, so no two evaluations ever interleave their
//! capture windows. Frames are pushed and popped only by the evaluation
//! scope in the sink module, which unwinds them in LIFO order even when a
//! computation panics.

use std::cell::RefCell;

use indexmap::IndexSet;

use super::source::SourceCore;

thread_local! {
    static CAPTURE_STACK: RefCell<Vec<CaptureFrame>> = const { RefCell::new(Vec::new()) };
}

struct CaptureFrame {
    reads: IndexSet<SourceCore>,
}

/// Record that `source` was just read.
///
/// No-op outside any capture window. Called by every source's read path;
/// custom [`SignalSource`](super::SignalSource) implementations must call
/// this before returning their value.
pub fn notify_usage(source: &SourceCore) {
    CAPTURE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        for frame in stack.iter_mut() {
            frame.reads.insert(source.clone());
        }
    });
}

/// Whether a capture window is currently open on this thread.
pub fn is_capturing() -> bool {
    CAPTURE_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Open a new capture frame. Returns the stack depth for the matching
/// [`pop_frame`] call.
pub(crate) fn push_frame() -> usize {
    CAPTURE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(CaptureFrame {
            reads: IndexSet::new(),
        });
        stack.len()
    })
}

/// Close the innermost capture frame and take its read set.
pub(crate) fn pop_frame(expected_depth: usize) -> IndexSet<SourceCore> {
    CAPTURE_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        debug_assert_eq!(
            stack.len(),
            expected_depth,
            "capture frames must unwind in LIFO order"
        );
        stack.pop().map(|frame| frame.reads).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_outside_a_window_is_dropped() {
        let source = SourceCore::new();
        assert!(!is_capturing());
        notify_usage(&source);
        // Nothing to observe; the call must simply not panic.
    }

    #[test]
    fn frame_collects_deduplicated_reads() {
        let a = SourceCore::new();
        let b = SourceCore::new();

        let depth = push_frame();
        assert!(is_capturing());
        notify_usage(&a);
        notify_usage(&b);
        notify_usage(&a);

        let reads = pop_frame(depth);
        assert_eq!(reads.len(), 2);
        assert!(reads.contains(&a));
        assert!(reads.contains(&b));
        assert!(!is_capturing());
    }

    #[test]
    fn nested_frames_both_observe_inner_reads() {
        let outer_only = SourceCore::new();
        let inner_read = SourceCore::new();

        let outer = push_frame();
        notify_usage(&outer_only);

        let inner = push_frame();
        notify_usage(&inner_read);
        let inner_reads = pop_frame(inner);

        let outer_reads = pop_frame(outer);

        assert_eq!(inner_reads.len(), 1);
        assert!(inner_reads.contains(&inner_read));

        // The outer frame saw both its own read and the nested one.
        assert_eq!(outer_reads.len(), 2);
        assert!(outer_reads.contains(&outer_only));
        assert!(outer_reads.contains(&inner_read));
    }
}
