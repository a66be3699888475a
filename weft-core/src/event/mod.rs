//! Event Channels
//!
//! This module implements the generic publish/subscribe primitive that
//! every notification surface in the crate is built on: value-change
//! channels on signal sources, dirty/clean channels on signal sinks, and
//! the per-key channels inside reactive containers.
//!
//! # Concepts
//!
//! A channel owns a list of listeners. Emitting fans out synchronously to
//! the listeners that are active at emit time. Cancellation is explicit:
//! each subscription is a handle with a tagged active/cancelled state, and
//! a [`CancelToken`] groups many subscriptions so a whole set can be torn
//! down at once. Cancelled entries are purged lazily.
//!
//! The dependency-tracking layer relies on two guarantees here:
//!
//! 1. A listener cancelled earlier in the same emission is skipped, so a
//!    dependency edge that fires and cancels its generation of edges
//!    cannot be invoked twice.
//! 2. Emission never holds the listener lock while running callbacks, so
//!    listeners may subscribe, cancel, or emit reentrantly.

mod channel;

pub use channel::{CancelToken, EventChannel, NextEvent, Subscription};
