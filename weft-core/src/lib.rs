//! Weft Core
//!
//! This crate provides the core engine for the Weft fine-grained
//! reactive state library. It implements:
//!
//! - Signal primitives (writable cells, derived values, effect runners)
//! - Automatic dependency capture with precise, per-evaluation rewiring
//! - Reactive container wrappers observable per property
//! - The event channels and deferred task queue they are built on
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `event`: Typed publish/subscribe channels with explicit cancellation
//! - `signal`: Core primitives and the dependency-capture protocol
//! - `reactive`: Per-key-observable wrappers around plain containers
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::signal::{Computed, State};
//!
//! // Create writable cells
//! let a = State::new(2);
//! let b = State::new(3);
//!
//! // Create a derived value; dependencies are discovered automatically
//! let a2 = a.clone();
//! let b2 = b.clone();
//! let sum = Computed::new(move || a2.get() + b2.get());
//! assert_eq!(sum.value(), 5);
//!
//! // Update a cell; the derived value goes dirty and recomputes lazily
//! a.set(5);
//! assert!(sum.dirty());
//! assert_eq!(sum.value(), 8);
//! ```

mod error;
pub mod event;
pub mod reactive;
pub mod signal;

pub use error::Error;
