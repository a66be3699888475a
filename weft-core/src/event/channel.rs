//! Channel Implementation
//!
//! A typed publish/subscribe channel with explicit, taggable cancellation.
//!
//! # Listener Lifecycle
//!
//! 1. `subscribe` / `once` / `subscribe_scoped` append a listener entry
//!    and hand back a [`Subscription`] handle sharing the entry's
//!    cancelled flag.
//!
//! 2. `emit` snapshots the active listeners, releases the lock, and then
//!    invokes each callback whose flag is still clear. One-shot entries
//!    flip their flag before running so they fire at most once even under
//!    reentrant emission.
//!
//! 3. Cancelled entries are swept out on the next subscribe or emit.
//!
//! # Thread Safety
//!
//! Channels are `Send + Sync`. Callbacks run on the emitting thread,
//! outside any channel lock.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tokio::sync::oneshot;

use crate::error::Error;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerEntry<T> {
    once: bool,
    cancelled: Arc<AtomicBool>,
    callback: Callback<T>,
}

/// Handle to one listener registration.
///
/// Cancellation is explicit: dropping the handle does NOT remove the
/// listener. The dependency-capture machinery stores whole generations of
/// these and cancels them when a generation is superseded.
#[derive(Clone)]
pub struct Subscription {
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    fn live() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A subscription that was never attached to a channel.
    pub(crate) fn dead() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Permanently deactivate the listener. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Groups subscriptions so an entire set can be cancelled at once.
///
/// Registering on an already-cancelled token cancels the subscription
/// immediately, so late registrations cannot leak.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Attach a subscription to this token's lifetime.
    pub fn register(&self, subscription: Subscription) {
        if self.is_cancelled() {
            subscription.cancel();
            return;
        }
        self.inner.subscriptions.lock().push(subscription);
    }

    /// Cancel every registered subscription. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        for subscription in subscriptions {
            subscription.cancel();
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A typed publish/subscribe channel.
///
/// Cloning shares the same listener list.
pub struct EventChannel<T> {
    inner: Arc<ChannelInner<T>>,
}

struct ChannelInner<T> {
    listeners: RwLock<Vec<ListenerEntry<T>>>,
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener that fires on every emission until cancelled.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.push_listener(false, Arc::new(callback))
    }

    /// Register a listener that fires at most once, then self-cancels.
    pub fn once<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.push_listener(true, Arc::new(callback))
    }

    /// Register a listener tied to `token`'s lifetime.
    ///
    /// Cancelling the token cancels the listener; a token that is already
    /// cancelled yields a dead subscription without touching the channel.
    pub fn subscribe_scoped<F>(&self, token: &CancelToken, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        if token.is_cancelled() {
            return Subscription::dead();
        }
        let subscription = self.subscribe(callback);
        token.register(subscription.clone());
        subscription
    }

    fn push_listener(&self, once: bool, callback: Callback<T>) -> Subscription {
        let subscription = Subscription::live();
        let mut listeners = self.inner.listeners.write();
        listeners.retain(|entry| !entry.cancelled.load(Ordering::Acquire));
        listeners.push(ListenerEntry {
            once,
            cancelled: subscription.cancelled.clone(),
            callback,
        });
        subscription
    }

    /// Synchronously invoke every listener active at the time of the call.
    ///
    /// Listeners may cancel subscriptions (their own included), subscribe,
    /// or emit while the fan-out is in progress; a listener cancelled
    /// earlier in the same emission is skipped.
    pub fn emit(&self, payload: &T) {
        let snapshot: SmallVec<[(bool, Arc<AtomicBool>, Callback<T>); 8]> = {
            let listeners = self.inner.listeners.read();
            listeners
                .iter()
                .filter(|entry| !entry.cancelled.load(Ordering::Acquire))
                .map(|entry| (entry.once, entry.cancelled.clone(), entry.callback.clone()))
                .collect()
        };

        for (once, cancelled, callback) in snapshot {
            if once {
                // Claim the entry before running so reentrant emissions
                // cannot fire it a second time.
                if !cancelled.swap(true, Ordering::AcqRel) {
                    callback(payload);
                }
            } else if !cancelled.load(Ordering::Acquire) {
                callback(payload);
            }
        }
    }

    /// Remove every listener. Pending [`NextEvent`]s resolve to
    /// [`Error::ChannelClosed`].
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.inner.listeners.write());
        for entry in &drained {
            entry.cancelled.store(true, Ordering::Release);
        }
    }

    /// Number of listeners that are still active.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::Acquire))
            .count()
    }
}

impl<T> EventChannel<T>
where
    T: Clone + Send + 'static,
{
    /// The next emitted payload as a deferred value.
    pub fn next(&self) -> NextEvent<T> {
        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));
        self.once(move |payload: &T| {
            if let Some(sender) = slot.lock().take() {
                let _ = sender.send(payload.clone());
            }
        });
        NextEvent { receiver }
    }
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

/// Deferred value resolved with the next payload emitted on a channel.
///
/// Resolves to [`Error::ChannelClosed`] if the channel is cleared or
/// dropped before an emission happens.
pub struct NextEvent<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Future for NextEvent<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map_err(|_| Error::ChannelClosed)
    }
}
