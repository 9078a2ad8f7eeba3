//! Named publish/subscribe events.
//!
//! The engine never owns a global event manager: the host injects an
//! [`EventSystem`] into each [`Context`](crate::Context). [`EventBus`] is the
//! in-process implementation with synchronous, same-thread delivery.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use trellis_context::events::{EventBus, EventSystem};
//!
//! let bus = EventBus::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//!
//! let subscription = bus.subscribe("door_opened", Arc::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! bus.publish("door_opened");
//! subscription.dispose();
//! bus.publish("door_opened");
//!
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

/// A zero-argument event callback.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// A process-wide named pub/sub facility.
pub trait EventSystem: Send + Sync {
    /// Registers `handler` for `event`. The returned token removes exactly
    /// this registration when disposed.
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;

    /// Invokes every handler currently registered for `event`.
    fn publish(&self, event: &str);

    /// Returns the number of live handlers for `event`.
    fn subscriber_count(&self, event: &str) -> usize;
}

impl fmt::Debug for dyn EventSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSystem").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription
// ─────────────────────────────────────────────────────────────────────────────

type Disposer = Box<dyn FnOnce() + Send>;

struct SubscriptionInner {
    event: String,
    disposer: Mutex<Option<Disposer>>,
}

/// Disposable token for one event registration.
///
/// Clones share the same registration. Disposing is idempotent, and dropping
/// a token does not dispose it.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Creates a token that runs `disposer` on the first call to [`dispose`](Self::dispose).
    ///
    /// Intended for [`EventSystem`] implementations.
    #[must_use]
    pub fn new(event: impl Into<String>, disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                event: event.into(),
                disposer: Mutex::new(Some(Box::new(disposer))),
            }),
        }
    }

    /// Returns the event name this token was registered for.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.inner.event
    }

    /// Removes the registration. Subsequent calls do nothing.
    pub fn dispose(&self) {
        let disposer = self.inner.disposer.lock().take();
        if let Some(disposer) = disposer {
            disposer();
        }
    }

    /// Returns true once the registration has been removed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposer.lock().is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.inner.event)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventBus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct BusInner {
    handlers: RwLock<HashMap<String, Vec<(u64, EventHandler)>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, event: &str, id: u64) {
        let mut handlers = self.handlers.write();
        if let Some(list) = handlers.get_mut(event) {
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.is_empty() {
                handlers.remove(event);
            }
        }
    }
}

/// In-process [`EventSystem`].
///
/// Cloning is cheap and clones share the same registrations. Handlers run
/// on the publishing thread, outside the internal lock, so a handler may
/// publish, subscribe or dispose without deadlocking. A handler disposed
/// while a publish is in flight still receives that one delivery.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of live handlers across all events.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.inner.handlers.read().values().map(Vec::len).sum()
    }
}

impl EventSystem for EventBus {
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .entry(event.to_owned())
            .or_default()
            .push((id, handler));

        tracing::trace!(event, id, "event handler registered");

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        let name = event.to_owned();
        Subscription::new(event, move || {
            if let Some(bus) = bus.upgrade() {
                bus.remove(&name, id);
                tracing::trace!(event = %name, id, "event handler removed");
            }
        })
    }

    fn publish(&self, event: &str) {
        let snapshot: Vec<EventHandler> = self
            .inner
            .handlers
            .read()
            .get(event)
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        tracing::trace!(event, handlers = snapshot.len(), "publishing event");

        for handler in snapshot {
            handler();
        }
    }

    fn subscriber_count(&self, event: &str) -> usize {
        self.inner.handlers.read().get(event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.total_subscribers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, EventHandler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&hits);
        let handler: EventHandler = Arc::new(move || {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, handler)
    }

    #[test]
    fn publish_reaches_only_matching_event() {
        let bus = EventBus::new();
        let (hits, handler) = counter();
        let _sub = bus.subscribe("a", handler);

        bus.publish("b");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.publish("a");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_removes_exactly_one_registration() {
        let bus = EventBus::new();
        let (hits, handler) = counter();
        let first = bus.subscribe("a", Arc::clone(&handler));
        let _second = bus.subscribe("a", handler);
        assert_eq!(bus.subscriber_count("a"), 2);

        first.dispose();
        assert_eq!(bus.subscriber_count("a"), 1);
        bus.publish("a");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_dispose_is_idempotent() {
        let bus = EventBus::new();
        let (_, handler) = counter();
        let sub = bus.subscribe("a", handler);
        let clone = sub.clone();

        sub.dispose();
        clone.dispose();
        assert!(sub.is_disposed());
        assert!(clone.is_disposed());
        assert_eq!(bus.total_subscribers(), 0);
    }

    #[test]
    fn dispose_after_bus_dropped_is_noop() {
        let bus = EventBus::new();
        let (_, handler) = counter();
        let sub = bus.subscribe("a", handler);
        drop(bus);
        sub.dispose();
        assert!(sub.is_disposed());
    }

    #[test]
    fn handler_may_dispose_itself_during_publish() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let slot_clone = Arc::clone(&slot);
        let hits_clone = Arc::clone(&hits);
        let sub = bus.subscribe(
            "once",
            Arc::new(move || {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(sub) = slot_clone.lock().take() {
                    sub.dispose();
                }
            }),
        );
        *slot.lock() = Some(sub);

        bus.publish("once");
        bus.publish("once");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
