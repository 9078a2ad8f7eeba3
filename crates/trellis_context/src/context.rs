//! The per-run execution context.
//!
//! Every node and condition callback receives the [`Context`]. It carries:
//!
//! - the [`Blackboard`], the only state nodes and conditions share
//! - the initial snapshot the blackboard is reset to
//! - a single-slot "request enter node" mailbox
//! - the event bridge to the injected [`EventSystem`]
//! - per-tick timing and the current node guid
//! - an opaque host handle
//!
//! # Subscription scopes
//!
//! | Method | Disposed on |
//! |--------|-------------|
//! | [`Context::subscribe`] | [`Context::reset_to_initial`], [`Context::dispose`] |
//! | [`Context::subscribe_while_active`] | the subscribing node's exit, or the above |
//! | [`Context::watch_event`] | the subscribing node's exit, or the above |

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::blackboard::Blackboard;
use crate::events::{EventBus, EventHandler, EventSystem, Subscription};
use crate::guid::NodeGuid;
use crate::value::BlackboardEntry;

/// Returns the blackboard key holding the fired-count of `event`.
#[must_use]
pub fn event_count_key(event: &str) -> String {
    format!("evt:{event}:count")
}

/// Deliveries waiting for the next flush, coalesced per event name.
///
/// Bounded by the number of distinct watched events, however many times
/// they fire between flushes.
type FiredInbox = Arc<Mutex<HashMap<String, u32>>>;

/// A live subscription plus the node that owns it, if any.
struct ScopedSubscription {
    subscription: Subscription,
    owner: Option<NodeGuid>,
}

/// Shared state for one machine run.
pub struct Context {
    owner: Option<Arc<dyn Any + Send + Sync>>,
    current_node: Option<NodeGuid>,
    delta_time: f32,
    fixed_delta_time: f32,
    blackboard: Blackboard,
    initial: Vec<BlackboardEntry>,
    requested: Option<NodeGuid>,
    events: Arc<dyn EventSystem>,
    subscriptions: Vec<ScopedSubscription>,
    fired: FiredInbox,
}

impl Context {
    /// Creates a context bridged to `events`.
    #[must_use]
    pub fn new(events: Arc<dyn EventSystem>) -> Self {
        Self {
            owner: None,
            current_node: None,
            delta_time: 0.0,
            fixed_delta_time: 0.0,
            blackboard: Blackboard::new(),
            initial: Vec::new(),
            requested: None,
            events,
            subscriptions: Vec::new(),
            fired: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a context with its own private [`EventBus`].
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }

    /// Attaches an opaque host handle.
    #[must_use]
    pub fn with_owner(mut self, owner: Arc<dyn Any + Send + Sync>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Replaces the host handle.
    pub fn set_owner(&mut self, owner: Option<Arc<dyn Any + Send + Sync>>) {
        self.owner = owner;
    }

    /// Returns the host handle if it has type `T`.
    #[must_use]
    pub fn owner<T: Any>(&self) -> Option<&T> {
        self.owner.as_deref()?.downcast_ref::<T>()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timing & position
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the guid of the node currently active, if any.
    #[must_use]
    pub fn current_node_guid(&self) -> Option<&NodeGuid> {
        self.current_node.as_ref()
    }

    /// Sets the active node guid. Called by the machine on every transition.
    pub fn set_current_node_guid(&mut self, guid: Option<NodeGuid>) {
        self.current_node = guid;
    }

    /// Returns the delta time of the current tick, in seconds.
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Sets the delta time. Called by the machine before `on_update`.
    pub fn set_delta_time(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
    }

    /// Returns the delta time of the current fixed tick, in seconds.
    #[must_use]
    pub fn fixed_delta_time(&self) -> f32 {
        self.fixed_delta_time
    }

    /// Sets the fixed delta time. Called by the machine before `on_fixed_update`.
    pub fn set_fixed_delta_time(&mut self, fixed_delta_time: f32) {
        self.fixed_delta_time = fixed_delta_time;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blackboard
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the value under `key`, or `default` if missing or mistyped.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &str, default: T) -> T {
        self.blackboard.get(key, default)
    }

    /// Returns a reference to the value under `key` if it has type `T`.
    #[must_use]
    pub fn get_ref<T: 'static>(&self, key: &str) -> Option<&T> {
        self.blackboard.get_ref(key)
    }

    /// Stores `value` under `key`.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.blackboard.set(key, value);
    }

    /// Returns true if `key` holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.blackboard.contains(key)
    }

    /// Removes the value under `key`.
    pub fn remove(&mut self, key: &str) -> bool {
        self.blackboard.remove(key)
    }

    /// Returns the blackboard.
    #[must_use]
    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Returns the blackboard mutably.
    #[must_use]
    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Replaces the initial snapshot used by [`reset_to_initial`](Self::reset_to_initial).
    pub fn set_initial_snapshot(&mut self, entries: Vec<BlackboardEntry>) {
        self.initial = entries;
    }

    /// Returns the initial snapshot.
    #[must_use]
    pub fn initial_snapshot(&self) -> &[BlackboardEntry] {
        &self.initial
    }

    /// Restores the context to its initial state.
    ///
    /// Live subscriptions are disposed before anything else, so no handler
    /// can fire into the cleared state. Then the pending request and fired
    /// events are dropped, and the blackboard is rebuilt from the snapshot.
    pub fn reset_to_initial(&mut self) {
        self.dispose_all();
        self.requested = None;
        self.fired.lock().clear();
        self.blackboard.clear();
        for entry in &self.initial {
            entry.value.write_into(&mut self.blackboard, entry.key.clone());
        }
        tracing::debug!(entries = self.initial.len(), "context reset to initial snapshot");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requested transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Asks the machine to enter `guid` at its next opportunity.
    ///
    /// Only the latest unconsumed request survives.
    pub fn request_enter_node(&mut self, guid: impl Into<NodeGuid>) {
        let guid = guid.into();
        if let Some(previous) = &self.requested {
            tracing::trace!(%previous, next = %guid, "node request superseded");
        }
        self.requested = Some(guid);
    }

    /// Takes the pending request, leaving the mailbox empty.
    pub fn consume_requested_node_guid(&mut self) -> Option<NodeGuid> {
        self.requested.take()
    }

    /// Returns the pending request without consuming it.
    #[must_use]
    pub fn peek_requested_node_guid(&self) -> Option<&NodeGuid> {
        self.requested.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the injected event system.
    #[must_use]
    pub fn event_system(&self) -> &Arc<dyn EventSystem> {
        &self.events
    }

    /// Subscribes `handler` for the rest of the run.
    pub fn subscribe(&mut self, event: &str, handler: EventHandler) -> Subscription {
        self.track(event, handler, None)
    }

    /// Subscribes `handler` until the current node exits.
    ///
    /// Outside a node (no current node) this behaves like [`subscribe`](Self::subscribe).
    pub fn subscribe_while_active(&mut self, event: &str, handler: EventHandler) -> Subscription {
        let owner = self.current_node.clone();
        self.track(event, handler, owner)
    }

    /// Counts occurrences of `event` while the current node is active.
    ///
    /// Each delivery is queued and applied to `"evt:<event>:count"` by
    /// [`flush_fired_events`](Self::flush_fired_events).
    pub fn watch_event(&mut self, event: &str) -> Subscription {
        let inbox = Arc::clone(&self.fired);
        let name = event.to_owned();
        self.subscribe_while_active(
            event,
            Arc::new(move || {
                let mut inbox = inbox.lock();
                let pending = inbox.entry_ref(name.as_str()).or_insert(0);
                *pending = pending.saturating_add(1);
            }),
        )
    }

    fn track(&mut self, event: &str, handler: EventHandler, owner: Option<NodeGuid>) -> Subscription {
        self.subscriptions.retain(|scoped| !scoped.subscription.is_disposed());
        let subscription = self.events.subscribe(event, handler);
        tracing::debug!(event, owner = ?owner.as_ref().map(NodeGuid::as_str), "context subscription added");
        self.subscriptions.push(ScopedSubscription {
            subscription: subscription.clone(),
            owner,
        });
        subscription
    }

    /// Publishes `event` through the injected event system.
    pub fn publish(&self, event: &str) {
        self.events.publish(event);
    }

    /// Applies queued deliveries from [`watch_event`](Self::watch_event).
    ///
    /// Returns the number of deliveries applied.
    pub fn flush_fired_events(&mut self) -> usize {
        let fired = core::mem::take(&mut *self.fired.lock());
        let mut applied = 0_usize;
        for (event, times) in &fired {
            self.add_event_count(event, *times);
            applied = applied.saturating_add(*times as usize);
        }
        applied
    }

    /// Increments the fired-count of `event`.
    pub fn mark_event_fired(&mut self, event: &str) {
        self.add_event_count(event, 1);
    }

    fn add_event_count(&mut self, event: &str, times: u32) {
        let key = event_count_key(event);
        let count = self.blackboard.get(&key, 0_i32);
        let times = i32::try_from(times).unwrap_or(i32::MAX);
        self.blackboard.set(key, count.saturating_add(times));
    }

    /// Returns how many times `event` fired since its last reset.
    #[must_use]
    pub fn get_event_count(&self, event: &str) -> i32 {
        self.blackboard.get(&event_count_key(event), 0_i32)
    }

    /// Clears the fired-count of `event`.
    pub fn reset_event(&mut self, event: &str) {
        self.blackboard.set(event_count_key(event), 0_i32);
    }

    /// Disposes the subscriptions owned by `node`.
    pub fn dispose_node_subscriptions(&mut self, node: &NodeGuid) -> usize {
        let mut disposed = 0;
        self.subscriptions.retain(|scoped| {
            if scoped.owner.as_ref() == Some(node) {
                scoped.subscription.dispose();
                disposed += 1;
                false
            } else {
                true
            }
        });
        if disposed > 0 {
            tracing::debug!(node = %node, disposed, "node subscriptions disposed");
        }
        disposed
    }

    /// Disposes every live subscription made through this context.
    pub fn dispose_all(&mut self) {
        for scoped in self.subscriptions.drain(..) {
            scoped.subscription.dispose();
        }
    }

    /// Returns the number of live subscriptions made through this context.
    #[must_use]
    pub fn live_subscription_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|scoped| !scoped.subscription.is_disposed())
            .count()
    }

    /// Tears the run down: disposes subscriptions and drops pending
    /// requests and deliveries. The blackboard is kept for inspection.
    pub fn dispose(&mut self) {
        self.dispose_all();
        self.requested = None;
        self.fired.lock().clear();
        self.current_node = None;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::detached()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("current_node", &self.current_node)
            .field("delta_time", &self.delta_time)
            .field("fixed_delta_time", &self.fixed_delta_time)
            .field("blackboard", &self.blackboard)
            .field("requested", &self.requested)
            .field("subscriptions", &self.subscriptions.len())
            .field("has_owner", &self.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler() -> (Arc<AtomicUsize>, EventHandler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&hits);
        (
            hits,
            Arc::new(move || {
                clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn fail_soft_read() {
        let ctx = Context::detached();
        assert_eq!(ctx.get::<i32>("missing", 7), 7);
    }

    #[test]
    fn mailbox_is_last_write_wins() {
        let mut ctx = Context::detached();
        ctx.request_enter_node("a");
        ctx.request_enter_node("b");
        assert_eq!(ctx.peek_requested_node_guid().map(NodeGuid::as_str), Some("b"));
        assert_eq!(ctx.consume_requested_node_guid(), Some(NodeGuid::from("b")));
        assert_eq!(ctx.consume_requested_node_guid(), None);
    }

    #[test]
    fn reset_replays_snapshot() {
        let mut ctx = Context::detached();
        ctx.set_initial_snapshot(vec![
            BlackboardEntry::new("hp", 3),
            BlackboardEntry::new("name", "guard"),
        ]);
        ctx.set("hp", 1_i32);
        ctx.set("scratch", 9.0_f32);
        ctx.request_enter_node("x");

        ctx.reset_to_initial();

        assert_eq!(ctx.get("hp", 0_i32), 3);
        assert_eq!(ctx.get("name", String::new()), "guard");
        assert!(!ctx.contains("scratch"));
        assert!(ctx.peek_requested_node_guid().is_none());
    }

    #[test]
    fn reset_before_any_use_is_safe() {
        let mut ctx = Context::detached();
        ctx.reset_to_initial();
        assert!(ctx.blackboard().is_empty());
    }

    #[test]
    fn reset_disposes_subscriptions() {
        let bus = EventBus::new();
        let mut ctx = Context::new(Arc::new(bus.clone()));
        let (hits, handler) = counting_handler();
        let _sub = ctx.subscribe("ping", handler);

        bus.publish("ping");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        ctx.reset_to_initial();
        bus.publish("ping");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count("ping"), 0);
    }

    #[test]
    fn node_scoped_subscriptions_follow_owner() {
        let bus = EventBus::new();
        let mut ctx = Context::new(Arc::new(bus.clone()));
        let (_, run_handler) = counting_handler();
        let (_, node_handler) = counting_handler();

        let _run = ctx.subscribe("tick", run_handler);
        ctx.set_current_node_guid(Some(NodeGuid::from("n1")));
        let node_sub = ctx.subscribe_while_active("tick", node_handler);
        assert_eq!(ctx.live_subscription_count(), 2);

        assert_eq!(ctx.dispose_node_subscriptions(&NodeGuid::from("n1")), 1);
        assert!(node_sub.is_disposed());
        assert_eq!(bus.subscriber_count("tick"), 1);
    }

    #[test]
    fn watched_events_are_counted_on_flush() {
        let bus = EventBus::new();
        let mut ctx = Context::new(Arc::new(bus.clone()));
        ctx.set_current_node_guid(Some(NodeGuid::from("waiter")));
        let _sub = ctx.watch_event("door");

        bus.publish("door");
        bus.publish("door");
        assert_eq!(ctx.get_event_count("door"), 0);

        assert_eq!(ctx.flush_fired_events(), 2);
        assert_eq!(ctx.get_event_count("door"), 2);
        assert_eq!(ctx.get("evt:door:count", 0_i32), 2);

        ctx.reset_event("door");
        assert_eq!(ctx.get_event_count("door"), 0);
    }

    #[test]
    fn repeated_deliveries_coalesce_per_event() {
        let bus = EventBus::new();
        let mut ctx = Context::new(Arc::new(bus.clone()));
        let _door = ctx.watch_event("door");
        let _bell = ctx.watch_event("bell");

        for _ in 0..1000 {
            bus.publish("door");
        }
        bus.publish("bell");
        assert_eq!(ctx.fired.lock().len(), 2);

        assert_eq!(ctx.flush_fired_events(), 1001);
        assert_eq!(ctx.get_event_count("door"), 1000);
        assert_eq!(ctx.get_event_count("bell"), 1);
    }

    #[test]
    fn reset_drops_pending_deliveries() {
        let bus = EventBus::new();
        let mut ctx = Context::new(Arc::new(bus.clone()));
        let _sub = ctx.watch_event("door");
        bus.publish("door");

        ctx.reset_to_initial();
        assert_eq!(ctx.flush_fired_events(), 0);
        assert_eq!(ctx.get_event_count("door"), 0);
    }

    #[test]
    fn owner_downcast() {
        #[derive(Debug, PartialEq)]
        struct Host(u8);

        let ctx = Context::detached().with_owner(Arc::new(Host(4)));
        assert_eq!(ctx.owner::<Host>(), Some(&Host(4)));
        assert_eq!(ctx.owner::<String>(), None);
    }

    #[test]
    fn dispose_clears_position_but_keeps_blackboard() {
        let mut ctx = Context::detached();
        ctx.set_current_node_guid(Some(NodeGuid::from("n")));
        ctx.set("kept", true);
        ctx.dispose();
        assert!(ctx.current_node_guid().is_none());
        assert!(ctx.get("kept", false));
    }
}
