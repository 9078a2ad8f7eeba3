//! Integration tests for the context: snapshot reset, mailbox and event scopes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use trellis_context::{
    BlackboardEntry, BlackboardValue, Context, EventBus, EventHandler, EventSystem, NodeGuid,
    merge_entries,
};

fn bus_context() -> (Context, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let events: Arc<dyn EventSystem> = bus.clone();
    (Context::new(events), bus)
}

fn counter() -> (Arc<AtomicUsize>, EventHandler) {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = Arc::clone(&hits);
    let handler: EventHandler = Arc::new(move || {
        handler_hits.fetch_add(1, Ordering::SeqCst);
    });
    (hits, handler)
}

#[test]
fn reset_disposes_subscriptions_before_restoring() {
    let (mut ctx, bus) = bus_context();
    ctx.set_initial_snapshot(vec![BlackboardEntry::new("lives", 3)]);

    let (hits, handler) = counter();
    let subscription = ctx.subscribe("hit", handler);
    ctx.set("lives", 1_i32);
    ctx.set("scratch", "temp".to_owned());

    ctx.reset_to_initial();

    assert!(subscription.is_disposed());
    assert_eq!(bus.total_subscribers(), 0);
    bus.publish("hit");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    assert_eq!(ctx.get("lives", 0_i32), 3);
    assert!(!ctx.contains("scratch"));
}

#[test]
fn reset_drops_pending_request_and_deliveries() {
    let (mut ctx, bus) = bus_context();
    ctx.set_current_node_guid(Some(NodeGuid::from("n")));
    ctx.watch_event("ping");
    bus.publish("ping");
    ctx.request_enter_node("elsewhere");

    ctx.reset_to_initial();

    assert!(ctx.peek_requested_node_guid().is_none());
    assert_eq!(ctx.flush_fired_events(), 0);
    assert_eq!(ctx.get_event_count("ping"), 0);
}

#[test]
fn mailbox_keeps_latest_request() {
    let mut ctx = Context::detached();
    ctx.request_enter_node("a");
    ctx.request_enter_node("b");

    assert_eq!(ctx.consume_requested_node_guid().map(|g| g.to_string()), Some("b".into()));
    assert!(ctx.consume_requested_node_guid().is_none());
}

#[test]
fn wrong_type_read_returns_default() {
    let mut ctx = Context::detached();
    ctx.set("speed", 2.5_f32);

    assert_eq!(ctx.get("speed", 7_i32), 7);
    assert!(!ctx.get("missing", false));
    assert!((ctx.get("speed", 0.0_f32) - 2.5).abs() < f32::EPSILON);
}

#[test]
fn node_scoped_subscriptions_end_with_the_node() {
    let (mut ctx, bus) = bus_context();
    let (run_hits, run_handler) = counter();
    let (node_hits, node_handler) = counter();

    ctx.subscribe("tick", run_handler);
    ctx.set_current_node_guid(Some(NodeGuid::from("door")));
    ctx.subscribe_while_active("tick", node_handler);
    assert_eq!(bus.subscriber_count("tick"), 2);

    assert_eq!(ctx.dispose_node_subscriptions(&NodeGuid::from("door")), 1);
    bus.publish("tick");

    assert_eq!(run_hits.load(Ordering::SeqCst), 1);
    assert_eq!(node_hits.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.live_subscription_count(), 1);
}

#[test]
fn dispose_keeps_blackboard_for_inspection() {
    let (mut ctx, bus) = bus_context();
    let (_hits, handler) = counter();
    ctx.subscribe("x", handler);
    ctx.set("score", 10_i32);
    ctx.set_current_node_guid(Some(NodeGuid::from("n")));

    ctx.dispose();

    assert_eq!(bus.total_subscribers(), 0);
    assert!(ctx.current_node_guid().is_none());
    assert_eq!(ctx.get("score", 0_i32), 10);
}

#[test]
fn dropping_context_releases_bus_handlers() {
    let bus = Arc::new(EventBus::new());
    {
        let events: Arc<dyn EventSystem> = bus.clone();
        let mut ctx = Context::new(events);
        let (_hits, handler) = counter();
        ctx.subscribe("x", handler);
        assert_eq!(bus.total_subscribers(), 1);
    }
    assert_eq!(bus.total_subscribers(), 0);
}

#[test]
fn overrides_win_in_initial_snapshot() {
    let defaults = vec![
        BlackboardEntry::new("hp", 10),
        BlackboardEntry::new("name", "door"),
    ];
    let overrides = vec![BlackboardEntry::new("hp", 99)];

    let mut ctx = Context::detached();
    ctx.set_initial_snapshot(merge_entries(&defaults, &overrides));
    ctx.reset_to_initial();

    assert_eq!(ctx.get("hp", 0_i32), 99);
    assert_eq!(ctx.get("name", String::new()), "door");
}

proptest! {
    #[test]
    fn reset_restores_every_seeded_int(values in prop::collection::vec(any::<i32>(), 0..16)) {
        let snapshot: Vec<BlackboardEntry> = values
            .iter()
            .enumerate()
            .map(|(i, v)| BlackboardEntry::new(format!("k{i}"), BlackboardValue::Int(*v)))
            .collect();

        let mut ctx = Context::detached();
        ctx.set_initial_snapshot(snapshot);
        for i in 0..values.len() {
            ctx.set(format!("k{i}"), "clobbered".to_owned());
        }
        ctx.reset_to_initial();

        for (i, v) in values.iter().enumerate() {
            prop_assert_eq!(ctx.get(&format!("k{i}"), 0_i32), *v);
        }
    }
}
