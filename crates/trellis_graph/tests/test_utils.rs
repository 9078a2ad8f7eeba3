//! Shared test utilities for `trellis_graph` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities — not all items used in every test binary"
)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_context::{Context, EventBus, EventSystem};
use trellis_graph::condition::FnCondition;
use trellis_graph::graph::Graph;
use trellis_graph::machine::Machine;
use trellis_graph::node::Node;

// ═══════════════════════════════════════════════════════════════════════════════
// CALL LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered record of lifecycle callbacks, shared between nodes.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDING NODE
// ═══════════════════════════════════════════════════════════════════════════════

/// Node that logs `"<name>:<callback>"` for every callback it receives.
pub struct RecordingNode {
    name: &'static str,
    log: CallLog,
    ports: Vec<String>,
    request_on_enter: Option<&'static str>,
    watch_on_enter: Option<&'static str>,
}

impl RecordingNode {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: log.clone(),
            ports: Vec::new(),
            request_on_enter: None,
            watch_on_enter: None,
        }
    }

    /// Declares output ports in order.
    pub fn with_ports(mut self, ports: &[&str]) -> Self {
        self.ports = ports.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    /// Calls `request_enter_node(target)` from `on_enter`.
    pub fn requesting(mut self, target: &'static str) -> Self {
        self.request_on_enter = Some(target);
        self
    }

    /// Calls `watch_event(event)` from `on_enter`.
    pub fn watching(mut self, event: &'static str) -> Self {
        self.watch_on_enter = Some(event);
        self
    }
}

impl Node for RecordingNode {
    fn output_ports(&self) -> Vec<String> {
        if self.ports.is_empty() {
            vec!["Next".to_owned()]
        } else {
            self.ports.clone()
        }
    }

    fn on_enter(&self, ctx: &mut Context) {
        self.log.push(format!("{}:enter", self.name));
        if let Some(event) = self.watch_on_enter {
            ctx.watch_event(event);
        }
        if let Some(target) = self.request_on_enter {
            ctx.request_enter_node(target);
        }
    }

    fn on_update(&self, _ctx: &mut Context) {
        self.log.push(format!("{}:update", self.name));
    }

    fn on_fixed_update(&self, _ctx: &mut Context) {
        self.log.push(format!("{}:fixed", self.name));
    }

    fn on_exit(&self, _ctx: &mut Context) {
        self.log.push(format!("{}:exit", self.name));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Condition reading a boolean blackboard flag (false when missing).
pub fn flag(key: &'static str) -> FnCondition<impl Fn(&Context) -> bool + Send + Sync + 'static> {
    FnCondition::new("flag", move |ctx: &Context| ctx.get(key, false))
}

/// Condition that always passes.
pub fn always() -> FnCondition<impl Fn(&Context) -> bool + Send + Sync + 'static> {
    FnCondition::new("always", |_: &Context| true)
}

/// Condition that never passes.
pub fn never() -> FnCondition<impl Fn(&Context) -> bool + Send + Sync + 'static> {
    FnCondition::new("never", |_: &Context| false)
}

/// Builds a machine over `graph` with a fresh event bus.
pub fn machine_with_bus(graph: Graph) -> (Machine, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let events: Arc<dyn EventSystem> = bus.clone();
    (Machine::new(Arc::new(graph), Context::new(events)), bus)
}

/// Returns the current node guid as a string, or `""` when stopped.
pub fn current(machine: &Machine) -> &str {
    machine.current_node_guid().map_or("", |g| g.as_str())
}
