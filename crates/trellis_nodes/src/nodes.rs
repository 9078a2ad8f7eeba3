//! Built-in nodes.
//!
//! All state a node needs across frames lives in the blackboard under a
//! key derived from the node's guid, so one node instance can back any
//! number of runs.

use serde::{Deserialize, Serialize};
use trellis_context::{BlackboardEntry, Context};
use trellis_graph::node::{DEFAULT_PORT, Node};

/// Returns the blackboard key holding a wait node's remaining seconds.
#[must_use]
pub fn wait_remaining_key(node_guid: &str) -> String {
    format!("wait:{node_guid}:remaining")
}

fn current_guid(ctx: &Context) -> &str {
    ctx.current_node_guid().map_or("", |guid| guid.as_str())
}

// ─────────────────────────────────────────────────────────────────────────────
// Log
// ─────────────────────────────────────────────────────────────────────────────

/// Severity used by [`LogNode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `TRACE`
    Trace,
    /// `DEBUG`
    Debug,
    /// `INFO`
    #[default]
    Info,
    /// `WARN`
    Warn,
    /// `ERROR`
    Error,
}

/// Emits a log line when entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogNode {
    /// Text to log.
    pub message: String,
    /// Severity.
    pub level: LogLevel,
}

impl LogNode {
    /// Creates an `info` log node.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
        }
    }
}

impl Node for LogNode {
    fn on_enter(&self, ctx: &mut Context) {
        let node = current_guid(ctx);
        let message = self.message.as_str();
        match self.level {
            LogLevel::Trace => tracing::trace!(node, "{message}"),
            LogLevel::Debug => tracing::debug!(node, "{message}"),
            LogLevel::Info => tracing::info!(node, "{message}"),
            LogLevel::Warn => tracing::warn!(node, "{message}"),
            LogLevel::Error => tracing::error!(node, "{message}"),
        }
    }

    fn type_name(&self) -> &'static str {
        "Log"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timers and events
// ─────────────────────────────────────────────────────────────────────────────

/// Counts down `seconds` of tick time.
///
/// Pair with [`WaitElapsedCondition`](crate::conditions::WaitElapsedCondition)
/// on the outgoing edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitNode {
    /// Duration in seconds.
    pub seconds: f32,
}

impl WaitNode {
    /// Creates a wait of `seconds`.
    #[must_use]
    pub fn new(seconds: f32) -> Self {
        Self { seconds }
    }
}

impl Node for WaitNode {
    fn on_enter(&self, ctx: &mut Context) {
        let key = wait_remaining_key(current_guid(ctx));
        ctx.set(key, self.seconds.max(0.0));
    }

    fn on_update(&self, ctx: &mut Context) {
        let key = wait_remaining_key(current_guid(ctx));
        let remaining = ctx.get(&key, 0.0_f32) - ctx.delta_time();
        ctx.set(key, remaining.max(0.0));
    }

    fn type_name(&self) -> &'static str {
        "Wait"
    }
}

/// Counts deliveries of `event` for as long as the node is active.
///
/// The counter is cleared on enter. Pair with
/// [`EventFiredCondition`](crate::conditions::EventFiredCondition).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitEventNode {
    /// Event name.
    pub event: String,
}

impl WaitEventNode {
    /// Creates a node waiting on `event`.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
        }
    }
}

impl Node for WaitEventNode {
    fn on_enter(&self, ctx: &mut Context) {
        ctx.reset_event(&self.event);
        ctx.watch_event(&self.event);
    }

    fn type_name(&self) -> &'static str {
        "WaitEvent"
    }
}

/// Publishes `event` when entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishEventNode {
    /// Event name.
    pub event: String,
}

impl PublishEventNode {
    /// Creates a node publishing `event`.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
        }
    }
}

impl Node for PublishEventNode {
    fn on_enter(&self, ctx: &mut Context) {
        ctx.publish(&self.event);
    }

    fn type_name(&self) -> &'static str {
        "PublishEvent"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blackboard and flow
// ─────────────────────────────────────────────────────────────────────────────

/// Writes typed entries into the blackboard when entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SetBlackboardNode {
    /// Entries written in order.
    pub entries: Vec<BlackboardEntry>,
}

impl SetBlackboardNode {
    /// Creates a node writing `entries`.
    #[must_use]
    pub fn new(entries: Vec<BlackboardEntry>) -> Self {
        Self { entries }
    }
}

impl Node for SetBlackboardNode {
    fn on_enter(&self, ctx: &mut Context) {
        for entry in &self.entries {
            entry.value.write_into(ctx.blackboard_mut(), entry.key.clone());
        }
    }

    fn type_name(&self) -> &'static str {
        "SetBlackboard"
    }
}

/// Declares named output ports and nothing else.
///
/// Edge conditions on each port decide where the graph goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchNode {
    /// Ports in resolution order.
    pub ports: Vec<String>,
}

impl Default for BranchNode {
    fn default() -> Self {
        Self {
            ports: vec![DEFAULT_PORT.to_owned()],
        }
    }
}

impl BranchNode {
    /// Creates a branch with `ports` in order.
    #[must_use]
    pub fn new<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

impl Node for BranchNode {
    fn output_ports(&self) -> Vec<String> {
        self.ports.clone()
    }

    fn type_name(&self) -> &'static str {
        "Branch"
    }
}

/// Requests a transition to `target` when entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpNode {
    /// Guid of the node to enter next.
    pub target: String,
}

impl JumpNode {
    /// Creates a jump to `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Node for JumpNode {
    fn on_enter(&self, ctx: &mut Context) {
        ctx.request_enter_node(self.target.as_str());
    }

    fn type_name(&self) -> &'static str {
        "Jump"
    }
}
