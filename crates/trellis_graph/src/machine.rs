//! The execution engine.
//!
//! A [`Machine`] walks a [`Graph`] one node at a time. Each [`tick`](Machine::tick):
//!
//! 1. drains a node-requested transition, if any
//! 2. runs `on_update` on the current node
//! 3. resolves automatic edge transitions
//!
//! # Automatic resolution
//!
//! The current node's output ports are scanned in declared order. For each
//! port, its outgoing edges are checked in authored order and the first
//! edge whose condition passes is taken. Edges on ports the node does not
//! declare are scanned last. In [`AutoTransitionMode::ResolveUntilStable`]
//! this repeats from the new node until nothing moves or the per-tick
//! transition budget is spent.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_context::Context;
//! use trellis_graph::graph::Graph;
//! use trellis_graph::machine::Machine;
//! use trellis_graph::node::EmptyNode;
//!
//! let mut graph = Graph::new();
//! graph
//!     .add_node("a", EmptyNode)
//!     .add_node("b", EmptyNode)
//!     .add_edge("a", "Next", "b");
//!
//! let mut machine = Machine::new(Arc::new(graph), Context::detached());
//! machine.start().unwrap();
//! assert_eq!(machine.current_node_guid().map(|g| g.as_str()), Some("a"));
//!
//! machine.tick(0.016);
//! assert_eq!(machine.current_node_guid().map(|g| g.as_str()), Some("b"));
//! ```

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_context::{Context, EdgeGuid, NodeGuid};
use trellis_core::Clock;

use crate::edge::{EdgeRecord, normalize_port};
use crate::graph::{Graph, ValidationError};
use crate::history::{TransitionHistory, TransitionReason, TransitionRecord};
use crate::node::DEFAULT_PORT;

/// How many automatic transitions a tick may take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoTransitionMode {
    /// One resolution pass per tick.
    #[default]
    Single,
    /// Resolve repeatedly until stable or the per-tick budget is spent.
    ResolveUntilStable,
}

/// Serializable machine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Automatic transition mode.
    pub mode: AutoTransitionMode,
    /// Transition budget per tick in [`AutoTransitionMode::ResolveUntilStable`].
    pub max_transitions_per_tick: usize,
    /// Number of transition records kept.
    pub history_capacity: usize,
}

impl MachineConfig {
    /// Default transition budget per tick.
    pub const DEFAULT_MAX_TRANSITIONS_PER_TICK: usize = 32;
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            mode: AutoTransitionMode::default(),
            max_transitions_per_tick: Self::DEFAULT_MAX_TRANSITIONS_PER_TICK,
            history_capacity: TransitionHistory::DEFAULT_CAPACITY,
        }
    }
}

/// Whether the machine is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MachineState {
    /// Not started, or stopped.
    #[default]
    Stopped,
    /// A node is active.
    Running,
}

/// Errors returned by [`Machine::start`].
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// The graph failed validation. Nothing was initialized.
    #[error("graph failed validation with {} error(s)", .0.len())]
    InvalidGraph(Vec<ValidationError>),
    /// The graph has no node to start from.
    #[error("graph has no entry node")]
    NoEntryNode,
}

/// What happened during one [`Machine::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Every node change during the tick.
    pub transitions: usize,
    /// Node changes made during automatic resolution (counted against the budget).
    pub resolved_transitions: usize,
    /// True if resolution stopped because the budget was spent.
    pub capped: bool,
}

/// Graph execution engine.
pub struct Machine {
    graph: Arc<Graph>,
    context: Context,
    current: Option<NodeGuid>,
    previous: Option<NodeGuid>,
    mode: AutoTransitionMode,
    max_transitions_per_tick: usize,
    history: TransitionHistory,
    clock: Clock,
    state: MachineState,
    frame: u64,
}

impl Machine {
    /// Creates a stopped machine over `graph`.
    #[must_use]
    pub fn new(graph: impl Into<Arc<Graph>>, context: Context) -> Self {
        Self {
            graph: graph.into(),
            context,
            current: None,
            previous: None,
            mode: AutoTransitionMode::default(),
            max_transitions_per_tick: MachineConfig::DEFAULT_MAX_TRANSITIONS_PER_TICK,
            history: TransitionHistory::default(),
            clock: Clock::default(),
            state: MachineState::Stopped,
            frame: 0,
        }
    }

    /// Applies every setting in `config`.
    #[must_use]
    pub fn with_config(self, config: &MachineConfig) -> Self {
        self.with_mode(config.mode)
            .with_max_transitions_per_tick(config.max_transitions_per_tick)
            .with_history_capacity(config.history_capacity)
    }

    /// Sets the automatic transition mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AutoTransitionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the per-tick transition budget (at least 1).
    #[must_use]
    pub fn with_max_transitions_per_tick(mut self, max: usize) -> Self {
        self.max_transitions_per_tick = max.max(1);
        self
    }

    /// Sets how many transition records are kept.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = TransitionHistory::with_capacity(capacity);
        self
    }

    /// Sets the clock used to stamp transition records.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the clock used to stamp transition records.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the graph being executed.
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Returns the context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the context mutably.
    #[must_use]
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Returns the active node guid.
    #[must_use]
    pub fn current_node_guid(&self) -> Option<&NodeGuid> {
        self.current.as_ref()
    }

    /// Returns the previously active node guid.
    #[must_use]
    pub fn previous_node_guid(&self) -> Option<&NodeGuid> {
        self.previous.as_ref()
    }

    /// Returns the transition trail.
    #[must_use]
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Returns the automatic transition mode.
    #[must_use]
    pub fn mode(&self) -> AutoTransitionMode {
        self.mode
    }

    /// Returns the per-tick transition budget.
    #[must_use]
    pub fn max_transitions_per_tick(&self) -> usize {
        self.max_transitions_per_tick
    }

    /// Returns the run state.
    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Returns true while a node is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    /// Returns the number of ticks since the last start.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates the graph and enters its entry node.
    ///
    /// Starting a running machine does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::InvalidGraph`] with every validation error if
    /// the graph is malformed; the machine stays stopped.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.is_running() {
            tracing::warn!("machine already running, start ignored");
            return Ok(());
        }

        if let Err(errors) = self.graph.validate() {
            for error in &errors {
                tracing::error!(%error, "graph validation failed");
            }
            return Err(MachineError::InvalidGraph(errors));
        }

        let entry = self
            .graph
            .resolve_entry()
            .cloned()
            .ok_or(MachineError::NoEntryNode)?;

        self.state = MachineState::Running;
        self.frame = 0;
        self.enter(entry.clone(), TransitionReason::Start, None);
        tracing::info!(entry = %entry, nodes = self.graph.node_count(), "machine started");
        Ok(())
    }

    /// Exits the active node and tears the run down.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        if let Some(current) = self.current.take() {
            self.exit(&current);
        }
        self.previous = None;
        self.context.dispose();
        self.state = MachineState::Stopped;
        tracing::info!(frame = self.frame, "machine stopped");
    }

    /// Advances the machine by one frame.
    ///
    /// Does nothing while stopped.
    pub fn tick(&mut self, delta_time: f32) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_running() {
            return report;
        }

        self.frame += 1;
        let _span = tracing::debug_span!("tick", frame = self.frame).entered();

        self.context.flush_fired_events();

        if let Some(requested) = self.context.consume_requested_node_guid()
            && self.enter(requested, TransitionReason::Requested, None)
        {
            report.transitions += 1;
        }

        self.context.set_delta_time(delta_time);
        if let Some(current) = self.current.clone() {
            let graph = Arc::clone(&self.graph);
            if let Some(node) = graph.node(current.as_str()) {
                node.on_update(&mut self.context);
            }
        }
        self.context.flush_fired_events();

        self.resolve(&mut report);
        report
    }

    /// Runs `on_fixed_update` on the active node. Never resolves edges.
    pub fn fixed_tick(&mut self, fixed_delta_time: f32) {
        if !self.is_running() {
            return;
        }

        self.context.set_fixed_delta_time(fixed_delta_time);
        if let Some(current) = self.current.clone() {
            let graph = Arc::clone(&self.graph);
            if let Some(node) = graph.node(current.as_str()) {
                node.on_fixed_update(&mut self.context);
            }
        }
    }

    /// Forces a transition to `guid`.
    ///
    /// Returns true if the machine changed node.
    pub fn try_enter_node(&mut self, guid: impl Into<NodeGuid>) -> bool {
        self.forced_enter(guid.into(), TransitionReason::Manual)
    }

    /// Forces a transition to `guid` on behalf of an external event binding.
    ///
    /// Returns true if the machine changed node.
    pub fn enter_node_from_external_event(&mut self, guid: impl Into<NodeGuid>) -> bool {
        self.forced_enter(guid.into(), TransitionReason::ExternalEvent)
    }

    fn forced_enter(&mut self, guid: NodeGuid, reason: TransitionReason) -> bool {
        if !self.is_running() {
            tracing::warn!(target_node = %guid, %reason, "machine not running, transition ignored");
            return false;
        }
        self.enter(guid, reason, None)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// The only path that changes the active node.
    fn enter(
        &mut self,
        target: NodeGuid,
        reason: TransitionReason,
        edge: Option<(EdgeGuid, String)>,
    ) -> bool {
        if self.current.as_ref() == Some(&target) {
            return false;
        }

        let graph = Arc::clone(&self.graph);
        let Some(next) = graph.node(target.as_str()) else {
            tracing::warn!(target_node = %target, %reason, "unknown node, transition ignored");
            return false;
        };

        if let Some(current) = self.current.clone() {
            self.exit(&current);
        }

        self.previous = self.current.take();
        self.current = Some(target.clone());
        self.context.set_current_node_guid(Some(target.clone()));

        let (edge, from_port) = match edge {
            Some((guid, port)) => (Some(guid), Some(port)),
            None => (None, None),
        };
        tracing::debug!(
            from = ?self.previous.as_ref().map(NodeGuid::as_str),
            to = %target,
            %reason,
            edge = ?edge.as_ref().map(EdgeGuid::as_str),
            "transition"
        );
        self.history.push(TransitionRecord {
            timestamp: self.clock.now(),
            frame: self.frame,
            from: self.previous.clone(),
            to: target,
            reason,
            edge,
            from_port,
        });

        next.on_enter(&mut self.context);
        true
    }

    fn exit(&mut self, guid: &NodeGuid) {
        let graph = Arc::clone(&self.graph);
        if let Some(node) = graph.node(guid.as_str()) {
            node.on_exit(&mut self.context);
        }
        self.context.dispose_node_subscriptions(guid);
    }

    fn resolve(&mut self, report: &mut TickReport) {
        let until_stable = self.mode == AutoTransitionMode::ResolveUntilStable;

        loop {
            if until_stable && report.resolved_transitions >= self.max_transitions_per_tick {
                if !self.has_pending_transition() {
                    break;
                }
                report.capped = true;
                tracing::warn!(
                    max = self.max_transitions_per_tick,
                    node = ?self.current.as_ref().map(NodeGuid::as_str),
                    "transition budget spent, resolution halted for this tick"
                );
                break;
            }

            if until_stable
                && let Some(requested) = self.context.consume_requested_node_guid()
                && self.enter(requested, TransitionReason::Requested, None)
            {
                report.transitions += 1;
                report.resolved_transitions += 1;
                continue;
            }

            if !self.resolve_once() {
                break;
            }
            report.transitions += 1;
            report.resolved_transitions += 1;

            if !until_stable {
                break;
            }
        }
    }

    /// One resolution pass from the active node. Returns true if it moved.
    fn resolve_once(&mut self) -> bool {
        let graph = Arc::clone(&self.graph);
        let chosen = self
            .choose_edge(&graph)
            .map(|edge| (edge.to.clone(), edge.guid.clone(), edge.from_port.clone()));
        match chosen {
            Some((to, edge, port)) => self.enter(to, TransitionReason::AutoEdge, Some((edge, port))),
            None => false,
        }
    }

    /// Returns the edge a resolution pass would take from the active node.
    fn choose_edge<'g>(&'g self, graph: &'g Graph) -> Option<&'g EdgeRecord> {
        let current = self.current.as_ref()?;
        let node = graph.node(current.as_str())?;

        let mut ports: Vec<String> = node
            .output_ports()
            .into_iter()
            .map(normalize_port)
            .collect();
        if ports.is_empty() {
            ports.push(DEFAULT_PORT.to_owned());
        }

        let ctx = &self.context;
        ports
            .iter()
            .find_map(|port| {
                graph
                    .edges_from(current.as_str())
                    .filter(|edge| edge.from_port == *port)
                    .find(|edge| passes(edge, ctx))
            })
            .or_else(|| {
                graph
                    .edges_from(current.as_str())
                    .filter(|edge| !ports.contains(&edge.from_port))
                    .find(|edge| passes(edge, ctx))
            })
    }

    /// Returns true if another resolution pass would change node.
    fn has_pending_transition(&self) -> bool {
        let moves = |target: &NodeGuid| {
            self.current.as_ref() != Some(target) && self.graph.contains_node(target.as_str())
        };
        if self.context.peek_requested_node_guid().is_some_and(&moves) {
            return true;
        }
        self.choose_edge(&self.graph).is_some_and(|edge| moves(&edge.to))
    }
}

fn passes(edge: &EdgeRecord, ctx: &Context) -> bool {
    edge.condition
        .as_ref()
        .is_none_or(|condition| condition.evaluate(ctx))
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("mode", &self.mode)
            .field("max_transitions_per_tick", &self.max_transitions_per_tick)
            .field("frame", &self.frame)
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EmptyNode;

    fn two_node_graph() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node("a", EmptyNode)
            .add_node("b", EmptyNode)
            .add_edge("a", "Next", "b");
        graph
    }

    #[test]
    fn config_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.mode, AutoTransitionMode::Single);
        assert_eq!(config.max_transitions_per_tick, 32);
        assert_eq!(config.history_capacity, 64);
    }

    #[test]
    fn config_deserializes_partial() {
        let config: MachineConfig =
            serde_json::from_str(r#"{"mode": "ResolveUntilStable"}"#).unwrap();
        assert_eq!(config.mode, AutoTransitionMode::ResolveUntilStable);
        assert_eq!(config.max_transitions_per_tick, 32);
    }

    #[test]
    fn budget_is_at_least_one() {
        let machine = Machine::new(two_node_graph(), Context::detached())
            .with_max_transitions_per_tick(0);
        assert_eq!(machine.max_transitions_per_tick(), 1);
    }

    #[test]
    fn tick_while_stopped_is_noop() {
        let mut machine = Machine::new(two_node_graph(), Context::detached());
        assert_eq!(machine.tick(0.1), TickReport::default());
        assert_eq!(machine.frame(), 0);
        assert!(machine.current_node_guid().is_none());
    }

    #[test]
    fn start_twice_keeps_state() {
        let mut machine = Machine::new(two_node_graph(), Context::detached());
        machine.start().unwrap();
        machine.start().unwrap();
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn error_display_counts_errors() {
        let err = MachineError::InvalidGraph(vec![ValidationError::EmptyGraph]);
        assert_eq!(err.to_string(), "graph failed validation with 1 error(s)");
    }
}
