//! The host adapter.
//!
//! A [`Runner`] owns one [`Machine`] and forwards the host's frame loop to
//! it. On top of the machine it adds pausing, time scaling, blackboard
//! overrides and external event bindings.
//!
//! External events arrive on whatever thread publishes them, so bound
//! handlers only push the target guid onto a queue. The queue is drained on
//! the host thread at the start of the next [`Runner::tick`]. The queue holds
//! at most [`Runner::MAX_PENDING_ENTRIES`] guids; when it is full the oldest
//! entry is dropped.

use core::any::Any;
use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_context::{BlackboardEntry, Context, EventSystem, NodeGuid, Subscription, merge_entries};
use trellis_core::Clock;
use trellis_graph::graph::Graph;
use trellis_graph::machine::{Machine, MachineError, TickReport};

use crate::config::{EventBinding, RunnerConfig};

type PendingQueue = Arc<Mutex<VecDeque<NodeGuid>>>;

/// Drives a [`Machine`] from a host frame loop.
pub struct Runner {
    machine: Machine,
    events: Arc<dyn EventSystem>,
    bindings: Vec<EventBinding>,
    overrides: Vec<BlackboardEntry>,
    pending: PendingQueue,
    subscriptions: Vec<Subscription>,
    enabled: bool,
    paused: bool,
    time_scale: f32,
}

fn sanitize_time_scale(time_scale: f32) -> f32 {
    if time_scale.is_finite() {
        time_scale.max(0.0)
    } else {
        0.0
    }
}

impl Runner {
    /// Capacity of the external entry queue.
    pub const MAX_PENDING_ENTRIES: usize = 64;

    /// Creates a stopped runner for `graph`, bridged to `events`.
    #[must_use]
    pub fn new(graph: Arc<Graph>, events: Arc<dyn EventSystem>, config: RunnerConfig) -> Self {
        let context = Context::new(Arc::clone(&events));
        let machine = Machine::new(graph, context).with_config(&config.machine);
        Self {
            machine,
            events,
            bindings: config.bindings,
            overrides: config.blackboard_overrides,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            subscriptions: Vec::new(),
            enabled: false,
            paused: config.start_paused,
            time_scale: sanitize_time_scale(config.time_scale),
        }
    }

    /// Attaches an opaque host handle, reachable from nodes via [`Context::owner`].
    #[must_use]
    pub fn with_owner(mut self, owner: Arc<dyn Any + Send + Sync>) -> Self {
        self.machine.context_mut().set_owner(Some(owner));
        self
    }

    /// Sets the clock used to stamp transition records.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.machine.set_clock(clock);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bindings
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribes every external event binding. Does nothing if already enabled.
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }

        for binding in &self.bindings {
            let queue = Arc::clone(&self.pending);
            let target = NodeGuid::from(binding.target_node_guid.as_str());
            let subscription = self.events.subscribe(
                &binding.event_name,
                Arc::new(move || {
                    let mut queue = queue.lock();
                    if queue.len() >= Self::MAX_PENDING_ENTRIES {
                        let dropped = queue.pop_front();
                        tracing::warn!(
                            dropped = ?dropped.as_ref().map(NodeGuid::as_str),
                            "external entry queue full, oldest entry dropped"
                        );
                    }
                    queue.push_back(target.clone());
                }),
            );
            self.subscriptions.push(subscription);
        }
        self.enabled = true;
        tracing::debug!(bindings = self.bindings.len(), "runner bindings enabled");
    }

    /// Disposes every binding subscription. Does nothing if not enabled.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }

        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        self.enabled = false;
        tracing::debug!("runner bindings disabled");
    }

    /// Returns true while bindings are subscribed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Seeds the blackboard and starts the machine.
    ///
    /// The initial snapshot is the graph's defaults with the configured
    /// overrides applied on top. Bindings are enabled once the machine is
    /// running. Starting a running runner does nothing.
    ///
    /// # Errors
    ///
    /// Returns the machine's error if the graph is invalid.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.machine.is_running() {
            tracing::warn!("runner already running, start ignored");
            return Ok(());
        }

        let snapshot = merge_entries(self.machine.graph().blackboard_defaults(), &self.overrides);
        let context = self.machine.context_mut();
        context.set_initial_snapshot(snapshot);
        context.reset_to_initial();
        self.pending.lock().clear();

        self.machine.start()?;
        self.enable();
        Ok(())
    }

    /// Stops the machine, drops queued external entries and disables bindings.
    pub fn stop(&mut self) {
        self.machine.stop();
        self.pending.lock().clear();
        self.disable();
    }

    /// Advances one frame unless paused.
    ///
    /// Returns `None` when paused.
    pub fn tick(&mut self, delta_time: f32) -> Option<TickReport> {
        if self.paused {
            return None;
        }
        Some(self.step(delta_time))
    }

    /// Advances one fixed frame unless paused.
    ///
    /// Returns false when paused.
    pub fn fixed_tick(&mut self, fixed_delta_time: f32) -> bool {
        if self.paused {
            return false;
        }
        self.step_fixed(fixed_delta_time);
        true
    }

    /// Advances one frame, even while paused.
    ///
    /// Queued external entries are applied first, then the machine ticks
    /// with `delta_time` scaled by the time scale.
    pub fn step(&mut self, delta_time: f32) -> TickReport {
        let entered = self.drain_external_entries();
        let mut report = self.machine.tick(delta_time * self.time_scale);
        report.transitions += entered;
        report
    }

    /// Advances one fixed frame, even while paused.
    pub fn step_fixed(&mut self, fixed_delta_time: f32) {
        self.machine.fixed_tick(fixed_delta_time * self.time_scale);
    }

    fn drain_external_entries(&mut self) -> usize {
        let queued: Vec<NodeGuid> = self.pending.lock().drain(..).collect();
        let mut entered = 0;
        for guid in queued {
            tracing::debug!(target_node = %guid, "applying external event entry");
            if self.machine.enter_node_from_external_event(guid) {
                entered += 1;
            }
        }
        entered
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pause & time scale
    // ─────────────────────────────────────────────────────────────────────────

    /// Pauses [`tick`](Self::tick) and [`fixed_tick`](Self::fixed_tick).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes ticking.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Sets the delta time multiplier. Negative or non-finite values become 0.
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = sanitize_time_scale(time_scale);
    }

    /// Returns the delta time multiplier.
    #[must_use]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the machine.
    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Returns the machine mutably.
    #[must_use]
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Returns the machine's context.
    #[must_use]
    pub fn context(&self) -> &Context {
        self.machine.context()
    }

    /// Returns the number of external entries waiting for the next tick.
    #[must_use]
    pub fn pending_external_entries(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.disable();
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("machine", &self.machine)
            .field("bindings", &self.bindings)
            .field("enabled", &self.enabled)
            .field("paused", &self.paused)
            .field("time_scale", &self.time_scale)
            .field("pending", &self.pending_external_entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_scale_is_sanitized() {
        assert_eq!(sanitize_time_scale(-3.0), 0.0);
        assert_eq!(sanitize_time_scale(f32::NAN), 0.0);
        assert_eq!(sanitize_time_scale(f32::INFINITY), 0.0);
        assert_eq!(sanitize_time_scale(2.5), 2.5);
    }
}
