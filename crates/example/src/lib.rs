//! Example door controller.
//!
//! The door is authored as a JSON graph (`assets/door.json`) and driven by a
//! [`Runner`] configured from `assets/runner.json`. A short script publishes
//! events on chosen frames so the whole cycle can be watched in the logs:
//!
//! - `knock` wakes the closed door, which greets and swings open
//! - `lockdown` is bound to the `locked` node and interrupts whatever is running
//! - `doorbell` is bound to the `greet` node

use std::path::Path;
use std::sync::Arc;

use trellis_context::{EventBus, EventSystem};
use trellis_graph::machine::MachineError;
use trellis_graph::registry::RegistryError;
use trellis_runner::{ConfigError, Runner, RunnerConfig};

/// Built-in door graph.
pub const DOOR_GRAPH: &str = include_str!("../assets/door.json");

/// Built-in runner configuration for the door graph.
pub const DOOR_RUNNER: &str = include_str!("../assets/runner.json");

/// Errors the demo can hit before the frame loop starts.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// A file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The graph document could not be instantiated.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The runner configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The machine refused to start.
    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// An event published before a given frame is ticked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedEvent {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Event name.
    pub event: String,
}

impl ScriptedEvent {
    /// Creates a scripted event.
    #[must_use]
    pub fn new(frame: u64, event: impl Into<String>) -> Self {
        Self {
            frame,
            event: event.into(),
        }
    }
}

/// The default script: knock, lock down mid-cycle, then ring the bell.
#[must_use]
pub fn door_script() -> Vec<ScriptedEvent> {
    vec![
        ScriptedEvent::new(5, "knock"),
        ScriptedEvent::new(100, "lockdown"),
        ScriptedEvent::new(200, "doorbell"),
    ]
}

/// Where the door ended up after a scripted run.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoSummary {
    /// Frames ticked.
    pub frames: u64,
    /// Node active when the loop ended.
    pub final_node: Option<String>,
    /// Final value of the `door_open` blackboard key.
    pub door_open: bool,
    /// Every node entered, oldest first.
    pub visited: Vec<String>,
}

/// Reads a file into a string.
///
/// # Errors
///
/// Returns [`DemoError::Io`] if the file can't be read.
pub fn read_asset(path: &Path) -> Result<String, DemoError> {
    std::fs::read_to_string(path).map_err(|source| DemoError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Builds a runner for the given graph and runner config documents.
///
/// # Errors
///
/// Returns an error if either document is invalid.
pub fn build_runner(
    graph_json: &str,
    runner_json: &str,
    events: Arc<dyn EventSystem>,
) -> Result<Runner, DemoError> {
    let registry = trellis_nodes::builtin_registry();
    let graph = registry.load_json(graph_json)?;
    let config = RunnerConfig::from_json(runner_json)?;

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        bindings = config.bindings.len(),
        "door graph loaded"
    );
    Ok(Runner::new(Arc::new(graph), events, config))
}

/// Runs `frames` ticks of `delta_time` seconds, publishing `script` on the way.
///
/// # Errors
///
/// Returns an error if the documents are invalid or the machine can't start.
pub fn run_scripted(
    graph_json: &str,
    runner_json: &str,
    script: &[ScriptedEvent],
    frames: u64,
    delta_time: f32,
) -> Result<DemoSummary, DemoError> {
    let bus = Arc::new(EventBus::new());
    let mut runner = build_runner(graph_json, runner_json, bus.clone())?;
    runner.start()?;

    let mut last = current(&runner);
    for frame in 1..=frames {
        for scripted in script.iter().filter(|s| s.frame == frame) {
            tracing::info!(frame, event = %scripted.event, "publishing");
            bus.publish(&scripted.event);
        }

        if let Some(report) = runner.tick(delta_time)
            && report.capped
        {
            tracing::warn!(frame, "transition budget exhausted");
        }

        let now = current(&runner);
        if now != last {
            tracing::info!(
                frame,
                from = last.as_deref().unwrap_or("-"),
                to = now.as_deref().unwrap_or("-"),
                door_open = runner.context().get("door_open", false),
                "door changed state"
            );
            last = now;
        }
    }

    let summary = DemoSummary {
        frames,
        final_node: last,
        door_open: runner.context().get("door_open", false),
        visited: runner
            .machine()
            .history()
            .iter()
            .map(|record| record.to.as_str().to_owned())
            .collect(),
    };
    runner.stop();
    Ok(summary)
}

fn current(runner: &Runner) -> Option<String> {
    runner
        .machine()
        .current_node_guid()
        .map(|guid| guid.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn bundled_assets_load() {
        let runner = build_runner(DOOR_GRAPH, DOOR_RUNNER, Arc::new(EventBus::new())).unwrap();
        assert_eq!(runner.machine().graph().node_count(), 7);
        assert!(runner.machine().graph().validate().is_ok());
    }

    #[test]
    fn quiet_door_stays_closed() {
        let summary = run_scripted(DOOR_GRAPH, DOOR_RUNNER, &[], 60, DT).unwrap();
        assert_eq!(summary.final_node.as_deref(), Some("closed"));
        assert!(!summary.door_open);
        assert_eq!(summary.visited, vec!["closed"]);
    }

    #[test]
    fn knock_opens_then_closes() {
        let script = [ScriptedEvent::new(5, "knock")];

        let opened = run_scripted(DOOR_GRAPH, DOOR_RUNNER, &script, 50, DT).unwrap();
        assert_eq!(opened.final_node.as_deref(), Some("hold"));
        assert!(opened.door_open);

        let closed = run_scripted(DOOR_GRAPH, DOOR_RUNNER, &script, 120, DT).unwrap();
        assert_eq!(closed.final_node.as_deref(), Some("closed"));
        assert!(!closed.door_open);
        assert_eq!(
            closed.visited,
            vec!["closed", "greet", "opening", "open", "hold", "closing", "closed"]
        );
    }

    #[test]
    fn full_script_visits_lockdown_and_doorbell() {
        let summary = run_scripted(DOOR_GRAPH, DOOR_RUNNER, &door_script(), 220, DT).unwrap();
        assert!(summary.visited.iter().any(|node| node == "locked"));
        assert_eq!(summary.final_node.as_deref(), Some("opening"));
        assert!(!summary.door_open);
    }

    #[test]
    fn missing_asset_is_io_error() {
        let err = read_asset(Path::new("/no/such/door.json")).unwrap_err();
        assert!(matches!(err, DemoError::Io { .. }));
    }
}
