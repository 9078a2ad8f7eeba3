//! Runner configuration.
//!
//! [`RunnerConfig`] is plain serde data, so hosts can keep it next to the
//! graph document:
//!
//! ```json
//! {
//!   "machine": { "mode": "ResolveUntilStable", "max_transitions_per_tick": 16 },
//!   "bindings": [ { "event_name": "alarm", "target_node_guid": "panic" } ],
//!   "blackboard_overrides": [ { "key": "hp", "value": { "type": "int", "value": 3 } } ],
//!   "time_scale": 0.5,
//!   "start_paused": false
//! }
//! ```
//!
//! Every field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use trellis_context::BlackboardEntry;
use trellis_graph::machine::MachineConfig;

/// Routes an external event to a forced node entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBinding {
    /// Event to listen for.
    pub event_name: String,
    /// Node entered when the event fires.
    pub target_node_guid: String,
}

impl EventBinding {
    /// Creates a binding.
    #[must_use]
    pub fn new(event_name: impl Into<String>, target_node_guid: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            target_node_guid: target_node_guid.into(),
        }
    }
}

/// Host-side settings for a [`Runner`](crate::Runner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Machine settings.
    pub machine: MachineConfig,
    /// External event bindings.
    pub bindings: Vec<EventBinding>,
    /// Blackboard values that replace the graph's defaults.
    pub blackboard_overrides: Vec<BlackboardEntry>,
    /// Multiplier applied to every delta time.
    pub time_scale: f32,
    /// Whether the runner starts paused.
    pub start_paused: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            machine: MachineConfig::default(),
            bindings: Vec::new(),
            blackboard_overrides: Vec::new(),
            time_scale: 1.0,
            start_paused: false,
        }
    }
}

/// Errors raised while loading a [`RunnerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read runner config '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The JSON is malformed or has the wrong shape.
    #[error("failed to parse runner config: {0}")]
    Parse(#[from] serde_json::Error),
    /// `time_scale` is negative or not finite.
    #[error("time scale must be a finite, non-negative number (got {0})")]
    InvalidTimeScale(f32),
    /// A binding has an empty event name or target.
    #[error("binding #{index} has an empty event name or target")]
    IncompleteBinding {
        /// Index in `bindings`.
        index: usize,
    },
}

impl RunnerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// validation error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file can't be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks values serde can't.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::InvalidTimeScale(self.time_scale));
        }
        if let Some(index) = self
            .bindings
            .iter()
            .position(|b| b.event_name.is_empty() || b.target_node_guid.is_empty())
        {
            return Err(ConfigError::IncompleteBinding { index });
        }
        Ok(())
    }

    /// Sets the machine settings.
    #[must_use]
    pub fn with_machine(mut self, machine: MachineConfig) -> Self {
        self.machine = machine;
        self
    }

    /// Adds an external event binding.
    #[must_use]
    pub fn with_binding(
        mut self,
        event_name: impl Into<String>,
        target_node_guid: impl Into<String>,
    ) -> Self {
        self.bindings.push(EventBinding::new(event_name, target_node_guid));
        self
    }

    /// Adds a blackboard override.
    #[must_use]
    pub fn with_override(mut self, entry: BlackboardEntry) -> Self {
        self.blackboard_overrides.push(entry);
        self
    }

    /// Sets the time scale.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Sets whether the runner starts paused.
    #[must_use]
    pub fn with_start_paused(mut self, paused: bool) -> Self {
        self.start_paused = paused;
        self
    }
}
