//! Built-in edge conditions.

use core::cmp::Ordering;
use core::fmt;

use serde::{Deserialize, Serialize};
use trellis_context::{BlackboardValue, Context};
use trellis_graph::condition::{BoxedCondition, Condition};
use trellis_graph::registry::{ConditionSpec, Registry, RegistryError, from_data};

use crate::nodes::wait_remaining_key;

// ─────────────────────────────────────────────────────────────────────────────
// Timers and events
// ─────────────────────────────────────────────────────────────────────────────

/// Passes once a [`WaitNode`](crate::nodes::WaitNode) has counted down.
///
/// Checks the current node's timer unless `node` names another one. A timer
/// that was never started does not pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitElapsedCondition {
    /// Guid of the wait node to check; defaults to the current node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl Condition for WaitElapsedCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        let guid = match &self.node {
            Some(node) => node.as_str(),
            None => match ctx.current_node_guid() {
                Some(guid) => guid.as_str(),
                None => return false,
            },
        };
        ctx.get_ref::<f32>(&wait_remaining_key(guid))
            .is_some_and(|remaining| *remaining <= 0.0)
    }

    fn type_name(&self) -> &'static str {
        "WaitElapsed"
    }
}

fn one() -> i32 {
    1
}

/// Passes once `event` fired at least `min_count` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFiredCondition {
    /// Event name.
    pub event: String,
    /// Required deliveries.
    #[serde(default = "one")]
    pub min_count: i32,
}

impl EventFiredCondition {
    /// Passes after a single delivery of `event`.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            min_count: 1,
        }
    }

    /// Sets the required number of deliveries.
    #[must_use]
    pub fn at_least(mut self, min_count: i32) -> Self {
        self.min_count = min_count;
        self
    }
}

impl Condition for EventFiredCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        ctx.get_event_count(&self.event) >= self.min_count
    }

    fn type_name(&self) -> &'static str {
        "EventFired"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compare
// ─────────────────────────────────────────────────────────────────────────────

/// Comparison operator for [`CompareCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `==`
    #[serde(alias = "==")]
    Eq,
    /// `!=`
    #[serde(alias = "!=")]
    Ne,
    /// `<`
    #[serde(alias = "<")]
    Lt,
    /// `<=`
    #[serde(alias = "<=")]
    Le,
    /// `>`
    #[serde(alias = ">")]
    Gt,
    /// `>=`
    #[serde(alias = ">=")]
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Compares a blackboard value against a constant.
///
/// Ints and floats compare numerically with each other. Bools and strings
/// only compare with their own kind. A missing key or mismatched kinds
/// never pass, whatever the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareCondition {
    /// Blackboard key.
    pub key: String,
    /// Operator applied as `blackboard[key] <op> value`.
    pub op: CompareOp,
    /// Right-hand side.
    pub value: BlackboardValue,
}

impl CompareCondition {
    /// Creates a comparison.
    #[must_use]
    pub fn new(key: impl Into<String>, op: CompareOp, value: impl Into<BlackboardValue>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }
}

fn compare(lhs: &BlackboardValue, rhs: &BlackboardValue) -> Option<Ordering> {
    match (lhs, rhs) {
        (BlackboardValue::Bool(a), BlackboardValue::Bool(b)) => Some(a.cmp(b)),
        (BlackboardValue::String(a), BlackboardValue::String(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

impl Condition for CompareCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        let Some(actual) = BlackboardValue::read_from(ctx.blackboard(), &self.key) else {
            tracing::trace!(key = %self.key, "compare on missing key");
            return false;
        };
        compare(&actual, &self.value).is_some_and(|ordering| self.op.accepts(ordering))
    }

    fn type_name(&self) -> &'static str {
        "Compare"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Combinators
// ─────────────────────────────────────────────────────────────────────────────

/// Inverts another condition.
pub struct NotCondition {
    inner: BoxedCondition,
}

impl NotCondition {
    /// Wraps `inner`.
    #[must_use]
    pub fn new<C: Condition>(inner: C) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Condition for NotCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        !self.inner.evaluate(ctx)
    }

    fn type_name(&self) -> &'static str {
        "Not"
    }
}

/// Passes when every child passes. Empty passes.
pub struct AllCondition {
    conditions: Vec<BoxedCondition>,
}

impl AllCondition {
    /// Creates a conjunction of `conditions`, evaluated in order.
    #[must_use]
    pub fn new(conditions: Vec<BoxedCondition>) -> Self {
        Self { conditions }
    }
}

impl Condition for AllCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        self.conditions.iter().all(|condition| condition.evaluate(ctx))
    }

    fn type_name(&self) -> &'static str {
        "All"
    }
}

/// Passes when any child passes. Empty fails.
pub struct AnyCondition {
    conditions: Vec<BoxedCondition>,
}

impl AnyCondition {
    /// Creates a disjunction of `conditions`, evaluated in order.
    #[must_use]
    pub fn new(conditions: Vec<BoxedCondition>) -> Self {
        Self { conditions }
    }
}

impl Condition for AnyCondition {
    fn evaluate(&self, ctx: &Context) -> bool {
        self.conditions.iter().any(|condition| condition.evaluate(ctx))
    }

    fn type_name(&self) -> &'static str {
        "Any"
    }
}

impl fmt::Debug for NotCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Not").field(&self.inner.type_name()).finish()
    }
}

impl fmt::Debug for AllCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.conditions.iter().map(|c| c.type_name()))
            .finish()
    }
}

impl fmt::Debug for AnyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.conditions.iter().map(|c| c.type_name()))
            .finish()
    }
}

#[derive(Deserialize)]
struct NotData {
    inner: ConditionSpec,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    conditions: Vec<ConditionSpec>,
}

fn build_all(registry: &Registry, specs: &[ConditionSpec]) -> Result<Vec<BoxedCondition>, RegistryError> {
    specs.iter().map(|spec| registry.build_condition(spec)).collect()
}

/// Registers `"Not"`, `"All"` and `"Any"`, whose children are nested specs.
pub(crate) fn register_combinators(registry: &mut Registry) {
    registry
        .register_condition_factory("Not", |data, registry| {
            let NotData { inner } = from_data("Not", data)?;
            Ok(Box::new(NotCondition {
                inner: registry.build_condition(&inner)?,
            }))
        })
        .register_condition_factory("All", |data, registry| {
            let ListData { conditions } = from_data("All", data)?;
            Ok(Box::new(AllCondition::new(build_all(registry, &conditions)?)))
        })
        .register_condition_factory("Any", |data, registry| {
            let ListData { conditions } = from_data("Any", data)?;
            Ok(Box::new(AnyCondition::new(build_all(registry, &conditions)?)))
        });
}
