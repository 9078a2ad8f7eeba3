//! Boolean predicates that gate edges.
//!
//! Conditions are evaluated by the machine in an order it decides (ports in
//! declared order, edges in authored order), so they only get a shared
//! reference to the context: they can read the blackboard but not write it.
//!
//! # Architecture
//!
//! - [`Condition`] - Object-safe trait stored on edges
//! - [`FnCondition`] - Adapter turning a closure into a condition
//! - [`BoxedCondition`] - Type alias for boxed conditions
//!
//! # Example
//!
//! ```
//! use trellis_context::Context;
//! use trellis_graph::condition::{Condition, FnCondition};
//!
//! let low_health = FnCondition::new("low_health", |ctx: &Context| ctx.get("hp", 100_i32) < 20);
//!
//! let mut ctx = Context::detached();
//! ctx.set("hp", 5_i32);
//! assert!(low_health.evaluate(&ctx));
//! ```

use core::fmt;

use trellis_context::Context;

/// A predicate over the shared context.
pub trait Condition: Send + Sync + 'static {
    /// Evaluates the condition.
    fn evaluate(&self, ctx: &Context) -> bool;

    /// Returns the condition's type name for debugging and tracing.
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

impl fmt::Debug for dyn Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("type", &self.type_name())
            .finish()
    }
}

/// Type alias for boxed conditions stored on edges.
pub type BoxedCondition = Box<dyn Condition>;

/// A condition backed by a closure.
pub struct FnCondition<F> {
    name: &'static str,
    func: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    /// Creates a new condition from a closure.
    ///
    /// `name` is reported as the condition's type name.
    #[must_use]
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    fn evaluate(&self, ctx: &Context) -> bool {
        (self.func)(ctx)
    }

    fn type_name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCondition")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_reads_blackboard() {
        let cond = FnCondition::new("armed", |ctx: &Context| ctx.get("armed", false));
        let mut ctx = Context::detached();
        assert!(!cond.evaluate(&ctx));
        ctx.set("armed", true);
        assert!(cond.evaluate(&ctx));
    }

    #[test]
    fn boxed_condition_reports_name() {
        let cond: BoxedCondition = Box::new(FnCondition::new("always", |_: &Context| true));
        assert_eq!(cond.type_name(), "always");
        assert!(format!("{cond:?}").contains("always"));
    }
}
