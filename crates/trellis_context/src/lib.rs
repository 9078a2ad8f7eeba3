//! Blackboard, event bridge and execution context for Trellis (Layer 1).
//!
//! `trellis_context` holds everything a running graph shares between its
//! nodes and conditions. It knows nothing about graphs themselves.
//!
//! # Core Concepts
//!
//! - [`Blackboard`] - Type-erased key/value store with fail-soft reads
//! - [`BlackboardValue`] / [`BlackboardEntry`] - Typed seeds for the initial snapshot
//! - [`EventSystem`] / [`EventBus`] / [`Subscription`] - Named pub/sub with disposable tokens
//! - [`Context`] - Blackboard + event bridge + timing, passed to every callback
//! - [`NodeGuid`] / [`EdgeGuid`] - Opaque identifiers
//!
//! # Example
//!
//! ```
//! use trellis_context::{BlackboardEntry, Context};
//!
//! let mut ctx = Context::detached();
//! ctx.set_initial_snapshot(vec![BlackboardEntry::new("lives", 3)]);
//! ctx.reset_to_initial();
//!
//! assert_eq!(ctx.get("lives", 0_i32), 3);
//! assert_eq!(ctx.get("missing", 7_i32), 7);
//! ```

/// Type-erased key/value storage.
pub mod blackboard;

/// The per-run execution context.
pub mod context;

/// Named publish/subscribe events.
pub mod events;

/// Node and edge identifiers.
pub mod guid;

/// Typed blackboard seeds.
pub mod value;

pub use blackboard::Blackboard;
pub use context::{Context, event_count_key};
pub use events::{EventBus, EventHandler, EventSystem, Subscription};
pub use guid::{EdgeGuid, NodeGuid};
pub use value::{BlackboardEntry, BlackboardValue, merge_entries};
