//! # grower-core
//!
//! The deterministic reducer for Grower - THE LOGIC.
//!
//! A small immutable [`State`] is evolved one tick at a time until it reaches
//! a fixed point. Each tick either merges pending key/value changes into the
//! scratch space and queues the handlers interested in them, or runs the next
//! queued handler through an injected [`Executor`].
//!
//! ```
//! use grower_core::{Handler, HandlerRegistry, State, TransitionEngine, ValuePair};
//!
//! let registry = HandlerRegistry::new().register("noop", |_, _| Ok(Vec::new()));
//! let state = State::blank()
//!     .with_value_changes(vec![ValuePair::new("seed", 1)])
//!     .with_handlers(vec![Handler::new("noop").when("seed")]);
//!
//! let merged = TransitionEngine::step(&state, &registry).unwrap();
//! assert_eq!(merged.to_handle().len(), 1);
//!
//! let done = TransitionEngine::step(&merged, &registry).unwrap();
//! assert!(done.is_terminal());
//! ```
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Holds no state between ticks; the caller owns every State
//! - Runs at most one handler per tick, strictly in queue order
//! - Never mutates the handler registry
//! - Has NO async, NO network dependencies, NO logging framework (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod driver;
pub mod engine;
pub mod executor;
pub mod formats;
pub mod matcher;
pub mod merge;
pub mod metrics;
pub mod primitives;
pub mod queue;
pub mod state;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Condition, ExecutionFailure, GrowerError, Handler, HandlerName, Key, Params, Value, ValuePair,
};

// =============================================================================
// RE-EXPORTS: Reducer
// =============================================================================

pub use driver::{Driver, RetryBudget, RunPolicy, RunReport};
pub use engine::{Rule, TransitionEngine};
pub use executor::{Executor, FnExecutor, HandlerFn, HandlerRegistry, Snapshot, param_key};
pub use matcher::matching;
pub use merge::merge;
pub use metrics::StateMetrics;
pub use queue::enqueue;
pub use state::State;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::state_fingerprint;
pub use formats::{SnapshotHeader, state_from_bytes, state_to_bytes};
