//! # State Metrics
//!
//! Counts extracted from a State for inspection and run summaries.
//! Pure and deterministic; computing them never changes the State.

use crate::engine::{Rule, TransitionEngine};
use crate::State;
use serde::{Deserialize, Serialize};

/// Summary of one State.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetrics {
    /// Pending value changes.
    pub value_change_count: usize,
    /// Handlers waiting in the dispatch queue.
    pub queued_count: usize,
    /// Keys in the scratch space.
    pub scratch_entry_count: usize,
    /// Registered handlers.
    pub handler_count: usize,
    /// Registered handlers without conditions.
    pub unconditional_handler_count: usize,
    /// Whether the State is the fixed point.
    pub terminal: bool,
    /// The rule the next tick would apply.
    pub next_rule: Rule,
    /// Name of the handler the next dispatch would run.
    pub next_handler: Option<String>,
}

impl StateMetrics {
    /// Compute metrics from a State.
    #[must_use]
    pub fn from_state(state: &State) -> Self {
        Self {
            value_change_count: state.value_changes().len(),
            queued_count: state.to_handle().len(),
            scratch_entry_count: state.scratch_space().len(),
            handler_count: state.handlers().len(),
            unconditional_handler_count: state
                .handlers()
                .iter()
                .filter(|h| h.is_unconditional())
                .count(),
            terminal: state.is_terminal(),
            next_rule: TransitionEngine::classify(state),
            next_handler: state.next_handler().map(|h| h.name.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handler, ValuePair};

    #[test]
    fn blank_state_metrics() {
        let metrics = StateMetrics::from_state(&State::blank());
        assert!(metrics.terminal);
        assert_eq!(metrics.next_rule, Rule::Terminal);
        assert_eq!(metrics.handler_count, 0);
        assert_eq!(metrics.next_handler, None);
    }

    #[test]
    fn counts_every_sequence() {
        let state = State::blank()
            .with_to_handle(vec![Handler::new("copy").when("a")])
            .with_scratch_space(vec![ValuePair::new("a", 1), ValuePair::new("b", 2)])
            .with_handlers(vec![Handler::new("copy").when("a"), Handler::new("log")]);

        let metrics = StateMetrics::from_state(&state);
        assert_eq!(metrics.value_change_count, 0);
        assert_eq!(metrics.queued_count, 1);
        assert_eq!(metrics.scratch_entry_count, 2);
        assert_eq!(metrics.handler_count, 2);
        assert_eq!(metrics.unconditional_handler_count, 1);
        assert!(!metrics.terminal);
        assert_eq!(metrics.next_rule, Rule::Dispatch);
        assert_eq!(metrics.next_handler.as_deref(), Some("copy"));
    }
}
