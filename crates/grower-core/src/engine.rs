//! # Transition Engine
//!
//! The reducer: one State in, one State out.
//!
//! Every tick applies exactly one of three mutually exclusive rules, checked in
//! this priority order:
//!
//! | Rule | Precondition | Effect |
//! |------|--------------|--------|
//! | `ApplyChanges` | `value_changes` non-empty | merge into scratch space, enqueue interested handlers |
//! | `Dispatch` | no changes, `to_handle` non-empty | run the queue head, its output becomes `value_changes` |
//! | `Terminal` | no changes, empty queue | return the State unchanged |
//!
//! Changes are always reconciled before any handler runs, whatever is already
//! queued. `ApplyChanges` drains `value_changes` and only appends to the queue,
//! so no State with both pending changes and a queue survives past one tick.
//!
//! The engine holds no state between calls. A failed `Dispatch` returns the
//! executor's error and builds nothing; the caller still owns the input State
//! and may retry it as-is.

use crate::executor::Executor;
use crate::matcher::matching;
use crate::merge::merge;
use crate::queue::{dequeue, enqueue};
use crate::{ExecutionFailure, State};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rule a tick applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// Nothing pending, nothing queued: the fixed point.
    Terminal,
    /// Pending changes are merged and matched against the registry.
    ApplyChanges,
    /// The queue head is executed.
    Dispatch,
}

impl Rule {
    /// Get the rule name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Terminal => "terminal",
            Rule::ApplyChanges => "apply-changes",
            Rule::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The TransitionEngine computes the next State.
pub struct TransitionEngine;

impl TransitionEngine {
    /// Decide which rule the next tick applies to `state`.
    #[must_use]
    pub fn classify(state: &State) -> Rule {
        if !state.value_changes().is_empty() {
            Rule::ApplyChanges
        } else if !state.to_handle().is_empty() {
            Rule::Dispatch
        } else {
            Rule::Terminal
        }
    }

    /// Compute the State after one tick.
    ///
    /// Only `Dispatch` can fail, and only with the executor's own error.
    pub fn step<E: Executor + ?Sized>(
        state: &State,
        executor: &E,
    ) -> Result<State, ExecutionFailure> {
        match Self::classify(state) {
            Rule::Terminal => Ok(state.clone()),
            Rule::ApplyChanges => Ok(Self::apply_changes(state)),
            Rule::Dispatch => Self::dispatch(state, executor),
        }
    }

    /// Merge pending changes and enqueue every handler they interest.
    ///
    /// Cannot fail and never runs a handler. A State without pending changes
    /// comes back unchanged.
    #[must_use]
    pub fn apply_changes(state: &State) -> State {
        let changes = state.value_changes();
        let scratch_space = merge(state.scratch_space(), changes);
        let matched = matching(changes, state.handlers());
        let to_handle = enqueue(state.to_handle(), &matched);

        State::new(
            Vec::new(),
            to_handle,
            scratch_space,
            state.handlers().to_vec(),
        )
    }

    fn dispatch<E: Executor + ?Sized>(
        state: &State,
        executor: &E,
    ) -> Result<State, ExecutionFailure> {
        let Some((head, rest)) = dequeue(state.to_handle()) else {
            return Ok(state.clone());
        };

        let produced = executor.execute(head, state.scratch_space())?;

        Ok(State::new(
            produced,
            rest.to_vec(),
            state.scratch_space().to_vec(),
            state.handlers().to_vec(),
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FnExecutor;
    use crate::{Handler, HandlerName, ValuePair};
    use std::cell::Cell;

    fn never_called() -> impl Executor {
        FnExecutor(
            |handler: &Handler, _: &[ValuePair]| -> Result<Vec<ValuePair>, ExecutionFailure> {
                Err(ExecutionFailure::handler(&handler.name, "must not run"))
            },
        )
    }

    #[test]
    fn classify_follows_priority() {
        let h = Handler::new("h");
        let both = State::blank()
            .with_value_changes(vec![ValuePair::new("a", 1)])
            .with_to_handle(vec![h.clone()]);

        assert_eq!(TransitionEngine::classify(&State::blank()), Rule::Terminal);
        assert_eq!(TransitionEngine::classify(&both), Rule::ApplyChanges);
        assert_eq!(
            TransitionEngine::classify(&State::blank().with_to_handle(vec![h])),
            Rule::Dispatch
        );
    }

    #[test]
    fn terminal_state_is_returned_unchanged() {
        let state = State::blank()
            .with_scratch_space(vec![ValuePair::new("kept", 1)])
            .with_handlers(vec![Handler::new("idle")]);

        let next = TransitionEngine::step(&state, &never_called()).expect("step");
        assert_eq!(next, state);
    }

    #[test]
    fn changes_merge_before_queued_handler_runs() {
        let queued = Handler::new("queued");
        let state = State::blank()
            .with_value_changes(vec![ValuePair::new("a", 1)])
            .with_to_handle(vec![queued.clone()]);

        let next = TransitionEngine::step(&state, &never_called()).expect("step");
        assert!(next.value_changes().is_empty());
        assert_eq!(next.to_handle(), &[queued][..]);
        assert_eq!(next.scratch_space(), &[ValuePair::new("a", 1)][..]);
    }

    #[test]
    fn dispatch_runs_head_once_and_pops_it() {
        let calls = Cell::new(0u32);
        let first = Handler::new("first");
        let second = Handler::new("second");
        let exec = FnExecutor(
            |handler: &Handler, scratch: &[ValuePair]| -> Result<Vec<ValuePair>, ExecutionFailure> {
                calls.set(calls.get() + 1);
                assert_eq!(handler.name, HandlerName::new("first"));
                assert_eq!(scratch.len(), 1);
                Ok(vec![ValuePair::new("out", 7)])
            },
        );
        let state = State::blank()
            .with_to_handle(vec![first, second.clone()])
            .with_scratch_space(vec![ValuePair::new("in", 1)]);

        let next = TransitionEngine::step(&state, &exec).expect("step");

        assert_eq!(calls.get(), 1);
        assert_eq!(next.value_changes(), &[ValuePair::new("out", 7)][..]);
        assert_eq!(next.to_handle(), &[second][..]);
        assert_eq!(next.scratch_space(), state.scratch_space());
    }

    #[test]
    fn failed_dispatch_leaves_input_untouched() {
        let state = State::blank().with_to_handle(vec![Handler::new("boom")]);
        let before = state.clone();

        let result = TransitionEngine::step(&state, &never_called());
        assert!(result.is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn apply_changes_without_changes_is_identity() {
        let state = State::blank().with_to_handle(vec![Handler::new("h")]);
        assert_eq!(TransitionEngine::apply_changes(&state), state);
    }

    #[test]
    fn rule_names() {
        assert_eq!(Rule::ApplyChanges.to_string(), "apply-changes");
        assert_eq!(Rule::Dispatch.name(), "dispatch");
    }
}
