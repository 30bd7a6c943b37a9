//! # State Module
//!
//! The immutable record the reducer evolves tick by tick.
//!
//! A State is a value snapshot. The reducer never mutates one in place; it
//! reads one State and builds the next. `handlers` is supplied once when the
//! run starts and is carried through every transition unchanged.

use crate::{GrowerError, Handler, Key, Value, ValuePair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The four sequences the reducer reconciles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Pending facts not yet merged into the scratch space.
    #[serde(default)]
    value_changes: Vec<ValuePair>,
    /// Handlers queued for execution, in dispatch order.
    #[serde(default)]
    to_handle: Vec<Handler>,
    /// Current values, one entry per key.
    #[serde(default)]
    scratch_space: Vec<ValuePair>,
    /// The static handler registry.
    #[serde(default)]
    handlers: Vec<Handler>,
}

impl State {
    /// Create a State from its four parts.
    #[must_use]
    pub fn new(
        value_changes: Vec<ValuePair>,
        to_handle: Vec<Handler>,
        scratch_space: Vec<ValuePair>,
        handlers: Vec<Handler>,
    ) -> Self {
        Self {
            value_changes,
            to_handle,
            scratch_space,
            handlers,
        }
    }

    /// Create the blank State: four empty sequences.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Replace the pending value changes.
    #[must_use]
    pub fn with_value_changes(mut self, value_changes: Vec<ValuePair>) -> Self {
        self.value_changes = value_changes;
        self
    }

    /// Replace the dispatch queue.
    #[must_use]
    pub fn with_to_handle(mut self, to_handle: Vec<Handler>) -> Self {
        self.to_handle = to_handle;
        self
    }

    /// Replace the scratch space.
    #[must_use]
    pub fn with_scratch_space(mut self, scratch_space: Vec<ValuePair>) -> Self {
        self.scratch_space = scratch_space;
        self
    }

    /// Replace the handler registry.
    #[must_use]
    pub fn with_handlers(mut self, handlers: Vec<Handler>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Pending value changes.
    #[must_use]
    pub fn value_changes(&self) -> &[ValuePair] {
        &self.value_changes
    }

    /// Handlers awaiting execution.
    #[must_use]
    pub fn to_handle(&self) -> &[Handler] {
        &self.to_handle
    }

    /// Current key-unique store.
    #[must_use]
    pub fn scratch_space(&self) -> &[ValuePair] {
        &self.scratch_space
    }

    /// The handler registry.
    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Handler that the next dispatch tick would run.
    #[must_use]
    pub fn next_handler(&self) -> Option<&Handler> {
        self.to_handle.first()
    }

    /// Look up the current value of `key` in the scratch space.
    #[must_use]
    pub fn lookup(&self, key: &Key) -> Option<&Value> {
        self.scratch_space
            .iter()
            .find(|pair| &pair.key == key)
            .map(|pair| &pair.value)
    }

    /// A State is terminal iff it has no pending changes and nothing queued.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.value_changes.is_empty() && self.to_handle.is_empty()
    }

    /// Check the structural invariants.
    ///
    /// - `scratch_space` holds each key at most once
    /// - `handlers` holds each handler at most once
    /// - `to_handle` holds each handler at most once
    pub fn validate(&self) -> Result<(), GrowerError> {
        if let Some(key) = first_duplicate(self.scratch_space.iter().map(|p| &p.key)) {
            return Err(GrowerError::InvalidState(format!(
                "scratch_space holds key '{}' more than once",
                key
            )));
        }
        if let Some(handler) = first_duplicate(self.handlers.iter()) {
            return Err(GrowerError::InvalidState(format!(
                "handler '{}' is registered more than once",
                handler.name
            )));
        }
        if let Some(handler) = first_duplicate(self.to_handle.iter()) {
            return Err(GrowerError::InvalidState(format!(
                "handler '{}' is queued more than once",
                handler.name
            )));
        }
        Ok(())
    }
}

fn first_duplicate<'a, T: Ord + 'a>(mut items: impl Iterator<Item = &'a T>) -> Option<&'a T> {
    let mut seen = BTreeSet::new();
    items.find(|item| !seen.insert(*item))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_state_is_terminal() {
        let state = State::blank();
        assert!(state.is_terminal());
        assert!(state.validate().is_ok());
        assert_eq!(
            state,
            State::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
        );
    }

    #[test]
    fn pending_changes_or_queue_are_not_terminal() {
        let changes = State::blank().with_value_changes(vec![ValuePair::new("a", 1)]);
        assert!(!changes.is_terminal());

        let queued = State::blank().with_to_handle(vec![Handler::new("noop")]);
        assert!(!queued.is_terminal());
    }

    #[test]
    fn validate_rejects_duplicate_scratch_key() {
        let state = State::blank()
            .with_scratch_space(vec![ValuePair::new("a", 1), ValuePair::new("a", 2)]);
        assert!(matches!(
            state.validate(),
            Err(GrowerError::InvalidState(msg)) if msg.contains("'a'")
        ));
    }

    #[test]
    fn validate_rejects_duplicate_handlers() {
        let h = Handler::new("noop").when("a");

        let registry = State::blank().with_handlers(vec![h.clone(), h.clone()]);
        assert!(registry.validate().is_err());

        let queue = State::blank().with_to_handle(vec![h.clone(), h]);
        assert!(queue.validate().is_err());
    }

    #[test]
    fn lookup_reads_scratch_space() {
        let state = State::blank()
            .with_scratch_space(vec![ValuePair::new("a", 1), ValuePair::new("b", "two")]);
        assert_eq!(state.lookup(&Key::new("b")), Some(&Value::from("two")));
        assert_eq!(state.lookup(&Key::new("c")), None);
    }

    #[test]
    fn json_missing_fields_default_to_empty() {
        let state: State =
            serde_json::from_str(r#"{"value_changes":[{"key":"a","value":1}]}"#).expect("parse");
        assert_eq!(
            state,
            State::blank().with_value_changes(vec![ValuePair::new("a", 1)])
        );
    }
}
