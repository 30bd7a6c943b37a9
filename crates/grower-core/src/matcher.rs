//! # Interest Matcher
//!
//! Decides which registered handlers a batch of changes makes relevant.
//!
//! - Unconditional handlers (no conditions) match any non-empty batch
//! - Conditional handlers match when a changed key equals one of their condition keys
//! - Matching is by exact key equality; no coercion
//! - Result keeps registry order

use crate::merge::touched_keys;
use crate::{Handler, Key, ValuePair};
use std::collections::BTreeSet;

/// Return the handlers of `registry` interested in `changed`, in registry order.
///
/// An empty batch matches nothing, including unconditional handlers.
#[must_use]
pub fn matching(changed: &[ValuePair], registry: &[Handler]) -> Vec<Handler> {
    if changed.is_empty() {
        return Vec::new();
    }

    let touched = touched_keys(changed);
    let mut matched: Vec<Handler> = Vec::new();
    for handler in registry {
        if is_interested(handler, &touched) && !matched.contains(handler) {
            matched.push(handler.clone());
        }
    }
    matched
}

/// Check whether `handler` cares about any key in `touched`.
#[must_use]
pub fn is_interested(handler: &Handler, touched: &BTreeSet<&Key>) -> bool {
    handler.is_unconditional() || touched.iter().any(|key| handler.watches(key))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_match_nothing() {
        let registry = vec![Handler::new("always"), Handler::new("watch").when("a")];
        assert!(matching(&[], &registry).is_empty());
    }

    #[test]
    fn unconditional_handlers_match_any_change() {
        let registry = vec![Handler::new("first"), Handler::new("second")];
        let changed = vec![ValuePair::new("new", 1)];
        assert_eq!(matching(&changed, &registry), registry);
    }

    #[test]
    fn conditional_handler_matches_on_watched_key() {
        let watcher = Handler::new("watch").when("watched");
        let registry = vec![watcher.clone()];

        assert_eq!(
            matching(&[ValuePair::new("watched", 1)], &registry),
            vec![watcher]
        );
        assert!(matching(&[ValuePair::new("other", 1)], &registry).is_empty());
    }

    #[test]
    fn any_overlapping_key_is_enough() {
        let handler = Handler::new("pair").when("left").when("right");
        let changed = vec![ValuePair::new("noise", 0), ValuePair::new("right", 5)];
        assert_eq!(matching(&changed, &[handler.clone()]), vec![handler]);
    }

    #[test]
    fn keeps_registry_order() {
        let b = Handler::new("b").when("k");
        let a = Handler::new("a");
        let c = Handler::new("c").when("other");
        let registry = vec![b.clone(), c, a.clone()];

        assert_eq!(matching(&[ValuePair::new("k", 1)], &registry), vec![b, a]);
    }
}
