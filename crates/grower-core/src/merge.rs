//! # Key-Value Merge
//!
//! Folds pending value changes into the scratch space.
//!
//! - New values win on key collision
//! - Updated keys move to the front, in update order
//! - Untouched entries keep their relative order behind them
//! - Pure: no side effects, cannot fail

use crate::{Key, ValuePair};
use std::collections::{BTreeMap, BTreeSet};

/// Merge `updates` into `existing`.
///
/// The result is `updates` in their given order, followed by every entry of
/// `existing` whose key does not appear in `updates`. If `updates` repeats a
/// key, the last value wins and keeps the position of the first occurrence,
/// so the result is key-unique whenever `existing` is.
#[must_use]
pub fn merge(existing: &[ValuePair], updates: &[ValuePair]) -> Vec<ValuePair> {
    let mut merged: Vec<ValuePair> = Vec::with_capacity(existing.len() + updates.len());
    let mut slots: BTreeMap<&Key, usize> = BTreeMap::new();

    for update in updates {
        match slots.get(&update.key) {
            Some(&slot) => merged[slot].value = update.value.clone(),
            None => {
                slots.insert(&update.key, merged.len());
                merged.push(update.clone());
            }
        }
    }

    merged.extend(
        existing
            .iter()
            .filter(|pair| !slots.contains_key(&pair.key))
            .cloned(),
    );

    merged
}

/// Collect the set of keys touched by a batch of changes.
#[must_use]
pub fn touched_keys(changes: &[ValuePair]) -> BTreeSet<&Key> {
    changes.iter().map(|pair| &pair.key).collect()
}

/// Check that no key appears twice.
#[must_use]
pub fn has_unique_keys(pairs: &[ValuePair]) -> bool {
    touched_keys(pairs).len() == pairs.len()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_into_empty() {
        let updates = vec![ValuePair::new("1", 1)];
        assert_eq!(merge(&[], &updates), updates);
    }

    #[test]
    fn merge_with_no_updates_is_identity() {
        let existing = vec![ValuePair::new("a", 1), ValuePair::new("b", 2)];
        assert_eq!(merge(&existing, &[]), existing);
    }

    #[test]
    fn overlapping_update_replaces_value() {
        let existing = vec![ValuePair::new("existing", 1)];
        let updates = vec![ValuePair::new("existing", 0)];
        assert_eq!(merge(&existing, &updates), vec![ValuePair::new("existing", 0)]);
    }

    #[test]
    fn updates_lead_untouched_entries_follow() {
        let existing = vec![
            ValuePair::new("a", 1),
            ValuePair::new("b", 2),
            ValuePair::new("c", 3),
        ];
        let updates = vec![ValuePair::new("c", 30), ValuePair::new("z", 26)];

        assert_eq!(
            merge(&existing, &updates),
            vec![
                ValuePair::new("c", 30),
                ValuePair::new("z", 26),
                ValuePair::new("a", 1),
                ValuePair::new("b", 2),
            ]
        );
    }

    #[test]
    fn repeated_update_key_last_value_wins() {
        let updates = vec![
            ValuePair::new("x", 1),
            ValuePair::new("y", 2),
            ValuePair::new("x", 3),
        ];
        let merged = merge(&[ValuePair::new("x", 0)], &updates);

        assert_eq!(merged, vec![ValuePair::new("x", 3), ValuePair::new("y", 2)]);
        assert!(has_unique_keys(&merged));
    }

    #[test]
    fn touched_keys_deduplicates() {
        let changes = vec![ValuePair::new("a", 1), ValuePair::new("a", 2)];
        assert_eq!(touched_keys(&changes).len(), 1);
        assert!(!has_unique_keys(&changes));
    }
}
