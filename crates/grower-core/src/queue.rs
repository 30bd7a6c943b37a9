//! # Dispatch Queue
//!
//! FIFO of handlers awaiting execution.
//!
//! - Appending never reorders what is already queued
//! - A handler already queued (by value) is not queued again
//! - The head is the next handler to run

use crate::Handler;

/// Append every handler of `newly_matched` that is not already in `queue`.
#[must_use]
pub fn enqueue(queue: &[Handler], newly_matched: &[Handler]) -> Vec<Handler> {
    let mut next = queue.to_vec();
    for handler in newly_matched {
        if !next.contains(handler) {
            next.push(handler.clone());
        }
    }
    next
}

/// Split the queue into its head and the remaining handlers.
///
/// Returns `None` for an empty queue.
#[must_use]
pub fn dequeue(queue: &[Handler]) -> Option<(&Handler, &[Handler])> {
    queue.split_first()
}

// =============================================================================
// TESTS
// =============================================================================
