//! # Driver Module
//!
//! Reference driver: holds a State and an Executor, ticks until the fixed point.
//!
//! A failed tick changes nothing; the driver retries the same State (same queue
//! head) until the retry budget runs out. The budget counts consecutive
//! failures only: any successful tick resets it.
//!
//! The accounting lives in [`RetryBudget`] so asynchronous drivers (timeouts,
//! cancellation) can share it without sharing this loop.

use crate::engine::{Rule, TransitionEngine};
use crate::executor::Executor;
use crate::primitives::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_TICKS};
use crate::{ExecutionFailure, GrowerError, State};
use serde::{Deserialize, Serialize};

// =============================================================================
// RUN POLICY
// =============================================================================

/// Limits applied to one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    /// Maximum successful ticks before giving up on reaching a fixed point.
    pub max_ticks: u64,
    /// Maximum consecutive failures of the same tick.
    pub max_retries: u32,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Tick and failure accounting for one run.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RunPolicy,
    ticks: u64,
    consecutive_failures: u32,
    total_failures: u64,
}

impl RetryBudget {
    /// Start an empty budget under `policy`.
    #[must_use]
    pub fn new(policy: RunPolicy) -> Self {
        Self {
            policy,
            ticks: 0,
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    /// Check that another tick may start.
    pub fn check_tick(&self) -> Result<(), GrowerError> {
        if self.ticks >= self.policy.max_ticks {
            return Err(GrowerError::TickLimitExceeded(self.ticks));
        }
        Ok(())
    }

    /// Record a successful tick. Resets the consecutive-failure count.
    pub fn record_success(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        self.consecutive_failures = 0;
    }

    /// Record a failed tick.
    ///
    /// Returns `RetriesExhausted` once the consecutive failures exceed
    /// `max_retries`; otherwise the caller should retry the same State.
    pub fn record_failure(&mut self, failure: ExecutionFailure) -> Result<(), GrowerError> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);

        if self.consecutive_failures > self.policy.max_retries {
            return Err(GrowerError::RetriesExhausted {
                attempts: self.consecutive_failures,
                source: failure,
            });
        }
        Ok(())
    }

    /// Successful ticks so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Failed attempts so far, across all ticks.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Failures of the current tick so far.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Outcome of a run that reached the fixed point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Successful ticks, not counting the final terminal check.
    pub ticks: u64,
    /// Failed attempts that were retried.
    pub failures: u64,
    /// The terminal State.
    pub state: State,
}

// =============================================================================
// DRIVER
// =============================================================================

/// Synchronous driver around [`TransitionEngine::step`].
#[derive(Debug)]
pub struct Driver<E: Executor> {
    state: State,
    executor: E,
    ticks: u64,
}

impl<E: Executor> Driver<E> {
    /// Create a driver for `state`, validating its invariants first.
    pub fn new(state: State, executor: E) -> Result<Self, GrowerError> {
        state.validate()?;
        Ok(Self {
            state,
            executor,
            ticks: 0,
        })
    }

    /// The current State.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Successful ticks applied so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Check if the current State is the fixed point.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply one tick.
    ///
    /// On success the new State replaces the current one and the applied rule
    /// is returned. On failure the current State is kept for retry.
    pub fn tick(&mut self) -> Result<Rule, ExecutionFailure> {
        let rule = TransitionEngine::classify(&self.state);
        let next = TransitionEngine::step(&self.state, &self.executor)?;
        self.state = next;
        if rule != Rule::Terminal {
            self.ticks = self.ticks.saturating_add(1);
        }
        Ok(rule)
    }

    /// Tick until the State is terminal or `policy` is exhausted.
    pub fn run(&mut self, policy: &RunPolicy) -> Result<RunReport, GrowerError> {
        let mut budget = RetryBudget::new(*policy);

        while !self.state.is_terminal() {
            budget.check_tick()?;
            match self.tick() {
                Ok(_) => budget.record_success(),
                Err(failure) => budget.record_failure(failure)?,
            }
        }

        Ok(RunReport {
            ticks: budget.ticks(),
            failures: budget.total_failures(),
            state: self.state.clone(),
        })
    }

    /// Give the current State back.
    #[must_use]
    pub fn into_state(self) -> State {
        self.state
    }
}

// =============================================================================
// TESTS
// =============================================================================
