//! # Async Runner
//!
//! Drives a State to its fixed point on the tokio runtime.
//!
//! Each dispatch tick runs the executor on the blocking pool under an
//! optional timeout. A failed or timed-out tick leaves the State untouched
//! and is retried after a short backoff, bounded by the same
//! [`RetryBudget`] the synchronous [`grower_core::Driver`] uses.
//! Cancellation is observed between and during ticks; an abandoned tick's
//! result is discarded, so the last committed State is always consistent.

use crate::config::GrowerConfig;
use grower_core::{
    ExecutionFailure, Executor, GrowerError, RetryBudget, Rule, RunPolicy, State,
    TransitionEngine,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How long the binary waits for abandoned handler work at exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Shared, thread-safe executor handle.
pub type SharedExecutor = Arc<dyn Executor + Send + Sync>;

/// Runner limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Tick and retry limits.
    pub policy: RunPolicy,
    /// Per-tick limit; `None` waits forever.
    pub tick_timeout: Option<Duration>,
    /// Pause before retrying a failed tick.
    pub retry_backoff: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&GrowerConfig::default())
    }
}

impl From<&GrowerConfig> for RunnerSettings {
    fn from(config: &GrowerConfig) -> Self {
        Self {
            policy: config.run_policy(),
            tick_timeout: config.tick_timeout(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The State reached its fixed point.
    FixedPoint,
    /// The run was cancelled before the fixed point.
    Cancelled,
}

/// The result of a run, including the last committed State even on failure.
#[derive(Debug)]
pub struct RunOutcome {
    /// Last committed State.
    pub state: State,
    /// Successful ticks.
    pub ticks: u64,
    /// Failed attempts.
    pub failures: u64,
    /// Completion or the error that stopped the run.
    pub result: Result<Completion, GrowerError>,
}

/// Async driver over a shared executor.
///
/// Handlers are synchronous and cannot be interrupted. A dispatch abandoned
/// by a timeout or by cancellation keeps running on the blocking pool until
/// the handler returns; its result is dropped. Dropping the runtime waits for
/// such work, so owners of the runtime should exit through
/// [`shutdown_runtime`].
pub struct Runner {
    executor: SharedExecutor,
    settings: RunnerSettings,
}

impl Runner {
    /// Create a runner.
    #[must_use]
    pub fn new(executor: SharedExecutor, settings: RunnerSettings) -> Self {
        Self { executor, settings }
    }

    /// Run until the fixed point, never cancelled.
    pub async fn run(&self, initial: State) -> Result<RunOutcome, GrowerError> {
        self.run_until(initial, std::future::pending()).await
    }

    /// Run until the fixed point or until `cancel` resolves.
    ///
    /// An invalid initial State is rejected up front; every later error is
    /// reported in [`RunOutcome::result`] next to the last committed State.
    pub async fn run_until<F>(&self, initial: State, cancel: F) -> Result<RunOutcome, GrowerError>
    where
        F: Future<Output = ()>,
    {
        initial.validate()?;
        tokio::pin!(cancel);

        let mut state = initial;
        let mut budget = RetryBudget::new(self.settings.policy);

        let result = loop {
            if state.is_terminal() {
                break Ok(Completion::FixedPoint);
            }
            if let Err(e) = budget.check_tick() {
                break Err(e);
            }

            let rule = TransitionEngine::classify(&state);
            tracing::debug!(
                tick = budget.ticks() + 1,
                rule = %rule,
                handler = state.next_handler().map(|h| h.name.as_str()),
                "tick"
            );

            let attempt = tokio::select! {
                biased;
                _ = &mut cancel => break Ok(Completion::Cancelled),
                attempt = self.tick(&state, rule) => attempt,
            };

            match attempt {
                Ok(next) => {
                    state = next;
                    budget.record_success();
                }
                Err(failure) => {
                    tracing::warn!(
                        attempt = budget.consecutive_failures() + 1,
                        error = %failure,
                        "tick failed, retrying from the same state"
                    );
                    if let Err(e) = budget.record_failure(failure) {
                        break Err(e);
                    }
                    if !self.settings.retry_backoff.is_zero() {
                        tokio::select! {
                            biased;
                            _ = &mut cancel => break Ok(Completion::Cancelled),
                            _ = tokio::time::sleep(self.settings.retry_backoff) => {}
                        }
                    }
                }
            }
        };

        match &result {
            Ok(completion) => tracing::info!(
                ticks = budget.ticks(),
                failures = budget.total_failures(),
                ?completion,
                "run finished"
            ),
            Err(e) => tracing::warn!(ticks = budget.ticks(), error = %e, "run stopped"),
        }

        Ok(RunOutcome {
            state,
            ticks: budget.ticks(),
            failures: budget.total_failures(),
            result,
        })
    }

    /// Apply one tick.
    ///
    /// Merges run inline; dispatches run on the blocking pool.
    async fn tick(&self, state: &State, rule: Rule) -> Result<State, ExecutionFailure> {
        let head = match (rule, state.next_handler()) {
            (Rule::Dispatch, Some(head)) => head.name.clone(),
            _ => return TransitionEngine::step(state, &self.executor),
        };

        let executor = Arc::clone(&self.executor);
        let input = state.clone();
        let task =
            tokio::task::spawn_blocking(move || TransitionEngine::step(&input, &executor));

        let joined = match self.settings.tick_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                ExecutionFailure::Timeout {
                    handler: head.clone(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }
            })?,
            None => task.await,
        };

        joined.map_err(|e| ExecutionFailure::handler(&head, format!("handler task aborted: {}", e)))?
    }
}

/// Shut `runtime` down, waiting at most `grace` for abandoned handlers.
pub fn shutdown_runtime(runtime: Runtime, grace: Duration) {
    runtime.shutdown_timeout(grace);
}

// =============================================================================
// TESTS
// =============================================================================
