//! Tests for the async runner: fixed point, retries, timeouts, cancellation.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use grower::handlers::builtin_registry;
use grower::runner::{Completion, Runner, RunnerSettings, shutdown_runtime};
use grower_core::{
    ExecutionFailure, FnExecutor, GrowerError, Handler, HandlerRegistry, RunPolicy, State,
    ValuePair,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn settings(max_ticks: u64, max_retries: u32, tick_timeout: Option<Duration>) -> RunnerSettings {
    RunnerSettings {
        policy: RunPolicy {
            max_ticks,
            max_retries,
        },
        tick_timeout,
        retry_backoff: Duration::ZERO,
    }
}

fn counter_state() -> State {
    State::blank()
        .with_value_changes(vec![ValuePair::new("n", 3)])
        .with_handlers(vec![Handler::new("countdown").when("n")])
}

/// Decrements `n` until it reaches zero.
fn countdown() -> HandlerRegistry {
    HandlerRegistry::new().register("countdown", |_, snapshot| {
        let n = snapshot.require_int("n")?;
        if n > 0 {
            Ok(vec![ValuePair::new("n", n - 1)])
        } else {
            Ok(Vec::new())
        }
    })
}

// =============================================================================
// FIXED POINT
// =============================================================================

#[tokio::test]
async fn test_runs_to_fixed_point() {
    let runner = Runner::new(Arc::new(countdown()), settings(100, 0, None));

    let outcome = runner.run(counter_state()).await.unwrap();

    assert_eq!(outcome.result.unwrap(), Completion::FixedPoint);
    assert!(outcome.state.is_terminal());
    assert_eq!(outcome.state.scratch_space(), &[ValuePair::new("n", 0)][..]);
    // one merge and one dispatch for each of n = 3, 2, 1, 0
    assert_eq!(outcome.ticks, 8);
    assert_eq!(outcome.failures, 0);
}

#[tokio::test]
async fn test_terminal_state_needs_no_ticks() {
    let runner = Runner::new(Arc::new(countdown()), settings(1, 0, None));
    let state = State::blank().with_scratch_space(vec![ValuePair::new("x", 1)]);

    let outcome = runner.run(state.clone()).await.unwrap();
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.state, state);
}

#[tokio::test]
async fn test_invalid_initial_state_is_rejected() {
    let runner = Runner::new(Arc::new(countdown()), RunnerSettings::default());
    let state = State::blank().with_scratch_space(vec![
        ValuePair::new("dup", 1),
        ValuePair::new("dup", 2),
    ]);

    assert!(matches!(
        runner.run(state).await,
        Err(GrowerError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_tick_limit_keeps_last_state() {
    let runner = Runner::new(Arc::new(countdown()), settings(3, 0, None));

    let outcome = runner.run(counter_state()).await.unwrap();

    assert!(matches!(outcome.result, Err(GrowerError::TickLimitExceeded(3))));
    assert_eq!(outcome.ticks, 3);
    assert!(!outcome.state.is_terminal());
}

// =============================================================================
// FAILURE & RETRY
// =============================================================================

#[tokio::test]
async fn test_flaky_handler_is_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let flaky = FnExecutor(
        move |handler: &Handler, _: &[ValuePair]| -> Result<Vec<ValuePair>, ExecutionFailure> {
            if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ExecutionFailure::handler(&handler.name, "not yet"))
            } else {
                Ok(vec![ValuePair::new("done", true)])
            }
        },
    );
    let runner = Runner::new(Arc::new(flaky), settings(10, 2, None));
    let state = State::blank().with_to_handle(vec![Handler::new("flaky")]);

    let outcome = runner.run(state).await.unwrap();

    assert_eq!(outcome.result.unwrap(), Completion::FixedPoint);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.failures, 2);
    assert_eq!(outcome.state.scratch_space(), &[ValuePair::new("done", true)][..]);
}

#[tokio::test]
async fn test_retries_exhausted_keeps_pre_tick_state() {
    let runner = Runner::new(Arc::new(builtin_registry(None)), settings(10, 1, None));
    let state = State::blank().with_to_handle(vec![Handler::new("teleport")]);

    let outcome = runner.run(state.clone()).await.unwrap();

    match outcome.result {
        Err(GrowerError::RetriesExhausted { attempts, source }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(source, ExecutionFailure::UnknownHandler(_)));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(outcome.state, state);
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let slow = FnExecutor(
        |_: &Handler, _: &[ValuePair]| -> Result<Vec<ValuePair>, ExecutionFailure> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(Vec::new())
        },
    );
    let runner = Runner::new(
        Arc::new(slow),
        settings(10, 0, Some(Duration::from_millis(20))),
    );
    let state = State::blank().with_to_handle(vec![Handler::new("slow")]);

    let outcome = runner.run(state.clone()).await.unwrap();

    match outcome.result {
        Err(GrowerError::RetriesExhausted { source, .. }) => assert!(matches!(
            source,
            ExecutionFailure::Timeout { timeout_ms: 20, .. }
        )),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(outcome.state, state);
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_cancel_before_first_tick() {
    let runner = Runner::new(Arc::new(countdown()), settings(100, 0, None));
    let state = counter_state();

    let outcome = runner.run_until(state.clone(), async {}).await.unwrap();

    assert_eq!(outcome.result.unwrap(), Completion::Cancelled);
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.state, state);
}

#[test]
fn test_shutdown_does_not_wait_for_abandoned_handler() {
    let slow = FnExecutor(
        |_: &Handler, _: &[ValuePair]| -> Result<Vec<ValuePair>, ExecutionFailure> {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(Vec::new())
        },
    );
    let runner = Runner::new(Arc::new(slow), settings(10, 0, None));
    let state = State::blank().with_to_handle(vec![Handler::new("slow")]);

    let started = Instant::now();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let outcome = {
        let _guard = runtime.enter();
        runtime
            .block_on(runner.run_until(state.clone(), tokio::time::sleep(Duration::from_millis(20))))
            .unwrap()
    };
    shutdown_runtime(runtime, Duration::from_millis(50));

    assert_eq!(outcome.result.unwrap(), Completion::Cancelled);
    assert_eq!(outcome.state, state);
    assert!(started.elapsed() < Duration::from_millis(1000));
}
