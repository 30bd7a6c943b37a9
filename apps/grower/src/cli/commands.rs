//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::GrowerConfig;
use crate::handlers::builtin_registry;
use crate::runner::{Completion, Runner, RunnerSettings};
use crate::state_io::{StateFormat, read_state, write_state};
use grower_core::{GrowerError, State, StateMetrics, TransitionEngine, state_fingerprint};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write a blank State.
pub fn cmd_init(output: &Path, force: bool, json_mode: bool) -> Result<(), GrowerError> {
    if output.exists() && !force {
        return Err(GrowerError::IoError(format!(
            "'{}' already exists. Use --force to overwrite.",
            output.display()
        )));
    }

    write_state(&State::blank(), output, StateFormat::Json)?;

    if json_mode {
        print_json(&serde_json::json!({
            "initialized": output.to_string_lossy(),
            "format": "json",
        }));
    } else {
        println!("Initialized blank state at {:?}", output);
    }
    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show State counts and the next rule.
pub fn cmd_inspect(path: &Path, json_mode: bool, verbose: bool) -> Result<(), GrowerError> {
    let (state, format) = read_state(path)?;
    let metrics = StateMetrics::from_state(&state);

    if json_mode {
        let mut output = serde_json::json!({
            "state": path.to_string_lossy(),
            "format": format.name(),
            "metrics": metrics,
        });
        if verbose {
            output["scratch_space"] = serde_json::json!(state.scratch_space());
        }
        print_json(&output);
        return Ok(());
    }

    println!("Grower State");
    println!("============");
    println!("File:     {:?} ({:?})", path, format);
    println!();
    println!("Value changes: {}", metrics.value_change_count);
    println!("Queued:        {}", metrics.queued_count);
    println!("Scratch keys:  {}", metrics.scratch_entry_count);
    println!(
        "Handlers:      {} ({} unconditional)",
        metrics.handler_count, metrics.unconditional_handler_count
    );
    println!("Terminal:      {}", metrics.terminal);
    match &metrics.next_handler {
        Some(name) if !metrics.terminal => println!("Next rule:     {} ({})", metrics.next_rule, name),
        _ => println!("Next rule:     {}", metrics.next_rule),
    }

    if verbose && !state.scratch_space().is_empty() {
        println!();
        println!("Scratch space:");
        for pair in state.scratch_space() {
            println!("  {} = {}", pair.key, pair.value);
        }
    }

    Ok(())
}

// =============================================================================
// STEP COMMAND
// =============================================================================

/// Apply exactly one tick with the built-in handlers.
pub fn cmd_step(
    config: &GrowerConfig,
    path: &Path,
    output: Option<&Path>,
    json_mode: bool,
) -> Result<(), GrowerError> {
    let (state, format) = read_state(path)?;
    let rule = TransitionEngine::classify(&state);
    let registry = builtin_registry(config.handlers.seed);

    let next = TransitionEngine::step(&state, &registry)?;
    write_state(&next, output.unwrap_or(path), format)?;

    tracing::info!(rule = %rule, "applied one tick");

    if json_mode {
        print_json(&serde_json::json!({
            "rule": rule,
            "terminal": next.is_terminal(),
            "metrics": StateMetrics::from_state(&next),
        }));
    } else {
        println!("Applied rule: {}", rule);
        println!("Terminal:     {}", next.is_terminal());
    }

    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Run to the fixed point with the built-in handlers.
///
/// Ctrl-C stops the run. The last committed State is written even when the
/// run stops early.
pub async fn cmd_run(
    config: &GrowerConfig,
    path: &Path,
    output: Option<&Path>,
    json_mode: bool,
) -> Result<(), GrowerError> {
    cmd_run_until(config, path, output, json_mode, interrupted()).await
}

/// [`cmd_run`] with an arbitrary stop signal in place of Ctrl-C.
pub async fn cmd_run_until<F>(
    config: &GrowerConfig,
    path: &Path,
    output: Option<&Path>,
    json_mode: bool,
    cancel: F,
) -> Result<(), GrowerError>
where
    F: Future<Output = ()>,
{
    let (state, format) = read_state(path)?;
    let runner = Runner::new(
        Arc::new(builtin_registry(config.handlers.seed)),
        RunnerSettings::from(config),
    );

    let outcome = runner.run_until(state, cancel).await?;
    let destination = output.unwrap_or(path);
    write_state(&outcome.state, destination, format)?;

    if json_mode {
        print_json(&serde_json::json!({
            "completed": matches!(outcome.result, Ok(Completion::FixedPoint)),
            "cancelled": matches!(outcome.result, Ok(Completion::Cancelled)),
            "error": outcome.result.as_ref().err().map(ToString::to_string),
            "ticks": outcome.ticks,
            "failures": outcome.failures,
            "output": destination.to_string_lossy(),
        }));
    } else {
        match &outcome.result {
            Ok(Completion::FixedPoint) => println!("Reached fixed point."),
            Ok(Completion::Cancelled) => println!("Interrupted; partial state saved."),
            Err(_) => println!("Run stopped; last state saved."),
        }
        println!("Ticks:    {}", outcome.ticks);
        println!("Failures: {}", outcome.failures);
        println!("Output:   {:?}", destination);
    }

    outcome.result.map(|_| ())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, stopping after the current tick");
}

// =============================================================================
// HANDLERS COMMAND
// =============================================================================

/// List built-in handlers.
pub fn cmd_handlers(json_mode: bool) -> Result<(), GrowerError> {
    let registry = builtin_registry(None);
    let names: Vec<&str> = registry.names().map(|name| name.as_str()).collect();

    if json_mode {
        print_json(&serde_json::json!({
            "count": registry.len(),
            "handlers": names,
        }));
        return Ok(());
    }

    println!("Built-in handlers ({}):", registry.len());
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Write a State as a binary snapshot.
pub fn cmd_export(path: &Path, output: &Path, json_mode: bool) -> Result<(), GrowerError> {
    convert(path, output, StateFormat::Snapshot, json_mode)
}

/// Write a State as JSON.
pub fn cmd_import(input: &Path, output: &Path, json_mode: bool) -> Result<(), GrowerError> {
    convert(input, output, StateFormat::Json, json_mode)
}

fn convert(
    input: &Path,
    output: &Path,
    target: StateFormat,
    json_mode: bool,
) -> Result<(), GrowerError> {
    let (state, source) = read_state(input)?;
    write_state(&state, output, target)?;

    if json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "output": output.to_string_lossy(),
            "from": source.name(),
            "to": target.name(),
        }));
    } else {
        println!("Wrote {} state to {:?}", target.name(), output);
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the BLAKE3 fingerprint of a State.
pub fn cmd_hash(path: &Path, json_mode: bool) -> Result<(), GrowerError> {
    let (state, _) = read_state(path)?;
    let hash = state_fingerprint(&state)?;

    if json_mode {
        print_json(&serde_json::json!({
            "hash": hash,
            "algorithm": "blake3",
        }));
    } else {
        println!("{}", hash);
    }
    Ok(())
}
