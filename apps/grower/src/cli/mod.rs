//! # Grower CLI Module
//!
//! This module implements the CLI interface for Grower.
//!
//! ## Available Commands
//!
//! - `init` - Write a blank State file
//! - `inspect` - Show State counts and the next rule
//! - `step` - Apply exactly one tick
//! - `run` - Run to the fixed point
//! - `handlers` - List built-in handlers
//! - `export` - Convert a State to the binary snapshot format
//! - `import` - Convert a snapshot back to JSON
//! - `hash` - Compute the BLAKE3 fingerprint of a State

mod commands;

use crate::config::GrowerConfig;
use clap::{Parser, Subcommand};
use grower_core::GrowerError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Grower - a deterministic single-step reducer
///
/// Evolves a State one tick at a time until nothing changes.
#[derive(Parser, Debug)]
#[command(name = "grower")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "grower.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a blank State file
    Init {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show State counts, terminal flag and next rule
    Inspect {
        /// State file (JSON or snapshot)
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Apply exactly one tick
    Step {
        /// State file (JSON or snapshot)
        #[arg(short, long)]
        state: PathBuf,

        /// Where to write the next State (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run to the fixed point
    Run {
        /// State file (JSON or snapshot)
        #[arg(short, long)]
        state: PathBuf,

        /// Where to write the final State (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum successful ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Maximum consecutive failures of one tick
        #[arg(long)]
        max_retries: Option<u32>,

        /// Per-tick timeout in milliseconds (0 disables it)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List built-in handlers
    Handlers,

    /// Convert a State to the binary snapshot format
    Export {
        /// State file (JSON or snapshot)
        #[arg(short, long)]
        state: PathBuf,

        /// Output snapshot path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a snapshot to a JSON State file
    Import {
        /// Input file (snapshot or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compute BLAKE3 fingerprint of a State
    Hash {
        /// State file (JSON or snapshot)
        #[arg(short, long)]
        state: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GrowerError> {
    let json_mode = cli.json_mode;
    let config = GrowerConfig::load(&cli.config)?.with_env()?;

    match cli.command {
        Commands::Init { output, force } => cmd_init(&output, force, json_mode),
        Commands::Inspect { state } => cmd_inspect(&state, json_mode, cli.verbose),
        Commands::Step { state, output } => {
            cmd_step(&config, &state, output.as_deref(), json_mode)
        }
        Commands::Run {
            state,
            output,
            max_ticks,
            max_retries,
            timeout_ms,
        } => {
            let config = apply_run_flags(config, max_ticks, max_retries, timeout_ms);
            cmd_run(&config, &state, output.as_deref(), json_mode).await
        }
        Commands::Handlers => cmd_handlers(json_mode),
        Commands::Export { state, output } => cmd_export(&state, &output, json_mode),
        Commands::Import { input, output } => cmd_import(&input, &output, json_mode),
        Commands::Hash { state } => cmd_hash(&state, json_mode),
    }
}

/// CLI flags take precedence over the file and environment.
fn apply_run_flags(
    mut config: GrowerConfig,
    max_ticks: Option<u64>,
    max_retries: Option<u32>,
    timeout_ms: Option<u64>,
) -> GrowerConfig {
    if let Some(v) = max_ticks {
        config.run.max_ticks = v;
    }
    if let Some(v) = max_retries {
        config.run.max_retries = v;
    }
    if let Some(v) = timeout_ms {
        config.run.tick_timeout_ms = v;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let config = apply_run_flags(GrowerConfig::default(), Some(5), None, Some(0));
        assert_eq!(config.run.max_ticks, 5);
        assert_eq!(config.run.max_retries, GrowerConfig::default().run.max_retries);
        assert_eq!(config.tick_timeout(), None);
    }

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "grower", "--quiet", "run", "--state", "s.json", "--max-ticks", "9",
        ])
        .expect("parse");
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Run { max_ticks: Some(9), output: None, .. }
        ));
    }
}
