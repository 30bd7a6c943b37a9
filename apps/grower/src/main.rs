//! # Grower
//!
//! The command-line driver for the Grower reducer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/grower (THE BINARY)              │
//! │                                                      │
//! │  ┌──────────┐   ┌──────────────┐   ┌─────────────┐  │
//! │  │   CLI    │   │ Async Runner │   │  Built-in   │  │
//! │  │  (clap)  │   │   (tokio)    │   │  handlers   │  │
//! │  └────┬─────┘   └──────┬───────┘   └──────┬──────┘  │
//! │       └────────────────┼──────────────────┘         │
//! │                        ▼                            │
//! │                ┌───────────────┐                    │
//! │                │  grower-core  │                    │
//! │                │  (THE LOGIC)  │                    │
//! │                └───────────────┘                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! grower init -o state.json
//! grower inspect -s state.json
//! grower run -s state.json --max-ticks 500
//! grower hash -s state.json
//! ```

use clap::Parser;
use grower::{cli, runner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GROWER_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GROWER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grower=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(cli::execute(cli));

    // A handler abandoned by Ctrl-C or a timeout must not hold the process open.
    runner::shutdown_runtime(runtime, runner::SHUTDOWN_GRACE);

    if let Err(e) = result {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Grower startup banner.
fn print_banner() {
    println!(
        r#"
   ___  ___  ___  _    _  ___  ___
  / __|| _ \/ _ \| |  | || __|| _ \
 | (_ ||   / (_) | |/\| || _| |   /
  \___||_|_\\___/|__/\__||___||_|_\

  Deterministic reducer v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
