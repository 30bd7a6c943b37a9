//! # grower
//!
//! THE BINARY side of Grower: configuration, built-in handlers, State files,
//! the async runner and the CLI. The reducer itself lives in `grower-core`.

pub mod cli;
pub mod config;
pub mod handlers;
pub mod runner;
pub mod state_io;
