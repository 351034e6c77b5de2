//! CLI Adapter
//!
//! Command-line interface for the stablewatch tracker.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, OnceCmd, RunCmd};
