//! CLI module for toolbox - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for listing, running,
//! installing and scaffolding tools.

pub mod commands;

pub use commands::Cli;
