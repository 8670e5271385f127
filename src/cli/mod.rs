//! CLI layer for profile-agent.
//!
//! Provides the command-line interface using clap, with commands for
//! one-shot questions, interactive chat, and setup.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
