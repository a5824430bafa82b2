//! CLI layer for QA-RS.
//!
//! Provides the command-line interface using clap, with commands for
//! answering questions, inspecting tokenization and model inputs, and
//! probing the model server.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
