//! Command line interface for doctrine_compiler.
//!
//! Argument parsing, colored output and the `compile`, `status` and
//! `cache-clear` commands.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, CompileArgs, ProjectArgs, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args)
}
