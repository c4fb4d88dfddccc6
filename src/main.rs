//! Doctrine Compiler - single-file compilation of the Doctrine core.
//!
//! This binary compiles Doctrine and its drivers through an isolated PHP
//! launcher and keeps the compiled file in step with cache clears.

use doctrine_compiler::cli;
use doctrine_compiler::cli::OutputManager;
use std::process;

fn main() {
    env_logger::init();

    match cli::run() {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
