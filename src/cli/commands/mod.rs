//! Command execution functions.
//!
//! Every command resolves the project configuration first, runs, and then
//! hands over to the post-step pipeline.

// Submodules
mod cache_clear;
pub mod compile;
mod status;

use crate::cli::{Args, Command, OutputManager, RuntimeConfig};
use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::pipeline::CommandPipeline;

use cache_clear::execute_cache_clear;
use compile::execute_compile;
use status::execute_status;

/// Execute the command selected by parsed arguments
pub fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = OutputManager::new(false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let command = args.into_command();
    let runtime = RuntimeConfig::from(command.project());

    let result = load_config(&command).and_then(|config| {
        match &command {
            Command::Compile(compile) => execute_compile(compile, &config, &runtime)?,
            Command::Status(_) => execute_status(&config, &runtime)?,
            Command::CacheClear(_) => execute_cache_clear(&config, &runtime)?,
        }
        CommandPipeline::for_project(&config).run_post_steps(command.name(), &config, &runtime)
    });

    match result {
        Ok(_) => Ok(0),
        Err(e) => {
            report_failure(&runtime, command.name(), &e);
            Ok(1)
        }
    }
}

fn load_config(command: &Command) -> Result<ProjectConfig> {
    let project = command.project();
    let overrides = match command {
        Command::Compile(compile) => compile.overrides(),
        _ => Default::default(),
    };

    let config = ProjectConfig::load_with_overrides(
        &project.project_dir,
        &project.application,
        &project.environment,
        overrides,
    )?;
    log::debug!("resolved configuration: {config:?}");
    Ok(config)
}

fn report_failure(runtime: &RuntimeConfig, command: &str, error: &Error) {
    runtime.error_println(&format!("Command '{}' failed: {}", command, error));

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() && !runtime.is_quiet() {
        runtime.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            runtime.indent(&format!("• {}", suggestion));
        }
    }
}
