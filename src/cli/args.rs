//! Command line argument parsing and validation.
//!
//! `compile` is the default command: its options are accepted with or
//! without the subcommand name.

use crate::config::CompileSettings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Compile the Doctrine core and drivers into a single file
#[derive(Parser, Debug)]
#[command(
    name = "doctrine_compiler",
    version,
    about = "Compile the Doctrine core and drivers into a single file",
    long_about = "Compile the Doctrine core classes, plus the classes of the selected database
drivers, into one PHP file that loads faster than the library itself.

Usage:
  doctrine_compiler
  doctrine_compiler compile --drivers mysql,sqlite
  doctrine_compiler compile --no-drivers --path cache/Doctrine.php
  doctrine_compiler status --application backend
  doctrine_compiler cache-clear --env prod",
    args_conflicts_with_subcommands = true
)]
pub struct Args {
    /// Options for the default `compile` command
    #[command(flatten)]
    pub compile: CompileArgs,

    /// Command to run
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Application name
    #[arg(long, default_value = "frontend")]
    pub application: String,

    /// Environment name
    #[arg(long = "env", value_name = "ENV", default_value = "dev")]
    pub environment: String,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Options of the `compile` command
#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    /// Project options
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Directory containing Doctrine.php
    #[arg(long, value_name = "DIR")]
    pub doctrine_path: Option<PathBuf>,

    /// Where the compiled file is written
    #[arg(long, visible_alias = "path", value_name = "FILE")]
    pub compiled_path: Option<PathBuf>,

    /// Where the temporary compiler script is written
    #[arg(long, value_name = "FILE")]
    pub compiler_path: Option<PathBuf>,

    /// Comma separated drivers to compile in
    #[arg(long, value_delimiter = ',', value_name = "DRIVERS", conflicts_with = "no_drivers")]
    pub drivers: Option<Vec<String>>,

    /// Compile the core classes only
    #[arg(long)]
    pub no_drivers: bool,

    /// Seconds to wait for the compiler, 0 waits forever
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl CompileArgs {
    /// Path and timeout options as the top configuration layer
    pub fn overrides(&self) -> CompileSettings {
        CompileSettings {
            compiled_path: self.compiled_path.clone(),
            compiler_path: self.compiler_path.clone(),
            doctrine_path: self.doctrine_path.clone(),
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compile Doctrine into a single file (default)
    Compile(CompileArgs),

    /// Show resolved paths and which Doctrine entry point is in use
    Status(ProjectArgs),

    /// Remove the project cache, then recompile when auto_compile is on
    CacheClear(ProjectArgs),
}

impl Command {
    /// Command name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Compile(_) => "compile",
            Command::Status(_) => "status",
            Command::CacheClear(_) => "cache-clear",
        }
    }

    /// Project options of this command
    pub fn project(&self) -> &ProjectArgs {
        match self {
            Command::Compile(args) => &args.project,
            Command::Status(project) | Command::CacheClear(project) => project,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, `compile` when none was named
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Compile(self.compile))
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let project = match &self.command {
            Some(command) => command.project(),
            None => &self.compile.project,
        };
        if project.application.trim().is_empty() {
            return Err("--application must not be empty".to_string());
        }
        if project.environment.trim().is_empty() {
            return Err("--env must not be empty".to_string());
        }

        let compile = match &self.command {
            Some(Command::Compile(args)) => Some(args),
            Some(_) => None,
            None => Some(&self.compile),
        };
        if let Some(drivers) = compile.and_then(|args| args.drivers.as_ref())
            && drivers.iter().all(|d| d.trim().is_empty())
        {
            return Err(
                "--drivers needs at least one driver name; use --no-drivers for the core only"
                    .to_string(),
            );
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print a task log line
    pub fn task(&self, section: &str, message: &str) {
        let _ = self.output.task(section, message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&ProjectArgs> for RuntimeConfig {
    fn from(project: &ProjectArgs) -> Self {
        Self::new(project.quiet)
    }
}
