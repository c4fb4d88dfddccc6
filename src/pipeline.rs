//! Post-command steps.
//!
//! A [`CommandPipeline`] holds steps that run, in registration order, after
//! a named command completes successfully. The built-in step recompiles
//! Doctrine after `cache-clear` so the application never runs without its
//! compiled bundle for longer than the clear itself.

use crate::cli::RuntimeConfig;
use crate::cli::commands::compile::{DriverSelection, run_compile};
use crate::config::ProjectConfig;
use crate::error::Result;
use std::fmt::Debug;

/// Work attached to the end of a command.
pub trait PostStep: Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether this step runs after `command`
    fn applies_to(&self, command: &str) -> bool;

    /// Run the step
    fn run(&self, config: &ProjectConfig, runtime: &RuntimeConfig) -> Result<()>;
}

/// Ordered list of post-steps.
#[derive(Debug, Default)]
pub struct CommandPipeline {
    steps: Vec<Box<dyn PostStep>>,
}

impl CommandPipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with the built-in steps enabled by `config`
    pub fn for_project(config: &ProjectConfig) -> Self {
        let mut pipeline = Self::new();
        if config.auto_compile {
            pipeline.register(RecompileOnCacheClear);
        }
        pipeline
    }

    /// Append a step
    pub fn register<S: PostStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Names of the registered steps, in order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs every step that applies to `command`, stopping at the first error.
    ///
    /// Returns how many steps ran.
    pub fn run_post_steps(
        &self,
        command: &str,
        config: &ProjectConfig,
        runtime: &RuntimeConfig,
    ) -> Result<usize> {
        let mut ran = 0;
        for step in self.steps.iter().filter(|step| step.applies_to(command)) {
            log::debug!("running post-step '{}' after '{}'", step.name(), command);
            step.run(config, runtime)?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pipeline is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Recompiles with the default driver selection after `cache-clear`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecompileOnCacheClear;

impl PostStep for RecompileOnCacheClear {
    fn name(&self) -> &str {
        "recompile"
    }

    fn applies_to(&self, command: &str) -> bool {
        command == "cache-clear"
    }

    fn run(&self, config: &ProjectConfig, runtime: &RuntimeConfig) -> Result<()> {
        run_compile(config, &DriverSelection::Default, runtime).map(|_| ())
    }
}
