//! Cache clear command implementation.
//!
//! Removes the project cache directory. Recompiling afterwards is a post-step
//! registered on the command pipeline.

use crate::cli::RuntimeConfig;
use crate::config::ProjectConfig;
use crate::error::{CliError, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Execute cache-clear command
pub(super) fn execute_cache_clear(config: &ProjectConfig, runtime: &RuntimeConfig) -> Result<()> {
    let cache_dir = &config.cache_dir;

    if absolute(&config.root).starts_with(absolute(cache_dir)) {
        return Err(CliError::ExecutionFailed {
            command: "cache-clear".to_string(),
            reason: format!(
                "cache directory {} contains the project itself",
                cache_dir.display()
            ),
        }
        .into());
    }

    if !cache_dir.exists() {
        runtime.task("cache", &format!("Nothing to clear in {}", cache_dir.display()));
        return Ok(());
    }

    std::fs::remove_dir_all(cache_dir)
        .with_context(|| format!("removing cache directory {}", cache_dir.display()))?;
    log::info!("removed {}", cache_dir.display());
    runtime.task("cache", &format!("Cleared {}", cache_dir.display()));

    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
