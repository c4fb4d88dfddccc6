//! Status command implementation.
//!
//! Displays the resolved configuration and which Doctrine entry point the
//! application loads.

use crate::cli::RuntimeConfig;
use crate::config::ProjectConfig;
use crate::error::Result;

/// Execute status command
pub(super) fn execute_status(config: &ProjectConfig, runtime: &RuntimeConfig) -> Result<()> {
    let output = runtime.output();
    let field = |label: &str, value: String| output.field(label, &value);

    output.section("Doctrine compile status")?;
    field("Project", config.root.display().to_string())?;
    field(
        "Application",
        format!("{} ({})", config.application, config.environment),
    )?;
    field("Doctrine library", config.doctrine_path.display().to_string())?;
    field(
        "Compiled file",
        format!(
            "{} ({})",
            config.compiled_path.display(),
            if config.compiled_path.is_file() {
                "present"
            } else {
                "missing"
            }
        ),
    )?;
    field("Compiler script", config.compiler_path.display().to_string())?;

    let php = match which::which(&config.php_binary) {
        Ok(path) => format!("{} ({})", config.php_binary, path.display()),
        Err(_) => format!("{} (not found)", config.php_binary),
    };
    field("PHP", php)?;

    let drivers = match &config.drivers {
        Some(drivers) if drivers.is_empty() => "none".to_string(),
        Some(drivers) => drivers.join(", "),
        None => format!("from {}", config.databases_file().display()),
    };
    field("Drivers", drivers)?;

    let timeout = match config.timeout {
        Some(timeout) => format!("{}s", timeout.as_secs()),
        None => "none".to_string(),
    };
    field("Timeout", timeout)?;
    field(
        "Auto compile",
        if config.auto_compile { "on" } else { "off" }.to_string(),
    )?;

    let entry = config.entry_point();
    field(
        "Entry point",
        format!(
            "{} ({})",
            entry.path().display(),
            if entry.is_compiled() { "compiled" } else { "vendor" }
        ),
    )?;

    Ok(())
}
