//! Compile command implementation.
//!
//! Resolves which drivers go into the bundle, then hands a request to the
//! bundler and reports where the compiled file was written.

use crate::bundler::{Artifact, Bundler};
use crate::cli::{CompileArgs, RuntimeConfig};
use crate::config::ProjectConfig;
use crate::discovery;
use crate::error::Result;
use std::path::Path;

/// Where the driver list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSelection {
    /// Core classes only.
    None,
    /// Drivers named on the command line.
    Explicit(Vec<String>),
    /// Configured drivers, else those found in `databases.yml`.
    Default,
}

impl DriverSelection {
    /// Selection made by `--drivers` / `--no-drivers`.
    pub fn from_args(args: &CompileArgs) -> Self {
        if args.no_drivers {
            DriverSelection::None
        } else if let Some(drivers) = &args.drivers {
            DriverSelection::Explicit(drivers.clone())
        } else {
            DriverSelection::Default
        }
    }
}

/// Driver names to compile in, in order, without blanks or repeats.
pub fn resolve_drivers(selection: &DriverSelection, config: &ProjectConfig) -> Result<Vec<String>> {
    let drivers = match selection {
        DriverSelection::None => Vec::new(),
        DriverSelection::Explicit(drivers) => drivers.clone(),
        DriverSelection::Default => match &config.drivers {
            Some(drivers) => drivers.clone(),
            None => discovery::drivers_from_file(&config.databases_file())?,
        },
    };

    let mut resolved: Vec<String> = Vec::with_capacity(drivers.len());
    for driver in drivers {
        let driver = driver.trim();
        if !driver.is_empty() && !resolved.iter().any(|d| d == driver) {
            resolved.push(driver.to_string());
        }
    }
    Ok(resolved)
}

/// Compiles Doctrine for `config`, logging progress the way tasks do.
pub fn run_compile(
    config: &ProjectConfig,
    selection: &DriverSelection,
    runtime: &RuntimeConfig,
) -> Result<Artifact> {
    let drivers = resolve_drivers(selection, config)?;

    if drivers.is_empty() {
        runtime.task("task", "Compile Doctrine core classes");
    } else {
        runtime.task(
            "task",
            &format!(
                "Compile Doctrine core classes and classes for these drivers: [{}]",
                drivers.join(", ")
            ),
        );
    }

    if !php_available(&config.php_binary) {
        runtime.warning_println(&format!(
            "PHP binary '{}' was not found; the compile will likely fail",
            config.php_binary
        ));
    }

    let request = config.bundle_request(drivers)?;
    runtime.task("task", "Start compiling...");

    let artifact = Bundler::new(config.bundler_settings()).compile(&request)?;
    log::info!("compiled bundle written to {}", artifact.path().display());
    runtime.task(
        "done",
        &format!(
            "Compiled classes were saved to \"{}\"",
            artifact.path().display()
        ),
    );

    Ok(artifact)
}

fn php_available(php_binary: &str) -> bool {
    if php_binary.contains('/') || php_binary.contains('\\') {
        Path::new(php_binary).is_file()
    } else {
        which::which(php_binary).is_ok()
    }
}

/// Execute compile command
pub(super) fn execute_compile(
    args: &CompileArgs,
    config: &ProjectConfig,
    runtime: &RuntimeConfig,
) -> Result<()> {
    run_compile(config, &DriverSelection::from_args(args), runtime).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileSettings;
    use crate::error::Error;
    use crate::discovery::DiscoveryError;

    fn project(root: &Path, drivers: Option<Vec<&str>>) -> ProjectConfig {
        let settings = CompileSettings {
            drivers: drivers.map(|d| d.into_iter().map(String::from).collect()),
            ..Default::default()
        };
        ProjectConfig::from_settings(root, "frontend", "dev", settings)
    }

    #[test]
    fn test_no_drivers_wins() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = project(temp.path(), Some(vec!["mysql"]));
        assert!(resolve_drivers(&DriverSelection::None, &config)
            .expect("resolve")
            .is_empty());
    }

    #[test]
    fn test_explicit_drivers_beat_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = project(temp.path(), Some(vec!["mysql"]));
        let selection = DriverSelection::Explicit(vec![" pgsql".into(), "sqlite".into(), "pgsql".into()]);
        assert_eq!(
            resolve_drivers(&selection, &config).expect("resolve"),
            vec!["pgsql", "sqlite"]
        );
    }

    #[test]
    fn test_default_uses_configured_drivers() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = project(temp.path(), Some(vec!["mssql"]));
        assert_eq!(
            resolve_drivers(&DriverSelection::Default, &config).expect("resolve"),
            vec!["mssql"]
        );
    }

    #[test]
    fn test_default_discovers_from_databases_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = project(temp.path(), None);
        std::fs::create_dir_all(temp.path().join("config")).expect("mkdir");
        std::fs::write(
            config.databases_file(),
            "all:\n  doctrine:\n    param:\n      dsn: 'mysql:host=localhost'\n",
        )
        .expect("write");

        assert_eq!(
            resolve_drivers(&DriverSelection::Default, &config).expect("resolve"),
            vec!["mysql"]
        );
    }

    #[test]
    fn test_default_without_databases_file_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = project(temp.path(), None);
        let result = resolve_drivers(&DriverSelection::Default, &config);
        assert!(matches!(
            result,
            Err(Error::Discovery(DiscoveryError::NotFound { .. }))
        ));
    }
}
