//! Driver discovery from `config/databases.yml`.
//!
//! The Doctrine driver for a connection is the DSN scheme, the part before
//! the first `:`. Every environment and every connection in the file is
//! scanned, and each driver is reported once in the order it first appears.
//!
//! ```yaml
//! all:
//!   doctrine:
//!     class: sfDoctrineDatabase
//!     param:
//!       dsn: mysql:host=localhost;dbname=app
//! test:
//!   doctrine:
//!     param:
//!       dsn: "sqlite::memory:"
//! ```

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading the database configuration.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The configuration file does not exist.
    #[error("File \"{}\" not found", .path.display())]
    NotFound {
        /// Expected location
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid YAML.
    #[error("Failed to parse database configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Collects driver names from the database configuration file at `path`.
pub fn drivers_from_file(path: &Path) -> Result<Vec<String>, DiscoveryError> {
    if !path.exists() {
        return Err(DiscoveryError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let drivers = drivers_from_yaml(&contents)?;
    log::debug!("discovered drivers {:?} in {}", drivers, path.display());
    Ok(drivers)
}

/// Collects driver names from database configuration text.
pub fn drivers_from_yaml(yaml: &str) -> Result<Vec<String>, DiscoveryError> {
    let document: Value = serde_yaml::from_str(yaml)?;
    Ok(drivers_from_value(&document))
}

fn drivers_from_value(document: &Value) -> Vec<String> {
    let mut drivers: Vec<String> = Vec::new();

    let Some(environments) = document.as_mapping() else {
        return drivers;
    };

    for connections in environments.values() {
        let Some(connections) = connections.as_mapping() else {
            continue;
        };

        for connection in connections.values() {
            let Some(dsn) = connection
                .get("param")
                .and_then(|param| param.get("dsn"))
                .and_then(Value::as_str)
            else {
                continue;
            };

            if let Some(driver) = driver_from_dsn(dsn)
                && !drivers.iter().any(|d| d == driver)
            {
                drivers.push(driver.to_string());
            }
        }
    }

    drivers
}

/// Driver name of a DSN: everything before the first `:`.
pub fn driver_from_dsn(dsn: &str) -> Option<&str> {
    let driver = dsn.split(':').next().unwrap_or_default().trim();
    (!driver.is_empty()).then_some(driver)
}
