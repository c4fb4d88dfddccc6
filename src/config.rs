//! Project configuration.
//!
//! Settings are read from `config/doctrine_compile.toml` under the project
//! root and, when present, from `apps/<application>/config/doctrine_compile.toml`,
//! which overrides the project file. Inside each file the `[all]` table is
//! the base and a table named after the environment (`[dev]`, `[prod]`, ...)
//! overrides it:
//!
//! ```toml
//! [all]
//! drivers = ["mysql"]
//! timeout_secs = 120
//!
//! [prod]
//! compiled_path = "/var/cache/app/Doctrine.compiled.php"
//! ```
//!
//! Environment variables win over both files:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `DOCTRINE_COMPILE_TIMEOUT` | `timeout_secs` (`0` disables the limit) |
//! | `DOCTRINE_COMPILE_PHP` | `php_binary` |
//! | `DOCTRINE_COMPILE_AUTO` | `auto_compile` |
//!
//! Relative paths are resolved against the project root.

use crate::bundler::{
    BundleRequest, BundlerSettings, DEFAULT_TIMEOUT, ENTRY_FILE, RequestBuilder, ScriptGenerator,
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Configuration file name, looked up in `config/` directories.
pub const CONFIG_FILE: &str = "doctrine_compile.toml";

/// Database configuration scanned for drivers.
pub const DATABASES_FILE: &str = "databases.yml";

/// Largest accepted launcher time limit (one hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML or has wrong value types.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },
}

/// One layer of settings. Unset keys fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Recompile after `cache-clear`
    pub auto_compile: Option<bool>,
    /// Where the bundle is written
    pub compiled_path: Option<PathBuf>,
    /// Where the launcher is written
    pub compiler_path: Option<PathBuf>,
    /// Directory containing `Doctrine.php`
    pub doctrine_path: Option<PathBuf>,
    /// Drivers compiled in when none are given on the command line
    pub drivers: Option<Vec<String>>,
    /// Launcher time limit in seconds
    pub timeout_secs: Option<u64>,
    /// PHP interpreter, a command name or a path
    pub php_binary: Option<String>,
    /// Project cache directory
    pub cache_dir: Option<PathBuf>,
    /// Symfony library directory
    pub symfony_lib_dir: Option<PathBuf>,
}

impl CompileSettings {
    /// Layers `other` on top of `self`; keys set in `other` win.
    pub fn overlay(self, other: CompileSettings) -> CompileSettings {
        CompileSettings {
            auto_compile: other.auto_compile.or(self.auto_compile),
            compiled_path: other.compiled_path.or(self.compiled_path),
            compiler_path: other.compiler_path.or(self.compiler_path),
            doctrine_path: other.doctrine_path.or(self.doctrine_path),
            drivers: other.drivers.or(self.drivers),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            php_binary: other.php_binary.or(self.php_binary),
            cache_dir: other.cache_dir.or(self.cache_dir),
            symfony_lib_dir: other.symfony_lib_dir.or(self.symfony_lib_dir),
        }
    }

    /// Settings taken from environment variables, read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning; timeouts are clamped to
    /// [`MAX_TIMEOUT_SECS`].
    pub fn from_env_with<F>(lookup: F) -> CompileSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = lookup("DOCTRINE_COMPILE_TIMEOUT").and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(secs) => Some(secs.min(MAX_TIMEOUT_SECS)),
                Err(_) => {
                    log::warn!("ignoring DOCTRINE_COMPILE_TIMEOUT={raw:?}: not a number of seconds");
                    None
                }
            }
        });

        let auto_compile = lookup("DOCTRINE_COMPILE_AUTO").and_then(|raw| {
            let parsed = parse_flag(&raw);
            if parsed.is_none() {
                log::warn!("ignoring DOCTRINE_COMPILE_AUTO={raw:?}: expected true or false");
            }
            parsed
        });

        CompileSettings {
            auto_compile,
            timeout_secs,
            php_binary: lookup("DOCTRINE_COMPILE_PHP").filter(|v| !v.trim().is_empty()),
            ..Default::default()
        }
    }

    /// Settings from the process environment.
    pub fn from_env() -> CompileSettings {
        Self::from_env_with(|name| std::env::var(name).ok())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shape of a configuration file: `[all]` plus one table per environment.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    all: CompileSettings,
    #[serde(flatten)]
    environments: BTreeMap<String, CompileSettings>,
}

impl ConfigFile {
    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path).map(Some)
    }

    fn for_environment(mut self, environment: &str) -> CompileSettings {
        let env_settings = self.environments.remove(environment).unwrap_or_default();
        self.all.overlay(env_settings)
    }
}

/// Which file the host application should load for Doctrine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// The compiled bundle exists.
    Compiled(PathBuf),
    /// Fall back to the library's own entry file.
    Vendor(PathBuf),
}

impl EntryPoint {
    /// Path to load.
    pub fn path(&self) -> &Path {
        match self {
            EntryPoint::Compiled(path) | EntryPoint::Vendor(path) => path,
        }
    }

    /// Whether the compiled bundle is used.
    pub fn is_compiled(&self) -> bool {
        matches!(self, EntryPoint::Compiled(_))
    }
}

/// Fully resolved configuration for one project, application and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root
    pub root: PathBuf,
    /// Application name
    pub application: String,
    /// Environment name
    pub environment: String,
    /// Recompile after `cache-clear`
    pub auto_compile: bool,
    /// Project cache directory
    pub cache_dir: PathBuf,
    /// Where the bundle is written
    pub compiled_path: PathBuf,
    /// Where the launcher is written
    pub compiler_path: PathBuf,
    /// Directory containing `Doctrine.php`
    pub doctrine_path: PathBuf,
    /// Symfony library directory
    pub symfony_lib_dir: PathBuf,
    /// Configured drivers, `None` means discover them
    pub drivers: Option<Vec<String>>,
    /// Launcher time limit, `None` waits forever
    pub timeout: Option<Duration>,
    /// PHP interpreter
    pub php_binary: String,
}

impl ProjectConfig {
    /// Loads configuration files and environment variables for `root`.
    pub fn load(
        root: impl AsRef<Path>,
        application: &str,
        environment: &str,
    ) -> Result<Self, ConfigError> {
        Self::load_with_overrides(root, application, environment, CompileSettings::default())
    }

    /// Like [`ProjectConfig::load`], with `overrides` (usually command line
    /// options) taking precedence over every other source.
    pub fn load_with_overrides(
        root: impl AsRef<Path>,
        application: &str,
        environment: &str,
        overrides: CompileSettings,
    ) -> Result<Self, ConfigError> {
        let root = std::path::absolute(root.as_ref()).map_err(|source| ConfigError::Read {
            path: root.as_ref().to_path_buf(),
            source,
        })?;
        let root = root.as_path();
        let mut settings = CompileSettings::default();

        for path in Self::config_files(root, application) {
            if let Some(file) = ConfigFile::load(&path)? {
                log::debug!("loaded configuration from {}", path.display());
                settings = settings.overlay(file.for_environment(environment));
            }
        }

        let settings = settings
            .overlay(CompileSettings::from_env())
            .overlay(overrides);
        Ok(Self::from_settings(root, application, environment, settings))
    }

    /// Configuration files for `application`, lowest precedence first.
    pub fn config_files(root: &Path, application: &str) -> Vec<PathBuf> {
        vec![
            root.join("config").join(CONFIG_FILE),
            root.join("apps")
                .join(application)
                .join("config")
                .join(CONFIG_FILE),
        ]
    }

    /// Resolves defaults for everything `settings` leaves unset.
    pub fn from_settings(
        root: &Path,
        application: &str,
        environment: &str,
        settings: CompileSettings,
    ) -> Self {
        let resolve = |path: PathBuf| if path.is_absolute() { path } else { root.join(path) };

        let cache_dir = settings
            .cache_dir
            .map(resolve)
            .unwrap_or_else(|| root.join("cache"));
        let compiled_path = settings
            .compiled_path
            .map(resolve)
            .unwrap_or_else(|| cache_dir.join("doctrine").join("Doctrine.compiled.php"));
        let compiler_path = settings.compiler_path.map(resolve).unwrap_or_else(|| {
            compiled_path
                .parent()
                .unwrap_or(root)
                .join("Doctrine.compiler.php")
        });
        let symfony_lib_dir = settings
            .symfony_lib_dir
            .map(resolve)
            .unwrap_or_else(|| root.join("lib/vendor/symfony/lib"));
        let doctrine_path = settings.doctrine_path.map(resolve).unwrap_or_else(|| {
            symfony_lib_dir.join("plugins/sfDoctrinePlugin/lib/vendor/doctrine")
        });
        let timeout = match settings.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs.min(MAX_TIMEOUT_SECS))),
            None => Some(DEFAULT_TIMEOUT),
        };

        Self {
            root: root.to_path_buf(),
            application: application.to_string(),
            environment: environment.to_string(),
            auto_compile: settings.auto_compile.unwrap_or(true),
            cache_dir,
            compiled_path,
            compiler_path,
            doctrine_path,
            symfony_lib_dir,
            drivers: settings.drivers,
            timeout,
            php_binary: settings.php_binary.unwrap_or_else(|| "php".to_string()),
        }
    }

    /// Location of `databases.yml`.
    pub fn databases_file(&self) -> PathBuf {
        self.root.join("config").join(DATABASES_FILE)
    }

    /// The compiled bundle if it exists, otherwise the library entry file.
    pub fn entry_point(&self) -> EntryPoint {
        if self.compiled_path.is_file() {
            EntryPoint::Compiled(self.compiled_path.clone())
        } else {
            EntryPoint::Vendor(self.doctrine_path.join(ENTRY_FILE))
        }
    }

    /// Compile request for this project with the given drivers.
    pub fn bundle_request<I, S>(&self, modules: I) -> crate::bundler::Result<BundleRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RequestBuilder::new()
            .source_root(&self.doctrine_path)
            .output_path(&self.compiled_path)
            .scratch_script_path(&self.compiler_path)
            .modules(modules)
            .build()
    }

    /// Bundler settings derived from this configuration.
    pub fn bundler_settings(&self) -> BundlerSettings {
        BundlerSettings {
            timeout: self.timeout,
            generator: ScriptGenerator::for_php_binary(&self.php_binary),
            lock_scratch: true,
        }
    }
}
