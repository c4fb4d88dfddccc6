//! Error types for doctrine_compiler operations.
//!
//! The bundler, discovery and configuration layers each have their own error
//! enum; [`Error`] wraps them for the command line and adds recovery
//! suggestions.

use crate::bundler::CompileError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use thiserror::Error;

/// Result type alias for doctrine_compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Compilation errors
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// Driver discovery errors
    #[error("Driver discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl Error {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Error::Compile(CompileError::ScratchBusy { path }) => vec![
                format!(
                    "Wait for the other compile using {} to finish",
                    path.display()
                ),
                "Give concurrent compiles distinct launchers with --compiler-path".to_string(),
            ],
            Error::Compile(CompileError::TimedOut { .. }) => vec![
                "Raise the limit with --timeout or DOCTRINE_COMPILE_TIMEOUT".to_string(),
                "Use --timeout 0 to wait without a limit".to_string(),
            ],
            Error::Compile(CompileError::Hygiene { path }) => vec![
                format!("Delete {} by hand", path.display()),
                "Check permissions on the launcher directory".to_string(),
            ],
            Error::Compile(CompileError::ProtocolViolation { .. }) => vec![
                "Check that the PHP binary runs: php -v".to_string(),
                "Check that --doctrine-path points at the directory containing Doctrine.php"
                    .to_string(),
            ],
            Error::Compile(CompileError::NotExecutable { .. }) => vec![
                "Use --compiler-path to put the launcher on a filesystem that allows execution"
                    .to_string(),
            ],
            Error::Compile(CompileError::CompileFailure { .. }) => vec![
                "Check that every requested driver exists in this Doctrine version".to_string(),
                "Try compiling the core only with --no-drivers".to_string(),
            ],
            Error::Discovery(DiscoveryError::NotFound { .. }) => vec![
                "Name the drivers explicitly: --drivers mysql,sqlite".to_string(),
                "Compile the core only with --no-drivers".to_string(),
                "Set drivers in config/doctrine_compile.toml".to_string(),
            ],
            Error::Config(ConfigError::Parse { path, .. }) => {
                vec![format!("Fix the syntax of {}", path.display())]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if running the same command again can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Compile(e) => e.is_retryable(),
            Error::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_compile_errors_display_unwrapped() {
        let error = Error::from(CompileError::CompileFailure {
            diagnostic: "Unsupported driver 'foo'".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Doctrine compile error: Unsupported driver 'foo'"
        );
    }

    #[test]
    fn test_suggestions_for_missing_databases_file() {
        let error = Error::from(DiscoveryError::NotFound {
            path: PathBuf::from("config/databases.yml"),
        });
        let suggestions = error.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("--no-drivers")));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_timeout_is_recoverable() {
        let error = Error::from(CompileError::TimedOut {
            timeout: Duration::from_secs(5),
        });
        assert!(error.is_recoverable());
        assert!(error.recovery_suggestions()[0].contains("--timeout"));
    }

    #[test]
    fn test_anyhow_keeps_context_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = Error::from(anyhow::Error::new(inner).context("removing cache"));
        assert_eq!(error.to_string(), "removing cache: denied");
    }
}
