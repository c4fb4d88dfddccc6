//! Error types for launcher compilation.
//!
//! Every failure of [`Bundler::compile`](crate::bundler::Bundler::compile) is
//! one of these variants. [`CompileError::class`] groups them into the
//! taxonomy callers act on: setup problems happen before any process runs,
//! compile failures are reported by the launcher itself, protocol violations
//! mean the launcher broke its exit-code contract, and hygiene errors mean
//! the compile worked but the launcher could not be cleaned up.

use std::{
    fmt::Display,
    io,
    path::PathBuf,
    time::Duration,
};
use thiserror::Error as DeriveError;

/// Diagnostic used when a failing launcher printed nothing.
pub const UNKNOWN_REASON: &str = "unknown reason";

/// Errors returned by the bundler.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum CompileError {
    /// The request itself is incomplete.
    #[error("invalid bundle request: {0}")]
    InvalidRequest(String),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Setup {
        /// Operation that failed (e.g. "creating launcher directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// The launcher was written but the owner cannot execute it.
    #[error("could not make the generated launcher \"{}\" executable by the user", .path.display())]
    NotExecutable {
        /// Launcher path
        path: PathBuf,
    },

    /// Another compile holds the lock on this launcher path.
    #[error("launcher path \"{}\" is in use by another compile", .path.display())]
    ScratchBusy {
        /// Launcher path
        path: PathBuf,
    },

    /// The launcher could not be started or waited on.
    #[error("failed to run launcher \"{}\": {error}", .path.display())]
    Spawn {
        /// Launcher path
        path: PathBuf,
        /// The underlying error
        error: io::Error,
    },

    /// The launcher exited with the failure code.
    #[error("Doctrine compile error: {diagnostic}")]
    CompileFailure {
        /// First line the launcher printed
        diagnostic: String,
    },

    /// The launcher exited with a status outside the protocol.
    #[error("the compiler returned an unknown exit status: {}", exit_label(.exit_code))]
    ProtocolViolation {
        /// Raw exit code, `None` when the process was killed by a signal
        exit_code: Option<i32>,
        /// Everything the launcher printed to stdout
        output: Vec<String>,
    },

    /// The launcher did not finish in time and was killed.
    #[error("the compiler did not finish within {timeout:?} and was killed")]
    TimedOut {
        /// Configured limit
        timeout: Duration,
    },

    /// Compilation succeeded but the launcher is still on disk.
    #[error("could not delete the generated compiler file \"{}\"", .path.display())]
    Hygiene {
        /// Launcher path that remains
        path: PathBuf,
    },
}

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing was executed; fix the environment and retry.
    Setup,
    /// The launcher reported a compile failure.
    Compile,
    /// The launcher broke the exit-code contract.
    Protocol,
    /// The launcher hung and was killed.
    Timeout,
    /// The compile worked but left the launcher behind.
    Hygiene,
}

impl CompileError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::InvalidRequest(_)
            | CompileError::Setup { .. }
            | CompileError::NotExecutable { .. }
            | CompileError::ScratchBusy { .. }
            | CompileError::Spawn { .. } => ErrorClass::Setup,
            CompileError::CompileFailure { .. } => ErrorClass::Compile,
            CompileError::ProtocolViolation { .. } => ErrorClass::Protocol,
            CompileError::TimedOut { .. } => ErrorClass::Timeout,
            CompileError::Hygiene { .. } => ErrorClass::Hygiene,
        }
    }

    /// Whether retrying the same request can succeed without changing it.
    ///
    /// An invalid request fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompileError::InvalidRequest(_) => false,
            _ => matches!(self.class(), ErrorClass::Setup | ErrorClass::Timeout),
        }
    }
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("\"{code}\""),
        None => "terminated by signal".to_string(),
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Adds context to a missing value.
pub trait Context<T> {
    /// Turn `None` into [`CompileError::InvalidRequest`].
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display;
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display,
    {
        self.ok_or_else(|| CompileError::InvalidRequest(context.to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "writing launcher", "creating output directory".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| CompileError::Setup {
            context,
            path: path.into(),
            error,
        })
    }
}
