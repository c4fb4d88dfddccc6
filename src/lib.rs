//! # Doctrine Compiler
//!
//! Compiles the Doctrine ORM core, plus the classes of selected database
//! drivers, into a single PHP file for faster loading.
//!
//! Compilation runs in an isolated PHP launcher process, so a fatal error in
//! the library cannot bring down the caller. The launcher reports through its
//! exit status and first line of output, and is deleted after a successful
//! compile.
//!
//! ## Features
//!
//! - **Process Isolation**: the library is only ever loaded by a child process
//! - **Driver Discovery**: drivers are read from `config/databases.yml` when none are given
//! - **Layered Configuration**: project, application, environment and command line
//! - **Post-Command Steps**: recompile automatically after clearing the cache
//!
//! ## Usage
//!
//! ```bash
//! doctrine_compiler                              # compile with discovered drivers
//! doctrine_compiler compile --drivers mysql      # compile the core plus mysql
//! doctrine_compiler compile --no-drivers         # core classes only
//! doctrine_compiler status                       # show paths and entry point
//! doctrine_compiler cache-clear --env prod       # clear, then recompile
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;

// Re-export main types for public API
pub use bundler::{Artifact, BundleRequest, Bundler, BundlerSettings, CompileError, RequestBuilder};
pub use cli::Args;
pub use config::{EntryPoint, ProjectConfig};
pub use error::{CliError, Error, Result};
pub use pipeline::{CommandPipeline, PostStep};
