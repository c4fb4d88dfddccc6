//! Single-file compilation of the Doctrine core through an isolated launcher.
//!
//! The bundler never loads Doctrine itself. It writes a small PHP launcher,
//! runs it as a child process and reads the result from the launcher's exit
//! status and stdout, so a fatal error inside Doctrine cannot take the
//! calling process down with it.
//!
//! # Protocol
//!
//! | Exit status | First stdout line | Result |
//! |-------------|-------------------|--------|
//! | 1 | bundle path | [`Artifact`], launcher deleted |
//! | 0 | diagnostic | [`CompileError::CompileFailure`] |
//! | other / signal | anything | [`CompileError::ProtocolViolation`] |
//!
//! # Integration
//!
//! ```no_run
//! use doctrine_compiler::bundler::{Bundler, BundlerSettings, RequestBuilder};
//!
//! let request = RequestBuilder::new()
//!     .source_root("lib/vendor/doctrine")
//!     .output_path("cache/doctrine/Doctrine.compiled.php")
//!     .scratch_script_path("cache/doctrine/Doctrine.compiler.php")
//!     .build()?;
//!
//! let artifact = Bundler::new(BundlerSettings::default()).compile(&request)?;
//! # Ok::<(), doctrine_compiler::bundler::CompileError>(())
//! ```

#![warn(missing_docs)]

mod builder;
mod error;
mod fs;
mod lock;
mod request;
mod runner;
mod script;

// Public re-exports
pub use builder::{Artifact, BundleState, Bundler, BundlerSettings, DEFAULT_TIMEOUT};
pub use error::{CompileError, ErrorClass, Result, UNKNOWN_REASON};
pub use fs::{Filesystem, LocalFilesystem};
pub use lock::ScratchLock;
pub use request::{BundleRequest, RequestBuilder};
pub use runner::{ProcessRunner, RunOutput, RunnerError, SystemRunner};
pub use script::{
    DEFAULT_INTERPRETER, ENTRY_FILE, EXIT_FAILURE, EXIT_SUCCESS, ScriptGenerator, php_literal,
};
