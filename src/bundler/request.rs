//! Bundle request and its builder.
//!
//! A [`BundleRequest`] names everything one compile needs: where the library
//! lives, where the bundle goes, where the launcher is written, and which
//! driver modules are folded in. It cannot be changed once built; a compile
//! with different modules needs a new request.

use crate::bundler::error::{CompileError, Context, Result};
use std::path::{Path, PathBuf};

/// Immutable description of a single compile.
///
/// # Examples
///
/// ```
/// use doctrine_compiler::bundler::RequestBuilder;
///
/// let request = RequestBuilder::new()
///     .source_root("lib/vendor/doctrine")
///     .output_path("cache/doctrine/Doctrine.compiled.php")
///     .scratch_script_path("cache/doctrine/Doctrine.compiler.php")
///     .modules(["mysql", "sqlite"])
///     .build()?;
///
/// assert_eq!(request.modules(), ["mysql", "sqlite"]);
/// # Ok::<(), doctrine_compiler::bundler::CompileError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    source_root: PathBuf,
    output_path: PathBuf,
    scratch_script_path: PathBuf,
    modules: Vec<String>,
}

impl BundleRequest {
    /// Directory containing the library's entry file.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Where the compiled bundle is written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Where the generated launcher is written.
    pub fn scratch_script_path(&self) -> &Path {
        &self.scratch_script_path
    }

    /// Driver modules to fold into the bundle, in order. May be empty.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }
}

/// Builder for [`BundleRequest`].
#[derive(Debug, Default, Clone)]
pub struct RequestBuilder {
    source_root: Option<PathBuf>,
    output_path: Option<PathBuf>,
    scratch_script_path: Option<PathBuf>,
    modules: Vec<String>,
}

impl RequestBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the library directory.
    ///
    /// # Required
    pub fn source_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the bundle path.
    ///
    /// # Required
    pub fn output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the launcher path.
    ///
    /// # Required
    pub fn scratch_script_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.scratch_script_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the driver modules.
    ///
    /// Default: none (core-only bundle)
    pub fn modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the request.
    ///
    /// Module names are trimmed, blank names are dropped and repeats are
    /// removed keeping the first occurrence. `source_root` and `output_path`
    /// are embedded in the launcher source and must be valid UTF-8.
    pub fn build(self) -> Result<BundleRequest> {
        let source_root = self.source_root.context("source_root is required")?;
        let output_path = self.output_path.context("output_path is required")?;
        require_utf8("source_root", &source_root)?;
        require_utf8("output_path", &output_path)?;

        Ok(BundleRequest {
            source_root,
            output_path,
            scratch_script_path: self
                .scratch_script_path
                .context("scratch_script_path is required")?,
            modules: normalize_modules(self.modules),
        })
    }
}

fn require_utf8(field: &str, path: &Path) -> Result<()> {
    match path.to_str() {
        Some(_) => Ok(()),
        None => Err(CompileError::InvalidRequest(format!(
            "{field} is not valid UTF-8: {}",
            path.display()
        ))),
    }
}

fn normalize_modules(modules: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(modules.len());
    for module in modules {
        let module = module.trim();
        if !module.is_empty() && !normalized.iter().any(|m| m == module) {
            normalized.push(module.to_string());
        }
    }
    normalized
}
