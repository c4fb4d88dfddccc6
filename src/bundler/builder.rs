//! Compile orchestration.
//!
//! This module provides the [`Bundler`], which drives one compile through
//! its states:
//!
//! ```text
//! Idle -> ScriptWritten -> Executed -> Succeeded | Failed
//! ```
//!
//! 1. Creates the launcher directory and locks the launcher path
//! 2. Renders the launcher, writes it and makes it executable
//! 3. Creates the output directory
//! 4. Runs the launcher and captures its stdout
//! 5. Maps the exit status to an [`Artifact`] or a [`CompileError`]
//! 6. Deletes the launcher after a successful compile and checks it is gone
//!
//! Nothing is retried and nothing is printed; the caller decides both.
//!
//! # Example
//!
//! ```no_run
//! use doctrine_compiler::bundler::{Bundler, BundlerSettings, RequestBuilder};
//!
//! # fn example() -> doctrine_compiler::bundler::Result<()> {
//! let request = RequestBuilder::new()
//!     .source_root("lib/vendor/doctrine")
//!     .output_path("cache/doctrine/Doctrine.compiled.php")
//!     .scratch_script_path("cache/doctrine/Doctrine.compiler.php")
//!     .modules(["mysql"])
//!     .build()?;
//!
//! let artifact = Bundler::new(BundlerSettings::default()).compile(&request)?;
//! println!("Compiled classes were saved to {}", artifact);
//! # Ok(())
//! # }
//! ```

use crate::bundler::{
    error::{CompileError, ErrorExt, Result, UNKNOWN_REASON},
    fs::{Filesystem, LocalFilesystem},
    lock::ScratchLock,
    request::BundleRequest,
    runner::{ProcessRunner, RunOutput, RunnerError, SystemRunner},
    script::{EXIT_FAILURE, EXIT_SUCCESS, ScriptGenerator},
};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// Launcher time limit used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// The compiled bundle reported by the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Wraps the path the launcher reported.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the compiled bundle.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Progress of a single compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    /// Nothing has been written yet.
    Idle,
    /// The launcher is on disk and executable.
    ScriptWritten,
    /// The launcher ran to completion.
    Executed,
    /// An artifact was produced and the launcher removed.
    Succeeded,
    /// The compile ended with an error.
    Failed,
}

/// Knobs for a [`Bundler`].
#[derive(Debug, Clone)]
pub struct BundlerSettings {
    /// Launcher time limit. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Renders the launcher.
    pub generator: ScriptGenerator,
    /// Hold an advisory lock on the launcher path during the compile.
    pub lock_scratch: bool,
}

impl Default for BundlerSettings {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            generator: ScriptGenerator::default(),
            lock_scratch: true,
        }
    }
}

/// Runs compiles through a generated launcher process.
#[derive(Debug)]
pub struct Bundler {
    fs: Box<dyn Filesystem>,
    runner: Box<dyn ProcessRunner>,
    settings: BundlerSettings,
}

impl Bundler {
    /// Bundler using the local file system and real child processes.
    pub fn new(settings: BundlerSettings) -> Self {
        Self::with_capabilities(Box::new(LocalFilesystem), Box::new(SystemRunner), settings)
    }

    /// Bundler with injected file system and process runner.
    pub fn with_capabilities(
        fs: Box<dyn Filesystem>,
        runner: Box<dyn ProcessRunner>,
        settings: BundlerSettings,
    ) -> Self {
        Self {
            fs,
            runner,
            settings,
        }
    }

    /// Settings this bundler was built with.
    pub fn settings(&self) -> &BundlerSettings {
        &self.settings
    }

    /// Compiles `request` into a single bundle.
    ///
    /// Returns the artifact path the launcher reported. On any error the
    /// launcher is left where it is, except that a successful compile whose
    /// launcher cannot be removed is reported as [`CompileError::Hygiene`].
    pub fn compile(&self, request: &BundleRequest) -> Result<Artifact> {
        let mut state = BundleState::Idle;
        let result = self.drive(request, &mut state);
        let terminal = if result.is_ok() {
            BundleState::Succeeded
        } else {
            BundleState::Failed
        };
        self.transition(&mut state, terminal);
        result
    }

    fn drive(&self, request: &BundleRequest, state: &mut BundleState) -> Result<Artifact> {
        let scratch = request.scratch_script_path();

        self.ensure_parent(scratch, "creating launcher directory")?;
        let _lock = if self.settings.lock_scratch {
            Some(ScratchLock::acquire(scratch)?)
        } else {
            None
        };

        self.write_launcher(request)?;
        self.transition(state, BundleState::ScriptWritten);

        self.ensure_parent(request.output_path(), "creating output directory")?;

        let output = self.run_launcher(scratch)?;
        self.transition(state, BundleState::Executed);

        self.interpret(scratch, output)
    }

    fn transition(&self, state: &mut BundleState, next: BundleState) {
        log::debug!("compile state {state:?} -> {next:?}");
        *state = next;
    }

    fn ensure_parent(&self, path: &Path, context: &'static str) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs.create_dir_all(parent).fs_context(context, parent)?;
        }
        Ok(())
    }

    fn write_launcher(&self, request: &BundleRequest) -> Result<()> {
        let scratch = request.scratch_script_path();
        let script = self.settings.generator.render(request);

        self.fs
            .write(scratch, &script)
            .fs_context("writing launcher", scratch)?;
        self.fs
            .set_executable(scratch)
            .fs_context("making launcher executable", scratch)?;

        if !self.fs.is_executable(scratch) {
            return Err(CompileError::NotExecutable {
                path: scratch.to_path_buf(),
            });
        }

        log::debug!("wrote launcher {} ({} bytes)", scratch.display(), script.len());
        Ok(())
    }

    fn run_launcher(&self, scratch: &Path) -> Result<RunOutput> {
        self.runner
            .run(scratch, self.settings.timeout)
            .map_err(|error| match error {
                RunnerError::Spawn(error) | RunnerError::Wait(error) => CompileError::Spawn {
                    path: scratch.to_path_buf(),
                    error,
                },
                RunnerError::TimedOut(timeout) => CompileError::TimedOut { timeout },
            })
    }

    fn interpret(&self, scratch: &Path, output: RunOutput) -> Result<Artifact> {
        match output.exit_code {
            Some(EXIT_FAILURE) => {
                let diagnostic = output
                    .first_line()
                    .filter(|line| !line.is_empty())
                    .unwrap_or(UNKNOWN_REASON)
                    .to_string();
                Err(CompileError::CompileFailure { diagnostic })
            }
            Some(EXIT_SUCCESS) => {
                let Some(target) = output.first_line().filter(|line| !line.is_empty()) else {
                    // Success without a path is not something we can hand back.
                    return Err(CompileError::ProtocolViolation {
                        exit_code: output.exit_code,
                        output: output.lines,
                    });
                };
                let artifact = Artifact::new(target);
                self.remove_launcher(scratch)?;
                Ok(artifact)
            }
            exit_code => Err(CompileError::ProtocolViolation {
                exit_code,
                output: output.lines,
            }),
        }
    }

    fn remove_launcher(&self, scratch: &Path) -> Result<()> {
        if let Err(e) = self.fs.remove_file(scratch) {
            log::warn!("failed to remove launcher {}: {}", scratch.display(), e);
        }

        if self.fs.exists(scratch) {
            return Err(CompileError::Hygiene {
                path: scratch.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::error::ErrorClass;
    use crate::bundler::request::RequestBuilder;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Runner returning a canned result and recording what it was asked to run.
    #[derive(Debug, Clone)]
    struct CannedRunner {
        result: Arc<Mutex<Option<std::result::Result<RunOutput, RunnerError>>>>,
        calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    }

    impl CannedRunner {
        fn exits(code: Option<i32>, lines: &[&str]) -> Self {
            Self::returning(Ok(RunOutput::new(
                code,
                lines.iter().map(|l| l.to_string()).collect(),
            )))
        }

        fn returning(result: std::result::Result<RunOutput, RunnerError>) -> Self {
            Self {
                result: Arc::new(Mutex::new(Some(result))),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, String)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl ProcessRunner for CannedRunner {
        fn run(
            &self,
            executable: &Path,
            _timeout: Option<Duration>,
        ) -> std::result::Result<RunOutput, RunnerError> {
            let script = std::fs::read_to_string(executable).unwrap_or_default();
            self.calls
                .lock()
                .expect("calls lock")
                .push((executable.to_path_buf(), script));
            self.result
                .lock()
                .expect("result lock")
                .take()
                .expect("runner called once")
        }
    }

    /// Local file system that can be told to fail specific operations.
    #[derive(Debug, Default)]
    struct FaultyFs {
        ignore_removes: bool,
        refuse_chmod: bool,
        fail_mkdir_under: Option<PathBuf>,
    }

    impl Filesystem for FaultyFs {
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            if let Some(prefix) = &self.fail_mkdir_under
                && path.starts_with(prefix)
            {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            LocalFilesystem.create_dir_all(path)
        }

        fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
            LocalFilesystem.write(path, contents)
        }

        fn set_executable(&self, path: &Path) -> io::Result<()> {
            if self.refuse_chmod {
                return Ok(());
            }
            LocalFilesystem.set_executable(path)
        }

        fn is_executable(&self, path: &Path) -> bool {
            !self.refuse_chmod && LocalFilesystem.is_executable(path)
        }

        fn exists(&self, path: &Path) -> bool {
            LocalFilesystem.exists(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            if self.ignore_removes {
                return Ok(());
            }
            LocalFilesystem.remove_file(path)
        }
    }

    fn request_in(dir: &Path) -> BundleRequest {
        RequestBuilder::new()
            .source_root(dir.join("vendor/doctrine"))
            .output_path(dir.join("cache/doctrine/Doctrine.compiled.php"))
            .scratch_script_path(dir.join("scratch/Doctrine.compiler.php"))
            .modules(["mysql", "sqlite"])
            .build()
            .expect("request")
    }

    fn bundler(fs: FaultyFs, runner: &CannedRunner) -> Bundler {
        Bundler::with_capabilities(
            Box::new(fs),
            Box::new(runner.clone()),
            BundlerSettings::default(),
        )
    }

    #[test]
    fn test_success_removes_launcher() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);

        let artifact = bundler(FaultyFs::default(), &runner)
            .compile(&request)
            .expect("compile succeeds");

        assert_eq!(artifact.path(), Path::new("/tmp/out.php"));
        assert!(!request.scratch_script_path().exists());
        assert!(!ScratchLock::lock_path(request.scratch_script_path()).exists());
        assert!(request.output_path().parent().expect("parent").is_dir());
    }

    #[test]
    fn test_launcher_content_reaches_runner() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);

        bundler(FaultyFs::default(), &runner)
            .compile(&request)
            .expect("compile succeeds");

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, request.scratch_script_path());
        assert!(calls[0].1.contains("array('mysql', 'sqlite')"));
    }

    #[test]
    fn test_failure_keeps_launcher() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(0), &["boom: missing class Foo"]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request)
            .expect_err("compile fails");

        match err {
            CompileError::CompileFailure { diagnostic } => {
                assert_eq!(diagnostic, "boom: missing class Foo");
            }
            other => panic!("expected CompileFailure, got {other:?}"),
        }
        assert!(request.scratch_script_path().exists());
    }

    #[test]
    fn test_failure_without_output_uses_sentinel() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::exits(Some(0), &[]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request_in(temp.path()))
            .expect_err("compile fails");

        assert!(matches!(
            err,
            CompileError::CompileFailure { ref diagnostic } if diagnostic == UNKNOWN_REASON
        ));
    }

    #[test]
    fn test_undeletable_launcher_is_hygiene_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);
        let fs = FaultyFs {
            ignore_removes: true,
            ..Default::default()
        };

        let err = bundler(fs, &runner).compile(&request).expect_err("hygiene");

        assert_eq!(err.class(), ErrorClass::Hygiene);
        assert!(request.scratch_script_path().exists());
    }

    #[test]
    fn test_unknown_exit_code_is_protocol_violation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::exits(Some(2), &["PHP Fatal error"]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request_in(temp.path()))
            .expect_err("protocol violation");

        match err {
            CompileError::ProtocolViolation { exit_code, output } => {
                assert_eq!(exit_code, Some(2));
                assert_eq!(output, vec!["PHP Fatal error".to_string()]);
            }
            other => panic!("expected ProtocolViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_signal_is_protocol_violation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::exits(None, &[]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request_in(temp.path()))
            .expect_err("protocol violation");

        assert!(matches!(err, CompileError::ProtocolViolation { exit_code: None, .. }));
    }

    #[test]
    fn test_success_without_path_is_protocol_violation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(1), &[]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request)
            .expect_err("protocol violation");

        assert_eq!(err.class(), ErrorClass::Protocol);
    }

    #[test]
    fn test_chmod_refused_never_spawns() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);
        let fs = FaultyFs {
            refuse_chmod: true,
            ..Default::default()
        };

        let err = bundler(fs, &runner)
            .compile(&request_in(temp.path()))
            .expect_err("not executable");

        assert!(matches!(err, CompileError::NotExecutable { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_scratch_dir_failure_aborts_before_writing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);
        let fs = FaultyFs {
            fail_mkdir_under: Some(temp.path().join("scratch")),
            ..Default::default()
        };

        let err = bundler(fs, &runner).compile(&request).expect_err("setup");

        assert!(matches!(
            err,
            CompileError::Setup { context: "creating launcher directory", .. }
        ));
        assert!(runner.calls().is_empty());
        assert!(!request.scratch_script_path().exists());
    }

    #[test]
    fn test_output_dir_failure_never_spawns() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);
        let fs = FaultyFs {
            fail_mkdir_under: Some(temp.path().join("cache")),
            ..Default::default()
        };

        let err = bundler(fs, &runner)
            .compile(&request_in(temp.path()))
            .expect_err("setup");

        assert!(matches!(
            err,
            CompileError::Setup { context: "creating output directory", .. }
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_timeout_maps_to_timed_out() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = CannedRunner::returning(Err(RunnerError::TimedOut(Duration::from_secs(5))));

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request_in(temp.path()))
            .expect_err("timeout");

        assert_eq!(err.class(), ErrorClass::Timeout);
    }

    #[test]
    fn test_busy_launcher_path_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = request_in(temp.path());
        std::fs::create_dir_all(temp.path().join("scratch")).expect("mkdir");
        let _held = ScratchLock::acquire(request.scratch_script_path()).expect("lock");
        let runner = CannedRunner::exits(Some(1), &["/tmp/out.php"]);

        let err = bundler(FaultyFs::default(), &runner)
            .compile(&request)
            .expect_err("busy");

        assert!(matches!(err, CompileError::ScratchBusy { .. }));
        assert!(runner.calls().is_empty());
    }
}
