//! Process runner for the generated launcher.
//!
//! The launcher reports through its exit status and stdout, so a non-zero
//! exit is never an error here: it is returned as [`RunOutput`] for the
//! bundler to interpret. Only failing to start the process, failing to wait
//! on it, or running out of time are errors.

use std::{
    fmt::Debug,
    io::{self, BufRead, BufReader},
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};
use thiserror::Error;
use wait_timeout::ChildExt;

/// How many times a freshly written launcher is retried when the kernel
/// still reports it as open for writing.
const BUSY_RETRIES: u32 = 20;
const BUSY_BACKOFF: Duration = Duration::from_millis(10);

/// Exit status and captured stdout of one launcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout, one entry per line, without line terminators.
    pub lines: Vec<String>,
}

impl RunOutput {
    /// Creates an output record.
    pub fn new(exit_code: Option<i32>, lines: Vec<String>) -> Self {
        Self { exit_code, lines }
    }

    /// First captured line, if any.
    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }
}

/// Errors from running a process.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be started.
    #[error("spawn failed: {0}")]
    Spawn(#[source] io::Error),

    /// Waiting on the process failed.
    #[error("wait failed: {0}")]
    Wait(#[source] io::Error),

    /// The process exceeded its time limit and was killed.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Runs an executable with no arguments and captures its stdout.
pub trait ProcessRunner: Debug + Send + Sync {
    /// Runs `executable`, blocking until it exits or `timeout` expires.
    fn run(&self, executable: &Path, timeout: Option<Duration>) -> Result<RunOutput, RunnerError>;
}

/// [`ProcessRunner`] backed by `std::process`.
///
/// stdin is closed, stderr is inherited so PHP warnings reach the terminal,
/// and stdout is drained on a helper thread while the caller waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(executable: &Path) -> io::Result<Child> {
        let mut attempt = 0;
        loop {
            match Command::new(executable)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
            {
                Ok(child) => return Ok(child),
                Err(e) if is_text_file_busy(&e) && attempt < BUSY_RETRIES => {
                    attempt += 1;
                    log::debug!(
                        "{} is busy, retrying spawn ({attempt}/{BUSY_RETRIES})",
                        executable.display()
                    );
                    thread::sleep(BUSY_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, executable: &Path, timeout: Option<Duration>) -> Result<RunOutput, RunnerError> {
        log::info!("Running {}", executable.display());
        let mut child = Self::spawn(executable).map_err(RunnerError::Spawn)?;

        let reader = child.stdout.take().map(|stdout| {
            thread::spawn(move || {
                BufReader::new(stdout)
                    .split(b'\n')
                    .map_while(Result::ok)
                    .map(|raw| decode_line(&raw))
                    .collect::<Vec<_>>()
            })
        });

        let status = match timeout {
            Some(limit) => match child.wait_timeout(limit) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    log::warn!(
                        "{} still running after {limit:?}, killing it",
                        executable.display()
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    // The reader thread is detached: a grandchild may still
                    // hold the pipe open.
                    return Err(RunnerError::TimedOut(limit));
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunnerError::Wait(e));
                }
            },
            None => child.wait().map_err(RunnerError::Wait)?,
        };

        let lines = reader
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default();

        log::debug!(
            "{} exited with {:?} after printing {} line(s)",
            executable.display(),
            status.code(),
            lines.len()
        );

        Ok(RunOutput::new(status.code(), lines))
    }
}

/// Decodes one raw stdout line. Bytes that are not UTF-8 become U+FFFD
/// so a diagnostic in a legacy encoding still reaches the caller.
fn decode_line(raw: &[u8]) -> String {
    let line = String::from_utf8_lossy(raw);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

#[cfg(unix)]
fn is_text_file_busy(error: &io::Error) -> bool {
    error.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

#[cfg(not(unix))]
fn is_text_file_busy(_error: &io::Error) -> bool {
    false
}
