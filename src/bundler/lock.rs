//! Advisory lock on a launcher path.
//!
//! Two compiles sharing a launcher path would overwrite and delete each
//! other's script. The lock lives next to the launcher (`<launcher>.lock`, the
//! full launcher name plus a suffix, so no two launchers share one) and is
//! held for the whole compile; a second compile fails fast with
//! [`CompileError::ScratchBusy`] instead of waiting.

use crate::bundler::error::{CompileError, ErrorExt, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

/// Held lock on a launcher path. Released when dropped.
#[derive(Debug)]
pub struct ScratchLock {
    lock_file_path: PathBuf,
    #[cfg(unix)]
    _handle: Flock<File>,
    #[cfg(not(unix))]
    _handle: File,
}

impl ScratchLock {
    /// Path of the lock file guarding `scratch_path`.
    pub fn lock_path(scratch_path: &Path) -> PathBuf {
        let mut name = scratch_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire the lock for `scratch_path` without blocking.
    ///
    /// The launcher's parent directory must already exist.
    #[cfg(unix)]
    pub fn acquire(scratch_path: &Path) -> Result<Self> {
        let lock_file_path = Self::lock_path(scratch_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .fs_context("opening launcher lock", &lock_file_path)?;

        let mut handle = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(handle) => handle,
            Err((_, errno)) if errno == nix::errno::Errno::EWOULDBLOCK => {
                return Err(CompileError::ScratchBusy {
                    path: scratch_path.to_path_buf(),
                });
            }
            Err((_, errno)) => {
                return Err(CompileError::Setup {
                    context: "locking launcher",
                    path: lock_file_path,
                    error: errno.into(),
                });
            }
        };

        write_owner(&mut handle, &lock_file_path)?;

        Ok(Self {
            lock_file_path,
            _handle: handle,
        })
    }

    /// Acquire the lock for `scratch_path` without blocking.
    ///
    /// Without `flock`, the lock is the exclusive creation of the lock file.
    #[cfg(not(unix))]
    pub fn acquire(scratch_path: &Path) -> Result<Self> {
        let lock_file_path = Self::lock_path(scratch_path);

        let mut handle = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_file_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CompileError::ScratchBusy {
                    path: scratch_path.to_path_buf(),
                });
            }
            Err(e) => return Err(e).fs_context("creating launcher lock", &lock_file_path),
        };

        write_owner(&mut handle, &lock_file_path)?;

        Ok(Self {
            lock_file_path,
            _handle: handle,
        })
    }

    /// Path of the held lock file.
    pub fn path(&self) -> &Path {
        &self.lock_file_path
    }
}

fn write_owner(file: &mut File, lock_file_path: &Path) -> Result<()> {
    let acquired_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let lock_data = serde_json::json!({
        "pid": std::process::id(),
        "acquired_at": acquired_at,
    });

    file.set_len(0).fs_context("truncating launcher lock", lock_file_path)?;
    file.write_all(lock_data.to_string().as_bytes())
        .fs_context("writing launcher lock", lock_file_path)
}

impl Drop for ScratchLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_file_path);
    }
}
