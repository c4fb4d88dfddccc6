//! File system capability used by the bundler.
//!
//! The bundler only ever touches the disk through [`Filesystem`], so tests can
//! observe or sabotage individual operations (a delete that silently leaves
//! the file behind, a directory that cannot be created) without needing a
//! hostile real file system.

use std::{
    fmt::Debug,
    fs,
    io,
    path::Path,
};

/// Mode given to the generated launcher: rwxrwxr-x.
#[cfg(unix)]
pub const LAUNCHER_MODE: u32 = 0o775;

/// File operations the bundler depends on.
pub trait Filesystem: Debug + Send + Sync {
    /// Creates a directory and all of its parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Writes `contents` to `path`, replacing any existing file.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Marks `path` executable.
    fn set_executable(&self, path: &Path) -> io::Result<()>;

    /// Whether the current user may execute `path`.
    fn is_executable(&self, path: &Path) -> bool;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Removes a single file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(LAUNCHER_MODE))
    }

    #[cfg(not(unix))]
    fn set_executable(&self, path: &Path) -> io::Result<()> {
        // No permission bits to flip; the file only has to exist.
        fs::metadata(path).map(|_| ())
    }

    #[cfg(unix)]
    fn is_executable(&self, path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o100 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    fn is_executable(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
