//! Integration tests for the command line binary.
//!
//! PHP is not assumed to be installed: compiles that need a working
//! interpreter use a shell script that speaks the launcher protocol.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cli(project: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_doctrine_compiler"));
    cmd.current_dir(project)
        .env_remove("DOCTRINE_COMPILE_TIMEOUT")
        .env_remove("DOCTRINE_COMPILE_PHP")
        .env_remove("DOCTRINE_COMPILE_AUTO")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

#[test]
fn test_status_shows_vendor_entry_point_before_compiling() {
    let temp = TempDir::new().expect("tempdir");

    cli(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Doctrine.php (vendor)"))
        .stdout(predicate::str::contains("Doctrine.compiled.php (missing)"));
}

#[test]
fn test_status_shows_compiled_entry_point() {
    let temp = TempDir::new().expect("tempdir");
    write(
        &temp.path().join("cache/doctrine/Doctrine.compiled.php"),
        "<?php\n",
    );

    cli(temp.path())
        .args(["status", "--project-dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Doctrine.compiled.php (compiled)"));
}

#[test]
fn test_drivers_and_no_drivers_conflict() {
    let temp = TempDir::new().expect("tempdir");

    cli(temp.path())
        .args(["compile", "--drivers", "mysql", "--no-drivers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_databases_file_fails_with_suggestions() {
    let temp = TempDir::new().expect("tempdir");

    cli(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("databases.yml"))
        .stdout(predicate::str::contains("--no-drivers"));
}

#[test]
fn test_interpreter_breaking_protocol_fails() {
    let temp = TempDir::new().expect("tempdir");

    // A POSIX shell chokes on the PHP source and exits with status 2.
    cli(temp.path())
        .env("DOCTRINE_COMPILE_PHP", "/bin/sh")
        .args(["compile", "--no-drivers"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Compile Doctrine core classes"))
        .stderr(predicate::str::contains("unknown exit status"));

    assert!(
        temp.path()
            .join("cache/doctrine/Doctrine.compiler.php")
            .exists()
    );
}

#[test]
fn test_cache_clear_without_auto_compile() {
    let temp = TempDir::new().expect("tempdir");
    write(&temp.path().join("cache/prod/config.php"), "<?php\n");

    cli(temp.path())
        .env("DOCTRINE_COMPILE_AUTO", "0")
        .arg("cache-clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled classes").not());

    assert!(!temp.path().join("cache").exists());
}

#[cfg(target_os = "linux")]
mod with_fake_php {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Shell script that answers like a successful launcher run.
    fn fake_php(dir: &Path) -> PathBuf {
        let path = dir.join("bin/fake-php");
        write(
            &path,
            "#!/bin/sh\nsed -n \"s/.*Doctrine::compile('\\([^']*\\)'.*/\\1/p\" \"$1\"\nexit 1\n",
        );
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[test]
    fn test_compile_with_explicit_drivers() {
        let temp = TempDir::new().expect("tempdir");
        let php = fake_php(temp.path());

        cli(temp.path())
            .env("DOCTRINE_COMPILE_PHP", &php)
            .args(["--drivers", "mysql,sqlite", "--path", "build/Doctrine.php"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                ">> task      Compile Doctrine core classes and classes for these drivers: [mysql, sqlite]",
            ))
            .stdout(predicate::str::contains(">> task      Start compiling..."))
            .stdout(predicate::str::contains(format!(
                ">> done      Compiled classes were saved to \"{}\"",
                temp.path().join("build/Doctrine.php").display()
            )));

        assert!(!temp.path().join("build/Doctrine.compiler.php").exists());
    }

    #[test]
    fn test_compile_discovers_drivers() {
        let temp = TempDir::new().expect("tempdir");
        let php = fake_php(temp.path());
        write(
            &temp.path().join("config/databases.yml"),
            "all:\n  doctrine:\n    class: sfDoctrineDatabase\n    param:\n      dsn: 'pgsql:host=localhost;dbname=app'\n",
        );

        cli(temp.path())
            .env("DOCTRINE_COMPILE_PHP", &php)
            .arg("compile")
            .assert()
            .success()
            .stdout(predicate::str::contains("these drivers: [pgsql]"));
    }

    #[test]
    fn test_cache_clear_recompiles() {
        let temp = TempDir::new().expect("tempdir");
        let php = fake_php(temp.path());
        write(
            &temp.path().join("config/doctrine_compile.toml"),
            "[all]\ndrivers = [\"mysql\"]\n",
        );
        write(&temp.path().join("cache/dev/stale.php"), "<?php\n");

        cli(temp.path())
            .env("DOCTRINE_COMPILE_PHP", &php)
            .arg("cache-clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("these drivers: [mysql]"))
            .stdout(predicate::str::contains("Compiled classes were saved to"));

        assert!(!temp.path().join("cache/dev/stale.php").exists());
    }
}
