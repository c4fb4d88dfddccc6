//! Launcher script generation.
//!
//! The launcher is a standalone PHP script that loads Doctrine, calls
//! `Doctrine::compile` and reports back through stdout and its exit status:
//!
//! | exit | stdout (first line) | meaning |
//! |------|---------------------|---------|
//! | 1    | bundle path         | compiled |
//! | 0    | exception message   | `Doctrine_Compiler_Exception` |
//!
//! Any other status (a PHP fatal error exits with 255) is outside the
//! contract. Every value embedded in the script is emitted as a PHP
//! single-quoted literal, so a path or driver name cannot end its string.

use crate::bundler::request::BundleRequest;
use std::path::Path;

/// File inside the source root that defines the `Doctrine` class.
pub const ENTRY_FILE: &str = "Doctrine.php";

/// Default interpreter line, resolved through `PATH`.
pub const DEFAULT_INTERPRETER: &str = "/usr/bin/env php";

/// Exit status the launcher uses when compilation succeeded.
pub const EXIT_SUCCESS: i32 = 1;

/// Exit status the launcher uses for a `Doctrine_Compiler_Exception`.
pub const EXIT_FAILURE: i32 = 0;

/// Renders launcher scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptGenerator {
    interpreter: String,
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
        }
    }
}

impl ScriptGenerator {
    /// Generator using `/usr/bin/env php`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with an explicit interpreter line (without the `#!`).
    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Generator for a configured PHP binary.
    ///
    /// A bare command name is looked up through `env`; anything containing a
    /// path separator is used as-is.
    pub fn for_php_binary(php_binary: &str) -> Self {
        if php_binary.contains('/') || php_binary.contains('\\') {
            Self::with_interpreter(php_binary)
        } else {
            Self::with_interpreter(format!("/usr/bin/env {php_binary}"))
        }
    }

    /// Interpreter line written after `#!`.
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Renders the launcher for `request`. Touches nothing on disk.
    pub fn render(&self, request: &BundleRequest) -> String {
        let entry = php_path_literal(&request.source_root().join(ENTRY_FILE));
        let output = php_path_literal(request.output_path());
        let drivers = request
            .modules()
            .iter()
            .map(|module| php_literal(module))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"#!{interpreter}
<?php
require_once({entry});
spl_autoload_register(array('Doctrine', 'autoload'));

try
{{
  $target = Doctrine::compile({output}, array({drivers}));
  echo $target;
  exit({success});
}}
catch (Doctrine_Compiler_Exception $e)
{{
  echo $e->getMessage();
  exit({failure});
}}
"#,
            interpreter = self.interpreter,
            success = EXIT_SUCCESS,
            failure = EXIT_FAILURE,
        )
    }
}

/// Quotes `value` as a PHP single-quoted string literal.
///
/// Inside single quotes PHP only interprets `\\` and `\'`, so escaping those
/// two is enough to keep the value inside its literal.
pub fn php_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}

// Embedded paths are UTF-8, `RequestBuilder::build` rejects the rest.
fn php_path_literal(path: &Path) -> String {
    php_literal(&path.to_string_lossy())
}
