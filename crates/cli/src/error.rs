// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors the CLI reports before any lock is touched

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    ConfigMissing,
    ConfigUnreadable,
    ConfigInvalid,
    NoContenders,
}

/// A setup failure with an optional offending file and a single hint.
///
/// Renders as
///
/// ```text
/// error: invalid config file
///   in: ./kl.toml
///   unknown variant `sideways`
/// hint: print the expected layout with `kl config`
/// ```
#[derive(Debug)]
pub struct KlError {
    pub failure: Failure,
    pub file: Option<PathBuf>,
    pub detail: Option<String>,
    pub hint: &'static str,
    io: Option<io::Error>,
}

impl KlError {
    fn new(failure: Failure, hint: &'static str) -> Self {
        Self {
            failure,
            file: None,
            detail: None,
            hint,
            io: None,
        }
    }

    fn in_file(mut self, path: &Path) -> Self {
        self.file = Some(path.to_path_buf());
        self
    }

    pub fn config_missing(path: &Path) -> Self {
        Self::new(
            Failure::ConfigMissing,
            "check --config, or omit it to use ./kl.toml or built-in defaults",
        )
        .in_file(path)
    }

    pub fn config_unreadable(path: &Path, err: io::Error) -> Self {
        let mut error = Self::new(Failure::ConfigUnreadable, "check file permissions").in_file(path);
        error.io = Some(err);
        error
    }

    pub fn config_invalid(path: &Path, err: &toml::de::Error) -> Self {
        let mut error = Self::new(
            Failure::ConfigInvalid,
            "print the expected layout with `kl config`",
        )
        .in_file(path);
        error.detail = Some(err.message().to_string());
        error
    }

    pub fn no_contenders() -> Self {
        Self::new(Failure::NoContenders, "pass --owners 2 or more to see contention")
    }

    fn summary(&self) -> &'static str {
        match self.failure {
            Failure::ConfigMissing => "config file not found",
            Failure::ConfigUnreadable => "cannot read config file",
            Failure::ConfigInvalid => "invalid config file",
            Failure::NoContenders => "nothing to contend: --owners is 0",
        }
    }
}

impl fmt::Display for KlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.summary())?;
        if let Some(file) = &self.file {
            writeln!(f, "  in: {}", file.display())?;
        }
        if let Some(detail) = &self.detail {
            writeln!(f, "  {}", detail)?;
        }
        write!(f, "hint: {}", self.hint)
    }
}

impl std::error::Error for KlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.io
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn missing_file_names_path_and_flag() {
        let err = KlError::config_missing(Path::new("/tmp/nope.toml"));
        let output = err.to_string();

        assert!(output.starts_with("error: config file not found"));
        assert!(output.contains("  in: /tmp/nope.toml"));
        assert!(output.contains("hint: check --config"));
    }

    #[test]
    fn unreadable_file_keeps_io_cause() {
        let cause = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = KlError::config_unreadable(Path::new("kl.toml"), cause);

        assert_eq!(err.failure, Failure::ConfigUnreadable);
        assert!(err.source().is_some_and(|e| e.to_string() == "denied"));
        assert!(!err.to_string().contains("denied"));
    }

    #[test]
    fn no_contenders_has_no_file_line() {
        let output = KlError::no_contenders().to_string();

        assert!(!output.contains("in:"));
        assert!(output.ends_with("hint: pass --owners 2 or more to see contention"));
    }
}
