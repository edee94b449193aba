//! Error types for package loading and analysis
//!
//! This module provides structured error types using thiserror. Every stage of
//! the toolchain reports through [`PackageError`] so callers can branch on the
//! kind of failure. The type is `Clone` because a facade records its build
//! failure once and replays it to every later caller.

use crate::types::Position;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single checker finding, positioned in the package's file set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub position: Position,
    pub message: String,
}

impl Diagnostic {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

/// Main error type for locating, building and querying a package
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackageError {
    /// The source locator could not resolve an import path
    #[error("cannot find package \"{import_path}\" from '{}': {reason}", .from.display())]
    ImportNotFound {
        import_path: String,
        from: PathBuf,
        reason: String,
    },

    /// Malformed source, or a source file/directory that could not be read
    #[error("Failed to parse '{}' at {position}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        position: Position,
        reason: String,
    },

    /// The directory parsed, but holds no package with the expected name
    #[error("unable to find package \"{name}\" in the '{}' directory", .dir.display())]
    PackageNotFound { name: String, dir: PathBuf },

    /// Name or type resolution failure reported by the checker
    #[error("type check failed: {diagnostic}")]
    TypeCheck { diagnostic: Diagnostic },

    /// Method set or function lookup on a name absent from the package scope
    #[error("named type '{name}' was not found")]
    NameNotFound { name: String },

    /// Lookup on a name that is unexported or looks like test scaffolding
    #[error("named type '{name}' was not exported")]
    NotExported { name: String },

    /// A view was read before its package finished building
    #[error("package has not been initialized")]
    NotInitialized,

    /// The build step panicked; the facade stays failed
    #[error("package build was aborted: {reason}")]
    BuildAborted { reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl PackageError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON output
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::ImportNotFound { .. } => "IMPORT_NOT_FOUND",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            Self::TypeCheck { .. } => "TYPE_CHECK_ERROR",
            Self::NameNotFound { .. } => "NAME_NOT_FOUND",
            Self::NotExported { .. } => "NOT_EXPORTED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::BuildAborted { .. } => "BUILD_ABORTED",
            Self::Config { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::ImportNotFound { .. } => vec![
                "Check the import path for typos",
                "Verify the GOROOT and GOPATH entries in .srcpkg/settings.toml",
                "Run from inside the module that contains the package",
            ],
            Self::Parse { .. } => vec![
                "Fix the syntax error reported at the given position",
                "Check that the package directory still exists and is readable",
            ],
            Self::PackageNotFound { .. } => vec![
                "Make sure the directory declares the expected package clause",
                "A directory holding only external test files has no importable package",
            ],
            Self::TypeCheck { .. } => vec![
                "Fix the reported declaration, the package must type check as a whole",
                "Unused imports are reported as errors",
            ],
            Self::BuildAborted { .. } => vec!["Create a new Package to retry the build"],
            _ => vec![],
        }
    }

    /// Shorthand for a checker failure at `position`.
    pub fn type_check(position: Position, message: impl Into<String>) -> Self {
        Self::TypeCheck {
            diagnostic: Diagnostic::new(position, message),
        }
    }
}

/// Result type alias for package operations
pub type PackageResult<T> = Result<T, PackageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let err = PackageError::NameNotFound {
            name: "Missing".to_string(),
        };
        assert_eq!(err.status_code(), "NAME_NOT_FOUND");
        assert_eq!(err.to_string(), "named type 'Missing' was not found");
        assert_eq!(PackageError::NotInitialized.status_code(), "NOT_INITIALIZED");
    }

    #[test]
    fn test_type_check_display_carries_position() {
        let err = PackageError::type_check(Position::new("a.go", 12, 3, 7), "undefined: Foo");
        assert_eq!(err.to_string(), "type check failed: a.go:3:7: undefined: Foo");
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_parse_error_without_line() {
        let err = PackageError::Parse {
            path: PathBuf::from("/missing"),
            position: Position::file_only("/missing"),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse '/missing' at /missing: No such file or directory"
        );
    }
}
