//! srcpkg builds a queryable model of one Go package.
//!
//! A [`Package`] is located through a [`SourceContext`], built once on first
//! use (parse, documentation, declaration check) and then answers
//! documentation, function and method set queries from the same snapshot.

pub mod check;
pub mod config;
pub mod docs;
pub mod error;
pub mod locate;
pub mod logging;
pub mod methods;
pub mod package;
pub mod syntax;
pub mod toolchain;
pub mod types;

// Explicit exports for better API clarity
pub use check::{CheckedPackage, Importer, Object, ObjectKind, Scope, Type, TypeInfo};
pub use config::Settings;
pub use docs::{DocPackage, Docs};
pub use error::{Diagnostic, PackageError, PackageResult};
pub use locate::{PackageIdentity, SourceContext};
pub use methods::{Function, MethodSet, is_exported, is_test_name};
pub use package::{BuildSlot, Files, Package};
pub use toolchain::{ArtifactBundle, BuildBundle, Toolchain};
pub use types::{Pos, Position, Span};

/// Shorthand for [`Package::import`]: locate `import_path` from the working
/// directory.
pub fn import(import_path: &str) -> PackageResult<Package> {
    Package::import(import_path)
}
