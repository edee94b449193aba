#![allow(dead_code)]

use srcpkg::locate::BuildConstraints;
use srcpkg::{Package, PackageResult, SourceContext};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Import path of the fixture package under `tests/fixtures/gopath`.
pub const TPKG: &str = "example.com/tpkg";

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Context over the fixture library and dependency roots, targeting
/// linux/amd64 with cgo enabled.
pub fn fixture_context() -> SourceContext {
    let fixtures = fixtures_dir();
    SourceContext {
        source_dir: fixtures.join("gopath").join("src"),
        goroot: fixtures.join("goroot"),
        gopath: vec![fixtures.join("gopath")],
        constraints: BuildConstraints::new("linux", "amd64", Vec::new(), true),
    }
}

/// The fixture package, unbuilt.
pub fn tpkg() -> Package {
    Package::import_with(&fixture_context(), TPKG).expect("fixture package should resolve")
}

/// A throwaway package directory.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fixture context with imports resolved from the project directory.
    pub fn context(&self) -> SourceContext {
        SourceContext {
            source_dir: self.path().to_path_buf(),
            ..fixture_context()
        }
    }

    /// Locate the package in the project root.
    pub fn import(&self) -> PackageResult<Package> {
        Package::import_with(&self.context(), ".")
    }

    /// Locate the package in a subdirectory of the project.
    pub fn import_sub(&self, sub: &str) -> PackageResult<Package> {
        Package::import_with(&self.context(), &format!("./{sub}"))
    }
}
