//! Import resolution and file classification.

use crate::common::{TPKG, TestProject, fixture_context, fixtures_dir, tpkg};
use srcpkg::PackageError;
use srcpkg::locate::BuildConstraints;
use std::path::PathBuf;

#[test]
fn test_classifies_fixture_files() {
    let identity = fixture_context().import(TPKG).unwrap();
    assert_eq!(identity.name, "tpkg");
    assert_eq!(identity.import_path, TPKG);
    assert!(!identity.goroot);
    assert_eq!(identity.root, Some(fixtures_dir().join("gopath")));

    assert_eq!(identity.go_files, vec!["doc.go", "tpkg.go", "tpkg_private.go"]);
    assert_eq!(identity.test_go_files, vec!["example_test.go", "tpkg_test.go"]);
    assert_eq!(identity.xtest_go_files, vec!["tpkg_ext_test.go"]);
    assert_eq!(identity.ignored_go_files, vec!["gen.go", "tpkg_windows.go"]);
    assert_eq!(identity.c_files, vec!["cgo_stub.c"]);
}

#[test]
fn test_library_packages_resolve_from_goroot() {
    let identity = fixture_context().import("fmt").unwrap();
    assert!(identity.goroot);
    assert_eq!(identity.name, "fmt");
    assert_eq!(identity.go_files, vec!["print.go"]);
}

#[test]
fn test_platform_files_follow_the_target() {
    let mut context = fixture_context();
    context.constraints = BuildConstraints::new("windows", "amd64", Vec::new(), true);
    let identity = context.import(TPKG).unwrap();
    assert!(identity.go_files.contains(&"tpkg_windows.go".to_string()));
    assert_eq!(identity.ignored_go_files, vec!["gen.go"]);
}

#[test]
fn test_unknown_import_path() {
    let err = fixture_context().import("example.com/missing").unwrap_err();
    match err {
        PackageError::ImportNotFound { import_path, .. } => {
            assert_eq!(import_path, "example.com/missing")
        }
        other => panic!("expected ImportNotFound, got {other:?}"),
    }
}

#[test]
fn test_conflicting_package_clauses() {
    let project = TestProject::new();
    project.add_file("a.go", "package a\n");
    project.add_file("b.go", "package b\n");
    assert!(matches!(
        project.import(),
        Err(PackageError::ImportNotFound { .. })
    ));
}

#[test]
fn test_local_subdirectory_import() {
    let project = TestProject::new();
    project.add_file("sub/s.go", "// Package s is nested.\npackage s\n");
    let package = project.import_sub("sub").unwrap();
    assert_eq!(package.name(), "s");
    assert!(package.dir().ends_with("sub"));
    assert_eq!(package.synopsis().unwrap(), "Package s is nested.");
}

#[test]
fn test_file_listings_from_identity() {
    let package = tpkg();
    let dir: PathBuf = package.dir().to_path_buf();
    let sources = package.files().source_paths();
    assert_eq!(
        sources,
        vec![
            dir.join("cgo_stub.c"),
            dir.join("doc.go"),
            dir.join("tpkg.go"),
            dir.join("tpkg_private.go"),
        ]
    );
    assert_eq!(
        package.files().test_paths(),
        vec![
            dir.join("example_test.go"),
            dir.join("tpkg_ext_test.go"),
            dir.join("tpkg_test.go"),
        ]
    );
    assert!(!package.is_initialized());
}
