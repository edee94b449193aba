//! Build-once behavior of the package facade against the fixture package.

use crate::common::{TPKG, TestProject, fixture_context, tpkg};
use srcpkg::{
    ArtifactBundle, BuildBundle, BuildSlot, Package, PackageError, PackageIdentity,
    PackageResult, Toolchain,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counts builds and slows them down so concurrent callers overlap.
struct Counting {
    inner: Toolchain,
    calls: AtomicUsize,
}

impl Counting {
    fn new() -> Self {
        Self {
            inner: Toolchain::new(fixture_context()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl BuildBundle for Counting {
    fn build(&self, identity: &PackageIdentity) -> PackageResult<ArtifactBundle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        self.inner.build(identity)
    }
}

#[test]
fn test_end_to_end_scenario() {
    let project = TestProject::new();
    project.add_file(
        "t.go",
        "package t\n\nconst (\n\tA = 1\n\tB = 2\n)\n\ntype T struct{}\n\nfunc (T) M() {}\n\nfunc (*T) N() {}\n",
    );
    project.add_file("t_test.go", "package t\n\nfunc TestX(t *T) {}\n");
    let package = project.import().unwrap();

    let docs = package.docs().unwrap();
    assert_eq!(docs.constants().len(), 1);
    assert_eq!(docs.constants()[0].names, vec!["A", "B"]);
    assert_eq!(package.method_set("T").unwrap().names(), vec!["M", "N"]);
    assert!(package.functions().unwrap().is_empty());
    assert!(matches!(
        package.method_set("TestX"),
        Err(PackageError::NotExported { .. })
    ));
}

#[test]
fn test_concurrent_first_access_builds_once() {
    let identity = fixture_context().import(TPKG).unwrap();
    let counting = Arc::new(Counting::new());
    let package = Package::new(identity, counting.clone());

    let sizes: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| package.method_set("PublicStruct").map(|set| set.len())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    assert!(sizes.iter().all(|&n| n == 6));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    assert_eq!(package.state(), BuildSlot::Ready);
}

#[test]
fn test_accessors_share_one_bundle() {
    let package = tpkg();
    assert!(!package.is_initialized());

    let first = package.to_types().unwrap();
    let second = package.to_types().unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(
        package.to_documentation().unwrap(),
        package.docs().unwrap().package()
    ));
    assert!(package.is_initialized());
}

#[test]
fn test_independent_builds_agree() {
    let first = tpkg();
    let second = tpkg();
    let a = serde_json::to_value(first.to_documentation().unwrap()).unwrap();
    let b = serde_json::to_value(second.to_documentation().unwrap()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        first.functions().unwrap(),
        second.functions().unwrap()
    );
}

#[test]
fn test_syntax_and_annotations() {
    let package = tpkg();
    let (_, syntax) = package.to_syntax().unwrap();
    assert_eq!(syntax.name, "tpkg");
    assert_eq!(syntax.files.len(), 5);

    let (info, checked) = package.to_types_with_annotations().unwrap();
    assert!(checked.scope.lookup("PublicStruct").is_some());
    assert!(info.def_of("PublicStruct").is_some());
    assert!(package.bundle().unwrap().has_annotations());
}

#[test]
fn test_missing_directory_is_a_parse_error() {
    let identity = fixture_context().import(TPKG).unwrap();
    let project = TestProject::new();
    let gone = project.path().join("gone");
    let package = Package::new(
        identity.with_dir(gone),
        Arc::new(Toolchain::new(fixture_context())),
    );
    assert!(matches!(package.docs(), Err(PackageError::Parse { .. })));
}

#[test]
fn test_empty_directory_has_no_package() {
    let identity = fixture_context().import(TPKG).unwrap();
    let project = TestProject::new();
    let package = Package::new(
        identity.with_dir(project.path()),
        Arc::new(Toolchain::new(fixture_context())),
    );
    let err = package.to_types().unwrap_err();
    assert!(matches!(err, PackageError::PackageNotFound { ref name, .. } if name == "tpkg"));
}

#[test]
fn test_malformed_source_is_a_parse_error() {
    let project = TestProject::new();
    project.add_file("broken.go", "package broken\n\nfunc F( {\n");
    let package = project.import().unwrap();
    let err = package.synopsis().unwrap_err();
    match err {
        PackageError::Parse { path, .. } => assert!(path.ends_with("broken.go")),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_type_check_failure_is_replayed() {
    let project = TestProject::new();
    project.add_file("bad.go", "package bad\n\nvar x Missing\n");
    let package = project.import().unwrap();

    let err = package.functions().unwrap_err();
    let PackageError::TypeCheck { diagnostic } = &err else {
        panic!("expected a type check error, got {err:?}");
    };
    assert!(diagnostic.position.filename.ends_with("bad.go"));
    assert_eq!(diagnostic.position.line, 3);
    assert_eq!(diagnostic.message, "undefined: Missing");

    // every later accessor sees the same failure
    assert_eq!(package.docs().unwrap_err(), err);
    assert_eq!(package.method_set("T").unwrap_err(), err);
    assert!(matches!(package.state(), BuildSlot::Failed(_)));
}

#[test]
fn test_lookup_errors_do_not_fail_the_package() {
    let package = tpkg();
    assert!(matches!(
        package.method_set("Missing"),
        Err(PackageError::NameNotFound { .. })
    ));
    assert!(matches!(
        package.method_set("privateStruct"),
        Err(PackageError::NotExported { .. })
    ));
    assert_eq!(package.state(), BuildSlot::Ready);
    assert!(package.method_set("PublicStruct").is_ok());
}

#[test]
fn test_display() {
    assert_eq!(tpkg().to_string(), "srcpkg::Package{tpkg}");
}
