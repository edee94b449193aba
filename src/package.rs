//! The package facade: one package, built at most once.
//!
//! A [`Package`] starts out unbuilt. The first accessor call runs the
//! builder; concurrent callers wait for that single run and then all see the
//! same bundle or the same error. A failed build is never retried, and a
//! built package is never refreshed: construct a new `Package` to see
//! changes on disk.

use crate::check::{CheckedPackage, TypeInfo};
use crate::config::Settings;
use crate::docs::{DocPackage, Docs};
use crate::error::{PackageError, PackageResult};
use crate::locate::{PackageIdentity, SourceContext};
use crate::methods::{self, Function, MethodSet};
use crate::syntax::{FileSet, SyntaxPackage};
use crate::toolchain::{ArtifactBundle, BuildBundle, Toolchain};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Build state of a [`Package`].
#[derive(Debug, Clone, PartialEq)]
pub enum BuildSlot {
    Unbuilt,
    Building,
    Ready,
    Failed(PackageError),
}

/// A located package and its lazily built artifacts.
pub struct Package {
    identity: PackageIdentity,
    builder: Arc<dyn BuildBundle>,
    slot: Mutex<BuildSlot>,
    done: Condvar,
    bundle: OnceLock<ArtifactBundle>,
}

impl Package {
    /// Package for `identity`, built by `builder` on first use.
    pub fn new(identity: PackageIdentity, builder: Arc<dyn BuildBundle>) -> Self {
        Self {
            identity,
            builder,
            slot: Mutex::new(BuildSlot::Unbuilt),
            done: Condvar::new(),
            bundle: OnceLock::new(),
        }
    }

    /// Locate `import_path` from the working directory.
    pub fn import(import_path: &str) -> PackageResult<Self> {
        Self::import_with(&SourceContext::from_work_dir(), import_path)
    }

    /// Locate `import_path` in `context` and build it with the default
    /// toolchain.
    pub fn import_with(context: &SourceContext, import_path: &str) -> PackageResult<Self> {
        let identity = context.import(import_path)?;
        Ok(Self::new(identity, Arc::new(Toolchain::new(context.clone()))))
    }

    /// Locate `import_path` with the search context and parse options of
    /// `settings`.
    pub fn from_settings(settings: &Settings, import_path: &str) -> PackageResult<Self> {
        let context = SourceContext::from_settings(settings);
        let identity = context.import(import_path)?;
        Ok(Self::new(identity, Arc::new(Toolchain::from_settings(settings))))
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn import_path(&self) -> &str {
        &self.identity.import_path
    }

    pub fn dir(&self) -> &Path {
        &self.identity.dir
    }

    /// Whether the build has run, successfully or not.
    pub fn is_initialized(&self) -> bool {
        matches!(*self.slot.lock(), BuildSlot::Ready | BuildSlot::Failed(_))
    }

    pub fn state(&self) -> BuildSlot {
        self.slot.lock().clone()
    }

    /// The built bundle, running the builder if nobody has yet.
    pub fn bundle(&self) -> PackageResult<&ArtifactBundle> {
        if let Some(bundle) = self.bundle.get() {
            return Ok(bundle);
        }

        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                BuildSlot::Ready => return self.bundle.get().ok_or(PackageError::NotInitialized),
                BuildSlot::Failed(e) => return Err(e.clone()),
                BuildSlot::Unbuilt => break,
                BuildSlot::Building => {}
            }
            self.done.wait(&mut slot);
        }
        *slot = BuildSlot::Building;
        drop(slot);

        debug!("building {}", self.identity.import_path);
        let mut guard = AbortGuard {
            package: self,
            finished: false,
        };
        let result = self.builder.build(&self.identity);
        guard.finished = true;

        let state = match result {
            Ok(bundle) => {
                // only the building thread reaches this point
                let _ = self.bundle.set(bundle);
                BuildSlot::Ready
            }
            Err(e) => BuildSlot::Failed(e),
        };
        let outcome = match &state {
            BuildSlot::Failed(e) => Err(e.clone()),
            _ => self.bundle.get().ok_or(PackageError::NotInitialized),
        };
        *self.slot.lock() = state;
        self.done.notify_all();
        outcome
    }

    /// Synopsis of the package documentation.
    pub fn synopsis(&self) -> PackageResult<String> {
        Ok(self.docs()?.synopsis())
    }

    /// File set and syntax package of the checked forest.
    pub fn to_syntax(&self) -> PackageResult<(&FileSet, &SyntaxPackage)> {
        let bundle = self.bundle()?;
        Ok((&bundle.fileset, &bundle.syntax))
    }

    pub fn to_documentation(&self) -> PackageResult<&DocPackage> {
        Ok(self.bundle()?.docs.as_ref())
    }

    pub fn to_types(&self) -> PackageResult<&CheckedPackage> {
        Ok(&self.bundle()?.checked)
    }

    /// Checked package plus the annotation index, which is built on the
    /// first call and kept with the bundle.
    pub fn to_types_with_annotations(&self) -> PackageResult<(&TypeInfo, &CheckedPackage)> {
        let bundle = self.bundle()?;
        Ok((bundle.annotations()?, &bundle.checked))
    }

    pub fn docs(&self) -> PackageResult<Docs> {
        Ok(Docs::new(Arc::clone(&self.bundle()?.docs)))
    }

    /// Exported, non-test functions of the package in name order.
    pub fn functions(&self) -> PackageResult<Vec<Function>> {
        Ok(methods::functions(&self.to_types()?.scope))
    }

    /// Value and pointer methods of the exported name `name`.
    pub fn method_set(&self, name: &str) -> PackageResult<MethodSet> {
        methods::method_set(&self.to_types()?.scope, name)
    }

    /// Method sets of every exported type with at least one method.
    pub fn methods(&self) -> PackageResult<BTreeMap<String, MethodSet>> {
        Ok(methods::methods(&self.to_types()?.scope))
    }

    pub fn files(&self) -> Files<'_> {
        Files { package: self }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "srcpkg::Package{{{}}}", self.identity.name)
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("identity", &self.identity)
            .field("state", &*self.slot.lock())
            .finish()
    }
}

/// Marks the slot failed and wakes waiters when the builder unwinds.
struct AbortGuard<'p> {
    package: &'p Package,
    finished: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        *self.package.slot.lock() = BuildSlot::Failed(PackageError::BuildAborted {
            reason: "the builder panicked".to_string(),
        });
        self.package.done.notify_all();
    }
}

/// File listings of a package.
#[derive(Clone, Copy)]
pub struct Files<'p> {
    package: &'p Package,
}

impl<'p> Files<'p> {
    pub fn package(&self) -> &'p Package {
        self.package
    }

    /// Base names of the documented files, sorted.
    pub fn names(&self) -> PackageResult<Vec<String>> {
        Ok(self.package.docs()?.file_names())
    }

    /// Full paths of the documented files, sorted.
    pub fn paths(&self) -> PackageResult<Vec<PathBuf>> {
        Ok(self
            .package
            .to_documentation()?
            .filenames
            .iter()
            .map(PathBuf::from)
            .collect())
    }

    /// Go, cgo, C, C++, Objective-C, assembly and SWIG sources, excluding
    /// tests. Does not build the package.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        let id = &self.package.identity;
        self.join(
            id.go_files
                .iter()
                .chain(&id.cgo_files)
                .chain(&id.c_files)
                .chain(&id.cc_files)
                .chain(&id.m_files)
                .chain(&id.s_files)
                .chain(&id.swig_files),
        )
    }

    /// In-package and external test files. Does not build the package.
    pub fn test_paths(&self) -> Vec<PathBuf> {
        let id = &self.package.identity;
        self.join(id.test_go_files.iter().chain(&id.xtest_go_files))
    }

    fn join<'a>(&self, names: impl Iterator<Item = &'a String>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = names
            .map(|name| self.package.identity.dir.join(name))
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: AtomicUsize,
    }

    impl BuildBundle for Failing {
        fn build(&self, identity: &PackageIdentity) -> PackageResult<ArtifactBundle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PackageError::PackageNotFound {
                name: identity.name.clone(),
                dir: identity.dir.clone(),
            })
        }
    }

    struct Panicking;

    impl BuildBundle for Panicking {
        fn build(&self, _identity: &PackageIdentity) -> PackageResult<ArtifactBundle> {
            panic!("boom");
        }
    }

    fn identity() -> PackageIdentity {
        PackageIdentity {
            import_path: "example.com/p".to_string(),
            name: "p".to_string(),
            dir: PathBuf::from("/src/p"),
            go_files: vec!["b.go".to_string(), "a.go".to_string()],
            c_files: vec!["x.c".to_string()],
            test_go_files: vec!["a_test.go".to_string()],
            xtest_go_files: vec!["b_test.go".to_string()],
            ..PackageIdentity::default()
        }
    }

    #[test]
    fn test_failure_is_replayed() {
        let builder = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let package = Package::new(identity(), builder.clone());
        assert!(!package.is_initialized());
        assert_eq!(package.to_string(), "srcpkg::Package{p}");

        let first = package.to_types().unwrap_err();
        let second = package.docs().unwrap_err();
        let third = package.method_set("T").unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first, third);
        assert!(matches!(first, PackageError::PackageNotFound { .. }));
        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);
        assert!(package.is_initialized());
        assert!(matches!(package.state(), BuildSlot::Failed(_)));
    }

    #[test]
    fn test_panicking_builder_fails_the_slot() {
        let package = Arc::new(Package::new(identity(), Arc::new(Panicking)));
        let worker = Arc::clone(&package);
        let joined = std::thread::spawn(move || worker.to_types().map(|_| ())).join();
        assert!(joined.is_err());
        assert!(matches!(
            package.to_types(),
            Err(PackageError::BuildAborted { .. })
        ));
    }

    #[test]
    fn test_file_listings_do_not_build() {
        let package = Package::new(
            identity(),
            Arc::new(Failing {
                calls: AtomicUsize::new(0),
            }),
        );
        let files = package.files();
        assert_eq!(
            files.source_paths(),
            vec![
                PathBuf::from("/src/p/a.go"),
                PathBuf::from("/src/p/b.go"),
                PathBuf::from("/src/p/x.c"),
            ]
        );
        assert_eq!(
            files.test_paths(),
            vec![
                PathBuf::from("/src/p/a_test.go"),
                PathBuf::from("/src/p/b_test.go"),
            ]
        );
        assert!(!package.is_initialized());
    }
}
