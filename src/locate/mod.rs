//! Source locator: resolves an import path into a package directory and a
//! classified file list.
//!
//! Resolution order for a non-local path is the base directory's `vendor/`
//! trees, the enclosing module, the library root and then each dependency
//! root. Relative and absolute paths resolve against the base directory.

pub mod constraints;
pub mod gomod;

pub use constraints::BuildConstraints;
pub use gomod::GoMod;

use crate::config::{ContextConfig, Settings};
use crate::error::{PackageError, PackageResult};
use crate::syntax;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Everything the locator learned about one package directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    pub import_path: String,
    pub name: String,
    pub dir: PathBuf,
    /// Root the package was found under (library or dependency root)
    pub root: Option<PathBuf>,
    /// Found under the library root
    pub goroot: bool,

    pub go_files: Vec<String>,
    pub cgo_files: Vec<String>,
    pub ignored_go_files: Vec<String>,
    pub test_go_files: Vec<String>,
    pub xtest_go_files: Vec<String>,
    pub c_files: Vec<String>,
    pub cc_files: Vec<String>,
    pub m_files: Vec<String>,
    pub h_files: Vec<String>,
    pub s_files: Vec<String>,
    pub swig_files: Vec<String>,
}

impl PackageIdentity {
    /// Go files that take part in a build of the package and its tests.
    pub fn buildable_go_files(&self) -> BTreeSet<&str> {
        self.go_files
            .iter()
            .chain(&self.cgo_files)
            .chain(&self.test_go_files)
            .chain(&self.xtest_go_files)
            .map(String::as_str)
            .collect()
    }

    /// The same identity pointing at another directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    fn total_go_files(&self) -> usize {
        self.go_files.len()
            + self.cgo_files.len()
            + self.test_go_files.len()
            + self.xtest_go_files.len()
    }
}

/// Where and for which target packages are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// Imports resolve as if written in a file of this directory
    pub source_dir: PathBuf,
    pub goroot: PathBuf,
    pub gopath: Vec<PathBuf>,
    pub constraints: BuildConstraints,
}

impl SourceContext {
    /// Context rooted at `dir`, with library and dependency roots taken
    /// from the environment.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let mut ctx = Self::from_config(&ContextConfig::default());
        ctx.source_dir = dir.into();
        ctx
    }

    /// Like [`from_dir`](Self::from_dir) with the working directory.
    pub fn from_work_dir() -> Self {
        Self::from_dir(work_dir())
    }

    /// Context seeing only the standard library: no dependency roots and the
    /// base directory set to `<goroot>/src`.
    pub fn from_standard() -> Self {
        let mut ctx = Self::from_dir(PathBuf::new());
        ctx.gopath.clear();
        ctx.source_dir = ctx.goroot.join("src");
        ctx
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_config(&settings.context)
    }

    fn from_config(config: &ContextConfig) -> Self {
        Self {
            source_dir: config.source_dir.clone().unwrap_or_else(work_dir),
            goroot: config.goroot.clone(),
            gopath: config.gopath.clone(),
            constraints: BuildConstraints::new(
                config.goos.clone(),
                config.goarch.clone(),
                config.build_tags.iter().cloned(),
                config.cgo_enabled,
            ),
        }
    }

    /// Resolve `import_path` as if imported from [`source_dir`](Self::source_dir).
    pub fn import(&self, import_path: &str) -> PackageResult<PackageIdentity> {
        self.import_from(import_path, &self.source_dir)
    }

    /// Resolve `import_path` as if imported from a file in `from`.
    pub fn import_from(&self, import_path: &str, from: &Path) -> PackageResult<PackageIdentity> {
        let not_found = |reason: String| PackageError::ImportNotFound {
            import_path: import_path.to_string(),
            from: from.to_path_buf(),
            reason,
        };
        if import_path.is_empty() {
            return Err(not_found("empty import path".to_string()));
        }

        if is_local_import(import_path) {
            let dir = if Path::new(import_path).is_absolute() {
                PathBuf::from(import_path)
            } else {
                from.join(import_path)
            };
            if !has_go_files(&dir) {
                return Err(not_found(format!("no Go files in {}", dir.display())));
            }
            return self.load_dir(import_path, &dir, None);
        }

        let mut tried = Vec::new();
        for (dir, root) in self.candidates(import_path, from) {
            trace!("trying {} for \"{import_path}\"", dir.display());
            if has_go_files(&dir) {
                debug!("resolved \"{import_path}\" to {}", dir.display());
                return self.load_dir(import_path, &dir, root);
            }
            tried.push(dir);
        }
        let tried: Vec<String> = tried
            .iter()
            .map(|dir| format!("\t{}", dir.display()))
            .collect();
        Err(not_found(format!(
            "not found in any of:\n{}",
            tried.join("\n")
        )))
    }

    /// Classify the files of an already known directory.
    pub fn import_dir(&self, dir: &Path) -> PackageResult<PackageIdentity> {
        self.load_dir(&dir.display().to_string(), dir, None)
    }

    fn candidates(&self, import_path: &str, from: &Path) -> Vec<(PathBuf, Option<PathBuf>)> {
        let mut candidates = Vec::new();
        for ancestor in from.ancestors() {
            candidates.push((ancestor.join("vendor").join(import_path), None));
        }
        if let Some(dir) = GoMod::find(from).and_then(|gomod| gomod.resolve(import_path)) {
            candidates.push((dir, None));
        }
        let goroot_src = self.goroot.join("src");
        candidates.push((goroot_src.join(import_path), Some(self.goroot.clone())));
        for root in &self.gopath {
            candidates.push((root.join("src").join(import_path), Some(root.clone())));
        }
        candidates
    }

    fn load_dir(
        &self,
        import_path: &str,
        dir: &Path,
        root: Option<PathBuf>,
    ) -> PackageResult<PackageIdentity> {
        let not_found = |reason: String| PackageError::ImportNotFound {
            import_path: import_path.to_string(),
            from: self.source_dir.clone(),
            reason,
        };
        let entries = std::fs::read_dir(dir).map_err(|e| not_found(e.to_string()))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        let abs_dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        let mut identity = PackageIdentity {
            import_path: import_path.to_string(),
            dir: abs_dir,
            goroot: root.as_ref().is_some_and(|r| *r == self.goroot),
            root,
            ..PackageIdentity::default()
        };
        let mut parser = syntax::new_parser()?;
        let mut first_file = String::new();

        for name in names {
            if name.starts_with('_') || name.starts_with('.') {
                continue;
            }
            let Some((_, ext)) = name.rsplit_once('.') else {
                continue;
            };
            if !self.constraints.matches_file_name(&name) {
                if ext == "go" {
                    identity.ignored_go_files.push(name);
                }
                continue;
            }
            let list = match ext {
                "go" => None,
                "c" => Some(&mut identity.c_files),
                "cc" | "cpp" | "cxx" => Some(&mut identity.cc_files),
                "m" => Some(&mut identity.m_files),
                "h" | "hh" | "hpp" | "hxx" => Some(&mut identity.h_files),
                "s" | "S" | "sx" => Some(&mut identity.s_files),
                "swig" | "swigcxx" => Some(&mut identity.swig_files),
                _ => continue,
            };
            if let Some(list) = list {
                list.push(name);
                continue;
            }

            let path = dir.join(&name);
            let source = std::fs::read_to_string(&path)
                .map_err(|e| not_found(format!("{}: {e}", path.display())))?;
            let matches = self
                .constraints
                .matches_source(&source)
                .map_err(|e| not_found(format!("{}: {e}", path.display())))?;
            if !matches {
                trace!("{name} excluded by build constraints");
                identity.ignored_go_files.push(name);
                continue;
            }

            let tree = parser
                .parse(&source, None)
                .ok_or_else(|| not_found(format!("{}: unreadable source", path.display())))?;
            let root_node = tree.root_node();
            let Some(mut package) = syntax::package_clause(root_node, &source) else {
                return Err(not_found(format!(
                    "{}: expected 'package' clause",
                    path.display()
                )));
            };

            let is_test = name.ends_with("_test.go");
            let mut is_xtest = false;
            if is_test && package.ends_with("_test") && identity.name != package {
                is_xtest = true;
                package.truncate(package.len() - "_test".len());
            }
            if identity.name.is_empty() {
                identity.name = package;
                first_file = name.clone();
            } else if package != identity.name {
                return Err(not_found(format!(
                    "found packages {} ({first_file}) and {package} ({name}) in {}",
                    identity.name,
                    dir.display()
                )));
            }

            let imports_c = syntax::import_specs(root_node, &source)
                .iter()
                .any(|(_, path, _)| path == "C");
            if is_xtest {
                identity.xtest_go_files.push(name);
            } else if is_test {
                identity.test_go_files.push(name);
            } else if imports_c {
                if self.constraints.cgo_enabled {
                    identity.cgo_files.push(name);
                } else {
                    identity.ignored_go_files.push(name);
                }
            } else {
                identity.go_files.push(name);
            }
        }

        if identity.total_go_files() == 0 {
            return Err(not_found(format!(
                "no buildable Go source files in {}",
                dir.display()
            )));
        }
        Ok(identity)
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context({} -> {})",
            self.source_dir.display(),
            self.goroot.display()
        )
    }
}

fn work_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_local_import(path: &str) -> bool {
    path == "."
        || path == ".."
        || path.starts_with("./")
        || path.starts_with("../")
        || Path::new(path).is_absolute()
}

fn has_go_files(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(|entry| entry.ok()).any(|entry| {
            entry.path().is_file() && entry.file_name().to_string_lossy().ends_with(".go")
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(root: &Path) -> SourceContext {
        SourceContext {
            source_dir: root.to_path_buf(),
            goroot: root.join("goroot"),
            gopath: vec![root.join("gopath")],
            constraints: BuildConstraints::new("linux", "amd64", Vec::new(), true),
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classifies_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("gopath/src/example.com/p");
        write(&dir.join("p.go"), "package p\n");
        write(&dir.join("p_windows.go"), "package p\n");
        write(&dir.join("skip.go"), "//go:build ignore\n\npackage main\n");
        write(&dir.join("cgo.go"), "package p\n\nimport \"C\"\n");
        write(&dir.join("p_test.go"), "package p\n");
        write(&dir.join("x_test.go"), "package p_test\n");
        write(&dir.join("_hidden.go"), "package hidden\n");
        write(&dir.join("asm_amd64.s"), "");
        write(&dir.join("README.md"), "");

        let identity = context(tmp.path()).import("example.com/p").unwrap();
        assert_eq!(identity.name, "p");
        assert_eq!(identity.go_files, vec!["p.go"]);
        assert_eq!(identity.cgo_files, vec!["cgo.go"]);
        assert_eq!(identity.ignored_go_files, vec!["p_windows.go", "skip.go"]);
        assert_eq!(identity.test_go_files, vec!["p_test.go"]);
        assert_eq!(identity.xtest_go_files, vec!["x_test.go"]);
        assert_eq!(identity.s_files, vec!["asm_amd64.s"]);
        assert!(!identity.goroot);
        assert_eq!(identity.root, Some(tmp.path().join("gopath")));
    }

    #[test]
    fn test_search_order() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("goroot/src/strings/s.go"), "package strings\n");
        write(&tmp.path().join("gopath/src/strings/s.go"), "package shadow\n");
        write(&tmp.path().join("vendor/example.com/v/v.go"), "package v\n");
        write(&tmp.path().join("gopath/src/example.com/v/v.go"), "package other\n");

        let ctx = context(tmp.path());
        let strings = ctx.import("strings").unwrap();
        assert_eq!(strings.name, "strings");
        assert!(strings.goroot);

        let vendored = ctx.import("example.com/v").unwrap();
        assert_eq!(vendored.name, "v");
    }

    #[test]
    fn test_module_resolution() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("go.mod"), "module example.com/mod\n\ngo 1.22\n");
        write(&tmp.path().join("inner/inner.go"), "package inner\n");

        let identity = context(tmp.path()).import("example.com/mod/inner").unwrap();
        assert_eq!(identity.name, "inner");
    }

    #[test]
    fn test_relative_import() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("rel/r.go"), "package r\n");
        let identity = context(tmp.path()).import("./rel").unwrap();
        assert_eq!(identity.name, "r");
    }

    #[test]
    fn test_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = context(tmp.path()).import("example.com/nothing").unwrap_err();
        assert_eq!(err.status_code(), "IMPORT_NOT_FOUND");
    }

    #[test]
    fn test_conflicting_packages() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("gopath/src/mixed");
        write(&dir.join("a.go"), "package a\n");
        write(&dir.join("b.go"), "package b\n");
        let err = context(tmp.path()).import("mixed").unwrap_err();
        assert!(err.to_string().contains("found packages a (a.go) and b (b.go)"));
    }

    #[test]
    fn test_display() {
        let ctx = SourceContext {
            source_dir: PathBuf::from("/src"),
            goroot: PathBuf::from("/go"),
            gopath: Vec::new(),
            constraints: BuildConstraints::new("linux", "amd64", Vec::new(), true),
        };
        assert_eq!(ctx.to_string(), "Context(/src -> /go)");
    }

    #[test]
    fn test_from_standard_has_no_gopath() {
        let ctx = SourceContext::from_standard();
        assert!(ctx.gopath.is_empty());
        assert_eq!(ctx.source_dir, ctx.goroot.join("src"));
    }
}
