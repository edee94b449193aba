//! Cross-package import resolution for the checker.

use crate::locate::SourceContext;
use crate::syntax;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// What the checker knows about an imported package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPackage {
    pub path: String,
    /// Name the package declares, used when the import has no alias
    pub name: String,
    /// Exported top-level names; `None` when any name is accepted
    pub exports: Option<BTreeSet<String>>,
}

impl ImportedPackage {
    pub fn exports(&self, name: &str) -> bool {
        self.exports
            .as_ref()
            .is_none_or(|exports| exports.contains(name))
    }
}

/// Resolves import paths seen by the checker.
pub trait Importer: Send + Sync {
    /// Resolve `path` as imported from a file in `from_dir`. The error is the
    /// human readable reason.
    fn import(&self, path: &str, from_dir: &Path) -> Result<Arc<ImportedPackage>, String>;
}

/// Default importer: locates the package and reads the exported names of its
/// non-test files. Results are cached per importer.
pub struct SourceImporter {
    context: SourceContext,
    cache: Mutex<HashMap<(String, PathBuf), Arc<ImportedPackage>>>,
}

impl SourceImporter {
    pub fn new(context: SourceContext) -> Self {
        Self {
            context,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn load(&self, path: &str, from_dir: &Path) -> Result<ImportedPackage, String> {
        match path {
            "unsafe" => {
                return Ok(ImportedPackage {
                    path: path.to_string(),
                    name: "unsafe".to_string(),
                    exports: Some(
                        [
                            "Add",
                            "Alignof",
                            "Offsetof",
                            "Pointer",
                            "Sizeof",
                            "Slice",
                            "SliceData",
                            "String",
                            "StringData",
                        ]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    ),
                });
            }
            "C" => {
                return Ok(ImportedPackage {
                    path: path.to_string(),
                    name: "C".to_string(),
                    exports: None,
                });
            }
            _ => {}
        }

        let identity = self
            .context
            .import_from(path, from_dir)
            .map_err(|e| e.to_string())?;
        let mut parser = syntax::new_parser().map_err(|e| e.to_string())?;
        let mut exports = BTreeSet::new();
        for name in identity.go_files.iter().chain(&identity.cgo_files) {
            let file = identity.dir.join(name);
            let source = std::fs::read_to_string(&file).map_err(|e| e.to_string())?;
            let Some(tree) = parser.parse(&source, None) else {
                continue;
            };
            exports.extend(exported_names(tree.root_node(), &source));
        }
        debug!(
            "imported \"{path}\" from {} ({} exported names)",
            identity.dir.display(),
            exports.len()
        );
        Ok(ImportedPackage {
            path: path.to_string(),
            name: identity.name,
            exports: Some(exports),
        })
    }
}

impl Importer for SourceImporter {
    fn import(&self, path: &str, from_dir: &Path) -> Result<Arc<ImportedPackage>, String> {
        let key = (path.to_string(), from_dir.to_path_buf());
        if let Some(found) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(found));
        }
        let package = Arc::new(self.load(path, from_dir)?);
        self.cache.lock().insert(key, Arc::clone(&package));
        Ok(package)
    }
}

/// Exported top-level names declared in one file (methods excluded).
pub fn exported_names(root: tree_sitter::Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut push = |node: tree_sitter::Node| {
        let name = &source[node.byte_range()];
        if crate::methods::is_exported(name) {
            names.push(name.to_string());
        }
    };
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        match decl.kind() {
            "function_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    push(name);
                }
            }
            "type_declaration" | "const_declaration" | "var_declaration" => {
                let mut stack = vec![decl];
                while let Some(node) = stack.pop() {
                    match node.kind() {
                        "type_spec" | "type_alias" | "const_spec" | "var_spec" => {
                            let mut inner = node.walk();
                            for name in node.children_by_field_name("name", &mut inner) {
                                push(name);
                            }
                        }
                        _ => {
                            let mut inner = node.walk();
                            stack.extend(node.named_children(&mut inner));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::BuildConstraints;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_exported_names() {
        let source = "package p\n\nfunc Exported() {}\nfunc hidden() {}\n\ntype (\n\tA int\n\tb int\n)\n\nconst C, d = 1, 2\n\nvar V = 1\n\nfunc (A) M() {}\n";
        let mut parser = syntax::new_parser().unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut names = exported_names(tree.root_node(), source);
        names.sort();
        assert_eq!(names, vec!["A", "C", "Exported", "V"]);
    }

    #[test]
    fn test_source_importer_caches() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("goroot/src/fmt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("print.go"), "package fmt\n\nfunc Println(a ...any) {}\n").unwrap();

        let importer = SourceImporter::new(SourceContext {
            source_dir: tmp.path().to_path_buf(),
            goroot: tmp.path().join("goroot"),
            gopath: Vec::new(),
            constraints: BuildConstraints::new("linux", "amd64", Vec::new(), true),
        });
        let first = importer.import("fmt", tmp.path()).unwrap();
        assert_eq!(first.name, "fmt");
        assert!(first.exports("Println"));
        assert!(!first.exports("Printf"));

        let second = importer.import("fmt", tmp.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(importer.import("unsafe", tmp.path()).unwrap().exports("Pointer"));
        assert!(importer.import("nope/nope", tmp.path()).is_err());
    }
}
