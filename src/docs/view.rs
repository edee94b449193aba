//! Read-only projections over a package's documentation.

use super::model::{DocPackage, Example, Func, Note, TypeDoc, Value};
use super::synopsis::synopsis;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Documentation view of a built package. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Docs {
    package: Arc<DocPackage>,
}

impl Docs {
    pub fn new(package: Arc<DocPackage>) -> Self {
        Self { package }
    }

    /// The underlying documentation model.
    pub fn package(&self) -> &DocPackage {
        &self.package
    }

    /// Constant blocks not associated with a type, in source order.
    pub fn constants(&self) -> &[Value] {
        &self.package.consts
    }

    /// Variable blocks not associated with a type, in source order.
    pub fn variables(&self) -> &[Value] {
        &self.package.vars
    }

    /// Package-level functions (constructors are listed under their type).
    pub fn functions(&self) -> &[Func] {
        &self.package.funcs
    }

    pub fn types(&self) -> &[TypeDoc] {
        &self.package.types
    }

    /// Documented methods keyed by receiver type name. Types without
    /// methods are left out.
    pub fn methods_by_type(&self) -> BTreeMap<&str, &[Func]> {
        self.package
            .types
            .iter()
            .filter(|ty| !ty.methods.is_empty())
            .map(|ty| (ty.name.as_str(), ty.methods.as_slice()))
            .collect()
    }

    pub fn examples(&self) -> &[Example] {
        &self.package.examples
    }

    /// Notes for `tag` (`BUG`, `TODO`, ...) in source order.
    pub fn notes(&self, tag: &str) -> &[Note] {
        self.package
            .notes
            .get(tag)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn all_notes(&self) -> &BTreeMap<String, Vec<Note>> {
        &self.package.notes
    }

    pub fn synopsis(&self) -> String {
        synopsis(&self.package.doc)
    }

    pub fn package_doc(&self) -> &str {
        &self.package.doc
    }

    /// Full paths of the documented files, sorted.
    pub fn filenames(&self) -> &[String] {
        &self.package.filenames
    }

    /// Base names of the documented files, sorted.
    pub fn file_names(&self) -> Vec<String> {
        self.package
            .filenames
            .iter()
            .filter_map(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pos;

    fn func(name: &str, recv: Option<&str>) -> Func {
        Func {
            doc: String::new(),
            name: name.to_string(),
            decl: format!("func {name}()"),
            recv: recv.map(str::to_string),
            pos: Pos::NONE,
        }
    }

    #[test]
    fn test_projections() {
        let mut notes = BTreeMap::new();
        notes.insert(
            "BUG".to_string(),
            vec![Note {
                pos: Pos(10),
                end: Pos(20),
                uid: "ann".to_string(),
                body: "broken.\n".to_string(),
            }],
        );
        let docs = Docs::new(Arc::new(DocPackage {
            name: "p".to_string(),
            doc: "Package p does things. More text.\n".to_string(),
            filenames: vec!["/src/p/a.go".to_string(), "/src/p/b.go".to_string()],
            notes,
            types: vec![
                TypeDoc {
                    name: "Empty".to_string(),
                    ..TypeDoc::default()
                },
                TypeDoc {
                    name: "T".to_string(),
                    methods: vec![func("M", Some("T")), func("N", Some("*T"))],
                    ..TypeDoc::default()
                },
            ],
            funcs: vec![func("F", None)],
            ..DocPackage::default()
        }));

        assert_eq!(docs.synopsis(), "Package p does things.");
        assert_eq!(docs.notes("BUG")[0].body, "broken.\n");
        assert!(docs.notes("TODO").is_empty());
        let by_type = docs.methods_by_type();
        assert_eq!(by_type.keys().copied().collect::<Vec<_>>(), vec!["T"]);
        assert_eq!(by_type["T"].len(), 2);
        assert!(!docs.functions()[0].is_method());
        assert_eq!(docs.file_names(), vec!["a.go", "b.go"]);
    }
}
