//! Builds a [`DocPackage`] from a syntax package.
//!
//! The reader takes its package by value and moves the comment groups out
//! of every file while reading notes. A package handed to the reader cannot
//! be shared with any other consumer.

use super::examples::read_examples;
use super::model::{DocPackage, Func, TypeDoc, Value};
use super::notes::read_notes;
use crate::methods::is_exported;
use crate::syntax::{CommentGroup, SyntaxFile, SyntaxPackage};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use tree_sitter::Node;

/// Share of a value block's specs that must name a type for the block to be
/// listed under that type.
const TYPE_ASSOCIATION_THRESHOLD: f64 = 0.75;

impl DocPackage {
    /// Read the documentation of `package`, consuming it.
    ///
    /// In-package `_test.go` files contribute examples only: their
    /// declarations and notes are not documented, unlike `go/doc` run over a
    /// package parsed with its tests. Their names still appear in
    /// `filenames`.
    pub fn new(mut package: SyntaxPackage, import_path: &str) -> Self {
        let mut reader = Reader {
            types: declared_types(&package),
            ..Reader::default()
        };
        let filenames = package
            .files
            .keys()
            .map(|path| path.display().to_string())
            .collect();

        for file in package.files.values_mut() {
            if file.is_test() {
                read_examples(file, &mut reader.examples);
                continue;
            }
            reader.read_file(file);
            let groups = std::mem::take(&mut file.comments);
            read_notes(&groups, &mut reader.notes);
        }
        debug!(
            "documented {}: {} consts, {} vars, {} types, {} funcs, {} examples",
            package.name,
            reader.consts.len(),
            reader.vars.len(),
            reader.types.len(),
            reader.funcs.len(),
            reader.examples.len()
        );

        let mut funcs = reader.funcs;
        funcs.sort_by(|a, b| a.name.cmp(&b.name));
        let types = reader
            .types
            .into_values()
            .map(|mut ty| {
                ty.funcs.sort_by(|a, b| a.name.cmp(&b.name));
                ty.methods.sort_by(|a, b| a.name.cmp(&b.name));
                ty
            })
            .collect();

        DocPackage {
            name: package.name,
            import_path: import_path.to_string(),
            doc: reader.doc,
            filenames,
            notes: reader.notes,
            consts: reader.consts,
            vars: reader.vars,
            types,
            funcs,
            examples: reader.examples,
        }
    }
}

#[derive(Default)]
struct Reader {
    doc: String,
    consts: Vec<Value>,
    vars: Vec<Value>,
    /// Exported types declared in non-test files, by name
    types: BTreeMap<String, TypeDoc>,
    funcs: Vec<Func>,
    examples: Vec<super::model::Example>,
    notes: BTreeMap<String, Vec<super::model::Note>>,
}

/// Placeholders for every exported type declared in a non-test file, so
/// methods and constructors can be attached in any file order.
fn declared_types(package: &SyntaxPackage) -> BTreeMap<String, TypeDoc> {
    let mut types = BTreeMap::new();
    for file in package.files.values().filter(|file| !file.is_test()) {
        for decl in file.declarations() {
            if decl.kind() != "type_declaration" {
                continue;
            }
            for spec in type_specs(decl) {
                let Some(name) = spec.child_by_field_name("name").map(|n| file.text(n)) else {
                    continue;
                };
                if is_exported(name) {
                    types.insert(
                        name.to_string(),
                        TypeDoc {
                            name: name.to_string(),
                            ..TypeDoc::default()
                        },
                    );
                }
            }
        }
    }
    types
}

impl Reader {
    fn read_file(&mut self, file: &SyntaxFile) {
        let root = file.root();
        let mut cursor = root.walk();
        if let Some(clause) = root
            .named_children(&mut cursor)
            .find(|node| node.kind() == "package_clause")
        {
            let text = doc_text(file.doc_comment(clause));
            if !text.is_empty() {
                if !self.doc.is_empty() {
                    self.doc.push('\n');
                }
                self.doc.push_str(&text);
            }
        }

        for decl in file.declarations() {
            match decl.kind() {
                "const_declaration" => self.read_value(file, decl, true),
                "var_declaration" => self.read_value(file, decl, false),
                "type_declaration" => self.read_type(file, decl),
                "function_declaration" => self.read_func(file, decl),
                "method_declaration" => self.read_method(file, decl),
                _ => {}
            }
        }
    }

    fn read_value(&mut self, file: &SyntaxFile, decl: Node, is_const: bool) {
        struct Spec<'t> {
            text: &'t str,
            names: Vec<String>,
            type_name: Option<String>,
        }

        // type names are computed over all specs so implicit repetition sees
        // the previous spec even when that one is unexported
        let mut specs = Vec::new();
        let mut prev: Option<String> = None;
        for spec in value_specs(decl) {
            let type_name = match spec.child_by_field_name("type") {
                Some(ty) => base_type_name(file, ty).and_then(|(name, imported)| {
                    (!imported).then_some(name)
                }),
                None if is_const && spec.child_by_field_name("value").is_none() => prev.clone(),
                None => None,
            };
            prev = type_name.clone();
            let mut inner = spec.walk();
            let names: Vec<String> = spec
                .children_by_field_name("name", &mut inner)
                .map(|n| file.text(n))
                .filter(|name| is_exported(name))
                .map(str::to_string)
                .collect();
            if !names.is_empty() {
                specs.push(Spec {
                    text: file.text(spec),
                    names,
                    type_name,
                });
            }
        }
        if specs.is_empty() {
            return;
        }

        let mut dominant: Option<&str> = None;
        let mut frequency = 0usize;
        for spec in &specs {
            let Some(name) = spec.type_name.as_deref() else {
                continue;
            };
            match dominant {
                Some(current) if current != name => {
                    dominant = None;
                    break;
                }
                _ => {
                    dominant = Some(name);
                    frequency += 1;
                }
            }
        }

        let keyword = if is_const { "const" } else { "var" };
        let decl_text = if is_grouped(file, decl, keyword) {
            let body: Vec<String> = specs.iter().map(|s| format!("\t{}", s.text)).collect();
            format!("{keyword} (\n{}\n)", body.join("\n"))
        } else {
            format!("{keyword} {}", specs[0].text)
        };
        let value = Value {
            doc: doc_text(file.doc_comment(decl)),
            names: specs.iter().flat_map(|s| s.names.iter().cloned()).collect(),
            decl: decl_text,
            pos: file.pos_of(decl),
        };

        let threshold = (specs.len() as f64 * TYPE_ASSOCIATION_THRESHOLD) as usize;
        let owner = dominant
            .filter(|_| frequency >= threshold)
            .and_then(|name| self.types.get_mut(name));
        match (owner, is_const) {
            (Some(ty), true) => ty.consts.push(value),
            (Some(ty), false) => ty.vars.push(value),
            (None, true) => self.consts.push(value),
            (None, false) => self.vars.push(value),
        }
    }

    fn read_type(&mut self, file: &SyntaxFile, decl: Node) {
        let specs = type_specs(decl);
        let single = specs.len() == 1;
        for spec in specs {
            let Some(name) = spec.child_by_field_name("name").map(|n| file.text(n)) else {
                continue;
            };
            let Some(ty) = self.types.get_mut(name) else {
                continue;
            };
            let doc = match file.doc_comment(spec) {
                Some(group) => group.text(),
                None if single => doc_text(file.doc_comment(decl)),
                None => String::new(),
            };
            ty.doc = doc;
            ty.decl = format!("type {}", file.text(spec));
            ty.pos = file.pos_of(spec);
        }
    }

    fn read_func(&mut self, file: &SyntaxFile, decl: Node) {
        let Some(name) = decl.child_by_field_name("name").map(|n| file.text(n)) else {
            return;
        };
        if !is_exported(name) {
            return;
        }
        let func = func_doc(file, decl, name, None);
        match self.constructed_type(file, decl) {
            Some(owner) => {
                if let Some(ty) = self.types.get_mut(&owner) {
                    ty.funcs.push(func);
                }
            }
            None => self.funcs.push(func),
        }
    }

    /// The single exported package type a function returns, if any.
    fn constructed_type(&self, file: &SyntaxFile, decl: Node) -> Option<String> {
        let result = decl.child_by_field_name("result")?;
        let type_params: BTreeSet<&str> = decl
            .child_by_field_name("type_parameters")
            .map(|list| {
                let mut names = BTreeSet::new();
                let mut cursor = list.walk();
                for param in list.named_children(&mut cursor) {
                    let mut inner = param.walk();
                    names.extend(
                        param
                            .children_by_field_name("name", &mut inner)
                            .map(|n| file.text(n)),
                    );
                }
                names
            })
            .unwrap_or_default();

        let result_types: Vec<Node> = if result.kind() == "parameter_list" {
            let mut cursor = result.walk();
            result
                .named_children(&mut cursor)
                .filter_map(|param| param.child_by_field_name("type"))
                .collect()
        } else {
            vec![result]
        };

        let mut found: Option<String> = None;
        let mut count = 0;
        for ty in result_types {
            let ty = match ty.kind() {
                "slice_type" | "array_type" => match ty.child_by_field_name("element") {
                    Some(elem) => elem,
                    None => continue,
                },
                _ => ty,
            };
            let Some((name, false)) = base_type_name(file, ty) else {
                continue;
            };
            if type_params.contains(name.as_str()) || !self.types.contains_key(&name) {
                continue;
            }
            found = Some(name);
            count += 1;
            if count > 1 {
                break;
            }
        }
        found.filter(|_| count == 1)
    }

    fn read_method(&mut self, file: &SyntaxFile, decl: Node) {
        let Some(name) = decl.child_by_field_name("name").map(|n| file.text(n)) else {
            return;
        };
        if !is_exported(name) {
            return;
        }
        let Some(recv_type) = decl.child_by_field_name("receiver").and_then(|list| {
            let mut cursor = list.walk();
            list.named_children(&mut cursor)
                .find(|n| n.kind() == "parameter_declaration")
                .and_then(|param| param.child_by_field_name("type"))
        }) else {
            return;
        };
        let Some((owner, false)) = base_type_name(file, recv_type) else {
            return;
        };
        let recv = file.text(recv_type).to_string();
        if let Some(ty) = self.types.get_mut(&owner) {
            ty.methods.push(func_doc(file, decl, name, Some(recv)));
        }
    }
}

fn func_doc(file: &SyntaxFile, decl: Node, name: &str, recv: Option<String>) -> Func {
    let end = decl
        .child_by_field_name("body")
        .map_or(decl.end_byte(), |body| body.start_byte());
    Func {
        doc: doc_text(file.doc_comment(decl)),
        name: name.to_string(),
        decl: file.source[decl.start_byte()..end].trim_end().to_string(),
        recv,
        pos: file.pos_of(decl),
    }
}

fn doc_text(group: Option<&CommentGroup>) -> String {
    group.map(CommentGroup::text).unwrap_or_default()
}

/// Whether the declaration uses the parenthesized `keyword ( ... )` form.
fn is_grouped(file: &SyntaxFile, decl: Node, keyword: &str) -> bool {
    file.text(decl)
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.trim_start().starts_with('('))
}

/// `const_spec`/`var_spec` nodes of a declaration, in order.
fn value_specs(decl: Node) -> Vec<Node> {
    let mut specs = Vec::new();
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "const_spec" | "var_spec" => specs.push(child),
            "var_spec_list" => {
                let mut inner = child.walk();
                specs.extend(
                    child
                        .named_children(&mut inner)
                        .filter(|n| n.kind() == "var_spec"),
                );
            }
            _ => {}
        }
    }
    specs
}

fn type_specs(decl: Node) -> Vec<Node> {
    let mut cursor = decl.walk();
    decl.named_children(&mut cursor)
        .filter(|n| matches!(n.kind(), "type_spec" | "type_alias"))
        .collect()
}

/// Base type name of a type expression and whether it is qualified by an
/// import. Pointers, parentheses and type arguments are looked through.
fn base_type_name(file: &SyntaxFile, ty: Node) -> Option<(String, bool)> {
    match ty.kind() {
        "type_identifier" | "identifier" => Some((file.text(ty).to_string(), false)),
        "pointer_type" | "parenthesized_type" => base_type_name(file, ty.named_child(0)?),
        "generic_type" => base_type_name(file, ty.child_by_field_name("type")?),
        "qualified_type" => {
            let name = ty.child_by_field_name("name")?;
            Some((file.text(name).to_string(), true))
        }
        _ => None,
    }
}
