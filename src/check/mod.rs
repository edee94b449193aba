//! Package-level declaration checker.
//!
//! Resolves every top-level declaration of a package: type expressions,
//! function signatures, methods and the types of constants and variables.
//! Function bodies are only scanned for import usage. The first diagnostic
//! in position order fails the whole check.

pub mod importer;
pub mod info;
mod infer;
mod resolve;
pub mod types;

pub use importer::{ImportedPackage, Importer, SourceImporter};
pub use info::{ObjectRef, TypeInfo};
pub use types::{
    ChanDir, CheckedPackage, Field, InterfaceType, Method, Object, ObjectKind, PackageImport,
    Param, Scope, Signature, Type, TypeDef, TypeParam,
};

use crate::error::{PackageError, PackageResult};
use crate::syntax::{self, FileSet, SyntaxFile};
use crate::types::Pos;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tree_sitter::Node;

/// Predeclared type names.
pub(crate) const UNIVERSE_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

/// Checks the files of one package against an [`Importer`].
pub struct Checker<'i> {
    importer: &'i dyn Importer,
}

impl<'i> Checker<'i> {
    pub fn new(importer: &'i dyn Importer) -> Self {
        Self { importer }
    }

    /// Check `files` (all declaring package `name`) located in `dir`.
    pub fn check(
        &self,
        name: &str,
        dir: &Path,
        fileset: &FileSet,
        files: &[&SyntaxFile],
    ) -> PackageResult<CheckedPackage> {
        self.run(name, dir, fileset, files, false).map(|(package, _)| package)
    }

    /// Like [`check`](Self::check), also recording the annotation index.
    pub fn check_with_info(
        &self,
        name: &str,
        dir: &Path,
        fileset: &FileSet,
        files: &[&SyntaxFile],
    ) -> PackageResult<(CheckedPackage, TypeInfo)> {
        self.run(name, dir, fileset, files, true)
            .map(|(package, info)| (package, info.unwrap_or_default()))
    }

    fn run(
        &self,
        name: &str,
        dir: &Path,
        fileset: &FileSet,
        files: &[&SyntaxFile],
        record: bool,
    ) -> PackageResult<(CheckedPackage, Option<TypeInfo>)> {
        let mut session = Session::new(dir, files, self.importer, record);
        session.collect_imports();
        session.collect();
        session.resolve_types();
        session.resolve_funcs();
        session.resolve_methods();
        session.resolve_values();
        session.report_unused_imports();

        if let Some((pos, message)) = session.diagnostics.iter().next() {
            debug!(
                "check of {name} failed with {} diagnostics",
                session.diagnostics.len()
            );
            return Err(PackageError::type_check(fileset.position(*pos), message.clone()));
        }
        debug!("checked {name}: {} objects", session.scope.len());
        let imports = session
            .import_paths
            .into_iter()
            .map(|(path, name)| PackageImport { path, name })
            .collect();
        Ok((
            CheckedPackage {
                name: name.to_string(),
                scope: session.scope,
                imports,
            },
            session.info,
        ))
    }
}

/// A declaration waiting for resolution.
#[derive(Debug, Clone, Copy)]
pub(super) struct Decl<'a> {
    pub file: usize,
    pub kind: ObjectKind,
    pub name: Node<'a>,
    /// `function_declaration`, `type_spec`, `type_alias`, `const_spec` or `var_spec`
    pub spec: Node<'a>,
    pub type_expr: Option<Node<'a>>,
    pub value: Option<Node<'a>>,
    /// Result picked from a multi-value call initializer
    pub result_index: usize,
}

#[derive(Debug)]
struct FileImport {
    package: Arc<ImportedPackage>,
    alias: Option<String>,
    pos: Pos,
    used: bool,
}

pub(super) struct Session<'a> {
    dir: &'a Path,
    files: &'a [&'a SyntaxFile],
    importer: &'a dyn Importer,
    pub scope: Scope,
    pub decls: HashMap<String, Decl<'a>>,
    /// Declarations of `_` and `init`, checked but never declared
    hidden: Vec<Decl<'a>>,
    methods: Vec<(usize, Node<'a>)>,
    imports: Vec<BTreeMap<String, FileImport>>,
    dot_imports: Vec<bool>,
    import_paths: BTreeMap<String, String>,
    pub diagnostics: BTreeSet<(Pos, String)>,
    pub in_progress: HashSet<String>,
    pub done: HashSet<String>,
    pub info: Option<TypeInfo>,
}

impl<'a> Session<'a> {
    fn new(
        dir: &'a Path,
        files: &'a [&'a SyntaxFile],
        importer: &'a dyn Importer,
        record: bool,
    ) -> Self {
        Self {
            dir,
            files,
            importer,
            scope: Scope::default(),
            decls: HashMap::new(),
            hidden: Vec::new(),
            methods: Vec::new(),
            imports: files.iter().map(|_| BTreeMap::new()).collect(),
            dot_imports: vec![false; files.len()],
            import_paths: BTreeMap::new(),
            diagnostics: BTreeSet::new(),
            in_progress: HashSet::new(),
            done: HashSet::new(),
            info: record.then(TypeInfo::default),
        }
    }

    pub fn text(&self, file: usize, node: Node) -> &'a str {
        let source: &'a str = &self.files[file].source;
        &source[node.byte_range()]
    }

    pub fn pos(&self, file: usize, node: Node) -> Pos {
        self.files[file].pos_of(node)
    }

    pub fn error(&mut self, pos: Pos, message: impl Into<String>) {
        self.diagnostics.insert((pos, message.into()));
    }

    pub fn has_dot_import(&self, file: usize) -> bool {
        self.dot_imports[file]
    }

    /// Import bound to `local` in `file`.
    pub fn file_import(&self, file: usize, local: &str) -> Option<Arc<ImportedPackage>> {
        self.imports[file]
            .get(local)
            .map(|import| Arc::clone(&import.package))
    }

    pub fn record_def(&mut self, file: usize, node: Node, kind: ObjectKind) {
        let name = self.text(file, node).to_string();
        let span = self.files[file].span(node);
        if let Some(info) = self.info.as_mut() {
            info.defs.insert(
                span,
                ObjectRef {
                    name,
                    kind,
                    package: None,
                },
            );
        }
    }

    pub fn record_use(
        &mut self,
        file: usize,
        node: Node,
        name: &str,
        kind: ObjectKind,
        package: Option<String>,
    ) {
        let span = self.files[file].span(node);
        if let Some(info) = self.info.as_mut() {
            info.uses.insert(
                span,
                ObjectRef {
                    name: name.to_string(),
                    kind,
                    package,
                },
            );
        }
    }

    pub fn record_type(&mut self, file: usize, node: Node, ty: &Type) {
        if matches!(ty, Type::Invalid) {
            return;
        }
        let span = self.files[file].span(node);
        if let Some(info) = self.info.as_mut() {
            info.types.insert(span, ty.clone());
        }
    }

    fn collect_imports(&mut self) {
        let files = self.files;
        for (idx, &file) in files.iter().enumerate() {
            for (alias, path, spec) in syntax::import_specs(file.root(), &file.source) {
                let pos = file.pos_of(spec);
                let package = match self.importer.import(&path, self.dir) {
                    Ok(package) => package,
                    Err(reason) => {
                        self.error(pos, format!("could not import {path} ({reason})"));
                        continue;
                    }
                };
                self.import_paths
                    .insert(path.clone(), package.name.clone());
                let local = match alias.as_deref() {
                    Some("_") => continue,
                    Some(".") => {
                        self.dot_imports[idx] = true;
                        continue;
                    }
                    Some(alias) => alias.to_string(),
                    None => package.name.clone(),
                };
                if let Some(previous) = self.imports[idx].get(&local) {
                    let message = format!(
                        "{local} redeclared in this block (imported as \"{}\")",
                        previous.package.path
                    );
                    self.error(pos, message);
                    continue;
                }
                self.imports[idx].insert(
                    local,
                    FileImport {
                        package,
                        alias,
                        pos,
                        used: false,
                    },
                );
            }
            self.mark_import_uses(idx, file.root());
        }
    }

    /// Mark imports referenced by qualified types and selectors anywhere in
    /// the file, function bodies included.
    fn mark_import_uses(&mut self, file: usize, root: Node<'a>) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let qualifier = match node.kind() {
                "qualified_type" => node.child_by_field_name("package"),
                "selector_expression" => node
                    .child_by_field_name("operand")
                    .filter(|operand| operand.kind() == "identifier"),
                _ => None,
            };
            if let Some(qualifier) = qualifier {
                let local = self.text(file, qualifier);
                if let Some(import) = self.imports[file].get_mut(local) {
                    import.used = true;
                }
            }
            let mut cursor = node.walk();
            stack.extend(node.named_children(&mut cursor));
        }
    }

    fn report_unused_imports(&mut self) {
        let unused: Vec<(Pos, String)> = self
            .imports
            .iter()
            .flat_map(|imports| imports.values())
            .filter(|import| !import.used && import.package.path != "C")
            .map(|import| {
                let message = match &import.alias {
                    Some(alias) => format!(
                        "\"{}\" imported as {alias} and not used",
                        import.package.path
                    ),
                    None => format!("\"{}\" imported and not used", import.package.path),
                };
                (import.pos, message)
            })
            .collect();
        self.diagnostics.extend(unused);
    }

    fn collect(&mut self) {
        let files = self.files;
        for (idx, &file) in files.iter().enumerate() {
            for decl in file.declarations() {
                match decl.kind() {
                    "function_declaration" => {
                        let Some(name) = decl.child_by_field_name("name") else {
                            continue;
                        };
                        self.declare(Decl {
                            file: idx,
                            kind: ObjectKind::Func,
                            name,
                            spec: decl,
                            type_expr: None,
                            value: None,
                            result_index: 0,
                        });
                    }
                    "method_declaration" => self.methods.push((idx, decl)),
                    "type_declaration" => {
                        let mut cursor = decl.walk();
                        let specs: Vec<Node<'a>> = decl
                            .named_children(&mut cursor)
                            .filter(|n| matches!(n.kind(), "type_spec" | "type_alias"))
                            .collect();
                        for spec in specs {
                            let Some(name) = spec.child_by_field_name("name") else {
                                continue;
                            };
                            self.declare(Decl {
                                file: idx,
                                kind: ObjectKind::TypeName,
                                name,
                                spec,
                                type_expr: spec.child_by_field_name("type"),
                                value: None,
                                result_index: 0,
                            });
                        }
                    }
                    "const_declaration" => self.collect_consts(idx, decl),
                    "var_declaration" => self.collect_vars(idx, decl),
                    _ => {}
                }
            }
        }
    }

    fn collect_consts(&mut self, file: usize, decl: Node<'a>) {
        let mut cursor = decl.walk();
        let specs: Vec<Node<'a>> = decl
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "const_spec")
            .collect();
        let mut last_type = None;
        let mut last_values: Vec<Node<'a>> = Vec::new();
        for spec in specs {
            let mut type_expr = spec.child_by_field_name("type");
            let mut values = expression_list(spec.child_by_field_name("value"));
            // a bare name repeats the previous type and initializer
            if type_expr.is_none() && values.is_empty() {
                type_expr = last_type;
                values = last_values.clone();
            } else {
                last_type = type_expr;
                last_values = values.clone();
            }
            let mut cursor = spec.walk();
            let names: Vec<Node<'a>> = spec.children_by_field_name("name", &mut cursor).collect();
            for (i, name) in names.into_iter().enumerate() {
                let value = values.get(i).copied();
                if value.is_none() {
                    let pos = self.pos(file, name);
                    self.error(pos, "missing init expr for const declaration");
                }
                self.declare(Decl {
                    file,
                    kind: ObjectKind::Const,
                    name,
                    spec,
                    type_expr,
                    value,
                    result_index: 0,
                });
            }
        }
    }

    fn collect_vars(&mut self, file: usize, decl: Node<'a>) {
        let mut specs = Vec::new();
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            if node.kind() == "var_spec" {
                specs.push(node);
                continue;
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        for spec in specs {
            let type_expr = spec.child_by_field_name("type");
            let values = expression_list(spec.child_by_field_name("value"));
            let mut cursor = spec.walk();
            let names: Vec<Node<'a>> = spec.children_by_field_name("name", &mut cursor).collect();
            if !values.is_empty() && values.len() != names.len() && values.len() != 1 {
                let pos = self.pos(file, spec);
                self.error(
                    pos,
                    format!(
                        "assignment mismatch: {} variables but {} values",
                        names.len(),
                        values.len()
                    ),
                );
            }
            for (i, name) in names.iter().enumerate() {
                let (value, result_index) = if values.len() == names.len() {
                    (values.get(i).copied(), 0)
                } else {
                    (values.first().copied(), i)
                };
                self.declare(Decl {
                    file,
                    kind: ObjectKind::Var,
                    name: *name,
                    spec,
                    type_expr,
                    value,
                    result_index,
                });
            }
        }
    }

    fn declare(&mut self, decl: Decl<'a>) {
        let name = self.text(decl.file, decl.name);
        if name == "_" || (decl.kind == ObjectKind::Func && name == "init") {
            self.hidden.push(decl);
            return;
        }
        let pos = self.pos(decl.file, decl.name);
        if self.scope.lookup(name).is_some() {
            self.error(pos, format!("{name} redeclared in this block"));
            return;
        }
        self.scope.insert(Object {
            name: name.to_string(),
            kind: decl.kind,
            ty: Type::Invalid,
            pos,
            type_def: None,
        });
        self.decls.insert(name.to_string(), decl);
        self.record_def(decl.file, decl.name, decl.kind);
    }

    fn sorted_decls(&self, kind: ObjectKind) -> Vec<(String, Decl<'a>)> {
        let mut decls: Vec<(String, Decl<'a>)> = self
            .decls
            .iter()
            .filter(|(_, decl)| decl.kind == kind)
            .map(|(name, decl)| (name.clone(), *decl))
            .collect();
        decls.sort_by_key(|(_, decl)| self.pos(decl.file, decl.name));
        decls
    }

    fn resolve_types(&mut self) {
        for (name, _) in self.sorted_decls(ObjectKind::TypeName) {
            self.resolve_type_decl(&name);
        }
        let hidden: Vec<Decl<'a>> = self
            .hidden
            .iter()
            .filter(|d| d.kind == ObjectKind::TypeName)
            .copied()
            .collect();
        for decl in hidden {
            if let Some(expr) = decl.type_expr {
                self.resolve_type(decl.file, expr, &[]);
            }
        }
        self.flatten_underlying();
    }

    /// Give every type defined from another local named type (`type U S`)
    /// the underlying type `S` ends at, so fields, embedded interfaces and
    /// receiver checks see through the chain.
    fn flatten_underlying(&mut self) {
        for (name, decl) in self.sorted_decls(ObjectKind::TypeName) {
            let Some(def) = self.scope.lookup(&name).and_then(|o| o.type_def.as_ref()) else {
                continue;
            };
            if def.alias || !matches!(def.underlying.local_base(), Some((_, false))) {
                continue;
            }
            match self.scope.underlying(&name).cloned() {
                Some(underlying) => {
                    if let Some(def) = self
                        .scope
                        .lookup_mut(&name)
                        .and_then(|o| o.type_def.as_mut())
                    {
                        def.underlying = underlying;
                    }
                }
                None => {
                    let pos = self.pos(decl.file, decl.name);
                    self.error(pos, format!("invalid recursive type {name}"));
                }
            }
        }
    }

    /// Resolve the definition of the declared type `name` once.
    pub fn resolve_type_decl(&mut self, name: &str) {
        if self.done.contains(name) {
            return;
        }
        let Some(decl) = self.decls.get(name).copied() else {
            return;
        };
        if !self.in_progress.insert(name.to_string()) {
            let pos = self.pos(decl.file, decl.name);
            self.error(pos, format!("invalid recursive type alias {name}"));
            return;
        }
        let type_params =
            self.resolve_type_params(decl.file, decl.spec.child_by_field_name("type_parameters"));
        let names: Vec<String> = type_params.iter().map(|tp| tp.name.clone()).collect();
        let underlying = match decl.type_expr {
            Some(expr) => self.resolve_type(decl.file, expr, &names),
            None => Type::Invalid,
        };
        let alias = decl.spec.kind() == "type_alias";
        if let Some(object) = self.scope.lookup_mut(name) {
            object.ty = if alias {
                underlying.clone()
            } else {
                Type::local(name)
            };
            object.type_def = Some(TypeDef {
                underlying,
                alias,
                type_params,
                methods: Vec::new(),
            });
        }
        self.in_progress.remove(name);
        self.done.insert(name.to_string());
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.decls
            .get(name)
            .is_some_and(|decl| decl.spec.kind() == "type_alias")
    }

    fn resolve_funcs(&mut self) {
        let mut decls = self.sorted_decls(ObjectKind::Func);
        decls.extend(
            self.hidden
                .iter()
                .filter(|d| d.kind == ObjectKind::Func)
                .map(|d| (String::new(), *d)),
        );
        for (name, decl) in decls {
            let type_params = self
                .resolve_type_params(decl.file, decl.spec.child_by_field_name("type_parameters"));
            let names: Vec<String> = type_params.iter().map(|tp| tp.name.clone()).collect();
            let mut signature = self.resolve_signature(
                decl.file,
                decl.spec.child_by_field_name("parameters"),
                decl.spec.child_by_field_name("result"),
                &names,
            );
            signature.type_params = type_params;
            if let Some(object) = self.scope.lookup_mut(&name) {
                object.ty = Type::Signature(signature);
                self.done.insert(name);
            }
        }
    }

    fn resolve_methods(&mut self) {
        let methods = std::mem::take(&mut self.methods);
        for (file, decl) in methods {
            self.resolve_method(file, decl);
        }
    }

    fn resolve_method(&mut self, file: usize, decl: Node<'a>) {
        let Some(name_node) = decl.child_by_field_name("name") else {
            return;
        };
        let Some(receiver) = decl.child_by_field_name("receiver").and_then(|list| {
            let mut cursor = list.walk();
            list.named_children(&mut cursor)
                .find(|n| n.kind() == "parameter_declaration")
        }) else {
            return;
        };
        let Some(recv_type) = receiver.child_by_field_name("type") else {
            return;
        };
        let recv_name = receiver
            .child_by_field_name("name")
            .map(|n| self.text(file, n).to_string());

        let (base, pointer, type_params) = self.receiver_base(file, recv_type);
        let Some(base) = base else {
            let pos = self.pos(file, recv_type);
            let text = self.text(file, recv_type);
            self.error(pos, format!("invalid receiver type {text}"));
            return;
        };
        let base_name = self.text(file, base);
        let base_pos = self.pos(file, base);
        let owner = match self.scope.lookup(base_name).map(|o| o.kind) {
            Some(ObjectKind::TypeName) => {
                self.record_use(file, base, base_name, ObjectKind::TypeName, None);
                self.method_owner(base_name)
            }
            Some(_) => {
                self.error(base_pos, format!("{base_name} is not a type"));
                return;
            }
            None if UNIVERSE_TYPES.contains(&base_name) => {
                self.error(
                    base_pos,
                    format!("cannot define new methods on non-local type {base_name}"),
                );
                return;
            }
            None => {
                self.error(base_pos, format!("undefined: {base_name}"));
                return;
            }
        };
        let Some(owner) = owner else {
            self.error(
                base_pos,
                format!("cannot define new methods on non-local type {base_name}"),
            );
            return;
        };

        let signature = self.resolve_signature(
            file,
            decl.child_by_field_name("parameters"),
            decl.child_by_field_name("result"),
            &type_params,
        );
        let method_name = self.text(file, name_node);
        if method_name == "_" {
            return;
        }
        self.record_def(file, name_node, ObjectKind::Func);
        let method_pos = self.pos(file, name_node);

        let Some(def) = self.scope.type_def(&owner).cloned() else {
            return;
        };
        if matches!(def.underlying, Type::Pointer(_) | Type::Interface(_)) {
            self.error(
                base_pos,
                format!("invalid receiver type {base_name} (pointer or interface type)"),
            );
            return;
        }
        if let Some(previous) = def.methods.iter().find(|m| m.name == method_name) {
            let previous = previous.pos;
            let other = self.files.iter().find_map(|f| {
                let end = f.base.offset(f.source.len());
                (previous >= f.base && previous <= end).then(|| {
                    let offset = (previous.value() - f.base.value()) as usize;
                    let line = f.source[..offset].matches('\n').count() + 1;
                    format!("{}:{line}", f.file_name())
                })
            });
            self.error(
                method_pos,
                format!(
                    "method {owner}.{method_name} already declared at {}",
                    other.unwrap_or_default()
                ),
            );
            return;
        }
        if let Type::Struct(fields) = &def.underlying {
            if fields.iter().any(|f| f.name == method_name) {
                self.error(
                    method_pos,
                    format!("field and method with the same name {method_name}"),
                );
                return;
            }
        }

        let receiver_type = Type::local(owner.clone());
        let method = Method {
            name: method_name.to_string(),
            receiver: Param {
                name: recv_name,
                ty: if pointer {
                    Type::pointer(receiver_type)
                } else {
                    receiver_type
                },
            },
            pointer_receiver: pointer,
            signature,
            pos: method_pos,
        };
        if let Some(def) = self
            .scope
            .lookup_mut(&owner)
            .and_then(|o| o.type_def.as_mut())
        {
            def.methods.push(method);
        }
    }

    /// Local named type receiving methods declared on `name`, following
    /// aliases. `None` when the alias leads outside the package.
    fn method_owner(&self, name: &str) -> Option<String> {
        let mut current = name.to_string();
        for _ in 0..16 {
            let object = self.scope.lookup(&current)?;
            let def = object.type_def.as_ref()?;
            if !def.alias {
                return Some(current);
            }
            current = def.underlying.local_base().filter(|(_, ptr)| !ptr)?.0.to_string();
        }
        None
    }

    /// Base type identifier of a receiver, whether it is a pointer, and the
    /// receiver's type parameter names.
    fn receiver_base(&self, file: usize, node: Node<'a>) -> (Option<Node<'a>>, bool, Vec<String>) {
        let mut node = node;
        let mut pointer = false;
        loop {
            match node.kind() {
                "parenthesized_type" => match node.named_child(0) {
                    Some(inner) => node = inner,
                    None => return (None, pointer, Vec::new()),
                },
                "pointer_type" if !pointer => match node.named_child(0) {
                    Some(inner) => {
                        pointer = true;
                        node = inner;
                    }
                    None => return (None, pointer, Vec::new()),
                },
                "generic_type" => {
                    let params = node
                        .child_by_field_name("type_arguments")
                        .map(|args| {
                            let mut cursor = args.walk();
                            args.named_children(&mut cursor)
                                .filter(|n| n.kind() != "comment")
                                .map(|n| self.text(file, n).to_string())
                                .collect()
                        })
                        .unwrap_or_default();
                    let base = node
                        .child_by_field_name("type")
                        .filter(|n| n.kind() == "type_identifier");
                    return (base, pointer, params);
                }
                "type_identifier" => return (Some(node), pointer, Vec::new()),
                _ => return (None, pointer, Vec::new()),
            }
        }
    }

    fn resolve_values(&mut self) {
        let mut decls = self.sorted_decls(ObjectKind::Const);
        decls.extend(self.sorted_decls(ObjectKind::Var));
        for (name, _) in decls {
            self.resolve_value(&name);
        }
        let hidden: Vec<Decl<'a>> = self
            .hidden
            .iter()
            .filter(|d| matches!(d.kind, ObjectKind::Const | ObjectKind::Var))
            .copied()
            .collect();
        for decl in hidden {
            self.value_decl_type(decl);
        }
    }
}

/// Expressions of an `expression_list` node.
fn expression_list(list: Option<Node>) -> Vec<Node> {
    let Some(list) = list else {
        return Vec::new();
    };
    if list.kind() != "expression_list" {
        return vec![list];
    }
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}
