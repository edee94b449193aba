//! Type expression resolution.

use super::types::{ChanDir, Field, InterfaceType, ObjectKind, Param, Signature, Type, TypeParam};
use super::{Session, UNIVERSE_TYPES};
use tree_sitter::Node;

impl<'a> Session<'a> {
    /// Resolve a type expression. `tparams` are the type parameter names in
    /// scope.
    pub fn resolve_type(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let ty = self.resolve_type_inner(file, node, tparams);
        self.record_type(file, node, &ty);
        ty
    }

    fn resolve_type_inner(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let field = |name: &str| node.child_by_field_name(name);
        match node.kind() {
            "type_identifier" | "identifier" => self.resolve_type_name(file, node, tparams),
            "qualified_type" => self.resolve_qualified(file, node),
            "pointer_type" => match node.named_child(0) {
                Some(elem) => Type::pointer(self.resolve_type(file, elem, tparams)),
                None => Type::Invalid,
            },
            "slice_type" => match field("element") {
                Some(elem) => Type::Slice(Box::new(self.resolve_type(file, elem, tparams))),
                None => Type::Invalid,
            },
            "array_type" => match field("element") {
                Some(elem) => Type::Array {
                    len: field("length")
                        .map(|len| self.text(file, len).to_string())
                        .unwrap_or_default(),
                    elem: Box::new(self.resolve_type(file, elem, tparams)),
                },
                None => Type::Invalid,
            },
            "implicit_length_array_type" => match field("element") {
                Some(elem) => Type::Array {
                    len: "...".to_string(),
                    elem: Box::new(self.resolve_type(file, elem, tparams)),
                },
                None => Type::Invalid,
            },
            "map_type" => match (field("key"), field("value")) {
                (Some(key), Some(value)) => Type::Map {
                    key: Box::new(self.resolve_type(file, key, tparams)),
                    value: Box::new(self.resolve_type(file, value, tparams)),
                },
                _ => Type::Invalid,
            },
            "channel_type" => {
                let Some(elem) = field("value") else {
                    return Type::Invalid;
                };
                let text = self.text(file, node);
                let dir = if text.starts_with("<-") {
                    ChanDir::Recv
                } else if text
                    .strip_prefix("chan")
                    .is_some_and(|rest| rest.trim_start().starts_with("<-"))
                {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: Box::new(self.resolve_type(file, elem, tparams)),
                }
            }
            "function_type" => Type::Signature(self.resolve_signature(
                file,
                field("parameters"),
                field("result"),
                tparams,
            )),
            "struct_type" => self.resolve_struct(file, node, tparams),
            "interface_type" => self.resolve_interface(file, node, tparams),
            "generic_type" => {
                let Some(base) = field("type") else {
                    return Type::Invalid;
                };
                let mut base = self.resolve_type(file, base, tparams);
                let args: Vec<Type> = match field("type_arguments") {
                    Some(list) => {
                        let mut cursor = list.walk();
                        let nodes: Vec<Node<'a>> = list
                            .named_children(&mut cursor)
                            .filter(|n| n.kind() != "comment")
                            .collect();
                        nodes
                            .into_iter()
                            .map(|arg| self.resolve_type(file, arg, tparams))
                            .collect()
                    }
                    None => Vec::new(),
                };
                if let Type::Named { args: slot, .. } = &mut base {
                    *slot = args;
                }
                base
            }
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.resolve_type(file, inner, tparams),
                None => Type::Invalid,
            },
            "type_elem" | "type_constraint" | "negated_type" | "union_type" => {
                self.resolve_constraint(file, node, tparams)
            }
            _ => Type::Invalid,
        }
    }

    fn resolve_type_name(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let name = self.text(file, node);
        if tparams.iter().any(|param| param == name) {
            return Type::TypeParam(name.to_string());
        }
        let pos = self.pos(file, node);
        match self.scope.lookup(name).map(|object| object.kind) {
            Some(ObjectKind::TypeName) => {
                self.record_use(file, node, name, ObjectKind::TypeName, None);
                if self.is_alias(name) {
                    self.resolve_type_decl(name);
                    return self
                        .scope
                        .lookup(name)
                        .map(|object| object.ty.clone())
                        .unwrap_or(Type::Invalid);
                }
                Type::local(name)
            }
            Some(_) => {
                self.error(pos, format!("{name} is not a type"));
                Type::Invalid
            }
            None if name == "any" => Type::Interface(InterfaceType::default()),
            None if UNIVERSE_TYPES.contains(&name) => Type::basic(name),
            None if self.has_dot_import(file) => Type::Invalid,
            None => {
                self.error(pos, format!("undefined: {name}"));
                Type::Invalid
            }
        }
    }

    fn resolve_qualified(&mut self, file: usize, node: Node<'a>) -> Type {
        let (Some(package), Some(name)) = (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) else {
            return Type::Invalid;
        };
        let local = self.text(file, package);
        let member = self.text(file, name);
        let Some(import) = self.file_import(file, local) else {
            let pos = self.pos(file, package);
            self.error(pos, format!("undefined: {local}"));
            return Type::Invalid;
        };
        let pos = self.pos(file, name);
        if !crate::methods::is_exported(member) {
            self.error(
                pos,
                format!("name {member} not exported by package {}", import.name),
            );
            return Type::Invalid;
        }
        if !import.exports(member) {
            self.error(pos, format!("undefined: {local}.{member}"));
            return Type::Invalid;
        }
        self.record_use(
            file,
            name,
            member,
            ObjectKind::TypeName,
            Some(import.path.clone()),
        );
        Type::Named {
            package: Some(import.name.clone()),
            name: member.to_string(),
            args: Vec::new(),
        }
    }

    /// Resolve a constraint or type set: `~int | ~float64`, `comparable`.
    fn resolve_constraint(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let mut terms = Vec::new();
        self.collect_terms(node, &mut terms);
        match terms.as_slice() {
            [single] if single.kind() != "negated_type" => {
                self.resolve_type(file, *single, tparams)
            }
            _ => Type::Union(
                terms
                    .into_iter()
                    .map(|term| {
                        if term.kind() == "negated_type" {
                            let inner = term
                                .named_child(0)
                                .map(|inner| self.resolve_type(file, inner, tparams))
                                .unwrap_or(Type::Invalid);
                            (true, inner)
                        } else {
                            (false, self.resolve_type(file, term, tparams))
                        }
                    })
                    .collect(),
            ),
        }
    }

    fn collect_terms(&self, node: Node<'a>, terms: &mut Vec<Node<'a>>) {
        match node.kind() {
            "type_elem" | "type_constraint" | "union_type" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'a>> = node
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                for child in children {
                    self.collect_terms(child, terms);
                }
            }
            _ => terms.push(node),
        }
    }

    /// Resolve a type parameter list, declaring every name before resolving
    /// the constraints so constraints may refer to sibling parameters.
    pub fn resolve_type_params(&mut self, file: usize, list: Option<Node<'a>>) -> Vec<TypeParam> {
        let Some(list) = list else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        let decls: Vec<Node<'a>> = list
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "type_parameter_declaration")
            .collect();
        let mut groups = Vec::new();
        for decl in decls {
            let mut cursor = decl.walk();
            let names: Vec<Node<'a>> = decl.children_by_field_name("name", &mut cursor).collect();
            groups.push((names, decl.child_by_field_name("type")));
        }
        let all: Vec<String> = groups
            .iter()
            .flat_map(|(names, _)| names.iter().map(|n| self.text(file, *n).to_string()))
            .collect();

        let mut params = Vec::new();
        for (names, constraint) in groups {
            let constraint = constraint
                .map(|c| self.resolve_constraint(file, c, &all))
                .unwrap_or(Type::Invalid);
            for name in names {
                params.push(TypeParam {
                    name: self.text(file, name).to_string(),
                    constraint: constraint.clone(),
                });
            }
        }
        params
    }

    pub fn resolve_signature(
        &mut self,
        file: usize,
        params: Option<Node<'a>>,
        result: Option<Node<'a>>,
        tparams: &[String],
    ) -> Signature {
        let (params, variadic) = match params {
            Some(list) => self.resolve_params(file, list, tparams),
            None => (Vec::new(), false),
        };
        let results = match result {
            None => Vec::new(),
            Some(list) if list.kind() == "parameter_list" => {
                self.resolve_params(file, list, tparams).0
            }
            Some(ty) => vec![Param {
                name: None,
                ty: self.resolve_type(file, ty, tparams),
            }],
        };
        Signature {
            type_params: Vec::new(),
            params,
            results,
            variadic,
        }
    }

    fn resolve_params(
        &mut self,
        file: usize,
        list: Node<'a>,
        tparams: &[String],
    ) -> (Vec<Param>, bool) {
        let mut cursor = list.walk();
        let decls: Vec<Node<'a>> = list.named_children(&mut cursor).collect();
        let mut params = Vec::new();
        let mut variadic = false;
        for decl in decls {
            let ty = decl.child_by_field_name("type");
            match decl.kind() {
                "parameter_declaration" => {
                    let ty = ty
                        .map(|ty| self.resolve_type(file, ty, tparams))
                        .unwrap_or(Type::Invalid);
                    let mut cursor = decl.walk();
                    let names: Vec<Node<'a>> =
                        decl.children_by_field_name("name", &mut cursor).collect();
                    if names.is_empty() {
                        params.push(Param {
                            name: None,
                            ty: ty.clone(),
                        });
                    }
                    for name in names {
                        params.push(Param {
                            name: Some(self.text(file, name).to_string()),
                            ty: ty.clone(),
                        });
                    }
                }
                "variadic_parameter_declaration" => {
                    let elem = ty
                        .map(|ty| self.resolve_type(file, ty, tparams))
                        .unwrap_or(Type::Invalid);
                    params.push(Param {
                        name: decl
                            .child_by_field_name("name")
                            .map(|n| self.text(file, n).to_string()),
                        ty: Type::Slice(Box::new(elem)),
                    });
                    variadic = true;
                }
                _ => {}
            }
        }
        (params, variadic)
    }

    fn resolve_struct(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let mut cursor = node.walk();
        let Some(list) = node
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Type::Struct(Vec::new());
        };
        let mut cursor = list.walk();
        let decls: Vec<Node<'a>> = list
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "field_declaration")
            .collect();

        let mut fields = Vec::new();
        for decl in decls {
            let tag = decl
                .child_by_field_name("tag")
                .map(|tag| self.text(file, tag).to_string());
            let Some(ty_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut cursor = decl.walk();
            let names: Vec<Node<'a>> = decl.children_by_field_name("name", &mut cursor).collect();
            let ty = self.resolve_type(file, ty_node, tparams);
            if names.is_empty() {
                let mut cursor = decl.walk();
                let star = decl.children(&mut cursor).any(|n| n.kind() == "*");
                fields.push(Field {
                    name: embedded_name(ty_node, &self.files[file].source),
                    ty: if star { Type::pointer(ty) } else { ty },
                    embedded: true,
                    tag,
                });
                continue;
            }
            for name in names {
                fields.push(Field {
                    name: self.text(file, name).to_string(),
                    ty: ty.clone(),
                    embedded: false,
                    tag: tag.clone(),
                });
            }
        }
        Type::Struct(fields)
    }

    fn resolve_interface(&mut self, file: usize, node: Node<'a>, tparams: &[String]) -> Type {
        let mut cursor = node.walk();
        let elems: Vec<Node<'a>> = node
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        let mut iface = InterfaceType::default();
        for elem in elems {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    let signature = self.resolve_signature(
                        file,
                        elem.child_by_field_name("parameters"),
                        elem.child_by_field_name("result"),
                        tparams,
                    );
                    iface
                        .methods
                        .push((self.text(file, name).to_string(), signature));
                }
                "type_elem" | "constraint_elem" => {
                    let ty = self.resolve_constraint(file, elem, tparams);
                    iface.embedded.push(ty);
                }
                _ => {
                    let ty = self.resolve_type(file, elem, tparams);
                    iface.embedded.push(ty);
                }
            }
        }
        Type::Interface(iface)
    }
}

/// Implicit field name of an embedded field: the type name without
/// package qualifier, pointer or type arguments.
pub(crate) fn embedded_name(node: Node, source: &str) -> String {
    match node.kind() {
        "pointer_type" | "parenthesized_type" => node
            .named_child(0)
            .map(|inner| embedded_name(inner, source))
            .unwrap_or_default(),
        "qualified_type" => node
            .child_by_field_name("name")
            .map(|name| source[name.byte_range()].to_string())
            .unwrap_or_default(),
        "generic_type" => node
            .child_by_field_name("type")
            .map(|inner| embedded_name(inner, source))
            .unwrap_or_default(),
        _ => source[node.byte_range()].to_string(),
    }
}
