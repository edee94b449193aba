//! Types of package-level constants and variables.
//!
//! Only initializer shapes that determine a type without looking into
//! function bodies are inferred: literals, composite literals, conversions,
//! calls of package functions and of the `new`/`make` builtins, and
//! references to other package-level values. Anything else is left as
//! [`Type::Invalid`] without a diagnostic.

use super::types::{ObjectKind, Type};
use super::{Decl, Session, UNIVERSE_TYPES};
use tree_sitter::Node;

const COMPARISONS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

impl<'a> Session<'a> {
    /// Type of the package-level constant or variable `name`, inferred once.
    pub fn resolve_value(&mut self, name: &str) -> Type {
        let Some(decl) = self.decls.get(name).copied() else {
            return Type::Invalid;
        };
        if self.done.contains(name) || !matches!(decl.kind, ObjectKind::Const | ObjectKind::Var) {
            return self
                .scope
                .lookup(name)
                .map(|object| object.ty.clone())
                .unwrap_or(Type::Invalid);
        }
        if !self.in_progress.insert(name.to_string()) {
            let pos = self.pos(decl.file, decl.name);
            self.error(pos, format!("initialization cycle: {name} refers to itself"));
            return Type::Invalid;
        }
        let ty = self.value_decl_type(decl);
        if let Some(object) = self.scope.lookup_mut(name) {
            object.ty = ty.clone();
        }
        self.in_progress.remove(name);
        self.done.insert(name.to_string());
        ty
    }

    pub fn value_decl_type(&mut self, decl: Decl<'a>) -> Type {
        if let Some(expr) = decl.type_expr {
            // the initializer is still walked for references
            if let Some(value) = decl.value {
                self.expr_type(decl.file, value, decl.result_index);
            }
            return self.resolve_type(decl.file, expr, &[]);
        }
        let Some(value) = decl.value else {
            return Type::Invalid;
        };
        let ty = self.expr_type(decl.file, value, decl.result_index);
        match decl.kind {
            ObjectKind::Var => ty.default_type(),
            _ => ty,
        }
    }

    /// Type of an initializer expression. `result` picks one result of a
    /// multi-value call.
    pub fn expr_type(&mut self, file: usize, node: Node<'a>, result: usize) -> Type {
        let ty = self.expr_type_inner(file, node, result);
        self.record_type(file, node, &ty);
        ty
    }

    fn expr_type_inner(&mut self, file: usize, node: Node<'a>, result: usize) -> Type {
        let field = |name: &str| node.child_by_field_name(name);
        match node.kind() {
            "int_literal" | "iota" => Type::basic("untyped int"),
            "float_literal" => Type::basic("untyped float"),
            "imaginary_literal" => Type::basic("untyped complex"),
            "rune_literal" => Type::basic("untyped rune"),
            "interpreted_string_literal" | "raw_string_literal" => Type::basic("untyped string"),
            "true" | "false" => Type::basic("untyped bool"),
            "nil" => Type::basic("untyped nil"),
            "identifier" => self.identifier_type(file, node),
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.expr_type(file, inner, result),
                None => Type::Invalid,
            },
            "unary_expression" => {
                let Some(operand) = field("operand") else {
                    return Type::Invalid;
                };
                let operator = field("operator")
                    .map(|op| self.text(file, op))
                    .unwrap_or_default();
                let inner = self.expr_type(file, operand, 0);
                match operator {
                    "&" => Type::pointer(inner),
                    "!" => inner,
                    "<-" => match inner {
                        Type::Chan { elem, .. } => *elem,
                        _ => Type::Invalid,
                    },
                    _ => inner,
                }
            }
            "binary_expression" => {
                let (Some(left), Some(right)) = (field("left"), field("right")) else {
                    return Type::Invalid;
                };
                let operator = field("operator")
                    .map(|op| self.text(file, op))
                    .unwrap_or_default();
                let lhs = self.expr_type(file, left, 0);
                let rhs = self.expr_type(file, right, 0);
                if COMPARISONS.contains(&operator) {
                    return Type::basic("untyped bool");
                }
                if matches!(operator, "<<" | ">>" | "&&" | "||") || !lhs.is_untyped() {
                    return lhs;
                }
                if !rhs.is_untyped() {
                    return rhs;
                }
                if untyped_rank(&rhs) > untyped_rank(&lhs) {
                    rhs
                } else {
                    lhs
                }
            }
            "composite_literal" => match field("type") {
                Some(ty) => self.resolve_type(file, ty, &[]),
                None => Type::Invalid,
            },
            "func_literal" => Type::Signature(self.resolve_signature(
                file,
                field("parameters"),
                field("result"),
                &[],
            )),
            "type_conversion_expression" | "type_assertion_expression" => match field("type") {
                Some(ty) => self.resolve_type(file, ty, &[]),
                None => Type::Invalid,
            },
            "call_expression" => self.call_type(file, node, result),
            "index_expression" => {
                let Some(operand) = field("operand") else {
                    return Type::Invalid;
                };
                match self.expr_type(file, operand, 0) {
                    Type::Slice(elem) | Type::Array { elem, .. } => *elem,
                    Type::Map { value, .. } => *value,
                    _ => Type::Invalid,
                }
            }
            "slice_expression" => match field("operand") {
                Some(operand) => self.expr_type(file, operand, 0).default_type(),
                None => Type::Invalid,
            },
            _ => Type::Invalid,
        }
    }

    fn identifier_type(&mut self, file: usize, node: Node<'a>) -> Type {
        let name = self.text(file, node);
        let Some(kind) = self.scope.lookup(name).map(|object| object.kind) else {
            return match name {
                "true" | "false" => Type::basic("untyped bool"),
                "nil" => Type::basic("untyped nil"),
                "iota" => Type::basic("untyped int"),
                _ => Type::Invalid,
            };
        };
        self.record_use(file, node, name, kind, None);
        match kind {
            ObjectKind::Const | ObjectKind::Var => self.resolve_value(name),
            ObjectKind::Func => self
                .scope
                .lookup(name)
                .map(|object| object.ty.clone())
                .unwrap_or(Type::Invalid),
            ObjectKind::TypeName => Type::Invalid,
        }
    }

    fn call_type(&mut self, file: usize, node: Node<'a>, result: usize) -> Type {
        let Some(callee) = node.child_by_field_name("function") else {
            return Type::Invalid;
        };
        let args: Vec<Node<'a>> = match node.child_by_field_name("arguments") {
            Some(list) => {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect()
            }
            None => Vec::new(),
        };

        match callee.kind() {
            "identifier" => {
                let name = self.text(file, callee);
                match self.scope.lookup(name).map(|object| object.kind) {
                    Some(ObjectKind::TypeName) => self.resolve_type(file, callee, &[]),
                    Some(ObjectKind::Func) => {
                        self.record_use(file, callee, name, ObjectKind::Func, None);
                        let results = self
                            .scope
                            .lookup(name)
                            .and_then(|object| object.signature())
                            .map(|sig| sig.results.clone())
                            .unwrap_or_default();
                        results
                            .get(result)
                            .or(results.first().filter(|_| results.len() == 1))
                            .map(|param| param.ty.clone())
                            .unwrap_or(Type::Invalid)
                    }
                    Some(_) => Type::Invalid,
                    None => self.builtin_call_type(file, name, callee, &args),
                }
            }
            // (*T)(x) and similar parenthesized conversions
            "parenthesized_expression" => {
                let Some(inner) = callee.named_child(0) else {
                    return Type::Invalid;
                };
                match inner.kind() {
                    "unary_expression" => {
                        let is_deref = inner
                            .child_by_field_name("operator")
                            .is_some_and(|op| self.text(file, op) == "*");
                        match inner.child_by_field_name("operand") {
                            Some(operand) if is_deref && self.names_type(file, operand) => {
                                Type::pointer(self.resolve_type(file, operand, &[]))
                            }
                            _ => Type::Invalid,
                        }
                    }
                    _ if self.names_type(file, inner) => self.resolve_type(file, inner, &[]),
                    _ => Type::Invalid,
                }
            }
            kind if kind.ends_with("_type") => self.resolve_type(file, callee, &[]),
            _ => Type::Invalid,
        }
    }

    fn builtin_call_type(
        &mut self,
        file: usize,
        name: &str,
        callee: Node<'a>,
        args: &[Node<'a>],
    ) -> Type {
        let first = args.first().copied();
        match name {
            "new" => first
                .map(|arg| Type::pointer(self.resolve_type(file, arg, &[])))
                .unwrap_or(Type::Invalid),
            "make" => first
                .map(|arg| self.resolve_type(file, arg, &[]))
                .unwrap_or(Type::Invalid),
            "len" | "cap" | "copy" => Type::basic("int"),
            "real" | "imag" => Type::basic("float64"),
            "complex" => Type::basic("complex128"),
            "append" | "min" | "max" => first
                .map(|arg| self.expr_type(file, arg, 0))
                .unwrap_or(Type::Invalid),
            "recover" => Type::Interface(Default::default()),
            _ if UNIVERSE_TYPES.contains(&name) => self.resolve_type(file, callee, &[]),
            _ => Type::Invalid,
        }
    }

    /// Whether `node` is an identifier naming a type.
    fn names_type(&self, file: usize, node: Node<'a>) -> bool {
        if !matches!(node.kind(), "identifier" | "type_identifier") {
            return node.kind().ends_with("_type");
        }
        let name = self.text(file, node);
        match self.scope.lookup(name) {
            Some(object) => object.kind == ObjectKind::TypeName,
            None => UNIVERSE_TYPES.contains(&name),
        }
    }
}

fn untyped_rank(ty: &Type) -> u8 {
    match ty {
        Type::Basic(name) => match name.as_str() {
            "untyped int" => 1,
            "untyped rune" => 2,
            "untyped float" => 3,
            "untyped complex" => 4,
            _ => 0,
        },
        _ => 0,
    }
}
