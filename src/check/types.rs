//! Resolved types, objects and the package scope.

use crate::types::Pos;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A resolved type.
///
/// Named types are referenced by name and resolved through the owning
/// [`Scope`] (local types) or are opaque (imported types).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Type {
    /// Predeclared types (`int`, `string`, `error`, ...) and untyped
    /// constant kinds (`untyped int`, ...)
    Basic(String),
    Named {
        /// Package name for imported types, `None` for local ones
        package: Option<String>,
        name: String,
        args: Vec<Type>,
    },
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array {
        len: String,
        elem: Box<Type>,
    },
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<Type>,
    },
    Signature(Signature),
    Struct(Vec<Field>),
    Interface(InterfaceType),
    TypeParam(String),
    /// Constraint union, each term flagged when written with `~`
    Union(Vec<(bool, Type)>),
    Invalid,
}

impl Type {
    pub fn basic(name: &str) -> Self {
        Type::Basic(name.to_string())
    }

    pub fn local(name: impl Into<String>) -> Self {
        Type::Named {
            package: None,
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Basic(name) if name.starts_with("untyped "))
    }

    /// Type a value of this type gets when stored in a variable.
    pub fn default_type(&self) -> Type {
        match self {
            Type::Basic(name) => match name.as_str() {
                "untyped bool" => Type::basic("bool"),
                "untyped int" => Type::basic("int"),
                "untyped rune" => Type::basic("rune"),
                "untyped float" => Type::basic("float64"),
                "untyped complex" => Type::basic("complex128"),
                "untyped string" => Type::basic("string"),
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Name of a local named type, looking through one pointer indirection.
    /// Returns the name and whether a pointer was removed.
    pub fn local_base(&self) -> Option<(&str, bool)> {
        match self {
            Type::Named {
                package: None,
                name,
                ..
            } => Some((name, false)),
            Type::Pointer(elem) => match elem.as_ref() {
                Type::Named {
                    package: None,
                    name,
                    ..
                } => Some((name, true)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(name) => write!(f, "{name}"),
            Type::Named {
                package,
                name,
                args,
            } => {
                if let Some(package) = package {
                    write!(f, "{package}.")?;
                }
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "[{}]", join(args, ", "))?;
                }
                Ok(())
            }
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Array { len, elem } => write!(f, "[{len}]{elem}"),
            Type::Map { key, value } => write!(f, "map[{key}]{value}"),
            Type::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {elem}"),
                ChanDir::Send => write!(f, "chan<- {elem}"),
                ChanDir::Recv => write!(f, "<-chan {elem}"),
            },
            Type::Signature(sig) => write!(f, "func{sig}"),
            Type::Struct(fields) => {
                let fields: Vec<String> = fields.iter().map(Field::to_string).collect();
                write!(f, "struct{{{}}}", fields.join("; "))
            }
            Type::Interface(iface) => {
                if iface.is_empty() {
                    return write!(f, "any");
                }
                let mut parts: Vec<String> = iface
                    .embedded
                    .iter()
                    .map(Type::to_string)
                    .collect();
                parts.extend(
                    iface
                        .methods
                        .iter()
                        .map(|(name, sig)| format!("{name}{sig}")),
                );
                write!(f, "interface{{{}}}", parts.join("; "))
            }
            Type::TypeParam(name) => write!(f, "{name}"),
            Type::Union(terms) => {
                let terms: Vec<String> = terms
                    .iter()
                    .map(|(tilde, ty)| format!("{}{ty}", if *tilde { "~" } else { "" }))
                    .collect();
                write!(f, "{}", terms.join(" | "))
            }
            Type::Invalid => write!(f, "invalid type"),
        }
    }
}

fn join(types: &[Type], sep: &str) -> String {
    types.iter().map(Type::to_string).collect::<Vec<_>>().join(sep)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
    pub tag: Option<String>,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.embedded {
            write!(f, "{}", self.ty)?;
        } else {
            write!(f, "{} {}", self.name, self.ty)?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " {tag}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceType {
    /// Explicitly declared methods in source order
    pub methods: Vec<(String, Signature)>,
    /// Embedded interfaces and type-set terms
    pub embedded: Vec<Type>,
}

impl InterfaceType {
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.embedded.is_empty()
    }
}

/// A parameter or result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Type,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// The last parameter is `...T`; its type is stored as `[]T`
    pub variadic: bool,
}

impl Signature {
    /// Parameter tuple, e.g. `(b []byte, off int64)`.
    pub fn params_string(&self) -> String {
        tuple_string(&self.params, self.variadic)
    }

    /// Result tuple, e.g. `(n int, err error)`; `()` without results.
    pub fn results_string(&self) -> String {
        tuple_string(&self.results, false)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            let params: Vec<String> = self
                .type_params
                .iter()
                .map(|tp| format!("{} {}", tp.name, tp.constraint))
                .collect();
            write!(f, "[{}]", params.join(", "))?;
        }
        write!(f, "{}", self.params_string())?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] if single.name.is_none() => write!(f, " {}", single.ty),
            _ => write!(f, " {}", self.results_string()),
        }
    }
}

fn tuple_string(params: &[Param], variadic: bool) -> String {
    let last = params.len().saturating_sub(1);
    let parts: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let ty = match (&param.ty, variadic && i == last) {
                (Type::Slice(elem), true) => format!("...{elem}"),
                (ty, _) => ty.to_string(),
            };
            match &param.name {
                Some(name) => format!("{name} {ty}"),
                None => ty,
            }
        })
        .collect();
    format!("({})", parts.join(", "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ObjectKind {
    Func,
    TypeName,
    Var,
    Const,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Func => "func",
            ObjectKind::TypeName => "type",
            ObjectKind::Var => "var",
            ObjectKind::Const => "const",
        };
        write!(f, "{name}")
    }
}

/// A method declared in the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    pub name: String,
    pub receiver: Param,
    pub pointer_receiver: bool,
    pub signature: Signature,
    pub pos: Pos,
}

/// Definition of a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    pub underlying: Type,
    pub alias: bool,
    pub type_params: Vec<TypeParam>,
    /// Methods declared on the type, in declaration order
    pub methods: Vec<Method>,
}

/// A package-level declared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// For a type name the named type itself (or the aliased type)
    pub ty: Type,
    pub pos: Pos,
    pub type_def: Option<TypeDef>,
}

impl Object {
    pub fn is_exported(&self) -> bool {
        crate::methods::is_exported(&self.name)
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.ty {
            Type::Signature(sig) if self.kind == ObjectKind::Func => Some(sig),
            _ => None,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, &self.type_def) {
            (ObjectKind::Func, _) => match &self.ty {
                Type::Signature(sig) => write!(f, "func {}{sig}", self.name),
                ty => write!(f, "func {} {ty}", self.name),
            },
            (ObjectKind::TypeName, Some(def)) if def.alias => {
                write!(f, "type {} = {}", self.name, def.underlying)
            }
            (ObjectKind::TypeName, Some(def)) => write!(f, "type {} {}", self.name, def.underlying),
            (kind, _) => write!(f, "{kind} {} {}", self.name, self.ty),
        }
    }
}

/// Package-level symbol table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scope {
    objects: BTreeMap<String, Object>,
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<&Object> {
        self.objects.get(name)
    }

    pub(crate) fn lookup_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.objects.get_mut(name)
    }

    pub(crate) fn insert(&mut self, object: Object) -> Option<Object> {
        self.objects.insert(object.name.clone(), object)
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Definition of the local type `name`, following aliases.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        let mut name = name;
        for _ in 0..16 {
            let object = self.lookup(name)?;
            let def = object.type_def.as_ref()?;
            if !def.alias {
                return Some(def);
            }
            name = def.underlying.local_base().filter(|(_, ptr)| !ptr)?.0;
        }
        None
    }

    /// Underlying type of the local type `name`. Aliases and types defined
    /// from another local named type are followed until a type literal or a
    /// named type without a local definition is reached. `None` when `name`
    /// has no definition or the chain is cyclic.
    pub fn underlying(&self, name: &str) -> Option<&Type> {
        let mut def = self.type_def(name)?;
        let mut seen: HashSet<&str> = HashSet::from([name]);
        loop {
            match &def.underlying {
                Type::Named {
                    package: None,
                    name: next,
                    ..
                } => {
                    if !seen.insert(next) {
                        return None;
                    }
                    match self.type_def(next) {
                        Some(next_def) => def = next_def,
                        None => return Some(&def.underlying),
                    }
                }
                other => return Some(other),
            }
        }
    }
}

/// An import of the checked package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageImport {
    pub path: String,
    pub name: String,
}

/// Output of a successful check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckedPackage {
    pub name: String,
    pub scope: Scope,
    /// Distinct imports, sorted by path
    pub imports: Vec<PackageImport>,
}
