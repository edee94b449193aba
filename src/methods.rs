//! Method sets of package types and the exported function listing.
//!
//! A method set is answered as a capability query over the checked scope:
//! which methods of a named type are reachable from a value handle and which
//! from a pointer handle. [`method_set`] merges both answers by name.

use crate::check::{Method, Object, ObjectKind, Param, Scope, Signature, Type};
use crate::error::{PackageError, PackageResult};
use crate::types::Pos;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Code points with the Unicode Lowercase property outside the lowercase
/// letter category (Ll), i.e. the Other_Lowercase ranges.
const OTHER_LOWERCASE: &[(char, char)] = &[
    ('\u{00AA}', '\u{00AA}'),
    ('\u{00BA}', '\u{00BA}'),
    ('\u{02B0}', '\u{02B8}'),
    ('\u{02C0}', '\u{02C1}'),
    ('\u{02E0}', '\u{02E4}'),
    ('\u{0345}', '\u{0345}'),
    ('\u{037A}', '\u{037A}'),
    ('\u{10FC}', '\u{10FC}'),
    ('\u{1D2C}', '\u{1D6A}'),
    ('\u{1D78}', '\u{1D78}'),
    ('\u{1D9B}', '\u{1DBF}'),
    ('\u{2071}', '\u{2071}'),
    ('\u{207F}', '\u{207F}'),
    ('\u{2090}', '\u{209C}'),
    ('\u{2170}', '\u{217F}'),
    ('\u{24D0}', '\u{24E9}'),
    ('\u{2C7C}', '\u{2C7D}'),
    ('\u{A69C}', '\u{A69D}'),
    ('\u{A770}', '\u{A770}'),
    ('\u{A7F2}', '\u{A7F4}'),
    ('\u{A7F8}', '\u{A7F9}'),
    ('\u{AB5C}', '\u{AB5F}'),
    ('\u{AB69}', '\u{AB69}'),
    ('\u{10780}', '\u{10780}'),
    ('\u{10783}', '\u{10785}'),
    ('\u{10787}', '\u{107B0}'),
    ('\u{107B2}', '\u{107BA}'),
    ('\u{1E030}', '\u{1E06D}'),
];

/// Code points with the Unicode Uppercase property outside the uppercase
/// letter category (Lu), i.e. the Other_Uppercase ranges.
const OTHER_UPPERCASE: &[(char, char)] = &[
    ('\u{2160}', '\u{216F}'),
    ('\u{24B6}', '\u{24CF}'),
    ('\u{1F130}', '\u{1F149}'),
    ('\u{1F150}', '\u{1F169}'),
    ('\u{1F170}', '\u{1F189}'),
];

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// Uppercase letter (general category Lu).
fn is_upper_letter(c: char) -> bool {
    c.is_uppercase() && !in_ranges(c, OTHER_UPPERCASE)
}

/// Lowercase letter (general category Ll). `ª` and modifier letters such
/// as `ʰ` have the Lowercase property but are not Ll.
fn is_lower_letter(c: char) -> bool {
    c.is_lowercase() && !in_ranges(c, OTHER_LOWERCASE)
}

/// Whether `name` is visible outside its package: its first rune is an
/// uppercase letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(is_upper_letter)
}

/// Whether `name` looks like a test function for `prefix` (`Test`,
/// `Example`, ...). `TestFoo` and `Test` match, `Testicular` does not.
pub fn is_test_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name.strip_prefix(prefix) else {
        return false;
    };
    match rest.chars().next() {
        None => true,
        Some(c) => !is_lower_letter(c),
    }
}

/// Names hidden from package listings: unexported or test scaffolding.
pub fn is_hidden(name: &str) -> bool {
    !is_exported(name) || is_test_name(name, "Test") || is_test_name(name, "Example")
}

/// A resolved function or method with its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    name: String,
    signature: Signature,
    receiver: Option<Param>,
    pointer_receiver: bool,
    pos: Pos,
}

impl Function {
    /// View of a package-level function object.
    pub fn from_object(object: &Object) -> Option<Self> {
        if object.kind != ObjectKind::Func {
            return None;
        }
        Some(Self {
            name: object.name.clone(),
            signature: object.signature()?.clone(),
            receiver: None,
            pointer_receiver: false,
            pos: object.pos,
        })
    }

    pub fn from_method(method: &Method) -> Self {
        Self {
            name: method.name.clone(),
            signature: method.signature.clone(),
            receiver: Some(method.receiver.clone()),
            pointer_receiver: method.pointer_receiver,
            pos: method.pos,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter tuple, e.g. `(b []byte, off int64)`.
    pub fn params(&self) -> String {
        self.signature.params_string()
    }

    /// Result tuple, `()` when the function returns nothing.
    pub fn results(&self) -> String {
        self.signature.results_string()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn receiver(&self) -> Option<&Param> {
        self.receiver.as_ref()
    }

    pub fn has_pointer_receiver(&self) -> bool {
        self.pointer_receiver
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.receiver {
            Some(recv) => write!(f, "func ({}) {}{}", recv.ty, self.name, self.signature),
            None => write!(f, "func {}{}", self.name, self.signature),
        }
    }
}

/// Methods of one named type, keyed by method name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSet {
    pub name: String,
    pub owner: Object,
    pub methods: BTreeMap<String, Function>,
}

impl MethodSet {
    pub fn new(name: impl Into<String>, owner: Object) -> Self {
        Self {
            name: name.into(),
            owner,
            methods: BTreeMap::new(),
        }
    }

    /// Method names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.methods.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.methods.values()
    }
}

/// How a method can be called on values of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reach {
    pub value: bool,
    pub pointer: bool,
}

impl Reach {
    pub fn any(&self) -> bool {
        self.value || self.pointer
    }
}

/// Which handles of the local type `type_name` reach method `method`.
pub fn reach(scope: &Scope, type_name: &str, method: &str) -> Reach {
    let ty = Type::local(type_name);
    Reach {
        value: type_methods(scope, &ty).contains_key(method),
        pointer: type_methods(scope, &Type::pointer(ty)).contains_key(method),
    }
}

/// Method set of a value of type `ty`. Only local named types (and pointers
/// to them) have methods; every other type yields an empty set.
pub fn type_methods(scope: &Scope, ty: &Type) -> BTreeMap<String, Method> {
    let Some((base, pointer)) = ty.local_base() else {
        return BTreeMap::new();
    };
    if scope.type_def(base).is_none() {
        return BTreeMap::new();
    }

    if let Some(Type::Interface(_)) = scope.underlying(base) {
        if pointer {
            return BTreeMap::new();
        }
        let mut methods = BTreeMap::new();
        interface_methods(scope, base, &mut HashSet::new(), &mut methods);
        return methods;
    }

    // (method name -> selection), None marks a collision or a hidden name
    let mut found: HashMap<String, Option<Method>> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    // (type name, reached through a pointer, embedded more than once)
    let mut current: Vec<(String, bool, bool)> = vec![(canonical(scope, base), pointer, false)];

    while !current.is_empty() {
        let mut level: HashMap<String, Option<Method>> = HashMap::new();
        let mut fields: HashSet<String> = HashSet::new();
        let mut next: Vec<(String, bool, bool)> = Vec::new();

        for (name, indirect, multiples) in current {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(def) = scope.type_def(&name) else {
                continue;
            };
            for method in &def.methods {
                add_method(&mut level, method, indirect, multiples);
            }
            match scope.underlying(&name) {
                Some(Type::Struct(struct_fields)) => {
                    for field in struct_fields {
                        fields.insert(field.name.clone());
                        if !field.embedded {
                            continue;
                        }
                        let Some((embedded, ptr)) = field.ty.local_base() else {
                            continue;
                        };
                        let embedded = canonical(scope, embedded);
                        match next.iter_mut().find(|(n, _, _)| *n == embedded) {
                            Some(entry) => entry.2 = true,
                            None => next.push((embedded, indirect || ptr, multiples)),
                        }
                    }
                }
                Some(Type::Interface(_)) => {
                    let mut promoted = BTreeMap::new();
                    interface_methods(scope, &name, &mut HashSet::new(), &mut promoted);
                    for method in promoted.values() {
                        add_method(&mut level, method, true, multiples);
                    }
                }
                _ => {}
            }
        }

        for (name, method) in level {
            if !found.contains_key(&name) {
                let method = if fields.contains(&name) { None } else { method };
                found.insert(name, method);
            }
        }
        for name in fields {
            found.entry(name).or_insert(None);
        }
        current = next;
    }

    found
        .into_iter()
        .filter_map(|(name, method)| method.map(|m| (name, m)))
        .collect()
}

fn add_method(
    level: &mut HashMap<String, Option<Method>>,
    method: &Method,
    indirect: bool,
    multiples: bool,
) {
    if !multiples
        && !level.contains_key(&method.name)
        && (indirect || !method.pointer_receiver)
    {
        level.insert(method.name.clone(), Some(method.clone()));
        return;
    }
    level.insert(method.name.clone(), None);
}

/// Name of the type an alias chain ends at.
fn canonical(scope: &Scope, name: &str) -> String {
    let mut name = name;
    for _ in 0..16 {
        let Some(def) = scope.lookup(name).and_then(|o| o.type_def.as_ref()) else {
            break;
        };
        if !def.alias {
            break;
        }
        match def.underlying.local_base() {
            Some((target, false)) => name = target,
            _ => break,
        }
    }
    name.to_string()
}

/// Flattened methods of the local interface `name`, including the methods
/// of embedded local interfaces.
fn interface_methods(
    scope: &Scope,
    name: &str,
    visited: &mut HashSet<String>,
    out: &mut BTreeMap<String, Method>,
) {
    if !visited.insert(name.to_string()) {
        return;
    }
    let Some(object) = scope.lookup(name) else {
        return;
    };
    let Some(Type::Interface(iface)) = scope.underlying(name) else {
        return;
    };
    for (method, signature) in &iface.methods {
        out.entry(method.clone()).or_insert_with(|| Method {
            name: method.clone(),
            receiver: Param {
                name: None,
                ty: Type::local(name),
            },
            pointer_receiver: false,
            signature: signature.clone(),
            pos: object.pos,
        });
    }
    for embedded in &iface.embedded {
        if let Some((inner, false)) = embedded.local_base() {
            interface_methods(scope, inner, visited, out);
        }
    }
}

/// Combined value and pointer method set of the exported name `name`.
pub fn method_set(scope: &Scope, name: &str) -> PackageResult<MethodSet> {
    let object = scope
        .lookup(name)
        .ok_or_else(|| PackageError::NameNotFound {
            name: name.to_string(),
        })?;
    if is_hidden(name) {
        return Err(PackageError::NotExported {
            name: name.to_string(),
        });
    }

    let mut set = MethodSet::new(name, object.clone());
    if object.kind == ObjectKind::Func {
        return Ok(set);
    }
    // a name declared with both receivers keeps the pointer handle's entry
    for ty in [object.ty.clone(), Type::pointer(object.ty.clone())] {
        for (method_name, method) in type_methods(scope, &ty) {
            set.methods.insert(method_name, Function::from_method(&method));
        }
    }
    Ok(set)
}

/// Exported, non-test package functions in name order.
pub fn functions(scope: &Scope) -> Vec<Function> {
    scope
        .iter()
        .filter(|object| !is_hidden(&object.name))
        .filter_map(Function::from_object)
        .collect()
}

/// Method sets of every exported type name that has at least one method.
pub fn methods(scope: &Scope) -> BTreeMap<String, MethodSet> {
    scope
        .iter()
        .filter(|object| object.kind == ObjectKind::TypeName)
        .filter_map(|object| method_set(scope, &object.name).ok())
        .filter(|set| !set.is_empty())
        .map(|set| (set.name.clone(), set))
        .collect()
}
