//! Documentation model produced by the reader.

use crate::types::Pos;
use serde::Serialize;
use std::collections::BTreeMap;

/// A documented `const` or `var` declaration block.
///
/// Names declared together stay together: `const (A = 1; B = 2)` is one
/// value with two names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Value {
    pub doc: String,
    /// Exported names in declaration order
    pub names: Vec<String>,
    /// Declaration text with unexported specs left out
    pub decl: String,
    pub pos: Pos,
}

/// A documented function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Func {
    pub doc: String,
    pub name: String,
    /// Signature text without the body
    pub decl: String,
    /// Receiver type as written (`T`, `*T`), `None` for functions
    pub recv: Option<String>,
    pub pos: Pos,
}

impl Func {
    pub fn is_method(&self) -> bool {
        self.recv.is_some()
    }
}

/// A documented type with everything associated with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeDoc {
    pub doc: String,
    pub name: String,
    pub decl: String,
    pub pos: Pos,
    /// Blocks whose values are mostly of this type
    pub consts: Vec<Value>,
    pub vars: Vec<Value>,
    /// Constructors returning this type
    pub funcs: Vec<Func>,
    pub methods: Vec<Func>,
}

/// A runnable example function from a test file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    /// Name without the `Example` prefix, e.g. `Buffer_Read_second`
    pub name: String,
    /// Lower-case trailing part after the last `_`, without the underscore
    pub suffix: String,
    pub doc: String,
    /// Body without braces and without the output comment
    pub code: String,
    pub output: String,
    pub unordered: bool,
    /// An output comment was present but empty
    pub empty_output: bool,
    pub pos: Pos,
}

impl Example {
    pub fn has_output(&self) -> bool {
        !self.output.is_empty() || self.empty_output
    }
}

/// A `MARKER(uid): body` comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub pos: Pos,
    pub end: Pos,
    pub uid: String,
    pub body: String,
}

/// Documentation of one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocPackage {
    pub name: String,
    pub import_path: String,
    pub doc: String,
    /// Every file of the package, sorted
    pub filenames: Vec<String>,
    pub notes: BTreeMap<String, Vec<Note>>,
    pub consts: Vec<Value>,
    pub vars: Vec<Value>,
    pub types: Vec<TypeDoc>,
    pub funcs: Vec<Func>,
    pub examples: Vec<Example>,
}
