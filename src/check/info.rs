//! Annotation index recorded while checking declarations.

use super::types::{ObjectKind, Type};
use crate::types::{Pos, Span};
use serde::Serialize;
use std::collections::BTreeMap;

/// The object an identifier defines or refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub name: String,
    pub kind: ObjectKind,
    /// Import path for objects of other packages
    pub package: Option<String>,
}

/// Identifier and expression annotations keyed by source span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeInfo {
    /// Identifiers that declare a package-level object or a method
    pub defs: BTreeMap<Span, ObjectRef>,
    /// Identifiers that refer to an object
    pub uses: BTreeMap<Span, ObjectRef>,
    /// Type expressions and typed value expressions
    pub types: BTreeMap<Span, Type>,
}

impl TypeInfo {
    /// The object defined or used by the identifier covering `pos`.
    pub fn object_at(&self, pos: Pos) -> Option<&ObjectRef> {
        find_covering(&self.defs, pos).or_else(|| find_covering(&self.uses, pos))
    }

    /// Type recorded for exactly `span`.
    pub fn type_of(&self, span: Span) -> Option<&Type> {
        self.types.get(&span)
    }

    /// Spans of every identifier referring to the local object `name`.
    pub fn uses_of(&self, name: &str) -> Vec<Span> {
        self.uses
            .iter()
            .filter(|(_, obj)| obj.package.is_none() && obj.name == name)
            .map(|(span, _)| *span)
            .collect()
    }

    /// Span of the identifier declaring the local object `name`.
    pub fn def_of(&self, name: &str) -> Option<Span> {
        self.defs
            .iter()
            .find(|(_, obj)| obj.name == name)
            .map(|(span, _)| *span)
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.uses.is_empty() && self.types.is_empty()
    }
}

fn find_covering<V>(map: &BTreeMap<Span, V>, pos: Pos) -> Option<&V> {
    map.range(..=Span::new(pos, Pos(u32::MAX)))
        .next_back()
        .filter(|(span, _)| span.contains(pos))
        .map(|(_, value)| value)
}
