//! Package documentation: extraction and the read-only view over it.
//!
//! Extraction follows the conventions of Go documentation tooling: only
//! exported declarations are documented, value blocks stay grouped, and
//! methods and constructors are listed under their type.

pub mod examples;
pub mod model;
pub mod notes;
pub mod reader;
pub mod synopsis;
pub mod view;

pub use model::{DocPackage, Example, Func, Note, TypeDoc, Value};
pub use synopsis::synopsis;
pub use view::Docs;
