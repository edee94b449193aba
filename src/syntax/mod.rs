//! Go syntax forests built with tree-sitter.
//!
//! A parse pass reads every selected `.go` file of one directory, parses the
//! files in parallel and registers them in a shared [`FileSet`] in file-name
//! order. Files are grouped into [`SyntaxPackage`]s by their package clause.
//!
//! Each pass produces an independent forest. The documentation extractor
//! takes its forest by value and strips comments out of it while reading, so
//! the toolchain runs one pass per consumer that needs ownership.

pub mod comments;
pub mod fileset;

pub use comments::{Comment, CommentGroup};
pub use fileset::FileSet;

use crate::error::{PackageError, PackageResult};
use crate::types::{Pos, Position, Span};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use tree_sitter::{Node, Parser, Tree};

/// Options for one parse pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseMode {
    /// Keep comment groups on the parsed files
    pub retain_comments: bool,
}

impl Default for ParseMode {
    fn default() -> Self {
        Self {
            retain_comments: true,
        }
    }
}

/// One parsed source file.
#[derive(Debug)]
pub struct SyntaxFile {
    pub path: PathBuf,
    pub package_name: String,
    pub source: String,
    pub tree: Tree,
    /// File-set base of the first byte
    pub base: Pos,
    pub comments: Vec<CommentGroup>,
}

impl SyntaxFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node) -> &str {
        &self.source[node.byte_range()]
    }

    pub fn pos(&self, byte: usize) -> Pos {
        self.base.offset(byte)
    }

    pub fn pos_of(&self, node: Node) -> Pos {
        self.pos(node.start_byte())
    }

    pub fn span(&self, node: Node) -> Span {
        Span::new(self.pos(node.start_byte()), self.pos(node.end_byte()))
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    pub fn is_test(&self) -> bool {
        self.file_name().ends_with("_test.go")
    }

    /// The doc comment group directly above `node`.
    pub fn doc_comment(&self, node: Node) -> Option<&CommentGroup> {
        let row = node.start_position().row;
        if row == 0 {
            return None;
        }
        self.comments.iter().find(|group| {
            !group.trailing && group.end_row() + 1 == row && group.start_byte() < node.start_byte()
        })
    }

    /// Comment groups lying inside `node`, in source order.
    pub fn comments_within(&self, node: Node) -> impl Iterator<Item = &CommentGroup> {
        let range = node.byte_range();
        self.comments
            .iter()
            .filter(move |group| range.contains(&group.start_byte()))
    }

    /// Top-level declarations of the file.
    pub fn declarations(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|node| {
                matches!(
                    node.kind(),
                    "function_declaration"
                        | "method_declaration"
                        | "type_declaration"
                        | "const_declaration"
                        | "var_declaration"
                        | "import_declaration"
                )
            })
            .collect()
    }
}

/// Files sharing one package clause.
#[derive(Debug, Default)]
pub struct SyntaxPackage {
    pub name: String,
    pub files: BTreeMap<PathBuf, SyntaxFile>,
}

impl SyntaxPackage {
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .values()
            .map(|file| file.file_name().to_string())
            .collect()
    }
}

/// Result of one parse pass over a directory.
#[derive(Debug, Default)]
pub struct SyntaxForest {
    pub fileset: FileSet,
    pub packages: BTreeMap<String, SyntaxPackage>,
}

impl SyntaxForest {
    pub fn package(&self, name: &str) -> Option<&SyntaxPackage> {
        self.packages.get(name)
    }

    /// Move the package out of the forest, keeping the file set in place.
    pub fn take_package(&mut self, name: &str) -> Option<SyntaxPackage> {
        self.packages.remove(name)
    }
}

/// A tree-sitter parser configured for Go.
pub fn new_parser() -> PackageResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| PackageError::Parse {
            path: PathBuf::new(),
            position: Position::default(),
            reason: format!("failed to load the Go grammar: {e}"),
        })?;
    Ok(parser)
}

struct RawFile {
    path: PathBuf,
    source: String,
    tree: Tree,
    package_name: String,
}

/// Parse the `.go` files of `dir` accepted by `filter` (called with the bare
/// file name).
pub fn parse_dir(
    dir: &Path,
    filter: impl Fn(&str) -> bool,
    mode: ParseMode,
) -> PackageResult<SyntaxForest> {
    let entries = std::fs::read_dir(dir).map_err(|e| PackageError::Parse {
        path: dir.to_path_buf(),
        position: Position::file_only(dir),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".go") && filter(name))
        })
        .collect();
    paths.sort();
    debug!("parsing {} files in {}", paths.len(), dir.display());

    let parsed: Vec<PackageResult<RawFile>> = paths
        .par_iter()
        .map_init(new_parser, |parser, path| {
            let parser = parser.as_mut().map_err(|e| e.clone())?;
            parse_raw(parser, path)
        })
        .collect();

    let mut forest = SyntaxForest::default();
    for raw in parsed {
        let raw = raw?;
        let base = forest.fileset.add_file(raw.path.clone(), &raw.source);
        let comments = if mode.retain_comments {
            let found = comments::collect_comments(raw.tree.root_node(), &raw.source, |node| {
                Span::new(base.offset(node.start_byte()), base.offset(node.end_byte()))
            });
            comments::group_comments(found)
        } else {
            Vec::new()
        };
        trace!("registered {} at base {}", raw.path.display(), base.value());
        let package = forest
            .packages
            .entry(raw.package_name.clone())
            .or_insert_with(|| SyntaxPackage {
                name: raw.package_name.clone(),
                files: BTreeMap::new(),
            });
        package.files.insert(
            raw.path.clone(),
            SyntaxFile {
                path: raw.path,
                package_name: raw.package_name,
                source: raw.source,
                tree: raw.tree,
                base,
                comments,
            },
        );
    }
    Ok(forest)
}

/// Parse a single file outside of any file set. Used by the locator and the
/// importer to peek at package clauses and exported names.
pub fn parse_source(parser: &mut Parser, path: &Path, source: &str) -> PackageResult<Tree> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| PackageError::Parse {
            path: path.to_path_buf(),
            position: Position::file_only(path),
            reason: "parser produced no tree".to_string(),
        })?;
    if let Some((node, reason)) = first_error(tree.root_node(), source) {
        let point = node.start_position();
        return Err(PackageError::Parse {
            path: path.to_path_buf(),
            position: Position::new(
                path,
                node.start_byte(),
                point.row as u32 + 1,
                point.column as u32 + 1,
            ),
            reason,
        });
    }
    Ok(tree)
}

fn parse_raw(parser: &mut Parser, path: &Path) -> PackageResult<RawFile> {
    let source = std::fs::read_to_string(path).map_err(|e| PackageError::Parse {
        path: path.to_path_buf(),
        position: Position::file_only(path),
        reason: e.to_string(),
    })?;
    let tree = parse_source(parser, path, &source)?;
    let package_name = package_clause(tree.root_node(), &source).ok_or_else(|| {
        PackageError::Parse {
            path: path.to_path_buf(),
            position: Position::new(path, 0, 1, 1),
            reason: "expected 'package' clause".to_string(),
        }
    })?;
    Ok(RawFile {
        path: path.to_path_buf(),
        source,
        tree,
        package_name,
    })
}

/// Name declared by the file's `package` clause.
pub fn package_clause(root: Node, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|node| node.kind() == "package_clause")?;
    let mut cursor = clause.walk();
    let name = clause
        .named_children(&mut cursor)
        .find(|node| node.kind() == "package_identifier")?;
    Some(source[name.byte_range()].to_string())
}

/// Import paths declared by the file, unquoted, with their optional alias.
pub fn import_specs<'t>(root: Node<'t>, source: &str) -> Vec<(Option<String>, String, Node<'t>)> {
    let mut specs = Vec::new();
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        if decl.kind() != "import_declaration" {
            continue;
        }
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            if node.kind() == "import_spec" {
                let Some(path) = node.child_by_field_name("path") else {
                    continue;
                };
                let alias = node
                    .child_by_field_name("name")
                    .map(|name| source[name.byte_range()].to_string());
                specs.push((alias, unquote(&source[path.byte_range()]), node));
                continue;
            }
            let mut inner = node.walk();
            let children: Vec<Node> = node.named_children(&mut inner).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    specs
}

/// Strip the quotes of a Go string literal. Escapes are left untouched.
pub fn unquote(literal: &str) -> String {
    let trimmed = literal.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(trimmed)
        .to_string()
}

fn first_error<'t>(node: Node<'t>, source: &str) -> Option<(Node<'t>, String)> {
    if node.is_missing() {
        return Some((node, format!("syntax error: missing {}", node.kind())));
    }
    if node.is_error() {
        let text: String = source[node.byte_range()].chars().take(24).collect();
        let text = text.lines().next().unwrap_or_default().trim().to_string();
        return Some((node, format!("syntax error: unexpected `{text}`")));
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(|child| first_error(child, source))
}
