//! Minimal `go.mod` reader: the module path and local `replace` targets.

use std::path::{Path, PathBuf};

pub const GO_MOD: &str = "go.mod";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoMod {
    /// Directory holding the `go.mod` file
    pub root: PathBuf,
    pub module: String,
    /// `replace old => ./dir` directives with a directory target
    pub replaces: Vec<(String, PathBuf)>,
}

impl GoMod {
    /// Parse `content` as the `go.mod` of `root`. Returns `None` without a
    /// `module` directive.
    pub fn parse(root: &Path, content: &str) -> Option<Self> {
        let mut module = None;
        let mut replaces = Vec::new();
        let mut in_replace_block = false;

        for line in content.lines() {
            let line = line.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            if in_replace_block {
                if line == ")" {
                    in_replace_block = false;
                } else if let Some(replace) = parse_replace(root, line) {
                    replaces.push(replace);
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("module") {
                if rest.starts_with(char::is_whitespace) {
                    module = Some(rest.trim().trim_matches('"').to_string());
                }
            } else if let Some(rest) = line.strip_prefix("replace") {
                let rest = rest.trim();
                if rest == "(" {
                    in_replace_block = true;
                } else if let Some(replace) = parse_replace(root, rest) {
                    replaces.push(replace);
                }
            }
        }

        Some(Self {
            root: root.to_path_buf(),
            module: module.filter(|m| !m.is_empty())?,
            replaces,
        })
    }

    /// Find the nearest `go.mod` in `start` or any of its ancestors.
    pub fn find(start: &Path) -> Option<Self> {
        start.ancestors().find_map(|dir| {
            let content = std::fs::read_to_string(dir.join(GO_MOD)).ok()?;
            Self::parse(dir, &content)
        })
    }

    /// Directory an import path maps to inside this module, if any.
    pub fn resolve(&self, import_path: &str) -> Option<PathBuf> {
        for (old, target) in &self.replaces {
            if let Some(rest) = strip_path_prefix(import_path, old) {
                return Some(join_rest(target, rest));
            }
        }
        strip_path_prefix(import_path, &self.module).map(|rest| join_rest(&self.root, rest))
    }
}

fn parse_replace(root: &Path, line: &str) -> Option<(String, PathBuf)> {
    let (old, new) = line.split_once("=>")?;
    let old = old.split_whitespace().next()?.trim_matches('"');
    let target = new.split_whitespace().next()?.trim_matches('"');
    let is_dir = target.starts_with("./") || target.starts_with("../") || target.starts_with('/');
    is_dir.then(|| (old.to_string(), root.join(target)))
}

/// `Some(rest)` when `path` equals `prefix` or lies under it.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

fn join_rest(base: &Path, rest: &str) -> PathBuf {
    if rest.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rest)
    }
}
