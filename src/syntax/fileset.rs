//! Position table shared by every file of one parse pass.

use crate::types::{Pos, Position};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct FileEntry {
    name: PathBuf,
    base: u32,
    size: u32,
    /// Byte offset of the first character of each line
    lines: Vec<u32>,
}

/// Registry of parsed files that turns [`Pos`] values into [`Position`]s.
///
/// Files are laid out one after another: a file of `size` bytes registered at
/// base `b` owns positions `b..=b + size` (the extra slot is the end-of-file
/// position), and the next file starts at `b + size + 1`.
#[derive(Debug, Clone)]
pub struct FileSet {
    base: u32,
    files: Vec<FileEntry>,
}

impl Default for FileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSet {
    pub fn new() -> Self {
        Self {
            base: 1,
            files: Vec::new(),
        }
    }

    /// The base the next registered file will receive.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Register `source` under `name` and return the file's base position.
    pub fn add_file(&mut self, name: impl Into<PathBuf>, source: &str) -> Pos {
        let base = self.base;
        let size = source.len() as u32;
        let mut lines = vec![0];
        lines.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        self.files.push(FileEntry {
            name: name.into(),
            base,
            size,
            lines,
        });
        self.base = base + size + 1;
        Pos(base)
    }

    fn entry(&self, pos: Pos) -> Option<&FileEntry> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self.files.partition_point(|f| f.base <= pos.0);
        let entry = self.files.get(idx.checked_sub(1)?)?;
        (pos.0 <= entry.base + entry.size).then_some(entry)
    }

    /// Name of the file `pos` belongs to.
    pub fn file_name(&self, pos: Pos) -> Option<&Path> {
        self.entry(pos).map(|e| e.name.as_path())
    }

    /// Registered file names in registration order.
    pub fn file_names(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.name.as_path())
    }

    /// Resolve `pos`; unknown positions yield `Position::default()`.
    pub fn position(&self, pos: Pos) -> Position {
        let Some(entry) = self.entry(pos) else {
            return Position::default();
        };
        let offset = pos.0 - entry.base;
        let line = entry.lines.partition_point(|start| *start <= offset);
        let line_start = entry.lines[line - 1];
        Position::new(
            entry.name.clone(),
            offset as usize,
            line as u32,
            offset - line_start + 1,
        )
    }
}
