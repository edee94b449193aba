use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Offset into a [`FileSet`](crate::syntax::FileSet).
///
/// Every parsed file is registered with a base, so positions from different
/// files of one file set never overlap and compare by file registration order
/// first. `Pos(0)` is the invalid position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Pos(pub u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }

    /// Position `delta` bytes after this one.
    pub fn offset(self, delta: usize) -> Pos {
        Pos(self.0 + delta as u32)
    }
}

/// Half-open `[start, end)` range of positions in one file set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos >= self.start && pos < self.end
    }

    pub fn len(&self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved, human-readable source position.
///
/// `line` and `column` are 1-based; a line of 0 marks a position that could
/// not be resolved (only the file name is then meaningful).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub filename: PathBuf,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(filename: impl Into<PathBuf>, offset: usize, line: u32, column: u32) -> Self {
        Self {
            filename: filename.into(),
            offset,
            line,
            column,
        }
    }

    /// Position naming only a file, without line information.
    pub fn file_only(filename: impl Into<PathBuf>) -> Self {
        Self::new(filename, 0, 0, 0)
    }

    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.filename.display().to_string();
        match (name.is_empty(), self.is_valid()) {
            (true, false) => write!(f, "-"),
            (true, true) => write!(f, "{}:{}", self.line, self.column),
            (false, false) => write!(f, "{name}"),
            (false, true) => write!(f, "{name}:{}:{}", self.line, self.column),
        }
    }
}
