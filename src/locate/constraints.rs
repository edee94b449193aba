//! Build constraints: `_GOOS_GOARCH` file name suffixes and `//go:build`
//! expressions.

use std::collections::BTreeSet;

/// Operating systems recognised in file name suffixes.
const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Systems satisfying the `unix` tag.
const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Architectures recognised in file name suffixes.
const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Newest `go1.N` release tag considered satisfied.
const RELEASE_MINOR: u32 = 24;

/// The target a package is being loaded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConstraints {
    pub goos: String,
    pub goarch: String,
    pub tags: BTreeSet<String>,
    pub cgo_enabled: bool,
}

impl BuildConstraints {
    pub fn new(
        goos: impl Into<String>,
        goarch: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        cgo_enabled: bool,
    ) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            tags: tags.into_iter().collect(),
            cgo_enabled,
        }
    }

    /// Whether a single build tag is satisfied.
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch || self.tags.contains(tag) {
            return true;
        }
        match tag {
            "gc" => true,
            "cgo" => self.cgo_enabled,
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            "linux" => self.goos == "android",
            "solaris" => self.goos == "illumos",
            "darwin" => self.goos == "ios",
            _ => tag
                .strip_prefix("go1.")
                .and_then(|minor| minor.parse::<u32>().ok())
                .is_some_and(|minor| minor <= RELEASE_MINOR),
        }
    }

    /// Whether the `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` suffix of a file
    /// name (if any) matches the target.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);
        // the part before the first underscore never counts
        let Some(idx) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[idx + 1..].split('_').collect();
        let n = parts.len();
        let is_os = |s: &str| KNOWN_OS.contains(&s);
        let is_arch = |s: &str| KNOWN_ARCH.contains(&s);

        if n >= 2 && is_os(parts[n - 2]) && is_arch(parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        if n >= 1 && (is_os(parts[n - 1]) || is_arch(parts[n - 1])) {
            return self.matches_tag(parts[n - 1]);
        }
        true
    }

    /// Evaluate every `//go:build` line of the file header. A file without
    /// constraint lines always matches.
    pub fn matches_source(&self, source: &str) -> Result<bool, String> {
        for line in header_lines(source) {
            if let Some(expr) = line.strip_prefix("//go:build") {
                if !self.eval(expr)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Evaluate a build expression made of tags, `!`, `&&`, `||` and
    /// parentheses.
    pub fn eval(&self, expr: &str) -> Result<bool, String> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
            constraints: self,
        };
        let value = parser.or()?;
        if parser.pos != tokens.len() {
            return Err(format!("unexpected token in build expression: {expr}"));
        }
        Ok(value)
    }
}

/// Comment lines before the package clause.
fn header_lines(source: &str) -> impl Iterator<Item = &str> {
    let mut in_block = false;
    source
        .lines()
        .map(str::trim)
        .take_while(move |line| {
            if in_block {
                in_block = !line.contains("*/");
                return true;
            }
            if line.starts_with("/*") {
                in_block = !line.contains("*/");
                return true;
            }
            line.is_empty() || line.starts_with("//")
        })
        .filter(|line| line.starts_with("//"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Tag(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(format!("invalid operator in build expression: {expr}"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut tag = String::new();
                while let Some(&c) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_' || c == '.') {
                        break;
                    }
                    tag.push(c);
                    chars.next();
                }
                tokens.push(Token::Tag(tag));
            }
            other => return Err(format!("invalid character {other:?} in build expression")),
        }
    }
    if tokens.is_empty() {
        return Err("empty build expression".to_string());
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    constraints: &'a BuildConstraints,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or(&mut self) -> Result<bool, String> {
        let mut value = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, String> {
        let mut value = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn not(&mut self) -> Result<bool, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(!self.not()?);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<bool, String> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Open) => {
                let value = self.or()?;
                if self.peek() != Some(&Token::Close) {
                    return Err("missing ) in build expression".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(Token::Tag(tag)) => Ok(self.constraints.matches_tag(&tag)),
            _ => Err("expected build tag".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> BuildConstraints {
        BuildConstraints::new("linux", "amd64", vec!["integration".to_string()], true)
    }

    #[test]
    fn test_file_name_suffixes() {
        let c = linux();
        assert!(c.matches_file_name("file.go"));
        assert!(c.matches_file_name("file_linux.go"));
        assert!(c.matches_file_name("file_linux_amd64_test.go"));
        assert!(!c.matches_file_name("file_windows.go"));
        assert!(!c.matches_file_name("file_arm64.go"));
        assert!(!c.matches_file_name("file_linux_arm64.go"));
        // the leading element is a plain name, not a constraint
        assert!(c.matches_file_name("windows.go"));
        assert!(c.matches_file_name("my_file.go"));
    }

    #[test]
    fn test_eval_expressions() {
        let c = linux();
        assert!(c.eval("linux && amd64").unwrap());
        assert!(c.eval("unix").unwrap());
        assert!(!c.eval("windows || darwin").unwrap());
        assert!(c.eval("!(windows || darwin) && go1.18").unwrap());
        assert!(c.eval("integration").unwrap());
        assert!(!c.eval("ignore").unwrap());
        assert!(c.eval("linux &&").is_err());
        assert!(c.eval("linux & amd64").is_err());
    }

    #[test]
    fn test_matches_source_header() {
        let c = linux();
        assert!(!c.matches_source("//go:build ignore\n\npackage main\n").unwrap());
        assert!(c.matches_source("// Copyright\n\n//go:build linux\n\npackage a\n").unwrap());
        // constraint-looking comments after the package clause do not count
        assert!(c.matches_source("package a\n\n//go:build ignore\n").unwrap());
    }
}
