//! Comment collection and grouping.
//!
//! Adjacent comments form a group the same way Go tooling groups them: a
//! group continues while the next comment starts no more than one line below
//! the previous one. A comment on the same line as preceding code starts a
//! *trailing* group that only takes further comments from that same line.
//! Trailing groups are never doc comments.

use crate::types::Span;
use serde::Serialize;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// Raw text including the `//` or `/* */` markers
    pub text: String,
    pub span: Span,
    pub start_byte: usize,
    /// 0-based rows
    pub start_row: usize,
    pub end_row: usize,
    pub trailing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentGroup {
    pub comments: Vec<Comment>,
    pub trailing: bool,
}

impl CommentGroup {
    pub fn start_row(&self) -> usize {
        self.comments.first().map_or(0, |c| c.start_row)
    }

    pub fn end_row(&self) -> usize {
        self.comments.last().map_or(0, |c| c.end_row)
    }

    pub fn start_byte(&self) -> usize {
        self.comments.first().map_or(0, |c| c.start_byte)
    }

    pub fn span(&self) -> Span {
        match (self.comments.first(), self.comments.last()) {
            (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
            _ => Span::default(),
        }
    }

    /// Comment text without markers, normalised to newline-terminated lines.
    pub fn text(&self) -> String {
        text_of(&self.comments)
    }
}

/// Text of a run of comments, see [`CommentGroup::text`].
pub fn text_of(comments: &[Comment]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for comment in comments {
        let raw = comment.text.as_str();
        let body = if let Some(rest) = raw.strip_prefix("//") {
            if is_directive(rest) {
                continue;
            }
            rest.strip_prefix(' ').unwrap_or(rest)
        } else if let Some(rest) = raw.strip_prefix("/*") {
            rest.strip_suffix("*/").unwrap_or(rest)
        } else {
            raw
        };
        lines.extend(body.split('\n').map(|line| line.trim_end().to_string()));
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        // drop leading blank lines and collapse runs of blank lines
        if line.is_empty() && out.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// `//line`, `//export`, `//extern` and `//tool:directive` comments carry
/// instructions, not documentation.
fn is_directive(body: &str) -> bool {
    if body.starts_with("line ") || body.starts_with("extern ") || body.starts_with("export ") {
        return true;
    }
    let Some(colon) = body.find(':') else {
        return false;
    };
    let is_word = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    colon > 0
        && body.as_bytes()[..colon].iter().all(|b| is_word(*b))
        && body.as_bytes().get(colon + 1).is_some_and(|b| is_word(*b))
}

/// Collect every comment node under `root` in source order.
pub(crate) fn collect_comments(
    root: Node,
    source: &str,
    span_of: impl Fn(Node) -> Span,
) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            comments.push(Comment {
                text: source[node.byte_range()].to_string(),
                span: span_of(node),
                start_byte: node.start_byte(),
                start_row: node.start_position().row,
                end_row: node.end_position().row,
                trailing: is_trailing(node, source),
            });
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    comments.sort_by_key(|c| c.start_byte);
    comments
}

/// A comment is trailing when code precedes it on the line it starts on.
fn is_trailing(node: Node, source: &str) -> bool {
    let start = node.start_byte();
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    !source[line_start..start].trim().is_empty()
}

/// Split source-ordered comments into groups.
pub(crate) fn group_comments(comments: Vec<Comment>) -> Vec<CommentGroup> {
    let mut groups: Vec<CommentGroup> = Vec::new();
    for comment in comments {
        if let Some(group) = groups.last_mut() {
            let end_row = group.end_row();
            let joins = if group.trailing {
                comment.start_row == end_row
            } else {
                !comment.trailing && comment.start_row <= end_row + 1
            };
            if joins {
                group.comments.push(comment);
                continue;
            }
        }
        groups.push(CommentGroup {
            trailing: comment.trailing,
            comments: vec![comment],
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pos;

    fn comment(text: &str, row: usize) -> Comment {
        Comment {
            text: text.to_string(),
            span: Span::new(Pos(1), Pos(2)),
            start_byte: row * 100,
            start_row: row,
            end_row: row,
            trailing: false,
        }
    }

    #[test]
    fn test_text_strips_markers() {
        let group = CommentGroup {
            comments: vec![
                comment("// Package a does things.", 0),
                comment("//", 1),
                comment("//", 2),
                comment("//   indented   ", 3),
                comment("//go:generate stringer", 4),
            ],
            trailing: false,
        };
        assert_eq!(group.text(), "Package a does things.\n\n  indented\n");
    }

    #[test]
    fn test_text_block_comment() {
        let group = CommentGroup {
            comments: vec![comment("/*\nfirst\n\nsecond\n*/", 0)],
            trailing: false,
        };
        assert_eq!(group.text(), "first\n\nsecond\n");
    }

    #[test]
    fn test_group_span() {
        let mut last = comment("// b", 1);
        last.span = Span::new(Pos(5), Pos(9));
        let group = CommentGroup {
            comments: vec![comment("// a", 0), last],
            trailing: false,
        };
        assert_eq!(group.span(), Span::new(Pos(1), Pos(9)));

        let empty = CommentGroup {
            comments: Vec::new(),
            trailing: false,
        };
        assert_eq!(empty.span(), Span::default());
        assert!(!empty.span().start.is_valid());
    }

    #[test]
    fn test_directive_detection() {
        assert!(is_directive("go:build linux"));
        assert!(is_directive("line foo.go:10"));
        assert!(!is_directive(" TODO: fix"));
        assert!(!is_directive("note: x"));
    }

    #[test]
    fn test_grouping_by_blank_lines() {
        let groups = group_comments(vec![
            comment("// a", 0),
            comment("// b", 1),
            comment("// c", 3),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].comments.len(), 2);
        assert_eq!(groups[1].text(), "c\n");
    }
}
