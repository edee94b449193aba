//! Marker notes: `// BUG(uid): body` style comments.

use super::model::Note;
use crate::syntax::comments::{self, CommentGroup};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `MARKER(uid)` at the start of a comment, including its markers.
static NOTE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[/*][ \t]*([A-Z][A-Z]+)\(([^)]+)\):?").expect("Invalid regex")
});

/// `MARKER(uid)` at the start of comment text.
static NOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*([A-Z][A-Z]+)\(([^)]+)\):?").expect("Invalid regex")
});

/// Collect the notes of `groups` into `notes`, keyed by marker.
///
/// A note starts at a comment whose text begins with a marker and runs up to
/// the next such comment or the end of the group.
pub fn read_notes(groups: &[CommentGroup], notes: &mut BTreeMap<String, Vec<Note>>) {
    for group in groups {
        let list = &group.comments;
        let mut start: Option<usize> = None;
        for (idx, comment) in list.iter().enumerate() {
            if NOTE_COMMENT.is_match(&comment.text) {
                if let Some(from) = start {
                    read_note(&list[from..idx], notes);
                }
                start = Some(idx);
            }
        }
        if let Some(from) = start {
            read_note(&list[from..], notes);
        }
    }
}

fn read_note(list: &[comments::Comment], notes: &mut BTreeMap<String, Vec<Note>>) {
    let (Some(first), Some(last)) = (list.first(), list.last()) else {
        return;
    };
    let text = comments::text_of(list);
    let Some(caps) = NOTE_MARKER.captures(&text) else {
        return;
    };
    let (Some(whole), Some(marker), Some(uid)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return;
    };
    let body = clean_keep_newlines(&text[whole.end()..]);
    if body.trim().is_empty() {
        return;
    }
    notes
        .entry(marker.as_str().to_string())
        .or_default()
        .push(Note {
            pos: first.span.start,
            end: last.span.end,
            uid: uid.as_str().to_string(),
            body,
        });
}

/// Collapse runs of blanks (tabs and carriage returns count as blanks) and
/// drop leading and trailing blanks. Newlines are kept.
fn clean_keep_newlines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = ' ';
    for c in s.chars() {
        let c = if c == '\t' || c == '\r' { ' ' } else { c };
        if c != ' ' || prev != ' ' {
            out.push(c);
            prev = c;
        }
    }
    if prev == ' ' && out.ends_with(' ') {
        out.pop();
    }
    out
}
