//! One-line package summaries.

/// Doc text starting with one of these is boilerplate, not a summary.
const ILLEGAL_PREFIXES: &[&str] = &["copyright", "all rights", "author"];

/// First sentence of `text` with whitespace collapsed and quote pairs
/// (two backquotes, two single quotes) turned into typographic quotes.
/// Empty when the text is a copyright or author notice.
pub fn synopsis(text: &str) -> String {
    let sentence = clean(&text[..first_sentence_len(text)]);
    let lower = sentence.to_lowercase();
    if ILLEGAL_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return String::new();
    }
    sentence.replace("``", "\u{201c}").replace("''", "\u{201d}")
}

/// Byte length of the first sentence: up to a period followed by a blank,
/// unless the period ends a single upper-case initial such as the `J.` in
/// `J. Smith`.
fn first_sentence_len(text: &str) -> usize {
    let (mut ppp, mut pp, mut p) = (' ', ' ', ' ');
    for (idx, c) in text.char_indices() {
        let c = if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c };
        if c == ' ' && p == '.' && (!pp.is_uppercase() || ppp.is_uppercase()) {
            return idx;
        }
        if p == '\u{3002}' || p == '\u{ff0e}' {
            return idx;
        }
        (ppp, pp, p) = (pp, p, c);
    }
    text.len()
}

/// Collapse every run of whitespace to one space and trim the ends.
fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence() {
        assert_eq!(
            synopsis("Package tpkg is a test package. It has two sentences.\n"),
            "Package tpkg is a test package."
        );
        assert_eq!(
            synopsis("Package mail was written by J. Smith. Really.\n"),
            "Package mail was written by J. Smith."
        );
        assert_eq!(synopsis("Package p spans\ntwo lines. Second."), "Package p spans two lines.");
        assert_eq!(synopsis("No period at all"), "No period at all");
    }

    #[test]
    fn test_boilerplate_is_dropped() {
        assert_eq!(synopsis("Copyright 2024 The Authors. All rights reserved."), "");
        assert_eq!(synopsis("Author: someone."), "");
        assert_eq!(synopsis(""), "");
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            synopsis("Package q handles ``quoted'' text."),
            "Package q handles \u{201c}quoted\u{201d} text."
        );
    }
}
