//! Example functions of test files.

use super::model::Example;
use crate::methods::is_test_name;
use crate::syntax::{CommentGroup, SyntaxFile};
use regex::Regex;
use std::sync::LazyLock;
use tree_sitter::Node;

static OUTPUT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[[:space:]]*(unordered )?output:").expect("Invalid regex")
});

/// Append the examples declared in the test file `file` to `out`, in
/// source order.
pub fn read_examples(file: &SyntaxFile, out: &mut Vec<Example>) {
    let mut has_tests = false;
    let mut num_decl = 0;
    let mut found = Vec::new();

    for decl in file.declarations() {
        match decl.kind() {
            "const_declaration" | "var_declaration" | "type_declaration" => {
                num_decl += 1;
                continue;
            }
            "function_declaration" => num_decl += 1,
            _ => continue,
        }
        let Some(name_node) = decl.child_by_field_name("name") else {
            continue;
        };
        let name = file.text(name_node);
        if is_test_name(name, "Test") || is_test_name(name, "Benchmark") || is_test_name(name, "Fuzz")
        {
            has_tests = true;
            continue;
        }
        if !is_test_name(name, "Example") || !is_niladic(decl) {
            continue;
        }
        let Some(body) = decl.child_by_field_name("body") else {
            continue;
        };

        let last = file.comments_within(body).last();
        let (output, unordered, has_output) = last.map(example_output).unwrap_or_default();
        let name = name["Example".len()..].to_string();
        found.push(Example {
            suffix: example_suffix(&name).to_string(),
            name,
            doc: file
                .doc_comment(decl)
                .map(CommentGroup::text)
                .unwrap_or_default(),
            code: example_code(file, body, last.filter(|_| has_output)),
            empty_output: has_output && output.is_empty(),
            output,
            unordered,
            pos: file.pos_of(decl),
        });
    }

    // a lone example next to other declarations is shown as the whole file
    if !has_tests && num_decl > 1 && found.len() == 1 {
        found[0].code = file.source.clone();
    }
    out.extend(found);
}

/// No parameters, results or type parameters.
fn is_niladic(decl: Node) -> bool {
    if decl.child_by_field_name("result").is_some()
        || decl.child_by_field_name("type_parameters").is_some()
    {
        return false;
    }
    decl.child_by_field_name("parameters").is_none_or(|params| {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .all(|param| param.kind() == "comment")
    })
}

/// Output text of the last comment group of an example body. Returns the
/// text, the unordered flag and whether an output marker was present.
fn example_output(group: &CommentGroup) -> (String, bool, bool) {
    let text = group.text();
    let Some(caps) = OUTPUT_PREFIX.captures(&text) else {
        return (String::new(), false, false);
    };
    let unordered = caps.get(1).is_some();
    let end = caps.get(0).map_or(0, |m| m.end());
    let rest = text[end..].trim_start_matches(' ');
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    (rest.to_string(), unordered, true)
}

/// Part of an example name after its last `_`, when that part does not
/// start with an upper-case letter.
fn example_suffix(name: &str) -> &str {
    match name.rfind('_') {
        Some(idx) if idx + 1 < name.len() => {
            let suffix = &name[idx + 1..];
            if suffix.chars().next().is_some_and(char::is_uppercase) {
                ""
            } else {
                suffix
            }
        }
        _ => "",
    }
}

/// Body statements without braces and without the output comment, dedented
/// by one level.
fn example_code(file: &SyntaxFile, body: Node, output: Option<&CommentGroup>) -> String {
    let start = body.start_byte() + 1;
    let end = body.end_byte().saturating_sub(1).max(start);
    let mut code = file.source[start..end].to_string();
    if let Some(group) = output {
        let from = group.start_byte();
        let to = group
            .comments
            .last()
            .map_or(from, |c| c.start_byte + c.text.len());
        if from >= start && to <= end {
            code.replace_range(from - start..to - start, "");
        }
    }

    let lines: Vec<&str> = code
        .lines()
        .map(|line| line.strip_prefix('\t').unwrap_or(line).trim_end())
        .collect();
    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => {
            let mut text = lines[first..=last].join("\n");
            text.push('\n');
            text
        }
        _ => String::new(),
    }
}
