//! Isolate the JSON-looking part of a raw generation.
//!
//! Providers wrap their answer in markdown fences, prepend prose, or append
//! a friendly sign-off. [`extract_candidate`] strips all of that and returns
//! the substring most likely to be the record document. It never fails.

use super::scan::matching_close;

const FENCE: &str = "```";

/// Extract the JSON body from a potentially fenced, prose-wrapped response.
///
/// 1. If the text has fenced blocks, every block body that starts with `{`
///    or `[` (after an optional language tag such as `json`) is a candidate;
///    the longest one wins.
/// 2. Otherwise each `{` or `[` is matched to its closer, string-aware, and
///    the first span that can hold records wins: an object, or an array whose
///    first element is an object. Bracketed prose such as `[1]` is skipped.
///    With no such span the first one is used. A truncated document with no
///    closer runs to the end of the text.
/// 3. With no opener at all, the trimmed text is returned unchanged.
#[must_use]
pub fn extract_candidate(raw: &str) -> &str {
    let trimmed = raw.trim();

    if trimmed.contains(FENCE) {
        let longest = trimmed
            .split(FENCE)
            .filter_map(fenced_body)
            .max_by_key(|body| body.len());
        if let Some(body) = longest {
            return body;
        }
    }

    bracket_span(trimmed).unwrap_or(trimmed)
}

/// Returns the block body if it looks like JSON, minus any language tag.
fn fenced_body(part: &str) -> Option<&str> {
    let part = part.trim();
    if starts_like_json(part) {
        return Some(part);
    }
    let tag_len = part
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
        .unwrap_or(part.len());
    if tag_len == 0 {
        return None;
    }
    let rest = part[tag_len..].trim_start();
    starts_like_json(rest).then_some(rest)
}

fn starts_like_json(s: &str) -> bool {
    s.starts_with('{') || s.starts_with('[')
}

/// First object/array span that can hold records, matched string-aware.
fn bracket_span(text: &str) -> Option<&str> {
    let mut first = None;
    let mut from = 0;
    while let Some(offset) = text[from..].find(['{', '[']) {
        let start = from + offset;
        let end = matching_close(text, start).unwrap_or(text.len());
        let span = &text[start..end];
        if holds_records(span) {
            return Some(span);
        }
        first = first.or(Some(span));
        from = end;
    }
    first
}

fn holds_records(span: &str) -> bool {
    match span.strip_prefix('[') {
        Some(rest) => rest.trim_start().starts_with('{'),
        None => true,
    }
}
