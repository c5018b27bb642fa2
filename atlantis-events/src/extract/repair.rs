//! Best-effort structural repair of machine-generated JSON.
//!
//! [`repair`] runs a fixed, ordered sequence of pure passes over the
//! candidate text. Every pass is total and leaves well-formed JSON untouched,
//! so repairing an already valid document is the identity.
//!
//! 1. [`prune_incomplete_records`] drops unfinished trailing records
//! 2. [`close_unterminated_strings`] closes field values cut off at a line end
//! 3. [`remove_trailing_commas`] drops commas that precede a closer
//! 4. [`balance_brackets`] appends the missing closers in nesting order

use tracing::debug;

use super::scan::Structural;
use super::validate::REQUIRED_FIELDS;

/// A named repair pass.
pub type RepairPass = fn(&str) -> String;

/// The repair sequence, in application order.
pub const REPAIR_PASSES: [(&str, RepairPass); 4] = [
    ("prune_incomplete_records", prune_incomplete_records),
    ("close_unterminated_strings", close_unterminated_strings),
    ("remove_trailing_commas", remove_trailing_commas),
    ("balance_brackets", balance_brackets),
];

/// Apply every repair pass in order.
#[must_use]
pub fn repair(text: &str) -> String {
    let mut current = text.to_owned();
    for (name, pass) in REPAIR_PASSES {
        let next = pass(&current);
        if next != current {
            debug!(
                pass = name,
                before = current.len(),
                after = next.len(),
                "repair pass changed text"
            );
            current = next;
        }
    }
    current
}

/// One object element of the record array.
#[derive(Debug)]
struct Element {
    /// Index of the `,` that precedes this element, if any.
    separator: Option<usize>,
    start: usize,
    /// Index one past the closing `}`; `None` if the text ends first.
    end: Option<usize>,
}

/// Shape of the record array found in a candidate.
struct RecordArray {
    elements: Vec<Element>,
    closed: bool,
}

/// Locate the record array (top level, or one level inside an object) and
/// its object elements.
fn scan_record_array(text: &str) -> Option<RecordArray> {
    let mut depth = 0usize;
    let mut array_depth: Option<usize> = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut pending_separator: Option<usize> = None;

    for (idx, c) in Structural::new(text) {
        match c {
            '{' | '[' => {
                if let Some(level) = array_depth {
                    if depth == level && c == '{' {
                        elements.push(Element {
                            separator: pending_separator.take(),
                            start: idx,
                            end: None,
                        });
                    }
                } else if c == '[' && depth <= 1 {
                    array_depth = Some(depth + 1);
                }
                depth += 1;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if let Some(level) = array_depth {
                    if depth == level && c == '}' {
                        if let Some(last) = elements.last_mut() {
                            last.end = Some(idx + 1);
                        }
                    } else if depth < level {
                        // A closed side array (e.g. tags) inside the wrapper
                        // object is not the record array; keep looking.
                        if elements.is_empty() && level == 2 {
                            array_depth = None;
                            pending_separator = None;
                            continue;
                        }
                        return Some(RecordArray {
                            elements,
                            closed: true,
                        });
                    }
                }
            }
            ',' if array_depth == Some(depth) => pending_separator = Some(idx),
            _ => {}
        }
    }

    array_depth.map(|_| RecordArray {
        elements,
        closed: false,
    })
}

/// True if every required field name appears as a key in `object`.
fn has_required_fields(object: &str) -> bool {
    REQUIRED_FIELDS.iter().all(|field| {
        let quoted = format!("\"{field}\"");
        object
            .match_indices(&quoted)
            .any(|(pos, _)| object[pos + quoted.len()..].trim_start().starts_with(':'))
    })
}

/// Drop unfinished records from the end of an unterminated record array.
///
/// Only applies when the record array never closes, which is the signature
/// of a generation cut off by its token budget. Scanning from the end, each
/// trailing object that is unclosed, or closed but missing a required field
/// name, is cut out together with the separator before it. The first
/// complete trailing record stops the scan.
#[must_use]
pub fn prune_incomplete_records(text: &str) -> String {
    let Some(array) = scan_record_array(text) else {
        return text.to_owned();
    };
    if array.closed {
        return text.to_owned();
    }

    let mut out = text.to_owned();
    for element in array.elements.iter().rev() {
        let complete = element
            .end
            .is_some_and(|end| has_required_fields(&text[element.start..end]));
        if complete {
            break;
        }
        let cut_from = element.separator.unwrap_or(element.start);
        let cut_to = element.end.unwrap_or(text.len()).min(out.len());
        out.replace_range(cut_from..cut_to, "");
    }
    out
}

/// Close string values that a line ends inside of.
///
/// Tracks string state across the whole buffer. When a line ends inside a
/// string that was opened on that line right after a `:` (a field value
/// such as `"title": "partial text`), trailing whitespace is trimmed and a
/// closing quote is appended. Strings that continue across lines are left
/// alone.
#[must_use]
pub fn close_unterminated_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;

    for (line_no, line) in text.split('\n').enumerate() {
        if line_no > 0 {
            out.push('\n');
        }
        let mut opened_at: Option<usize> = None;
        for (idx, c) in line.char_indices() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                    opened_at = None;
                }
            } else if c == '"' {
                in_string = true;
                opened_at = Some(idx);
            }
        }

        let value_start = opened_at.filter(|&at| line[..at].trim_end().ends_with(':'));
        match value_start {
            Some(_) if in_string => {
                let mut fixed = line.trim_end();
                if escaped {
                    fixed = fixed.strip_suffix('\\').unwrap_or(fixed);
                }
                out.push_str(fixed);
                out.push('"');
                in_string = false;
                escaped = false;
            }
            _ => out.push_str(line),
        }
    }
    out
}

/// Remove commas that are followed (after whitespace) by `}` / `]`, or by
/// the end of the text.
#[must_use]
pub fn remove_trailing_commas(text: &str) -> String {
    let dangling: Vec<usize> = Structural::new(text)
        .filter(|&(idx, c)| {
            c == ',' && {
                let rest = text[idx + 1..].trim_start();
                rest.is_empty() || rest.starts_with('}') || rest.starts_with(']')
            }
        })
        .map(|(idx, _)| idx)
        .collect();

    if dangling.is_empty() {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for idx in dangling {
        out.push_str(&text[last..idx]);
        last = idx + 1;
    }
    out.push_str(&text[last..]);
    out
}

/// Append the closers needed to balance every open `{` / `[`.
///
/// Closers are appended innermost first. A string left open at the very end
/// is closed before any bracket.
#[must_use]
pub fn balance_brackets(text: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut scan = Structural::new(text);
    for (_, c) in scan.by_ref() {
        match c {
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    if open.is_empty() && !scan.in_string() {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len() + open.len() + 1);
    out.push_str(text);
    if scan.in_string() {
        out.push('"');
    }
    out.extend(open.iter().rev());
    debug!(added = open.len(), "appended missing closers");
    out
}
