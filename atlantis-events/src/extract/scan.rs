//! String-aware character scanning shared by the extraction passes.
//!
//! [`Structural`] walks a JSON-ish buffer and yields only the characters
//! that sit outside string literals, plus the opening quote of each string.
//! Escape state is honoured inside strings, so `"a\"}"` never yields the `}`.

use std::str::CharIndices;

/// Iterator over structural characters of a JSON-like buffer.
pub(crate) struct Structural<'a> {
    chars: CharIndices<'a>,
    in_string: bool,
    escaped: bool,
}

impl<'a> Structural<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            in_string: false,
            escaped: false,
        }
    }

    /// True if the scan so far ended inside an open string literal.
    pub(crate) fn in_string(&self) -> bool {
        self.in_string
    }
}

impl Iterator for Structural<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, c) = self.chars.next()?;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            if c == '"' {
                self.in_string = true;
            }
            return Some((idx, c));
        }
    }
}

/// Byte index one past the value that opens at `start`.
///
/// `start` must point at `{` or `[`. Returns `None` when the buffer ends
/// before the opener is balanced.
pub(crate) fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in Structural::new(&text[start..]) {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + idx + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
