//! Source positions.

use std::fmt;

/// A position in the input text.
///
/// `offset` is a byte offset into the loader's input buffer; `line` and
/// `column` are zero-based. Marks are attached to errors and never change
/// once taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Mark {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Render the source line holding this mark with a caret under it.
    ///
    /// Long lines are cut down to `max_length` characters around the mark
    /// and the cut is shown with ` ... `.
    pub fn snippet(&self, input: &str, indent: usize, max_length: usize) -> Option<String> {
        if self.offset > input.len() || !input.is_char_boundary(self.offset) {
            return None;
        }

        let bytes = input.as_bytes();
        let mut start = self.offset;
        while start > 0 && !matches!(bytes[start - 1], b'\n' | b'\r') {
            start -= 1;
        }
        let mut end = self.offset;
        while end < bytes.len() && !matches!(bytes[end], b'\n' | b'\r') {
            end += 1;
        }

        let before: Vec<char> = input[start..self.offset].chars().collect();
        let after: Vec<char> = input[self.offset..end].chars().collect();
        let half = max_length / 2;

        let (head, before) = if before.len() > half.saturating_sub(1) {
            let keep = half.saturating_sub(1).saturating_sub(5);
            (" ... ", &before[before.len() - keep..])
        } else {
            ("", &before[..])
        };
        let (tail, after) = if after.len() > half.saturating_sub(1) {
            let keep = half.saturating_sub(1).saturating_sub(5);
            (" ... ", &after[..keep])
        } else {
            ("", &after[..])
        };

        let pad = " ".repeat(indent);
        let line: String = before.iter().chain(after.iter()).collect();
        let caret = " ".repeat(head.chars().count() + before.len());
        Some(format!("{pad}{head}{line}{tail}\n{pad}{caret}^"))
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        let mark = Mark::new(7, 0, 7);
        assert_eq!(mark.to_string(), "line 1, column 8");
    }

    #[test]
    fn test_snippet_points_at_column() {
        let input = "{'': {${: []}}\n";
        let mark = Mark::new(7, 0, 7);
        let snippet = mark.snippet(input, 4, 75).unwrap();
        assert_eq!(snippet, "    {'': {${: []}}\n           ^");
    }

    #[test]
    fn test_snippet_on_second_line() {
        let input = "a: 1\nb: [x y]\n";
        let mark = Mark::new(11, 1, 6);
        let snippet = mark.snippet(input, 0, 75).unwrap();
        assert_eq!(snippet, "b: [x y]\n      ^");
    }

    #[test]
    fn test_snippet_truncates_long_lines() {
        let input = format!("{}X{}", "a".repeat(100), "b".repeat(100));
        let mark = Mark::new(100, 0, 100);
        let snippet = mark.snippet(&input, 0, 40).unwrap();
        let mut lines = snippet.lines();
        let text = lines.next().unwrap();
        let caret = lines.next().unwrap();
        assert!(text.starts_with(" ... "));
        assert!(text.ends_with(" ... "));
        assert_eq!(text.chars().nth(caret.len() - 1), Some('X'));
    }
}
