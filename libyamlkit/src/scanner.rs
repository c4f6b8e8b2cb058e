//! Cursor over the loader input and the lexical readers built on it.
//!
//! The scanner owns no tokens. It keeps an absolute byte position plus the
//! current line, line start and indentation, and each `read_*` function
//! either recognizes one lexical construct at the cursor (advancing past it)
//! or leaves the cursor untouched:
//!
//! - separation space: blanks, comments and line breaks between tokens
//! - document markers `---` and `...` at the start of a line
//! - plain, single-quoted, double-quoted, literal and folded scalars
//! - tag, anchor and alias properties
//! - directive lines
//!
//! The input always ends in a line break; reading past the end yields `0`.

use std::collections::HashMap;

use crate::error::{Error, Located, ParseContext, Result};
use crate::mark::Mark;

pub(crate) const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

pub(crate) fn is_eol(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

pub(crate) fn is_white_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

pub(crate) fn is_ws_or_eol(c: u8) -> bool {
    is_white_space(c) || is_eol(c)
}

pub(crate) fn is_flow_indicator(c: u8) -> bool {
    matches!(c, b',' | b'[' | b']' | b'{' | b'}')
}

fn simple_escape(c: u8) -> Option<&'static str> {
    Some(match c {
        b'0' => "\x00",
        b'a' => "\x07",
        b'b' => "\x08",
        b't' | b'\t' => "\t",
        b'n' => "\n",
        b'v' => "\x0B",
        b'f' => "\x0C",
        b'r' => "\r",
        b'e' => "\x1B",
        b' ' => " ",
        b'"' => "\"",
        b'/' => "/",
        b'\\' => "\\",
        b'N' => "\u{85}",
        b'_' => "\u{A0}",
        b'L' => "\u{2028}",
        b'P' => "\u{2029}",
        _ => return None,
    })
}

fn escaped_hex_len(c: u8) -> usize {
    match c {
        b'x' => 2,
        b'u' => 4,
        b'U' => 8,
        _ => 0,
    }
}

/// `!`, `!!` or `!name!`.
pub(crate) fn is_tag_handle(handle: &str) -> bool {
    let bytes = handle.as_bytes();
    match bytes.len() {
        0 => false,
        1 => bytes[0] == b'!',
        _ => {
            bytes[0] == b'!'
                && bytes[bytes.len() - 1] == b'!'
                && bytes[1..bytes.len() - 1]
                    .iter()
                    .all(|c| c.is_ascii_alphabetic() || *c == b'-')
        }
    }
}

/// Characters allowed in a tag URI; `%` must introduce two hex digits.
pub(crate) fn is_tag_uri(uri: &str) -> bool {
    let bytes = uri.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'%' {
            if i + 2 >= bytes.len() {
                return false;
            }
            if !(bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit()) {
                return false;
            }
            i += 3;
            continue;
        }
        if i == 0 && is_flow_indicator(c) {
            return false;
        }
        let ok = c.is_ascii_alphanumeric()
            || c >= 0x80
            || b"-#;/?:@&=+$,_.!~*'()[]".contains(&c);
        if !ok {
            return false;
        }
        i += 1;
    }
    true
}

/// Decode `%XX` escapes in a tag.
fn decode_tag(tag: &str) -> Option<String> {
    if !tag.contains('%') {
        return Some(tag.to_string());
    }
    let bytes = tag.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = tag.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Block scalar chomping mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Chomping {
    Clip,
    Strip,
    Keep,
}

/// Cursor state shared by all lexical readers.
pub(crate) struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    ctx: &'a ParseContext,
    pub position: usize,
    pub line: usize,
    pub line_start: usize,
    pub line_indent: isize,
    /// The last separation space ended on a line indented with a tab.
    pub tab_indent: bool,
    pub warnings: Vec<Located>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        input: &'a str,
        ctx: &'a ParseContext,
        position: usize,
        line: usize,
        line_start: usize,
    ) -> Self {
        let mut scanner = Scanner {
            input,
            bytes: input.as_bytes(),
            ctx,
            position,
            line,
            line_start,
            line_indent: 0,
            tab_indent: false,
            warnings: Vec::new(),
        };
        let lead = &scanner.bytes[line_start.min(position)..position];
        if lead.iter().all(|c| *c == b' ') {
            scanner.line_indent = lead.len() as isize;
            while scanner.peek() == b' ' {
                scanner.line_indent += 1;
                scanner.position += 1;
            }
        }
        scanner
    }

    pub fn peek(&self) -> u8 {
        self.bytes.get(self.position).copied().unwrap_or(0)
    }

    pub fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.position + offset).copied().unwrap_or(0)
    }

    fn byte_at(&self, position: usize) -> u8 {
        self.bytes.get(position).copied().unwrap_or(0)
    }

    pub fn advance(&mut self) -> u8 {
        self.position += 1;
        self.peek()
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.input.get(start..end).unwrap_or("")
    }

    pub fn mark(&self) -> Mark {
        Mark::new(
            self.position,
            self.line,
            self.position.saturating_sub(self.line_start),
        )
    }

    pub fn located_at(&self, mark: Mark, message: impl Into<String>) -> Located {
        self.ctx.locate(message, mark, self.input)
    }

    pub fn lexical(&self, message: impl Into<String>) -> Error {
        Error::Lexical(self.located_at(self.mark(), message))
    }

    pub fn composition(&self, message: impl Into<String>) -> Error {
        Error::Composition(self.located_at(self.mark(), message))
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let located = self.located_at(self.mark(), message);
        self.warnings.push(located);
    }

    pub fn read_line_break(&mut self) -> Result<()> {
        match self.peek() {
            b'\n' => self.position += 1,
            b'\r' => {
                self.position += 1;
                if self.peek() == b'\n' {
                    self.position += 1;
                }
            }
            _ => return Err(self.lexical("a line break is expected")),
        }
        self.line += 1;
        self.line_start = self.position;
        Ok(())
    }

    /// Skip blanks, comments (if allowed) and line breaks.
    ///
    /// Returns the number of line breaks crossed. `check_indent` of `-1`
    /// disables the deficient-indentation warning.
    pub fn skip_separation_space(&mut self, allow_comments: bool, check_indent: isize) -> usize {
        let mut line_breaks = 0;
        let mut tab_on_line = false;
        let mut ch = self.peek();
        while ch != 0 {
            while is_white_space(ch) {
                ch = self.advance();
            }
            if allow_comments && ch == b'#' {
                loop {
                    ch = self.advance();
                    if is_eol(ch) || ch == 0 {
                        break;
                    }
                }
            }
            if !is_eol(ch) {
                break;
            }
            // read_line_break cannot fail on an end-of-line byte
            let _ = self.read_line_break();
            ch = self.peek();
            line_breaks += 1;
            self.line_indent = 0;
            while ch == b' ' {
                self.line_indent += 1;
                ch = self.advance();
            }
            tab_on_line = ch == b'\t';
        }
        self.tab_indent = line_breaks > 0 && tab_on_line && ch != 0;
        if check_indent != -1 && line_breaks != 0 && self.line_indent < check_indent {
            self.warn("deficient indentation");
        }
        line_breaks
    }

    /// `---` or `...` followed by a blank, a line break or the end.
    pub fn test_document_separator(&self) -> bool {
        let ch = self.peek();
        if (ch == b'-' || ch == b'.') && self.peek_at(1) == ch && self.peek_at(2) == ch {
            let next = self.peek_at(3);
            return next == 0 || is_ws_or_eol(next);
        }
        false
    }

    pub fn at_document_separator(&self) -> bool {
        self.position == self.line_start && self.test_document_separator()
    }

    fn capture_segment(&self, out: &mut String, start: usize, end: usize, check_json: bool) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        let segment = self.slice(start, end);
        if check_json {
            if let Some(offset) = segment
                .char_indices()
                .find(|(_, c)| !(*c == '\t' || *c >= ' '))
                .map(|(i, _)| i)
            {
                let at = start + offset;
                let mark = Mark::new(at, self.line, at.saturating_sub(self.line_start));
                return Err(Error::Lexical(
                    self.located_at(mark, "expected valid JSON character"),
                ));
            }
        }
        out.push_str(segment);
        Ok(())
    }

    fn write_folded_lines(out: &mut String, count: usize) {
        if count == 1 {
            out.push(' ');
        } else if count > 1 {
            out.extend(std::iter::repeat('\n').take(count - 1));
        }
    }

    /// Read a plain scalar; `None` if the cursor is not at one.
    pub fn read_plain_scalar(&mut self, node_indent: isize, within_flow: bool) -> Option<String> {
        let mut ch = self.peek();
        if is_ws_or_eol(ch)
            || is_flow_indicator(ch)
            || matches!(
                ch,
                b'#' | b'&' | b'*' | b'!' | b'|' | b'>' | b'\'' | b'"' | b'%' | b'@' | b'`'
            )
        {
            return None;
        }
        if ch == b'?' || ch == b'-' {
            let following = self.peek_at(1);
            if is_ws_or_eol(following) || (within_flow && is_flow_indicator(following)) {
                return None;
            }
        }

        let mut result = String::new();
        let mut capture_start = self.position;
        let mut capture_end = self.position;
        let mut pending = false;
        let mut saved = (self.line, self.line_start, self.line_indent);

        while ch != 0 {
            if ch == b':' {
                let following = self.peek_at(1);
                if is_ws_or_eol(following) || (within_flow && is_flow_indicator(following)) {
                    break;
                }
            } else if ch == b'#' {
                if self.position > 0 && is_ws_or_eol(self.byte_at(self.position - 1)) {
                    break;
                }
            } else if self.at_document_separator() || (within_flow && is_flow_indicator(ch)) {
                break;
            } else if is_eol(ch) {
                saved = (self.line, self.line_start, self.line_indent);
                self.skip_separation_space(false, -1);
                if self.line_indent >= node_indent {
                    pending = true;
                    ch = self.peek();
                    continue;
                }
                self.position = capture_end;
                self.line = saved.0;
                self.line_start = saved.1;
                self.line_indent = saved.2;
                break;
            }

            if pending {
                result.push_str(self.slice(capture_start, capture_end));
                Self::write_folded_lines(&mut result, self.line - saved.0);
                capture_start = self.position;
                capture_end = self.position;
                pending = false;
            }
            if !is_white_space(ch) {
                capture_end = self.position + 1;
            }
            ch = self.advance();
        }
        result.push_str(self.slice(capture_start, capture_end));

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    pub fn read_single_quoted_scalar(&mut self, node_indent: isize) -> Result<Option<String>> {
        if self.peek() != b'\'' {
            return Ok(None);
        }
        let mut result = String::new();
        self.position += 1;
        let mut capture_start = self.position;
        let mut capture_end = self.position;

        loop {
            let ch = self.peek();
            if ch == 0 {
                break;
            }
            if ch == b'\'' {
                self.capture_segment(&mut result, capture_start, self.position, true)?;
                if self.advance() == b'\'' {
                    capture_start = self.position;
                    self.position += 1;
                    capture_end = self.position;
                } else {
                    return Ok(Some(result));
                }
            } else if is_eol(ch) {
                self.capture_segment(&mut result, capture_start, capture_end, true)?;
                let breaks = self.skip_separation_space(false, node_indent);
                Self::write_folded_lines(&mut result, breaks);
                capture_start = self.position;
                capture_end = self.position;
            } else if self.at_document_separator() {
                return Err(self.lexical("unexpected end of the document within a single quoted scalar"));
            } else {
                self.position += 1;
                if !is_white_space(ch) {
                    capture_end = self.position;
                }
            }
        }
        Err(self.lexical("unexpected end of the stream within a single quoted scalar"))
    }

    pub fn read_double_quoted_scalar(&mut self, node_indent: isize) -> Result<Option<String>> {
        if self.peek() != b'"' {
            return Ok(None);
        }
        let mut result = String::new();
        self.position += 1;
        let mut capture_start = self.position;
        let mut capture_end = self.position;

        loop {
            let ch = self.peek();
            if ch == 0 {
                break;
            }
            if ch == b'"' {
                self.capture_segment(&mut result, capture_start, self.position, true)?;
                self.position += 1;
                return Ok(Some(result));
            } else if ch == b'\\' {
                self.capture_segment(&mut result, capture_start, self.position, true)?;
                let ch = self.advance();
                if is_eol(ch) {
                    self.skip_separation_space(false, node_indent);
                } else if let Some(text) = simple_escape(ch) {
                    result.push_str(text);
                    self.position += 1;
                } else if escaped_hex_len(ch) > 0 {
                    let mut code: u32 = 0;
                    for _ in 0..escaped_hex_len(ch) {
                        let digit = self.advance();
                        match (digit as char).to_digit(16) {
                            Some(value) => code = (code << 4) | value,
                            None => return Err(self.lexical("expected hexadecimal character")),
                        }
                    }
                    match char::from_u32(code) {
                        Some(c) => result.push(c),
                        None => return Err(self.lexical("invalid Unicode code point in escape sequence")),
                    }
                    self.position += 1;
                } else {
                    return Err(self.lexical("unknown escape sequence"));
                }
                capture_start = self.position;
                capture_end = self.position;
            } else if is_eol(ch) {
                self.capture_segment(&mut result, capture_start, capture_end, true)?;
                let breaks = self.skip_separation_space(false, node_indent);
                Self::write_folded_lines(&mut result, breaks);
                capture_start = self.position;
                capture_end = self.position;
            } else if self.at_document_separator() {
                return Err(self.lexical("unexpected end of the document within a double quoted scalar"));
            } else {
                self.position += 1;
                if !is_white_space(ch) {
                    capture_end = self.position;
                }
            }
        }
        Err(self.lexical("unexpected end of the stream within a double quoted scalar"))
    }

    /// Read a literal (`|`) or folded (`>`) block scalar.
    pub fn read_block_scalar(&mut self, node_indent: isize) -> Result<Option<String>> {
        let folding = match self.peek() {
            b'|' => false,
            b'>' => true,
            _ => return Ok(None),
        };
        let mut result = String::new();
        let mut chomping = Chomping::Clip;
        let mut did_read_content = false;
        let mut detected_indent = false;
        let mut text_indent = node_indent;
        let mut empty_lines = 0usize;
        let mut at_more_indented = false;

        let mut ch = self.peek();
        while ch != 0 {
            ch = self.advance();
            if ch == b'+' || ch == b'-' {
                if chomping != Chomping::Clip {
                    return Err(self.lexical("repeat of a chomping mode identifier"));
                }
                chomping = if ch == b'+' { Chomping::Keep } else { Chomping::Strip };
            } else if ch.is_ascii_digit() {
                let width = (ch - b'0') as isize;
                if width == 0 {
                    return Err(self.lexical(
                        "bad explicit indentation width of a block scalar; it cannot be less than one",
                    ));
                }
                if detected_indent {
                    return Err(self.lexical("repeat of an indentation width identifier"));
                }
                // A root node has no parent column, so `|N` there means column N.
                text_indent = node_indent.max(1) + width - 1;
                detected_indent = true;
            } else {
                break;
            }
        }

        if is_white_space(ch) {
            loop {
                ch = self.advance();
                if !is_white_space(ch) {
                    break;
                }
            }
            if ch == b'#' {
                loop {
                    ch = self.advance();
                    if is_eol(ch) || ch == 0 {
                        break;
                    }
                }
            }
        }
        if ch != 0 && !is_eol(ch) {
            return Err(self.lexical("a line break is expected after a block scalar header"));
        }

        while ch != 0 {
            self.read_line_break()?;
            self.line_indent = 0;
            ch = self.peek();

            while (!detected_indent || self.line_indent < text_indent) && ch == b' ' {
                self.line_indent += 1;
                ch = self.advance();
            }
            if !detected_indent && self.line_indent > text_indent {
                text_indent = self.line_indent;
            }
            if is_eol(ch) {
                empty_lines += 1;
                continue;
            }

            if ch == 0 || self.line_indent < text_indent {
                match chomping {
                    Chomping::Keep => {
                        let count = if did_read_content { 1 + empty_lines } else { empty_lines };
                        result.extend(std::iter::repeat('\n').take(count));
                    }
                    Chomping::Clip => {
                        if did_read_content {
                            result.push('\n');
                        }
                    }
                    Chomping::Strip => {}
                }
                break;
            }

            if folding {
                if is_white_space(ch) {
                    at_more_indented = true;
                    let count = if did_read_content { 1 + empty_lines } else { empty_lines };
                    result.extend(std::iter::repeat('\n').take(count));
                } else if at_more_indented {
                    at_more_indented = false;
                    result.extend(std::iter::repeat('\n').take(empty_lines + 1));
                } else if empty_lines == 0 {
                    if did_read_content {
                        result.push(' ');
                    }
                } else {
                    result.extend(std::iter::repeat('\n').take(empty_lines));
                }
            } else {
                let count = if did_read_content { 1 + empty_lines } else { empty_lines };
                result.extend(std::iter::repeat('\n').take(count));
            }

            did_read_content = true;
            detected_indent = true;
            empty_lines = 0;
            let capture_start = self.position;
            while !is_eol(ch) && ch != 0 {
                ch = self.advance();
            }
            self.capture_segment(&mut result, capture_start, self.position, false)?;
        }

        Ok(Some(result))
    }

    /// Read a `!tag` property and expand it against `tag_map`.
    pub fn read_tag_property(&mut self, tag_map: &HashMap<String, String>) -> Result<Option<String>> {
        if self.peek() != b'!' {
            return Ok(None);
        }
        let start_mark = self.mark();
        let mut ch = self.advance();
        let mut verbatim = false;
        let mut named = false;
        let mut handle = String::from("!");

        if ch == b'<' {
            verbatim = true;
            ch = self.advance();
        } else if ch == b'!' {
            named = true;
            handle = String::from("!!");
            ch = self.advance();
        }

        let mut name_start = self.position;
        let name;
        if verbatim {
            while ch != 0 && ch != b'>' && !is_eol(ch) {
                ch = self.advance();
            }
            if ch != b'>' {
                return Err(self.lexical("unexpected end of the stream within a verbatim tag"));
            }
            name = self.slice(name_start, self.position).to_string();
            self.position += 1;
        } else {
            while ch != 0 && !is_ws_or_eol(ch) && !is_flow_indicator(ch) {
                if ch == b'!' {
                    if named {
                        return Err(self.lexical("tag suffix cannot contain exclamation marks"));
                    }
                    handle = self.slice(name_start - 1, self.position + 1).to_string();
                    if !is_tag_handle(&handle) {
                        return Err(self.lexical("named tag handle cannot contain such characters"));
                    }
                    named = true;
                    name_start = self.position + 1;
                }
                ch = self.advance();
            }
            name = self.slice(name_start, self.position).to_string();
        }

        if !name.is_empty() && !is_tag_uri(&name) {
            return Err(Error::Lexical(self.located_at(
                start_mark,
                format!("tag name cannot contain such characters: {}", name),
            )));
        }
        let Some(name) = decode_tag(&name) else {
            return Err(Error::Lexical(self.located_at(start_mark, "tag name is malformed")));
        };

        let tag = if verbatim {
            name
        } else if let Some(prefix) = tag_map.get(&handle) {
            format!("{}{}", prefix, name)
        } else if handle == "!" {
            format!("!{}", name)
        } else if handle == "!!" {
            format!("{}{}", YAML_TAG_PREFIX, name)
        } else {
            return Err(Error::Lexical(self.located_at(
                start_mark,
                format!("undeclared tag handle \"{}\"", handle),
            )));
        };
        Ok(Some(tag))
    }

    fn read_name(&mut self, sigil: u8, what: &str) -> Result<Option<String>> {
        if self.peek() != sigil {
            return Ok(None);
        }
        let mut ch = self.advance();
        let start = self.position;
        while ch != 0 && !is_ws_or_eol(ch) && !is_flow_indicator(ch) {
            ch = self.advance();
        }
        if self.position == start {
            return Err(self.lexical(format!(
                "name of an {} node must contain at least one character",
                what
            )));
        }
        Ok(Some(self.slice(start, self.position).to_string()))
    }

    pub fn read_anchor_property(&mut self) -> Result<Option<String>> {
        self.read_name(b'&', "anchor")
    }

    pub fn read_alias_name(&mut self) -> Result<Option<String>> {
        self.read_name(b'*', "alias")
    }

    /// Read one `%NAME arg...` line; the cursor is at `%`.
    pub fn read_directive(&mut self) -> Result<(String, Vec<String>)> {
        let mut ch = self.advance();
        let start = self.position;
        while ch != 0 && !is_ws_or_eol(ch) {
            ch = self.advance();
        }
        let name = self.slice(start, self.position).to_string();
        if name.is_empty() {
            return Err(self.lexical("directive name must not be less than one character in length"));
        }

        let mut args = Vec::new();
        while ch != 0 {
            while is_white_space(ch) {
                ch = self.advance();
            }
            if ch == b'#' {
                while ch != 0 && !is_eol(ch) {
                    ch = self.advance();
                }
                break;
            }
            if is_eol(ch) {
                break;
            }
            let start = self.position;
            while ch != 0 && !is_ws_or_eol(ch) {
                ch = self.advance();
            }
            args.push(self.slice(start, self.position).to_string());
        }
        if ch != 0 {
            self.read_line_break()?;
        }
        Ok((name, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner<'a>(input: &'a str, ctx: &'a ParseContext) -> Scanner<'a> {
        Scanner::new(input, ctx, 0, 0, 0)
    }

    #[test]
    fn test_skip_separation_space_counts_lines() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("  # c\n\n   x\n", &ctx);
        assert_eq!(s.skip_separation_space(true, -1), 2);
        assert_eq!(s.line, 2);
        assert_eq!(s.line_indent, 3);
        assert_eq!(s.peek(), b'x');
    }

    #[test]
    fn test_tab_indent_is_flagged() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("a\n\tb\n", &ctx);
        s.position = 1;
        s.skip_separation_space(true, -1);
        assert!(s.tab_indent);
    }

    #[test]
    fn test_plain_scalar_folds_lines() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("foo\n\nfoo\n", &ctx);
        assert_eq!(s.read_plain_scalar(0, false).as_deref(), Some("foo\nfoo"));
        assert_eq!(s.position, 9);
    }

    #[test]
    fn test_plain_scalar_stops_at_document_end() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("...\n", &ctx);
        assert_eq!(s.read_plain_scalar(0, false), None);
    }

    #[test]
    fn test_plain_scalar_in_flow_stops_at_indicator() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("$,x]\n", &ctx);
        assert_eq!(s.read_plain_scalar(0, true).as_deref(), Some("$"));
        assert_eq!(s.peek(), b',');
    }

    #[test]
    fn test_single_quoted_escape() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("'it''s'\n", &ctx);
        assert_eq!(s.read_single_quoted_scalar(0).unwrap().as_deref(), Some("it's"));
    }

    #[test]
    fn test_double_quoted_escapes() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("\"a\\tb\\x41\\u263A\\U0001F600\\n\"\n", &ctx);
        assert_eq!(
            s.read_double_quoted_scalar(0).unwrap().as_deref(),
            Some("a\tbA\u{263A}\u{1F600}\n")
        );
    }

    #[test]
    fn test_unknown_escape_is_lexical() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("\"\\q\"\n", &ctx);
        let err = s.read_double_quoted_scalar(0).unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
        assert_eq!(err.message(), "unknown escape sequence");
    }

    #[test]
    fn test_unterminated_double_quote() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("\"abc\n", &ctx);
        let err = s.read_double_quoted_scalar(0).unwrap_err();
        assert_eq!(
            err.message(),
            "unexpected end of the stream within a double quoted scalar"
        );
    }

    #[test]
    fn test_literal_block_chomping() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("|\n  a\n  b\n\n", &ctx);
        assert_eq!(s.read_block_scalar(-1).unwrap().as_deref(), Some("a\nb\n"));

        let mut s = scanner("|-\n  a\n", &ctx);
        assert_eq!(s.read_block_scalar(-1).unwrap().as_deref(), Some("a"));

        let mut s = scanner("|+\n  a\n\n", &ctx);
        assert_eq!(s.read_block_scalar(-1).unwrap().as_deref(), Some("a\n\n"));
    }

    #[test]
    fn test_folded_block() {
        let ctx = ParseContext::new(None);
        let mut s = scanner(">\n  a\n  b\n\n  c\n", &ctx);
        assert_eq!(s.read_block_scalar(-1).unwrap().as_deref(), Some("a b\nc\n"));
    }

    #[test]
    fn test_explicit_indentation_indicator() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("|2\n   a\n", &ctx);
        assert_eq!(s.read_block_scalar(1).unwrap().as_deref(), Some(" a\n"));

        let mut s = scanner("|2-\n    \n   x\n", &ctx);
        assert_eq!(s.read_block_scalar(0).unwrap().as_deref(), Some("  \n x"));
    }

    #[test]
    fn test_tag_shorthands() {
        let ctx = ParseContext::new(None);
        let mut map = HashMap::new();
        map.insert("!e!".to_string(), "tag:example.com,2000:".to_string());

        let mut s = scanner("!!int 1\n", &ctx);
        assert_eq!(
            s.read_tag_property(&map).unwrap().as_deref(),
            Some("tag:yaml.org,2002:int")
        );
        let mut s = scanner("!local x\n", &ctx);
        assert_eq!(s.read_tag_property(&map).unwrap().as_deref(), Some("!local"));
        let mut s = scanner("!e!foo x\n", &ctx);
        assert_eq!(
            s.read_tag_property(&map).unwrap().as_deref(),
            Some("tag:example.com,2000:foo")
        );
        let mut s = scanner("!<tag:x,1:y%21> z\n", &ctx);
        assert_eq!(s.read_tag_property(&map).unwrap().as_deref(), Some("tag:x,1:y!"));
        let mut s = scanner("!u!foo x\n", &ctx);
        assert!(s.read_tag_property(&map).is_err());
    }

    #[test]
    fn test_anchor_requires_name() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("& x\n", &ctx);
        assert!(s.read_anchor_property().is_err());
        let mut s = scanner("&a1 x\n", &ctx);
        assert_eq!(s.read_anchor_property().unwrap().as_deref(), Some("a1"));
    }

    #[test]
    fn test_directive_line() {
        let ctx = ParseContext::new(None);
        let mut s = scanner("%TAG !e! tag:e,1: # c\n---\n", &ctx);
        let (name, args) = s.read_directive().unwrap();
        assert_eq!(name, "TAG");
        assert_eq!(args, vec!["!e!", "tag:e,1:"]);
        assert_eq!(s.line, 1);
    }
}
