//! Serialize document graphs to YAML text.
//!
//! Every node is matched against the schema's types (implicit types first),
//! and the first type whose predicate accepts it decides how it is written:
//! implicit scalar types print their representation as-is, everything else
//! goes through scalar style selection, and non-implicit types other than
//! `str`, `seq` and `map` get a tag. Collections reached more than once are
//! anchored as `&ref_N` and later written as `*ref_N`.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::graph::{Document, Node, NodeId};
use crate::options::{DumpOptions, SortKeys};
use crate::scanner::{is_tag_uri, YAML_TAG_PREFIX};
use crate::schema::{Kind, Schema};
use crate::types;

/// Keys whose representation is longer than this use the explicit `? ` form.
const MAX_IMPLICIT_KEY: usize = 1024;

/// Plain scalars that YAML 1.1 readers take for booleans.
const LEGACY_BOOLEANS: &[&str] = &[
    "y", "Y", "yes", "Yes", "YES", "on", "On", "ON", "n", "N", "no", "No", "NO", "off", "Off", "OFF",
];

/// YAML 1.1 sexagesimal numbers.
static LEGACY_BASE60: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+(?:\.[0-9_]*)?$").unwrap());

/// Dump a document graph.
pub fn dump_document(doc: &Document, options: &DumpOptions) -> Result<String> {
    let mut dumper = Dumper::new(doc, options);
    match dumper.write_node(0, doc.root(), true, true)? {
        Some(dump) => Ok(dump + "\n"),
        None => Ok(String::new()),
    }
}

/// How the matched type wants a node written.
struct Detected {
    /// Tag to print; `None` when the type is implied by the content.
    tag: Option<String>,
    /// Representation of a scalar node.
    text: Option<String>,
    /// Implicit scalar text is printed without style selection.
    verbatim: bool,
}

struct Dumper<'a> {
    doc: &'a Document,
    options: &'a DumpOptions,
    schema: &'a Schema,
    duplicates: HashMap<NodeId, usize>,
    used: Vec<bool>,
    visiting: HashSet<NodeId>,
}

impl<'a> Dumper<'a> {
    fn new(doc: &'a Document, options: &'a DumpOptions) -> Self {
        let duplicates = if options.no_refs {
            Vec::new()
        } else {
            find_duplicates(doc, doc.root())
        };
        trace!(count = duplicates.len(), "shared nodes found");
        Self {
            doc,
            options,
            schema: &options.schema,
            used: vec![false; duplicates.len()],
            duplicates: duplicates.into_iter().enumerate().map(|(i, id)| (id, i)).collect(),
            visiting: HashSet::new(),
        }
    }

    fn detect(&self, node: &Node) -> Result<Option<Detected>> {
        for ty in self.schema.dump_order() {
            if !ty.predicate(node, self.doc) {
                continue;
            }
            let text = if ty.kind() == Kind::Scalar {
                let style = self.options.style(ty.tag());
                Some(ty.represent(node, self.doc, style).map_err(Error::Dump)?)
            } else {
                None
            };
            let tag = if ty.implicit() || types::is_failsafe_tag(ty.tag()) {
                None
            } else {
                Some(ty.tag().to_string())
            };
            return Ok(Some(Detected {
                tag,
                text,
                verbatim: ty.implicit(),
            }));
        }
        Ok(None)
    }

    fn invalid(&self, node: &Node) -> Result<Option<String>> {
        if self.options.skip_invalid {
            trace!(kind = describe(node), "skipping node with no matching type");
            return Ok(None);
        }
        Err(Error::Dump(format!(
            "unacceptable kind of an object to dump {}",
            describe(node)
        )))
    }

    fn enter(&mut self, id: NodeId) -> Result<()> {
        if !self.visiting.insert(id) {
            return Err(Error::Dump(
                "cyclic reference cannot be written without anchors".to_string(),
            ));
        }
        Ok(())
    }

    fn next_line(&self, level: usize) -> String {
        format!("\n{}", " ".repeat(self.options.indent * level))
    }

    /// Write one node; `None` when it is skipped as invalid.
    fn write_node(&mut self, level: usize, id: NodeId, block: bool, compact: bool) -> Result<Option<String>> {
        let doc = self.doc;
        let node = doc.node(id);
        let Some(detected) = self.detect(node)? else {
            if let Node::Tagged { tag, inner } = node {
                let dump = self.write_node(level, *inner, block, false)?;
                return Ok(dump.map(|dump| with_tag(tag, dump)));
            }
            return self.invalid(node);
        };

        let flow_level = self.options.flow_level;
        let block = block && (flow_level < 0 || flow_level > level as i32);
        let duplicate = self.duplicates.get(&id).copied();
        let compact = compact
            && detected.tag.is_none()
            && duplicate.is_none()
            && (self.options.indent == 2 || level == 0);

        if let Some(index) = duplicate {
            if self.used[index] {
                return Ok(Some(format!("*ref_{}", index)));
            }
            self.used[index] = true;
        }

        let dump = match (detected.text, node) {
            (Some(text), _) if detected.verbatim => text,
            (Some(text), _) => self.write_scalar(&text, level, false),
            (None, Node::Mapping(entries)) => {
                self.enter(id)?;
                let dump = if block && !entries.is_empty() {
                    self.write_block_mapping(level, entries, compact)?
                } else {
                    self.write_flow_mapping(level, entries)?
                };
                self.visiting.remove(&id);
                dump
            }
            (None, Node::Sequence(items)) => {
                self.enter(id)?;
                let dump = if block && !items.is_empty() {
                    self.write_block_sequence(level, items, compact)?
                } else {
                    self.write_flow_sequence(level, items)?
                };
                self.visiting.remove(&id);
                dump
            }
            (None, Node::Tagged { inner, .. }) => {
                self.enter(id)?;
                let dump = self.write_node(level, *inner, block, false)?;
                self.visiting.remove(&id);
                match dump {
                    Some(dump) => dump,
                    None => return Ok(None),
                }
            }
            (None, Node::Scalar(_)) => return self.invalid(node),
        };

        let dump = match duplicate {
            Some(index) => with_prefix(&format!("&ref_{}", index), dump),
            None => dump,
        };
        Ok(Some(match detected.tag {
            Some(tag) => with_tag(&tag, dump),
            None => dump,
        }))
    }

    fn sorted<'e>(&self, entries: &'e IndexMap<String, NodeId>) -> Vec<(&'e String, NodeId)> {
        let mut pairs: Vec<(&String, NodeId)> = entries.iter().map(|(k, v)| (k, *v)).collect();
        match &self.options.sort_keys {
            SortKeys::None => {}
            SortKeys::Lexicographic => pairs.sort_by(|a, b| a.0.cmp(b.0)),
            SortKeys::By(compare) => pairs.sort_by(|a, b| compare(a.0, b.0)),
        }
        pairs
    }

    // =========================================================================
    // Collections
    // =========================================================================

    fn write_block_sequence(&mut self, level: usize, items: &[NodeId], compact: bool) -> Result<String> {
        let mut out = String::new();
        for item in items {
            let Some(dump) = self.write_node(level + 1, *item, true, true)? else {
                continue;
            };
            if !compact || !out.is_empty() {
                out.push_str(&self.next_line(level));
            }
            out.push_str(if dump.starts_with('\n') { "-" } else { "- " });
            out.push_str(&dump);
        }
        Ok(if out.is_empty() { "[]".to_string() } else { out })
    }

    fn write_flow_sequence(&mut self, level: usize, items: &[NodeId]) -> Result<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            if let Some(dump) = self.write_node(level, *item, false, false)? {
                parts.push(dump);
            }
        }
        let separator = if self.options.condense_flow { "," } else { ", " };
        Ok(format!("[{}]", parts.join(separator)))
    }

    fn write_block_mapping(&mut self, level: usize, entries: &IndexMap<String, NodeId>, compact: bool) -> Result<String> {
        let mut out = String::new();
        for (key, value) in self.sorted(entries) {
            let mut pair = String::new();
            if !compact || !out.is_empty() {
                pair.push_str(&self.next_line(level));
            }
            let key_dump = self.write_scalar(key, level + 1, true);
            let explicit = key_dump.len() > MAX_IMPLICIT_KEY;
            if explicit {
                pair.push_str("? ");
            }
            pair.push_str(&key_dump);
            if explicit {
                pair.push_str(&self.next_line(level));
            }
            let Some(dump) = self.write_node(level + 1, value, true, explicit)? else {
                continue;
            };
            pair.push_str(if dump.starts_with('\n') { ":" } else { ": " });
            pair.push_str(&dump);
            out.push_str(&pair);
        }
        Ok(if out.is_empty() { "{}".to_string() } else { out })
    }

    fn write_flow_mapping(&mut self, level: usize, entries: &IndexMap<String, NodeId>) -> Result<String> {
        let condense = self.options.condense_flow;
        let mut parts = Vec::with_capacity(entries.len());
        for (key, value) in self.sorted(entries) {
            let Some(dump) = self.write_node(level, value, false, false)? else {
                continue;
            };
            let key_dump = if condense {
                format!("\"{}\"", escape_string(key))
            } else {
                self.write_scalar(key, level, true)
            };
            let explicit = if key_dump.len() > MAX_IMPLICIT_KEY { "? " } else { "" };
            let colon = if condense { ":" } else { ": " };
            parts.push(format!("{}{}{}{}", explicit, key_dump, colon, dump));
        }
        let separator = if condense { "," } else { ", " };
        Ok(format!("{{{}}}", parts.join(separator)))
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    fn write_scalar(&self, text: &str, level: usize, is_key: bool) -> String {
        if text.is_empty() {
            return "''".to_string();
        }
        if !self.options.no_compat_mode && is_legacy_ambiguous(text) {
            return format!("'{}'", text);
        }

        let indent = self.options.indent * level.max(1);
        let line_width = match self.options.line_width {
            -1 => -1,
            width => width.min(40).max(width - indent as i32),
        };
        let flow_level = self.options.flow_level;
        let single_line_only = is_key || (flow_level > -1 && level as i32 >= flow_level);
        let style = choose_scalar_style(text, single_line_only, self.options.indent, line_width, |s| {
            self.schema.is_ambiguous(s)
        });

        match style {
            ScalarStyle::Plain => text.to_string(),
            ScalarStyle::Single => format!("'{}'", text.replace('\'', "''")),
            ScalarStyle::Literal => format!(
                "|{}{}",
                block_header(text, self.options.indent),
                drop_ending_newline(indent_string(text, indent))
            ),
            ScalarStyle::Folded => format!(
                ">{}{}",
                block_header(text, self.options.indent),
                drop_ending_newline(indent_string(&fold_string(text, line_width.max(0) as usize), indent))
            ),
            ScalarStyle::Double => format!("\"{}\"", escape_string(text)),
        }
    }
}

/// Shared collections in depth-first order of their second visit.
fn find_duplicates(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let children: Vec<NodeId> = match doc.node(id) {
            Node::Scalar(_) => continue,
            Node::Sequence(items) => items.iter().rev().copied().collect(),
            Node::Mapping(entries) => entries.values().rev().copied().collect(),
            Node::Tagged { inner, .. } => vec![*inner],
        };
        if !seen.insert(id) {
            if !duplicates.contains(&id) {
                duplicates.push(id);
            }
            continue;
        }
        stack.extend(children);
    }
    duplicates
}

fn describe(node: &Node) -> &str {
    match node {
        Node::Scalar(_) => "scalar",
        Node::Sequence(_) => "sequence",
        Node::Mapping(_) => "mapping",
        Node::Tagged { tag, .. } => tag,
    }
}

fn with_prefix(prefix: &str, dump: String) -> String {
    if dump.starts_with('\n') {
        format!("{}{}", prefix, dump)
    } else {
        format!("{} {}", prefix, dump)
    }
}

fn with_tag(tag: &str, dump: String) -> String {
    let shorthand = match tag.strip_prefix(YAML_TAG_PREFIX) {
        Some(suffix) if is_tag_uri(suffix) => format!("!!{}", suffix),
        _ if tag.starts_with('!') && !tag.contains('>') => tag.to_string(),
        _ => format!("!<{}>", tag),
    };
    with_prefix(&shorthand, dump)
}

fn is_legacy_ambiguous(text: &str) -> bool {
    LEGACY_BOOLEANS.contains(&text) || LEGACY_BASE60.is_match(text)
}

// =============================================================================
// Scalar styles
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScalarStyle {
    Plain,
    Single,
    Literal,
    Folded,
    Double,
}

fn is_white_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_printable(c: char) -> bool {
    matches!(c as u32,
        0x20..=0x7E
        | 0xA1..=0xD7FF
        | 0xE000..=0xFFFD
        | 0x10000..=0x10FFFF)
        && c != '\u{2028}'
        && c != '\u{2029}'
        && c != '\u{FEFF}'
}

fn is_plain_safe(c: char) -> bool {
    is_printable(c) && !matches!(c, ',' | '[' | ']' | '{' | '}' | ':' | '#')
}

fn is_plain_safe_first(c: char) -> bool {
    is_printable(c)
        && !is_white_space(c)
        && !matches!(
            c,
            '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\''
                | '"' | '%' | '@' | '`'
        )
}

/// A leading space after any line breaks hides the content indentation.
fn need_indent_indicator(text: &str) -> bool {
    text.trim_start_matches('\n').starts_with(' ')
}

/// The line `chars[start..end]` is too long and can be folded.
fn is_foldable(chars: &[char], start: usize, end: usize, width: usize) -> bool {
    end - start > width && chars.get(start) != Some(&' ')
}

fn choose_scalar_style(
    text: &str,
    single_line_only: bool,
    indent_per_level: usize,
    line_width: i32,
    is_ambiguous: impl Fn(&str) -> bool,
) -> ScalarStyle {
    let chars: Vec<char> = text.chars().collect();
    let track_width = line_width != -1;
    let width = line_width.max(0) as usize;
    let mut has_line_break = false;
    let mut has_foldable_line = false;
    let mut line_start = 0;
    let mut plain = chars.first().is_some_and(|c| is_plain_safe_first(*c))
        && !chars.last().is_some_and(|c| is_white_space(*c))
        && !text.starts_with("...");

    for (i, &c) in chars.iter().enumerate() {
        if !single_line_only && c == '\n' {
            has_line_break = true;
            if track_width {
                has_foldable_line = has_foldable_line || is_foldable(&chars, line_start, i, width);
                line_start = i + 1;
            }
        } else if !is_printable(c) {
            return ScalarStyle::Double;
        }
        plain = plain && is_plain_safe(c);
    }
    if !single_line_only && track_width {
        has_foldable_line = has_foldable_line || is_foldable(&chars, line_start, chars.len(), width);
    }

    if !has_line_break && !has_foldable_line {
        return if plain && !is_ambiguous(text) {
            ScalarStyle::Plain
        } else {
            ScalarStyle::Single
        };
    }
    if indent_per_level > 9 && need_indent_indicator(text) {
        return ScalarStyle::Double;
    }
    if has_foldable_line {
        ScalarStyle::Folded
    } else {
        ScalarStyle::Literal
    }
}

/// Indentation and chomping indicators, and the line break ending the header.
fn block_header(text: &str, indent_per_level: usize) -> String {
    let indicator = if need_indent_indicator(text) {
        indent_per_level.to_string()
    } else {
        String::new()
    };
    let clip = text.ends_with('\n');
    let keep = clip && (text.ends_with("\n\n") || text == "\n");
    let chomp = if keep {
        "+"
    } else if clip {
        ""
    } else {
        "-"
    };
    format!("{}{}\n", indicator, chomp)
}

fn drop_ending_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

/// Indent every non-empty line by `spaces`.
fn indent_string(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line != "\n" {
            out.push_str(&pad);
        }
        out.push_str(line);
    }
    out
}

/// Fold a multi-line string for the `>` style.
///
/// Blank-line structure is kept; lines that start with a space are never
/// folded, and an extra line break separates two ordinary lines so that
/// they load back as separate lines.
fn fold_string(text: &str, width: usize) -> String {
    let first_end = text.find('\n').unwrap_or(text.len());
    let mut out = fold_line(&text[..first_end], width);
    let mut prev_more_indented = text.starts_with('\n') || text.starts_with(' ');
    let mut rest = &text[first_end..];

    while !rest.is_empty() {
        let after = rest.trim_start_matches('\n');
        let breaks = &rest[..rest.len() - after.len()];
        let line_end = after.find('\n').unwrap_or(after.len());
        let line = &after[..line_end];
        let more_indented = line.starts_with(' ');
        out.push_str(breaks);
        if !prev_more_indented && !more_indented && !line.is_empty() {
            out.push('\n');
        }
        out.push_str(&fold_line(line, width));
        prev_more_indented = more_indented;
        rest = &after[line_end..];
    }
    out
}

/// Break one line at spaces so that its pieces fit `width`.
fn fold_line(line: &str, width: usize) -> String {
    if line.is_empty() || line.starts_with(' ') {
        return line.to_string();
    }
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut curr = 0;
    let mut out = String::new();

    let breaks = (0..bytes.len().saturating_sub(1)).filter(|&i| bytes[i] == b' ' && bytes[i + 1] != b' ');
    for next in breaks {
        if next - start > width {
            let end = if curr > start { curr } else { next };
            out.push('\n');
            out.push_str(&line[start..end]);
            start = end + 1;
        }
        curr = next;
    }

    out.push('\n');
    if line.len() - start > width && curr > start {
        out.push_str(&line[start..curr]);
        out.push('\n');
        out.push_str(&line[curr + 1..]);
    } else {
        out.push_str(&line[start..]);
    }
    out[1..].to_string()
}

fn escape_sequence(c: char) -> Option<&'static str> {
    Some(match c {
        '\0' => "\\0",
        '\u{07}' => "\\a",
        '\u{08}' => "\\b",
        '\t' => "\\t",
        '\n' => "\\n",
        '\u{0B}' => "\\v",
        '\u{0C}' => "\\f",
        '\r' => "\\r",
        '\u{1B}' => "\\e",
        '"' => "\\\"",
        '\\' => "\\\\",
        '\u{85}' => "\\N",
        '\u{A0}' => "\\_",
        '\u{2028}' => "\\L",
        '\u{2029}' => "\\P",
        _ => return None,
    })
}

/// Body of a double-quoted scalar.
fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escape_sequence(c) {
            Some(escape) => out.push_str(escape),
            None if is_printable(c) => out.push(c),
            None => {
                let code = c as u32;
                if code <= 0xFF {
                    out.push_str(&format!("\\x{:02X}", code));
                } else if code <= 0xFFFF {
                    out.push_str(&format!("\\u{:04X}", code));
                } else {
                    out.push_str(&format!("\\U{:08X}", code));
                }
            }
        }
    }
    out
}
