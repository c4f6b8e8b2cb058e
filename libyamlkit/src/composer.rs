//! Document composer.
//!
//! Recursive descent over the node grammar, driving the [`Scanner`] readers.
//! Each node is read in two steps: [`Composer::compose_raw`] collects its
//! properties and raw content (collections are already allocated in the
//! graph), and [`Composer::finish`] resolves the content against the schema
//! and registers the node's anchors.
//!
//! Block mappings are only recognized once the first key is followed by a
//! `:`. Until then the candidate key is an ordinary node, and if no colon
//! follows it is handed back up as the content of the enclosing node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::SecondsFormat;
use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Located, Result};
use crate::graph::{Document, Node, NodeId};
use crate::mark::Mark;
use crate::options::{DuplicateKeys, LoadOptions};
use crate::scanner::{is_tag_handle, is_tag_uri, is_white_space, is_ws_or_eol, Scanner};
use crate::schema::{Data, Kind, Schema};
use crate::types::MERGE_TAG;
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Context {
    FlowIn,
    FlowOut,
    BlockIn,
    BlockOut,
}

impl Context {
    fn is_block(self) -> bool {
        matches!(self, Context::BlockIn | Context::BlockOut)
    }
}

#[derive(Default, Debug)]
struct Properties {
    tag: Option<String>,
    anchors: Vec<String>,
}

#[derive(Debug)]
enum Content {
    None,
    Scalar { text: String, plain: bool },
    Collection { id: NodeId, kind: Kind, key_marks: Vec<(String, Mark)> },
    Alias(NodeId),
}

/// A node whose content has been read but not resolved.
#[derive(Debug)]
struct Raw {
    props: Properties,
    content: Content,
    start: Mark,
}

impl Raw {
    fn is_present(&self) -> bool {
        self.props.tag.is_some() || !self.props.anchors.is_empty() || !matches!(self.content, Content::None)
    }
}

/// A resolved node and the tag it resolved to.
struct Composed {
    id: NodeId,
    tag: Option<String>,
}

/// A mapping key waiting for its value.
struct PendingKey {
    name: String,
    merge: bool,
    mark: Mark,
}

enum MappingRead {
    NotFound,
    Mapping(Content),
    /// The first candidate key had no `:` after it.
    Fallback(Raw),
}

/// Entries of one mapping being filled in.
struct MappingFill {
    id: NodeId,
    /// Keys that came from a merge and may be replaced silently.
    overridable: HashSet<String>,
    key_marks: Vec<(String, Mark)>,
}

impl MappingFill {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            overridable: HashSet::new(),
            key_marks: Vec::new(),
        }
    }
}

/// Position reached by the composer, for the stream driver.
pub(crate) struct Cursor {
    pub position: usize,
    pub line: usize,
    pub line_start: usize,
}

pub(crate) struct Composer<'a> {
    scanner: Scanner<'a>,
    options: &'a LoadOptions,
    schema: Arc<Schema>,
    doc: Document,
    anchors: HashMap<String, NodeId>,
    tag_map: HashMap<String, String>,
    version: Option<String>,
    depth: usize,
}

impl<'a> Composer<'a> {
    pub fn new(scanner: Scanner<'a>, options: &'a LoadOptions) -> Self {
        Self {
            scanner,
            options,
            schema: Arc::clone(&options.schema),
            doc: Document::new(),
            anchors: HashMap::new(),
            tag_map: HashMap::new(),
            version: None,
            depth: 0,
        }
    }

    /// The composed document, the cursor, and the warnings raised.
    pub fn into_parts(self) -> (Document, Cursor, Vec<Located>) {
        let cursor = Cursor {
            position: self.scanner.position,
            line: self.scanner.line,
            line_start: self.scanner.line_start,
        };
        (self.doc, cursor, self.scanner.warnings)
    }

    fn composition_at(&self, mark: Mark, message: impl Into<String>) -> Error {
        Error::Composition(self.scanner.located_at(mark, message))
    }

    fn resolution_at(&self, mark: Mark, message: impl Into<String>) -> Error {
        Error::Resolution(self.scanner.located_at(mark, message))
    }

    fn warn_at(&mut self, mark: Mark, message: impl Into<String>) {
        let located = self.scanner.located_at(mark, message);
        self.scanner.warnings.push(located);
    }

    fn check_tab_indent(&self) -> Result<()> {
        if self.scanner.tab_indent && self.scanner.peek() != 0 {
            return Err(self.scanner.lexical("tab characters must not be used in indentation"));
        }
        Ok(())
    }

    // =========================================================================
    // Documents and directives
    // =========================================================================

    /// Read directives, the `---` marker and the root node of one document.
    ///
    /// The cursor stops at the start of the next marker line or at the end;
    /// a closing `...` is left for the stream driver.
    pub fn compose_document(&mut self) -> Result<()> {
        self.version = None;
        self.tag_map.clear();
        self.anchors.clear();
        let mut has_directives = false;

        while self.scanner.peek() != 0 {
            self.scanner.skip_separation_space(true, -1);
            if self.scanner.line_indent > 0 || self.scanner.peek() != b'%' {
                break;
            }
            has_directives = true;
            let mark = self.scanner.mark();
            let (name, args) = self.scanner.read_directive()?;
            self.handle_directive(&name, &args, mark)?;
        }

        self.scanner.skip_separation_space(true, -1);
        if self.scanner.line_indent == 0
            && self.scanner.peek() == b'-'
            && self.scanner.test_document_separator()
        {
            self.scanner.position += 3;
            self.scanner.skip_separation_space(true, -1);
        } else if has_directives {
            return Err(self.scanner.composition("directives end mark is expected"));
        }

        let parent_indent = self.scanner.line_indent - 1;
        let raw = self.compose_raw(parent_indent, Context::BlockOut, false, true)?;
        let root = self.finish(raw)?;
        self.doc.set_root(root.id);

        self.scanner.skip_separation_space(true, -1);
        if self.scanner.peek() != 0 && !self.scanner.at_document_separator() {
            return Err(self
                .scanner
                .composition("end of the stream or a document separator is expected"));
        }
        Ok(())
    }

    fn handle_directive(&mut self, name: &str, args: &[String], mark: Mark) -> Result<()> {
        match name {
            "YAML" => {
                if self.version.is_some() {
                    return Err(self.composition_at(mark, "duplication of %YAML directive"));
                }
                if args.len() != 1 {
                    return Err(self.composition_at(mark, "YAML directive accepts exactly one argument"));
                }
                let Some((major, minor)) = parse_version(&args[0]) else {
                    return Err(self.composition_at(mark, "ill-formed argument of the YAML directive"));
                };
                if major != 1 {
                    return Err(self.composition_at(mark, "unacceptable YAML version of the document"));
                }
                self.version = Some(args[0].clone());
                if minor != 1 && minor != 2 {
                    self.warn_at(mark, "unsupported YAML version of the document");
                }
            }
            "TAG" => {
                if args.len() != 2 {
                    return Err(self.composition_at(mark, "TAG directive accepts exactly two arguments"));
                }
                let (handle, prefix) = (&args[0], &args[1]);
                if !is_tag_handle(handle) {
                    return Err(self.composition_at(
                        mark,
                        "ill-formed tag handle (first argument) of the TAG directive",
                    ));
                }
                if self.tag_map.contains_key(handle) {
                    return Err(self.composition_at(
                        mark,
                        format!("there is a previously declared suffix for \"{}\" tag handle", handle),
                    ));
                }
                if !is_tag_uri(prefix) {
                    return Err(self.composition_at(
                        mark,
                        "ill-formed tag prefix (second argument) of the TAG directive",
                    ));
                }
                self.tag_map.insert(handle.clone(), prefix.clone());
            }
            _ => self.warn_at(mark, format!("unknown document directive \"{}\"", name)),
        }
        Ok(())
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    fn compose_raw(
        &mut self,
        parent_indent: isize,
        context: Context,
        allow_to_seek: bool,
        allow_compact: bool,
    ) -> Result<Raw> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(self
                .scanner
                .composition(format!("nesting depth exceeds {}", self.options.max_depth)));
        }
        let raw = self.compose_node(parent_indent, context, allow_to_seek, allow_compact);
        self.depth -= 1;
        raw
    }

    fn compose_node(
        &mut self,
        parent_indent: isize,
        context: Context,
        allow_to_seek: bool,
        allow_compact: bool,
    ) -> Result<Raw> {
        let allow_block_styles = context.is_block();
        let mut allow_block_collections = allow_block_styles;
        let mut indent_status = std::cmp::Ordering::Greater;
        let mut at_new_line = false;
        let mut props = Properties::default();

        if allow_to_seek && self.scanner.skip_separation_space(true, -1) > 0 {
            at_new_line = true;
            indent_status = self.scanner.line_indent.cmp(&parent_indent);
            if context.is_block() {
                self.check_tab_indent()?;
            }
        }
        let start = self.scanner.mark();

        if indent_status.is_gt() {
            loop {
                let mark = self.scanner.mark();
                if let Some(tag) = self.scanner.read_tag_property(&self.tag_map)? {
                    if props.tag.is_some() {
                        return Err(Error::Lexical(
                            self.scanner.located_at(mark, "duplication of a tag property"),
                        ));
                    }
                    props.tag = Some(tag);
                } else if let Some(anchor) = self.scanner.read_anchor_property()? {
                    if !props.anchors.is_empty() {
                        return Err(Error::Lexical(
                            self.scanner.located_at(mark, "duplication of an anchor property"),
                        ));
                    }
                    props.anchors.push(anchor);
                } else {
                    break;
                }
                if self.scanner.skip_separation_space(true, -1) > 0 {
                    at_new_line = true;
                    allow_block_collections = allow_block_styles;
                    indent_status = self.scanner.line_indent.cmp(&parent_indent);
                } else {
                    allow_block_collections = false;
                }
            }
        }

        if allow_block_collections {
            allow_block_collections = at_new_line || allow_compact;
        }

        let mut content = Content::None;
        if indent_status.is_gt() || context == Context::BlockOut {
            let flow_indent = if context.is_block() {
                parent_indent + 1
            } else {
                parent_indent
            };
            let block_indent = (self.scanner.position - self.scanner.line_start) as isize;

            if indent_status.is_gt() {
                if allow_block_collections {
                    if let Some(found) = self.read_block_sequence(block_indent, &props)? {
                        content = found;
                    } else {
                        match self.read_block_mapping(block_indent, flow_indent, &props)? {
                            MappingRead::NotFound => {}
                            MappingRead::Mapping(found) => content = found,
                            MappingRead::Fallback(key) => {
                                if props.tag.is_none() {
                                    props.tag = key.props.tag;
                                }
                                props.anchors.extend(key.props.anchors);
                                content = key.content;
                            }
                        }
                    }
                }
                if matches!(content, Content::None) {
                    if let Some(found) = self.read_flow_collection(flow_indent, &props)? {
                        content = found;
                    }
                }
                if matches!(content, Content::None) {
                    content = self.read_scalar_or_alias(flow_indent, context, allow_block_styles, &props)?;
                }
            } else if allow_block_collections {
                if let Some(found) = self.read_block_sequence(block_indent, &props)? {
                    content = found;
                }
            }
        }

        Ok(Raw { props, content, start })
    }

    fn read_scalar_or_alias(
        &mut self,
        flow_indent: isize,
        context: Context,
        allow_block_scalars: bool,
        props: &Properties,
    ) -> Result<Content> {
        if allow_block_scalars {
            if let Some(text) = self.scanner.read_block_scalar(flow_indent)? {
                return Ok(Content::Scalar { text, plain: false });
            }
        }
        if let Some(text) = self.scanner.read_single_quoted_scalar(flow_indent)? {
            return Ok(Content::Scalar { text, plain: false });
        }
        if let Some(text) = self.scanner.read_double_quoted_scalar(flow_indent)? {
            return Ok(Content::Scalar { text, plain: false });
        }
        let mark = self.scanner.mark();
        if let Some(name) = self.scanner.read_alias_name()? {
            if props.tag.is_some() || !props.anchors.is_empty() {
                return Err(self.composition_at(mark, "alias node should not have any properties"));
            }
            let Some(id) = self.anchors.get(&name).copied() else {
                return Err(self.composition_at(mark, format!("unidentified alias \"{}\"", name)));
            };
            self.scanner.skip_separation_space(true, -1);
            return Ok(Content::Alias(id));
        }
        if let Some(text) = self
            .scanner
            .read_plain_scalar(flow_indent, context == Context::FlowIn)
        {
            return Ok(Content::Scalar { text, plain: true });
        }
        Ok(Content::None)
    }

    /// Allocate a collection node and register the anchors it carries.
    fn open_collection(&mut self, node: Node, props: &Properties) -> NodeId {
        let id = self.doc.push(node);
        for anchor in &props.anchors {
            trace!(anchor = %anchor, node = id.index(), "anchor registered");
            self.anchors.insert(anchor.clone(), id);
        }
        id
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn finish(&mut self, raw: Raw) -> Result<Composed> {
        let Raw { props, content, start } = raw;
        let non_specific = props.tag.as_deref() == Some("!");
        let tag = props.tag.filter(|t| t != "!");
        let composed = match content {
            Content::Alias(id) => return Ok(Composed { id, tag: None }),
            Content::None => match tag {
                Some(tag) => {
                    let id = self.construct_empty(&tag, start)?;
                    Composed { id, tag: Some(tag) }
                }
                None => Composed {
                    id: self.doc.scalar(Value::Null),
                    tag: None,
                },
            },
            Content::Scalar { text, plain } => {
                self.resolve_scalar(text, plain && !non_specific, tag, start)?
            }
            Content::Collection { id, kind, key_marks } => {
                if let Some(tag) = &tag {
                    self.resolve_collection(id, tag, start)?;
                }
                if kind == Kind::Mapping {
                    self.add_meta_entry(id, &key_marks);
                }
                Composed { id, tag }
            }
        };
        for anchor in props.anchors {
            trace!(anchor = %anchor, node = composed.id.index(), "anchor registered");
            self.anchors.insert(anchor, composed.id);
        }
        Ok(composed)
    }

    /// Run the type bound to `tag` and the kind of `data`.
    fn construct(&mut self, tag: &str, data: &Data<'_>, mark: Mark) -> Result<Node> {
        let schema = Arc::clone(&self.schema);
        let kind = data.kind();
        let Some(ty) = schema.lookup(tag, kind) else {
            return Err(match schema.lookup_any(tag) {
                Some(other) => self.composition_at(
                    mark,
                    format!(
                        "unacceptable node kind for !<{}> tag; it should be \"{}\", not \"{}\"",
                        tag,
                        other.kind(),
                        kind
                    ),
                ),
                None => self.resolution_at(mark, format!("unknown tag !<{}>", tag)),
            });
        };
        if !ty.resolve(data, &self.doc) {
            return Err(self.resolution_at(
                mark,
                format!("cannot resolve a node with !<{}> explicit tag", tag),
            ));
        }
        ty.construct(data, &mut self.doc)
            .map_err(|message| self.resolution_at(mark, message))
    }

    /// In lenient mode a failed construction becomes a warning.
    fn recover(&mut self, result: Result<Node>, mark: Mark, raw: impl FnOnce() -> Node) -> Result<Node> {
        match result {
            Ok(node) => Ok(node),
            Err(err) if self.options.lenient => {
                self.warn_at(mark, err.message().to_string());
                Ok(raw())
            }
            Err(err) => Err(err),
        }
    }

    fn resolve_scalar(&mut self, text: String, plain: bool, tag: Option<String>, mark: Mark) -> Result<Composed> {
        let Some(tag) = tag else {
            if plain {
                return self.resolve_implicit(text, mark);
            }
            let id = self.doc.scalar(Value::String(text));
            return Ok(Composed { id, tag: None });
        };
        let result = self.construct(&tag, &Data::Scalar(&text), mark);
        let node = self.recover(result, mark, || Node::Scalar(Value::String(text.clone())))?;
        let id = self.doc.push(node);
        Ok(Composed { id, tag: Some(tag) })
    }

    fn resolve_implicit(&mut self, text: String, mark: Mark) -> Result<Composed> {
        let schema = Arc::clone(&self.schema);
        let data = Data::Scalar(&text);
        for ty in schema.implicit_types() {
            if !ty.resolve(&data, &self.doc) {
                continue;
            }
            let result = ty
                .construct(&data, &mut self.doc)
                .map_err(|message| self.resolution_at(mark, message));
            let node = self.recover(result, mark, || Node::Scalar(Value::String(text.clone())))?;
            let id = self.doc.push(node);
            return Ok(Composed {
                id,
                tag: Some(ty.tag().to_string()),
            });
        }
        let id = self.doc.scalar(Value::String(text));
        Ok(Composed { id, tag: None })
    }

    fn resolve_collection(&mut self, id: NodeId, tag: &str, mark: Mark) -> Result<()> {
        let node = self.doc.replace(id, Node::Scalar(Value::Null));
        let result = match &node {
            Node::Sequence(items) => self.construct(tag, &Data::Sequence(items), mark),
            Node::Mapping(entries) => self.construct(tag, &Data::Mapping(entries), mark),
            other => Ok(other.clone()),
        };
        let constructed = self.recover(result, mark, || node.clone())?;
        self.doc.replace(id, constructed);
        Ok(())
    }

    fn construct_empty(&mut self, tag: &str, mark: Mark) -> Result<NodeId> {
        let kind = self
            .schema
            .lookup_any(tag)
            .map(|ty| ty.kind())
            .unwrap_or(Kind::Scalar);
        let empty = IndexMap::new();
        let data = match kind {
            Kind::Scalar => Data::Scalar(""),
            Kind::Sequence => Data::Sequence(&[]),
            Kind::Mapping => Data::Mapping(&empty),
        };
        let result = self.construct(tag, &data, mark);
        let node = self.recover(result, mark, || Node::Scalar(Value::Null))?;
        Ok(self.doc.push(node))
    }

    fn add_meta_entry(&mut self, map: NodeId, key_marks: &[(String, Mark)]) {
        let Some(meta_key) = self.options.meta_key.clone() else {
            return;
        };
        if key_marks.is_empty() || !matches!(self.doc.node(map), Node::Mapping(_)) {
            return;
        }
        let meta = self.doc.push(Node::Mapping(IndexMap::with_capacity(key_marks.len())));
        for (key, mark) in key_marks {
            let line = self.doc.scalar(mark.line as i64);
            let pos = self.doc.scalar(mark.offset as i64);
            let entry = self.doc.push(Node::Mapping(IndexMap::from([
                ("startLine".to_string(), line),
                ("startPos".to_string(), pos),
            ])));
            self.doc.insert(meta, key.clone(), entry);
        }
        self.doc.insert(map, meta_key, meta);
    }

    // =========================================================================
    // Mapping keys
    // =========================================================================

    fn finish_key(&mut self, raw: Raw, mark: Mark) -> Result<PendingKey> {
        let composed = self.finish(raw)?;
        self.pending_key(composed, mark)
    }

    fn pending_key(&self, composed: Composed, mark: Mark) -> Result<PendingKey> {
        Ok(PendingKey {
            name: self.key_string(composed.id, mark)?,
            merge: composed.tag.as_deref() == Some(MERGE_TAG),
            mark,
        })
    }

    /// Mapping keys are strings; other keys use their compact flow form.
    fn key_string(&self, id: NodeId, mark: Mark) -> Result<String> {
        match self.doc.node(id) {
            Node::Sequence(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.flat_key(*item, mark))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            Node::Mapping(entries) => {
                let parts = entries
                    .iter()
                    .map(|(key, value)| Ok(format!("{}: {}", key, self.flat_key(*value, mark)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            _ => self.flat_key(id, mark),
        }
    }

    fn flat_key(&self, id: NodeId, mark: Mark) -> Result<String> {
        match self.doc.node(id) {
            Node::Scalar(value) => Ok(scalar_key(value)),
            Node::Tagged { inner, .. } => self.flat_key(*inner, mark),
            _ => Err(self.composition_at(mark, "nested collections are not supported inside keys")),
        }
    }

    fn store_pair(&mut self, fill: &mut MappingFill, key: Option<PendingKey>, value: Option<NodeId>) -> Result<()> {
        let key = key.unwrap_or_else(|| PendingKey {
            name: "null".to_string(),
            merge: false,
            mark: self.scanner.mark(),
        });
        let value = match value {
            Some(value) => value,
            None => self.doc.scalar(Value::Null),
        };

        if key.merge {
            let sources = match self.doc.node(value) {
                Node::Sequence(items) => items.clone(),
                _ => vec![value],
            };
            for source in sources {
                self.merge_mapping(fill, source, key.mark)?;
            }
            return Ok(());
        }

        let replaces_merged = fill.overridable.remove(&key.name);
        if !replaces_merged && self.doc.get(fill.id, &key.name).is_some() {
            match self.options.duplicate_keys {
                DuplicateKeys::Reject => {
                    return Err(self.composition_at(key.mark, "duplicated mapping key"));
                }
                DuplicateKeys::Overwrite => {
                    self.warn_at(key.mark, format!("duplicated mapping key \"{}\"", key.name));
                }
            }
        }
        self.doc.insert(fill.id, key.name.clone(), value);
        fill.key_marks.push((key.name, key.mark));
        Ok(())
    }

    fn merge_mapping(&mut self, fill: &mut MappingFill, source: NodeId, mark: Mark) -> Result<()> {
        let entries: Vec<(String, NodeId)> = match self.doc.node(source) {
            Node::Mapping(entries) => entries.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            _ => {
                return Err(self.composition_at(
                    mark,
                    "cannot merge mappings; the provided source object is unacceptable",
                ))
            }
        };
        for (key, value) in entries {
            if self.options.meta_key.as_deref() == Some(key.as_str()) {
                continue;
            }
            if self.doc.get(fill.id, &key).is_none() || fill.overridable.contains(&key) {
                self.doc.insert(fill.id, key.clone(), value);
                fill.overridable.insert(key);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Collections
    // =========================================================================

    fn read_block_sequence(&mut self, node_indent: isize, props: &Properties) -> Result<Option<Content>> {
        let mut seq = None;
        let mut ch = self.scanner.peek();

        while ch != 0 {
            if ch != b'-' || !is_ws_or_eol(self.scanner.peek_at(1)) {
                break;
            }
            let id = match seq {
                Some(id) => id,
                None => {
                    let id = self.open_collection(Node::Sequence(Vec::new()), props);
                    seq = Some(id);
                    id
                }
            };
            self.scanner.position += 1;

            if self.scanner.skip_separation_space(true, -1) > 0 && self.scanner.line_indent <= node_indent {
                self.check_tab_indent()?;
                let null = self.doc.scalar(Value::Null);
                self.doc.append(id, null);
                ch = self.scanner.peek();
                continue;
            }

            let line = self.scanner.line;
            let raw = self.compose_raw(node_indent, Context::BlockIn, false, true)?;
            let item = self.finish(raw)?;
            self.doc.append(id, item.id);
            self.scanner.skip_separation_space(true, -1);
            self.check_tab_indent()?;
            ch = self.scanner.peek();

            if (self.scanner.line == line || self.scanner.line_indent > node_indent) && ch != 0 {
                return Err(self.scanner.composition("bad indentation of a sequence entry"));
            } else if self.scanner.line_indent < node_indent {
                break;
            }
        }

        Ok(seq.map(|id| Content::Collection {
            id,
            kind: Kind::Sequence,
            key_marks: Vec::new(),
        }))
    }

    fn read_block_mapping(&mut self, node_indent: isize, flow_indent: isize, props: &Properties) -> Result<MappingRead> {
        let mut fill: Option<MappingFill> = None;
        let mut key: Option<PendingKey> = None;
        let mut at_explicit_key = false;
        let mut allow_compact;
        let mut ch = self.scanner.peek();

        while ch != 0 {
            let following = self.scanner.peek_at(1);
            let line = self.scanner.line;
            let entry_mark = self.scanner.mark();

            if (ch == b'?' || ch == b':') && is_ws_or_eol(following) {
                if ch == b'?' {
                    if at_explicit_key {
                        let map = self.mapping_fill(&mut fill, props);
                        self.store_pair(map, key.take(), None)?;
                    }
                    at_explicit_key = true;
                    allow_compact = true;
                } else if at_explicit_key {
                    at_explicit_key = false;
                    allow_compact = true;
                } else {
                    return Err(self.scanner.composition(
                        "incomplete explicit mapping pair; a key node is missed; or followed by a non-tabulated empty line",
                    ));
                }
                self.mapping_fill(&mut fill, props);
                self.scanner.position += 1;
                ch = following;
            } else {
                let raw = self.compose_raw(flow_indent, Context::FlowOut, false, true)?;
                if !raw.is_present() {
                    break;
                }
                if self.scanner.line != line {
                    if fill.is_some() {
                        return Err(self.scanner.composition(
                            "can not read a block mapping entry; a multiline key may not be an implicit key",
                        ));
                    }
                    return Ok(MappingRead::Fallback(raw));
                }
                ch = self.scanner.peek();
                while is_white_space(ch) {
                    ch = self.scanner.advance();
                }
                if ch != b':' {
                    if fill.is_some() {
                        return Err(self
                            .scanner
                            .composition("can not read an implicit mapping pair; a colon is missed"));
                    }
                    return Ok(MappingRead::Fallback(raw));
                }
                ch = self.scanner.advance();
                if !is_ws_or_eol(ch) {
                    return Err(self.scanner.composition(
                        "a whitespace character is expected after the key-value separator within a block mapping",
                    ));
                }
                if at_explicit_key {
                    let map = self.mapping_fill(&mut fill, props);
                    self.store_pair(map, key.take(), None)?;
                }
                self.mapping_fill(&mut fill, props);
                at_explicit_key = false;
                allow_compact = false;
                key = Some(self.finish_key(raw, entry_mark)?);
            }

            if self.scanner.line == line || self.scanner.line_indent > node_indent {
                let raw = self.compose_raw(node_indent, Context::BlockOut, true, allow_compact)?;
                let present = raw.is_present();
                if at_explicit_key {
                    if present {
                        key = Some(self.finish_key(raw, entry_mark)?);
                    }
                } else {
                    let value = if present { Some(self.finish(raw)?.id) } else { None };
                    let map = self.mapping_fill(&mut fill, props);
                    self.store_pair(map, key.take(), value)?;
                }
                self.scanner.skip_separation_space(true, -1);
                self.check_tab_indent()?;
                ch = self.scanner.peek();
            }

            if self.scanner.line_indent > node_indent && ch != 0 {
                return Err(self.scanner.composition("bad indentation of a mapping entry"));
            } else if self.scanner.line_indent < node_indent {
                break;
            }
        }

        let Some(mut map) = fill else {
            return Ok(MappingRead::NotFound);
        };
        if at_explicit_key {
            self.store_pair(&mut map, key.take(), None)?;
        }
        Ok(MappingRead::Mapping(Content::Collection {
            id: map.id,
            kind: Kind::Mapping,
            key_marks: map.key_marks,
        }))
    }

    /// The mapping being filled, allocated on first use.
    fn mapping_fill<'f>(&mut self, fill: &'f mut Option<MappingFill>, props: &Properties) -> &'f mut MappingFill {
        fill.get_or_insert_with(|| {
            MappingFill::new(self.open_collection(Node::Mapping(IndexMap::new()), props))
        })
    }

    fn read_flow_collection(&mut self, node_indent: isize, props: &Properties) -> Result<Option<Content>> {
        let (terminator, kind) = match self.scanner.peek() {
            b'[' => (b']', Kind::Sequence),
            b'{' => (b'}', Kind::Mapping),
            _ => return Ok(None),
        };
        let node = match kind {
            Kind::Mapping => Node::Mapping(IndexMap::new()),
            _ => Node::Sequence(Vec::new()),
        };
        let id = self.open_collection(node, props);
        let mut fill = MappingFill::new(id);
        let mut read_next = true;
        let mut ch = self.scanner.advance();

        while ch != 0 {
            self.scanner.skip_separation_space(true, node_indent);
            ch = self.scanner.peek();

            if ch == terminator {
                self.scanner.position += 1;
                return Ok(Some(Content::Collection {
                    id,
                    kind,
                    key_marks: fill.key_marks,
                }));
            } else if !read_next {
                return Err(self.scanner.lexical("missed comma between flow collection entries"));
            }

            let mut is_pair = false;
            let mut is_explicit_pair = false;
            if ch == b'?' && is_ws_or_eol(self.scanner.peek_at(1)) {
                is_pair = true;
                is_explicit_pair = true;
                self.scanner.position += 1;
                self.scanner.skip_separation_space(true, node_indent);
            }

            let line = self.scanner.line;
            let entry_mark = self.scanner.mark();
            let raw = self.compose_raw(node_indent, Context::FlowIn, false, true)?;
            let key = self.finish(raw)?;
            self.scanner.skip_separation_space(true, node_indent);
            ch = self.scanner.peek();

            let mut value = None;
            if (is_explicit_pair || self.scanner.line == line) && ch == b':' {
                is_pair = true;
                self.scanner.advance();
                self.scanner.skip_separation_space(true, node_indent);
                let raw = self.compose_raw(node_indent, Context::FlowIn, false, true)?;
                value = Some(self.finish(raw)?.id);
            }

            if kind == Kind::Mapping {
                let key = self.pending_key(key, entry_mark)?;
                self.store_pair(&mut fill, Some(key), value)?;
            } else if is_pair {
                let pair = self.doc.push(Node::Mapping(IndexMap::new()));
                let key = self.pending_key(key, entry_mark)?;
                self.store_pair(&mut MappingFill::new(pair), Some(key), value)?;
                self.doc.append(id, pair);
            } else {
                self.doc.append(id, key.id);
            }

            self.scanner.skip_separation_space(true, node_indent);
            ch = self.scanner.peek();
            if ch == b',' {
                read_next = true;
                ch = self.scanner.advance();
            } else {
                read_next = false;
            }
        }

        Err(self
            .scanner
            .lexical("unexpected end of the stream within a flow collection"))
    }
}

/// `major.minor` with decimal digits only.
fn parse_version(text: &str) -> Option<(u32, u32)> {
    let (major, minor) = text.split_once('.')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(major) || !digits(minor) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn scalar_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) if f.is_nan() => ".nan".to_string(),
        Value::Float(f) if f.is_infinite() => {
            if *f > 0.0 {
                ".inf".to_string()
            } else {
                "-.inf".to_string()
            }
        }
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(bytes) => STANDARD.encode(bytes),
        Value::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseContext;
    use pretty_assertions::assert_eq;

    fn compose_with(input: &str, options: &LoadOptions) -> Result<Document> {
        let ctx = ParseContext::default();
        let text = format!("{}\n", input);
        let scanner = Scanner::new(&text, &ctx, 0, 0, 0);
        let mut composer = Composer::new(scanner, options);
        composer.compose_document()?;
        let (doc, _, _) = composer.into_parts();
        Ok(doc)
    }

    fn compose(input: &str) -> Result<Value> {
        compose_with(input, &LoadOptions::default())?.to_value()
    }

    fn seq(items: Vec<Value>) -> Value {
        Value::Sequence(items)
    }

    #[test]
    fn test_block_mapping_with_nested_sequence() {
        let value = compose("name: demo\nitems:\n- 1\n- two\n- ~\n").unwrap();
        let expected: Value = [
            ("name", Value::from("demo")),
            ("items", seq(vec![Value::from(1i64), Value::from("two"), Value::Null])),
        ]
        .into_iter()
        .collect();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_flow_collections() {
        let value = compose("{a: [1, 2], b: {c: true}, 'd': \"e\"}").unwrap();
        let expected: Value = [
            ("a", seq(vec![Value::from(1i64), Value::from(2i64)])),
            ("b", [("c", true)].into_iter().collect()),
            ("d", Value::from("e")),
        ]
        .into_iter()
        .collect();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_pair_in_flow_sequence_is_single_pair_mapping() {
        let value = compose("[a: 1, b]").unwrap();
        assert_eq!(
            value,
            seq(vec![[("a", 1i64)].into_iter().collect(), Value::from("b")])
        );
    }

    #[test]
    fn test_plain_scalar_without_colon_is_the_root() {
        assert_eq!(compose("foo\n\nfoo").unwrap(), Value::from("foo\nfoo"));
        assert_eq!(compose("").unwrap(), Value::Null);
    }

    #[test]
    fn test_explicit_keys() {
        let value = compose("? a\n: 1\n? b\n").unwrap();
        let expected: Value = [("a", Value::from(1i64)), ("b", Value::Null)].into_iter().collect();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_alias_shares_the_anchored_node() {
        let doc = compose_with("a: &x [1]\nb: *x\n", &LoadOptions::default()).unwrap();
        let root = doc.root();
        assert_eq!(doc.get(root, "a"), doc.get(root, "b"));
    }

    #[test]
    fn test_self_referencing_mapping() {
        let doc = compose_with("&a\nself: *a\n", &LoadOptions::default()).unwrap();
        let root = doc.root();
        assert_eq!(doc.get(root, "self"), Some(root));
        assert!(doc.to_value().is_err());
    }

    #[test]
    fn test_unknown_alias() {
        let err = compose("a: *missing").unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
        assert_eq!(err.message(), "unidentified alias \"missing\"");
    }

    #[test]
    fn test_merge_keys() {
        let input = "base: &base {a: 1, b: 2}\nother: &other {b: 3, c: 4}\nchild:\n  <<: [*base, *other]\n  a: 9\n";
        let value = compose(input).unwrap();
        let expected: Value = [("a", 9i64), ("b", 3i64), ("c", 4i64)].into_iter().collect();
        assert_eq!(value.get("child"), Some(&expected));
    }

    #[test]
    fn test_merge_of_scalar_is_rejected() {
        let err = compose("a:\n  <<: 1\n").unwrap_err();
        assert_eq!(
            err.message(),
            "cannot merge mappings; the provided source object is unacceptable"
        );
    }

    #[test]
    fn test_quoted_merge_key_is_a_plain_string() {
        let value = compose("'<<': 1").unwrap();
        assert_eq!(value.get("<<"), Some(&Value::from(1i64)));
    }

    #[test]
    fn test_duplicate_keys() {
        let value = compose("a: 1\nb: 2\na: 3\n").unwrap();
        let keys: Vec<&String> = value.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(value.get("a"), Some(&Value::from(3i64)));

        let options = LoadOptions::new().with_duplicate_keys(DuplicateKeys::Reject);
        let err = compose_with("a: 1\na: 3\n", &options).unwrap_err();
        assert_eq!(err.message(), "duplicated mapping key");
        assert_eq!(err.mark().map(|m| (m.line, m.column)), Some((1, 0)));
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let value = compose("1: a\n[x, y]: b\n{k: v}: c\nnull: d\n").unwrap();
        let keys: Vec<&String> = value.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["1", "[x, y]", "{k: v}", "null"]);
    }

    #[test]
    fn test_nested_collection_key_is_rejected() {
        let err = compose("[[a]]: b").unwrap_err();
        assert_eq!(err.message(), "nested collections are not supported inside keys");
    }

    #[test]
    fn test_missed_comma() {
        let err = compose("{${: []}}").unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
        assert_eq!(err.message(), "missed comma between flow collection entries");
    }

    #[test]
    fn test_unterminated_flow_collection() {
        let err = compose("[a, b").unwrap_err();
        assert_eq!(err.message(), "unexpected end of the stream within a flow collection");
    }

    #[test]
    fn test_bad_indentation() {
        let err = compose("a: 1\n  b: 2\n").unwrap_err();
        assert_eq!(err.message(), "bad indentation of a mapping entry");
        let err = compose("- [a]\n  - b\n").unwrap_err();
        assert_eq!(err.message(), "bad indentation of a sequence entry");
    }

    #[test]
    fn test_tab_indentation_is_rejected() {
        let err = compose("a:\n\tb: 1\n").unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
        assert_eq!(err.message(), "tab characters must not be used in indentation");
    }

    #[test]
    fn test_missing_colon() {
        let err = compose("a: 1\nb\n").unwrap_err();
        assert_eq!(err.message(), "can not read an implicit mapping pair; a colon is missed");
    }

    #[test]
    fn test_explicit_tags() {
        let value = compose("a: !!str 12\nb: !!int '7'\nc: ! 12\nd: !!null\n").unwrap();
        assert_eq!(value.get("a"), Some(&Value::from("12")));
        assert_eq!(value.get("b"), Some(&Value::from(7i64)));
        assert_eq!(value.get("c"), Some(&Value::from("12")));
        assert_eq!(value.get("d"), Some(&Value::Null));
    }

    #[test]
    fn test_tag_errors() {
        let err = compose("!!int abc").unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        assert_eq!(
            err.message(),
            "cannot resolve a node with !<tag:yaml.org,2002:int> explicit tag"
        );

        let err = compose("!unknown x").unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        assert_eq!(err.message(), "unknown tag !<!unknown>");

        let err = compose("!!seq x").unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
        assert_eq!(
            err.message(),
            "unacceptable node kind for !<tag:yaml.org,2002:seq> tag; it should be \"sequence\", not \"scalar\""
        );
    }

    #[test]
    fn test_lenient_keeps_raw_content() {
        let options = LoadOptions::new().with_lenient(true);
        let value = compose_with("a: !unknown x\nb: !!int abc\n", &options)
            .unwrap()
            .to_value()
            .unwrap();
        assert_eq!(value.get("a"), Some(&Value::from("x")));
        assert_eq!(value.get("b"), Some(&Value::from("abc")));
    }

    #[test]
    fn test_tag_directive() {
        let value = compose("%TAG !e! tag:yaml.org,2002:\n---\n!e!int '5'\n").unwrap();
        assert_eq!(value, Value::from(5i64));
    }

    #[test]
    fn test_directive_errors() {
        let err = compose("%YAML 1.2\n%YAML 1.2\n---\na").unwrap_err();
        assert_eq!(err.message(), "duplication of %YAML directive");
        let err = compose("%YAML 2.0\n---\na").unwrap_err();
        assert_eq!(err.message(), "unacceptable YAML version of the document");
        let err = compose("%YAML 1.2\na").unwrap_err();
        assert_eq!(err.message(), "directives end mark is expected");
        let err = compose("%TAG !e! a\n%TAG !e! b\n---\na").unwrap_err();
        assert_eq!(
            err.message(),
            "there is a previously declared suffix for \"!e!\" tag handle"
        );
    }

    #[test]
    fn test_unknown_directive_warns() {
        let ctx = ParseContext::default();
        let options = LoadOptions::default();
        let scanner = Scanner::new("%FOO bar\n---\na\n", &ctx, 0, 0, 0);
        let mut composer = Composer::new(scanner, &options);
        composer.compose_document().unwrap();
        let (_, _, warnings) = composer.into_parts();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "unknown document directive \"FOO\"");
    }

    #[test]
    fn test_trailing_content_is_rejected() {
        let err = compose("[a]\n]").unwrap_err();
        assert_eq!(err.message(), "end of the stream or a document separator is expected");
    }

    #[test]
    fn test_depth_limit() {
        let options = LoadOptions::new().with_max_depth(8);
        let input = format!("{}{}", "[".repeat(10), "]".repeat(10));
        let err = compose_with(&input, &options).unwrap_err();
        assert_eq!(err.message(), "nesting depth exceeds 8");
        assert!(compose_with("[[[]]]", &options).is_ok());
    }

    #[test]
    fn test_meta_key_records_key_positions() {
        let options = LoadOptions::new().with_meta_key("__meta__");
        let value = compose_with("a: 1\nb:\n  c: 2\n", &options).unwrap().to_value().unwrap();
        let position = |line: i64, pos: i64| -> Value {
            [("startLine", line), ("startPos", pos)].into_iter().collect()
        };
        let meta = value.get("__meta__").unwrap();
        assert_eq!(meta.get("a"), Some(&position(0, 0)));
        assert_eq!(meta.get("b"), Some(&position(1, 5)));
        let inner = value.get("b").unwrap().get("__meta__").unwrap();
        assert_eq!(inner.get("c"), Some(&position(2, 10)));
    }

    #[test]
    fn test_cursor_stops_before_document_end_marker() {
        let ctx = ParseContext::default();
        let options = LoadOptions::default();
        let input = "a: 1\n...\nb: 2\n";
        let scanner = Scanner::new(input, &ctx, 0, 0, 0);
        let mut composer = Composer::new(scanner, &options);
        composer.compose_document().unwrap();
        let (_, cursor, _) = composer.into_parts();
        assert_eq!((cursor.position, cursor.line, cursor.line_start), (5, 1, 5));
    }
}
