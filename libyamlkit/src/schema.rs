//! Type bindings and schemas.
//!
//! A [`Type`] binds a tag and a node kind to the four operations both
//! directions need: `resolve` and `construct` on load, `predicate` and
//! `represent` on dump. A [`Schema`] is an ordered, immutable list of types.
//!
//! Loading looks types up by `(tag, kind)`. Untagged plain scalars try every
//! implicit type in registration order and take the first that resolves.
//! Dumping scans implicit types and then the rest, both in registration
//! order, and uses the first whose predicate accepts the node.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Located, Result};
use crate::graph::{Document, Node, NodeId};
use crate::types;

/// Structural kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar,
    Sequence,
    Mapping,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Scalar => "scalar",
            Kind::Sequence => "sequence",
            Kind::Mapping => "mapping",
        })
    }
}

/// Raw content of a composed node, handed to [`Type::resolve`] and
/// [`Type::construct`].
#[derive(Clone, Copy, Debug)]
pub enum Data<'a> {
    Scalar(&'a str),
    Sequence(&'a [NodeId]),
    Mapping(&'a IndexMap<String, NodeId>),
}

impl Data<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            Data::Scalar(_) => Kind::Scalar,
            Data::Sequence(_) => Kind::Sequence,
            Data::Mapping(_) => Kind::Mapping,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

/// A type binding.
///
/// `construct` and `represent` report failures as plain messages; the loader
/// and dumper attach positions and wrap them in [`Error`].
pub trait Type: Send + Sync {
    /// Full tag, e.g. `tag:yaml.org,2002:int` or `!point`.
    fn tag(&self) -> &str;

    fn kind(&self) -> Kind;

    /// Whether untagged plain scalars may resolve to this type.
    fn implicit(&self) -> bool {
        false
    }

    fn resolve(&self, data: &Data<'_>, doc: &Document) -> bool {
        let _ = (data, doc);
        true
    }

    fn construct(&self, data: &Data<'_>, doc: &mut Document) -> std::result::Result<Node, String>;

    fn predicate(&self, node: &Node, doc: &Document) -> bool {
        let _ = (node, doc);
        false
    }

    /// Text for a scalar node accepted by `predicate`.
    ///
    /// `style` is the caller's preference for this tag, if any.
    fn represent(
        &self,
        node: &Node,
        doc: &Document,
        style: Option<&str>,
    ) -> std::result::Result<String, String> {
        let _ = (node, doc, style);
        Err(format!("no representer for !<{}>", self.tag()))
    }
}

/// An ordered, immutable set of type bindings.
#[derive(Clone)]
pub struct Schema {
    types: Vec<Arc<dyn Type>>,
    index: HashMap<(String, Kind), usize>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.types.iter().map(|t| (t.tag().to_string(), t.kind())))
            .finish()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::default_safe()
    }
}

/// Empty graph for resolving standalone scalars.
static SCALAR_PROBE: Document = Document::empty();

impl Schema {
    /// Build a schema; two types with the same `(tag, kind)` are rejected.
    pub fn new(types: Vec<Arc<dyn Type>>) -> Result<Self> {
        let (schema, duplicates) = Self::assemble(types);
        match duplicates.first() {
            Some((tag, kind)) => Err(Error::Composition(Located::unplaced(format!(
                "duplicate {} type for !<{}> in schema",
                kind, tag
            )))),
            None => Ok(schema),
        }
    }

    fn assemble(types: Vec<Arc<dyn Type>>) -> (Self, Vec<(String, Kind)>) {
        let mut index = HashMap::with_capacity(types.len());
        let mut duplicates = Vec::new();
        for (i, ty) in types.iter().enumerate() {
            let key = (ty.tag().to_string(), ty.kind());
            if index.contains_key(&key) {
                duplicates.push(key);
            } else {
                index.insert(key, i);
            }
        }
        (Schema { types, index }, duplicates)
    }

    /// A new schema with `additions` registered after this schema's types.
    pub fn extend(&self, additions: Vec<Arc<dyn Type>>) -> Result<Self> {
        let mut types = self.types.clone();
        types.extend(additions);
        Self::new(types)
    }

    /// `str`, `seq` and `map` only.
    pub fn failsafe() -> Self {
        Self::assemble(types::failsafe()).0
    }

    /// Failsafe plus implicit `null`, `bool`, `int` and `float`.
    pub fn core() -> Self {
        let mut list = types::failsafe();
        list.extend(types::core());
        Self::assemble(list).0
    }

    /// Core plus `timestamp`, `merge`, `binary`, `omap`, `pairs` and `set`.
    pub fn default_safe() -> Self {
        let mut list = types::failsafe();
        list.extend(types::core());
        list.extend(types::extended());
        Self::assemble(list).0
    }

    pub fn types(&self) -> &[Arc<dyn Type>] {
        &self.types
    }

    /// Types that untagged plain scalars may resolve to, in order.
    pub fn implicit_types(&self) -> impl Iterator<Item = &Arc<dyn Type>> {
        self.types.iter().filter(|t| t.implicit() && t.kind() == Kind::Scalar)
    }

    /// Types consulted when dumping: implicit ones first, then the rest.
    pub fn dump_order(&self) -> impl Iterator<Item = &Arc<dyn Type>> {
        self.types
            .iter()
            .filter(|t| t.implicit())
            .chain(self.types.iter().filter(|t| !t.implicit()))
    }

    pub fn lookup(&self, tag: &str, kind: Kind) -> Option<&Arc<dyn Type>> {
        self.index
            .get(&(tag.to_string(), kind))
            .map(|i| &self.types[*i])
    }

    /// First registered type for `tag`, of any kind.
    pub fn lookup_any(&self, tag: &str) -> Option<&Arc<dyn Type>> {
        self.types.iter().find(|t| t.tag() == tag)
    }

    /// Tag an untagged plain scalar with this text would resolve to.
    pub fn resolve_scalar(&self, text: &str) -> &str {
        let data = Data::Scalar(text);
        self.implicit_types()
            .find(|t| t.resolve(&data, &SCALAR_PROBE))
            .map(|t| t.tag())
            .unwrap_or(types::STR_TAG)
    }

    /// Whether plain `text` would load as something other than a string.
    pub fn is_ambiguous(&self, text: &str) -> bool {
        let data = Data::Scalar(text);
        self.implicit_types().any(|t| t.resolve(&data, &SCALAR_PROBE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Point;

    impl Type for Point {
        fn tag(&self) -> &str {
            "!point"
        }

        fn kind(&self) -> Kind {
            Kind::Scalar
        }

        fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> std::result::Result<Node, String> {
            Ok(Node::Scalar(Value::from(data.as_str().unwrap_or(""))))
        }
    }

    #[test]
    fn test_resolve_scalar_order() {
        let schema = Schema::default_safe();
        assert_eq!(schema.resolve_scalar("~"), "tag:yaml.org,2002:null");
        assert_eq!(schema.resolve_scalar("true"), "tag:yaml.org,2002:bool");
        assert_eq!(schema.resolve_scalar("0x1F"), "tag:yaml.org,2002:int");
        assert_eq!(schema.resolve_scalar("1.5"), "tag:yaml.org,2002:float");
        assert_eq!(schema.resolve_scalar("2001-12-14"), "tag:yaml.org,2002:timestamp");
        assert_eq!(schema.resolve_scalar("<<"), "tag:yaml.org,2002:merge");
        assert_eq!(schema.resolve_scalar("hello"), "tag:yaml.org,2002:str");
    }

    #[test]
    fn test_failsafe_resolves_everything_to_str() {
        let schema = Schema::failsafe();
        assert_eq!(schema.resolve_scalar("true"), "tag:yaml.org,2002:str");
        assert!(!schema.is_ambiguous("1"));
    }

    #[test]
    fn test_extend_appends() {
        let schema = Schema::core().extend(vec![Arc::new(Point)]).unwrap();
        assert!(schema.lookup("!point", Kind::Scalar).is_some());
        assert!(schema.lookup("!point", Kind::Mapping).is_none());
        assert_eq!(schema.types().last().map(|t| t.tag()), Some("!point"));
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let err = Schema::core()
            .extend(vec![Arc::new(Point), Arc::new(Point)])
            .unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
        assert_eq!(err.message(), "duplicate scalar type for !<!point> in schema");
    }

    #[test]
    fn test_builtin_tag_cannot_be_rebound() {
        let err = Schema::default_safe()
            .extend(types::core())
            .unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
    }
}
