//! Arena-backed document graph.
//!
//! Aliases make a loaded document a graph rather than a tree: two mapping
//! entries may hold the same node, and a collection may contain itself. The
//! graph stores every node in one vector and links them by [`NodeId`], so a
//! back edge is an ordinary index.

use indexmap::IndexMap;

use crate::error::{Error, Located, Result};
use crate::value::{Mapping, TaggedValue, Value};

/// Handle of a node inside one [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of a document graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A scalar. The value is never a `Sequence`, `Mapping` or `Tagged`.
    Scalar(Value),
    Sequence(Vec<NodeId>),
    Mapping(IndexMap<String, NodeId>),
    /// A node constructed by an application type that keeps its tag.
    Tagged { tag: String, inner: NodeId },
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Node::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NodeId]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, NodeId>> {
        match self {
            Node::Mapping(entries) => Some(entries),
            _ => None,
        }
    }
}

/// A document: an arena of nodes and the root handle.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document whose root is null.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Scalar(Value::Null)],
            root: NodeId(0),
        }
    }

    /// A graph with no nodes; its root handle is dangling.
    pub(crate) const fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Add a node and return its handle.
    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a scalar node.
    pub fn scalar(&mut self, value: impl Into<Value>) -> NodeId {
        self.push(Node::Scalar(value.into()))
    }

    /// Replace a node's content, keeping its handle.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Node {
        std::mem::replace(&mut self.nodes[id.0], node)
    }

    /// Build a `Tagged` node around `inner`, which is added to the arena.
    pub fn tagged(&mut self, tag: impl Into<String>, inner: Node) -> Node {
        let inner = self.push(inner);
        Node::Tagged {
            tag: tag.into(),
            inner,
        }
    }

    /// Insert `key: value` into the mapping node `map`.
    ///
    /// Returns `false` if `map` is not a mapping.
    pub fn insert(&mut self, map: NodeId, key: impl Into<String>, value: NodeId) -> bool {
        match &mut self.nodes[map.0] {
            Node::Mapping(entries) => {
                entries.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Append `item` to the sequence node `seq`.
    ///
    /// Returns `false` if `seq` is not a sequence.
    pub fn append(&mut self, seq: NodeId, item: NodeId) -> bool {
        match &mut self.nodes[seq.0] {
            Node::Sequence(items) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    /// Look up a mapping entry of `map` by key.
    pub fn get(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.node(map).as_mapping().and_then(|m| m.get(key).copied())
    }

    /// Build a graph holding a copy of `value`.
    pub fn from_value(value: Value) -> Self {
        let mut doc = Document::empty();
        let root = doc.add_value(value);
        doc.root = root;
        doc
    }

    /// Add `value` and its children to the arena.
    pub fn add_value(&mut self, value: Value) -> NodeId {
        match value {
            Value::Sequence(items) => {
                let id = self.push(Node::Sequence(Vec::with_capacity(items.len())));
                for item in items {
                    let child = self.add_value(item);
                    self.append(id, child);
                }
                id
            }
            Value::Mapping(map) => {
                let id = self.push(Node::Mapping(IndexMap::with_capacity(map.len())));
                for (key, item) in map {
                    let child = self.add_value(item);
                    self.insert(id, key, child);
                }
                id
            }
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let inner = self.add_value(value);
                self.push(Node::Tagged { tag, inner })
            }
            scalar => self.push(Node::Scalar(scalar)),
        }
    }

    /// Copy the graph into a tree.
    ///
    /// Shared nodes are copied once per reference. A cycle cannot be
    /// expressed as a tree and is an error.
    pub fn to_value(&self) -> Result<Value> {
        self.value_at(self.root)
    }

    /// Copy the subgraph rooted at `id` into a tree.
    pub fn value_at(&self, id: NodeId) -> Result<Value> {
        let mut visiting = vec![false; self.nodes.len()];
        self.build_value(id, &mut visiting)
    }

    fn build_value(&self, id: NodeId, visiting: &mut [bool]) -> Result<Value> {
        if visiting[id.0] {
            return Err(Error::Composition(Located::unplaced(
                "cyclic reference cannot be converted to a tree value",
            )));
        }
        let value = match self.node(id) {
            Node::Scalar(value) => return Ok(value.clone()),
            Node::Sequence(items) => {
                visiting[id.0] = true;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.build_value(*item, visiting)?);
                }
                Value::Sequence(out)
            }
            Node::Mapping(entries) => {
                visiting[id.0] = true;
                let mut out = Mapping::with_capacity(entries.len());
                for (key, item) in entries {
                    out.insert(key.clone(), self.build_value(*item, visiting)?);
                }
                Value::Mapping(out)
            }
            Node::Tagged { tag, inner } => {
                visiting[id.0] = true;
                Value::Tagged(Box::new(TaggedValue {
                    tag: tag.clone(),
                    value: self.build_value(*inner, visiting)?,
                }))
            }
        };
        visiting[id.0] = false;
        Ok(value)
    }
}
