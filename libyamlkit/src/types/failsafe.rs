use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{MAP_TAG, SEQ_TAG, STR_TAG};

pub struct StrType;

impl Type for StrType {
    fn tag(&self) -> &str {
        STR_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        Ok(Node::Scalar(Value::String(
            data.as_str().unwrap_or_default().to_string(),
        )))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::String(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, _style: Option<&str>) -> Result<String, String> {
        match node {
            Node::Scalar(Value::String(s)) => Ok(s.clone()),
            _ => Err("not a string".to_string()),
        }
    }
}

pub struct SeqType;

impl Type for SeqType {
    fn tag(&self) -> &str {
        SEQ_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        match data {
            Data::Sequence(items) => Ok(Node::Sequence(items.to_vec())),
            _ => Err("expected a sequence".to_string()),
        }
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Sequence(_))
    }
}

pub struct MapType;

impl Type for MapType {
    fn tag(&self) -> &str {
        MAP_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Mapping
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        match data {
            Data::Mapping(entries) => Ok(Node::Mapping((*entries).clone())),
            _ => Err("expected a mapping".to_string()),
        }
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Mapping(_))
    }
}
