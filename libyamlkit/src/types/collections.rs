use std::collections::HashSet;

use crate::graph::{Document, Node, NodeId};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{OMAP_TAG, PAIRS_TAG, SET_TAG};

/// The single entry of a one-pair mapping node.
fn single_pair<'d>(doc: &'d Document, id: NodeId) -> Option<(&'d String, NodeId)> {
    match doc.node(id) {
        Node::Mapping(entries) if entries.len() == 1 => entries.iter().next().map(|(k, v)| (k, *v)),
        _ => None,
    }
}

/// Ordered mapping: a sequence of one-pair mappings with distinct keys.
pub struct OmapType;

impl Type for OmapType {
    fn tag(&self) -> &str {
        OMAP_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn resolve(&self, data: &Data<'_>, doc: &Document) -> bool {
        let Data::Sequence(items) = data else {
            return false;
        };
        let mut seen = HashSet::new();
        items.iter().all(|item| match single_pair(doc, *item) {
            Some((key, _)) => seen.insert(key.as_str()),
            None => false,
        })
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        match data {
            Data::Sequence(items) => Ok(Node::Sequence(items.to_vec())),
            _ => Err("expected a sequence".to_string()),
        }
    }
}

/// Key/value pairs; keys may repeat.
///
/// Constructs a sequence of `[key, value]` sequences.
pub struct PairsType;

impl Type for PairsType {
    fn tag(&self) -> &str {
        PAIRS_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn resolve(&self, data: &Data<'_>, doc: &Document) -> bool {
        match data {
            Data::Sequence(items) => items.iter().all(|item| single_pair(doc, *item).is_some()),
            _ => false,
        }
    }

    fn construct(&self, data: &Data<'_>, doc: &mut Document) -> Result<Node, String> {
        let Data::Sequence(items) = data else {
            return Err("expected a sequence".to_string());
        };
        let mut pairs = Vec::with_capacity(items.len());
        for item in items.iter() {
            let (key, value) = single_pair(doc, *item)
                .map(|(k, v)| (k.clone(), v))
                .ok_or_else(|| "each pair must be a single-entry mapping".to_string())?;
            let key = doc.scalar(Value::String(key));
            pairs.push(doc.push(Node::Sequence(vec![key, value])));
        }
        Ok(Node::Sequence(pairs))
    }
}

/// Set: a mapping whose values are all null.
pub struct SetType;

impl Type for SetType {
    fn tag(&self) -> &str {
        SET_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Mapping
    }

    fn resolve(&self, data: &Data<'_>, doc: &Document) -> bool {
        match data {
            Data::Mapping(entries) => entries
                .values()
                .all(|v| matches!(doc.node(*v), Node::Scalar(Value::Null))),
            _ => false,
        }
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        match data {
            Data::Mapping(entries) => Ok(Node::Mapping((*entries).clone())),
            _ => Err("expected a mapping".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn one_pair(doc: &mut Document, key: &str, value: i64) -> NodeId {
        let value = doc.scalar(value);
        doc.push(Node::Mapping(IndexMap::from([(key.to_string(), value)])))
    }

    #[test]
    fn test_omap_rejects_repeated_keys() {
        let mut doc = Document::new();
        let a = one_pair(&mut doc, "a", 1);
        let b = one_pair(&mut doc, "b", 2);
        let again = one_pair(&mut doc, "a", 3);
        assert!(OmapType.resolve(&Data::Sequence(&[a, b]), &doc));
        assert!(!OmapType.resolve(&Data::Sequence(&[a, again]), &doc));
        assert!(PairsType.resolve(&Data::Sequence(&[a, again]), &doc));
    }

    #[test]
    fn test_pairs_construct() {
        let mut doc = Document::new();
        let a = one_pair(&mut doc, "a", 1);
        let node = PairsType.construct(&Data::Sequence(&[a]), &mut doc).unwrap();
        let root = doc.push(node);
        doc.set_root(root);
        assert_eq!(
            doc.to_value().unwrap(),
            Value::Sequence(vec![Value::Sequence(vec![Value::from("a"), Value::from(1i64)])])
        );
    }

    #[test]
    fn test_set_requires_null_values() {
        let mut doc = Document::new();
        let null = doc.scalar(Value::Null);
        let one = doc.scalar(1i64);
        let ok = IndexMap::from([("a".to_string(), null)]);
        let bad = IndexMap::from([("a".to_string(), one)]);
        assert!(SetType.resolve(&Data::Mapping(&ok), &doc));
        assert!(!SetType.resolve(&Data::Mapping(&bad), &doc));
    }
}
