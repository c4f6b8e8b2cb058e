use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::BINARY_TAG;

pub struct BinaryType;

fn decode(text: &str) -> Result<Vec<u8>, String> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| format!("invalid base64 data: {}", e))
}

impl Type for BinaryType {
    fn tag(&self) -> &str {
        BINARY_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        data.as_str().is_some_and(|text| decode(text).is_ok())
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        Ok(Node::Scalar(Value::Bytes(decode(data.as_str().unwrap_or_default())?)))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Bytes(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, _style: Option<&str>) -> Result<String, String> {
        match node {
            Node::Scalar(Value::Bytes(bytes)) => Ok(STANDARD.encode(bytes)),
            _ => Err("not binary data".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ignores_line_breaks() {
        assert_eq!(decode("aGVs\nbG8=\n").unwrap(), b"hello");
    }

    #[test]
    fn test_padding_is_required() {
        assert!(decode("aGk").is_err());
        assert!(decode("a$==").is_err());
    }
}
