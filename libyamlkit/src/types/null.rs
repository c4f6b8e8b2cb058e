use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{unknown_style, NULL_TAG};

pub struct NullType;

impl Type for NullType {
    fn tag(&self) -> &str {
        NULL_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        matches!(data.as_str(), Some("" | "~" | "null" | "Null" | "NULL"))
    }

    fn construct(&self, _data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        Ok(Node::Scalar(Value::Null))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Null))
    }

    fn represent(&self, _node: &Node, _doc: &Document, style: Option<&str>) -> Result<String, String> {
        let text = match style.unwrap_or("lowercase") {
            "canonical" => "~",
            "lowercase" => "null",
            "uppercase" => "NULL",
            "camelcase" => "Null",
            "empty" => "",
            other => return Err(unknown_style(NULL_TAG, other)),
        };
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_spellings() {
        let doc = Document::new();
        for text in ["", "~", "null", "Null", "NULL"] {
            assert!(NullType.resolve(&Data::Scalar(text), &doc), "{:?}", text);
        }
        assert!(!NullType.resolve(&Data::Scalar("nULL"), &doc));
    }

    #[test]
    fn test_represent_styles() {
        let doc = Document::new();
        let node = Node::Scalar(Value::Null);
        assert_eq!(NullType.represent(&node, &doc, None).unwrap(), "null");
        assert_eq!(NullType.represent(&node, &doc, Some("canonical")).unwrap(), "~");
        assert_eq!(NullType.represent(&node, &doc, Some("empty")).unwrap(), "");
        assert!(NullType.represent(&node, &doc, Some("loud")).is_err());
    }
}
