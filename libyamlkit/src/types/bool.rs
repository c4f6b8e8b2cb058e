use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{unknown_style, BOOL_TAG};

pub struct BoolType;

impl Type for BoolType {
    fn tag(&self) -> &str {
        BOOL_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        matches!(
            data.as_str(),
            Some("true" | "True" | "TRUE" | "false" | "False" | "FALSE")
        )
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        let value = matches!(data.as_str(), Some("true" | "True" | "TRUE"));
        Ok(Node::Scalar(Value::Bool(value)))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Bool(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, style: Option<&str>) -> Result<String, String> {
        let value = matches!(node, Node::Scalar(Value::Bool(true)));
        let text = match (style.unwrap_or("lowercase"), value) {
            ("lowercase", true) => "true",
            ("lowercase", false) => "false",
            ("uppercase", true) => "TRUE",
            ("uppercase", false) => "FALSE",
            ("camelcase", true) => "True",
            ("camelcase", false) => "False",
            (other, _) => return Err(unknown_style(BOOL_TAG, other)),
        };
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct() {
        let mut doc = Document::new();
        let node = BoolType.construct(&Data::Scalar("TRUE"), &mut doc).unwrap();
        assert_eq!(node, Node::Scalar(Value::Bool(true)));
        let node = BoolType.construct(&Data::Scalar("False"), &mut doc).unwrap();
        assert_eq!(node, Node::Scalar(Value::Bool(false)));
    }

    #[test]
    fn test_yaml11_words_are_not_booleans() {
        let doc = Document::new();
        for text in ["yes", "no", "on", "off", "y", "n"] {
            assert!(!BoolType.resolve(&Data::Scalar(text), &doc), "{:?}", text);
        }
    }

    #[test]
    fn test_represent_camelcase() {
        let doc = Document::new();
        let node = Node::Scalar(Value::Bool(false));
        assert_eq!(BoolType.represent(&node, &doc, Some("camelcase")).unwrap(), "False");
    }
}
