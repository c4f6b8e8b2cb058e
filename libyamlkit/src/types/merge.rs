use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::MERGE_TAG;

/// The `<<` key; the composer merges the entries it points at.
pub struct MergeType;

impl Type for MergeType {
    fn tag(&self) -> &str {
        MERGE_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        data.as_str() == Some("<<")
    }

    fn construct(&self, _data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        Ok(Node::Scalar(Value::from("<<")))
    }
}
