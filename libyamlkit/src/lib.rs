//! YAML loader and dumper with pluggable type schemas.
//!
//! Documents load into an arena graph ([`Document`]) that can hold the shared
//! and cyclic structures anchors and aliases describe, or into a plain tree
//! ([`Value`]) when no cycles are involved. Scalars are resolved to typed
//! values by a [`Schema`], an ordered list of [`Type`] bindings that the
//! dumper consults in the other direction.
//!
//! # Loading Pipeline
//!
//! 1. **Scanner**: Walks the input byte by byte, tracking line, column and
//!    indentation, and reads scalars in every style, tags, anchors and
//!    directives.
//!
//! 2. **Composer**: Builds one document's node graph by recursive descent,
//!    registers anchors, resolves aliases, applies merge keys and resolves
//!    every node against the schema.
//!
//! 3. **Stream driver**: Composes documents one after another and hands each
//!    to a callback that may move the cursor before the next one is read.
//!
//! # Dumping
//!
//! The dumper walks a graph, anchors nodes reached more than once, picks
//! block or flow layout per level and a quoting style per scalar, and makes
//! sure every plain scalar loads back as the same type.

mod composer;
mod dumper;
mod error;
mod graph;
mod mark;
mod options;
mod scanner;
mod schema;
mod stream;
pub mod types;
mod value;

pub use dumper::dump_document;
pub use error::{Error, Located, ParseContext, Result};
pub use graph::{Document, Node, NodeId};
pub use mark::Mark;
pub use options::{DumpOptions, DuplicateKeys, LoadOptions, SortKeys, WarningHandler};
pub use schema::{Data, Kind, Schema, Type};
pub use stream::{for_each_document, DocumentFlow, DocumentStreamState};
pub use value::{Mapping, TaggedValue, Value};

/// Load a single-document stream with the default options.
///
/// # Example
///
/// ```
/// use libyamlkit::{load, Value};
///
/// let value = load("answer: 42").unwrap();
/// assert_eq!(value.get("answer"), Some(&Value::from(42i64)));
/// ```
pub fn load(input: &str) -> Result<Value> {
    load_with_options(input, &LoadOptions::default())
}

/// Load a single-document stream into a tree value.
pub fn load_with_options(input: &str, options: &LoadOptions) -> Result<Value> {
    load_document(input, options)?.to_value()
}

/// Load a single-document stream into a graph.
///
/// An empty stream gives a null document unless `allow_empty` is off; a
/// stream with more than one document is an error.
pub fn load_document(input: &str, options: &LoadOptions) -> Result<Document> {
    let mut documents = load_all_documents(input, options)?;
    match documents.len() {
        0 if options.allow_empty => Ok(Document::new()),
        0 => Err(Error::Composition(Located::unplaced(
            "expected a document in the stream, but found none",
        ))),
        1 => Ok(documents.pop().unwrap_or_default()),
        _ => Err(Error::Composition(Located::unplaced(
            "expected a single document in the stream, but found more",
        ))),
    }
}

/// Load every document of a stream with the default options.
pub fn load_all(input: &str) -> Result<Vec<Value>> {
    load_all_with_options(input, &LoadOptions::default())
}

/// Load every document of a stream into tree values.
pub fn load_all_with_options(input: &str, options: &LoadOptions) -> Result<Vec<Value>> {
    load_all_documents(input, options)?
        .iter()
        .map(Document::to_value)
        .collect()
}

/// Load every document of a stream into graphs.
pub fn load_all_documents(input: &str, options: &LoadOptions) -> Result<Vec<Document>> {
    for_each_document(input, options, |_, _, _| DocumentFlow::Default)
}

/// Dump a value with the default options.
///
/// # Example
///
/// ```
/// use libyamlkit::{dump, Value};
///
/// let value: Value = [("flag", "true")].into_iter().collect();
/// assert_eq!(dump(&value).unwrap(), "flag: 'true'\n");
/// ```
pub fn dump(value: &Value) -> Result<String> {
    dump_with_options(value, &DumpOptions::default())
}

/// Dump a value.
pub fn dump_with_options(value: &Value, options: &DumpOptions) -> Result<String> {
    dump_document(&Document::from_value(value.clone()), options)
}
