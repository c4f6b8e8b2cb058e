//! Multi-document streams and the per-document callback protocol.

use libyamlkit::{
    for_each_document, load_all, load_all_with_options, DocumentFlow, LoadOptions, Value,
};
use pretty_assertions::assert_eq;

const STREAM: &str = "foo: bar\n...\nbar: bla bla\n\nx: y\n\nz: bogus\n...\nfoo: bar\n...\nfoo\n\nfoo";

fn mapping(pairs: &[(&str, Value)]) -> Value {
    pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
}

fn position(line: i64, pos: i64) -> Value {
    mapping(&[("startLine", Value::from(line)), ("startPos", Value::from(pos))])
}

#[test]
fn test_explicit_document_markers() {
    let docs = load_all("---\nfoo: bar\n---\nfoo: bar\n").unwrap();
    let foo = mapping(&[("foo", Value::from("bar"))]);
    assert_eq!(docs, vec![foo.clone(), foo]);
}

#[test]
fn test_all_documents_empty() {
    let docs = load_all("--- # first document\n--- # second document\n").unwrap();
    assert_eq!(docs, vec![Value::Null, Value::Null]);
}

#[test]
fn test_implicit_first_document() {
    let docs = load_all("foo: bar\n---\nfoo: bar\n").unwrap();
    assert_eq!(docs.len(), 2);
}

#[test]
fn test_document_end_markers() {
    let docs = load_all(STREAM).unwrap();
    assert_eq!(
        docs,
        vec![
            mapping(&[("foo", Value::from("bar"))]),
            mapping(&[
                ("bar", Value::from("bla bla")),
                ("x", Value::from("y")),
                ("z", Value::from("bogus")),
            ]),
            mapping(&[("foo", Value::from("bar"))]),
            Value::from("foo\nfoo"),
        ]
    );
}

#[test]
fn test_empty_stream_has_no_documents() {
    assert!(load_all("").unwrap().is_empty());
    assert!(load_all("\n# only a comment\n").unwrap().is_empty());
}

#[test]
fn test_listener_sees_every_document_with_positions() {
    let expected_spans = [(0, 9), (13, 42), (46, 55), (59, 68)];
    let options = LoadOptions::new().with_meta_key("coord");
    let mut count = 0;
    let docs = for_each_document(STREAM, &options, |_, index, state| {
        assert_eq!(index, count);
        count += 1;
        assert_eq!((state.document_start, state.position), expected_spans[index]);
        assert_eq!(state.length, 68);
        DocumentFlow::Default
    })
    .unwrap();
    assert_eq!(count, 4);

    let values: Vec<Value> = docs.iter().map(|d| d.to_value().unwrap()).collect();
    assert_eq!(
        values,
        vec![
            mapping(&[
                ("foo", Value::from("bar")),
                ("coord", mapping(&[("foo", position(0, 0))])),
            ]),
            mapping(&[
                ("bar", Value::from("bla bla")),
                ("x", Value::from("y")),
                ("z", Value::from("bogus")),
                (
                    "coord",
                    mapping(&[
                        ("bar", position(2, 13)),
                        ("x", position(4, 27)),
                        ("z", position(6, 33)),
                    ]),
                ),
            ]),
            mapping(&[
                ("foo", Value::from("bar")),
                ("coord", mapping(&[("foo", position(8, 46))])),
            ]),
            Value::from("foo\nfoo"),
        ]
    );
}

#[test]
fn test_meta_key_comes_after_the_keys() {
    let options = LoadOptions::new().with_meta_key("coord");
    let docs = load_all_with_options("b: 1\na: 2\n", &options).unwrap();
    let keys: Vec<&String> = docs[0].as_mapping().unwrap().keys().collect();
    assert_eq!(keys, ["b", "a", "coord"]);
}

#[test]
fn test_listener_can_forward_the_cursor() {
    let expected_spans = [(0, 9), (46, 55)];
    let options = LoadOptions::new().with_meta_key("coord");
    let mut count = 0;
    let docs = for_each_document(STREAM, &options, |doc, index, state| {
        assert_eq!(index, count);
        count += 1;
        assert_eq!((state.document_start, state.position), expected_spans[index]);

        let start = state.position;
        assert!(state.input[start..].starts_with("...\n"));
        let end = match state.input[start..].find("\n...\n") {
            Some(offset) => start + offset + 1,
            None => state.length,
        };
        state.position = end;
        state.line_start = end;
        let content = &state.input[start..end];
        state.line += content.matches('\n').count();

        let chunk = content[4..content.len() - 1].to_string();
        let root = doc.root();
        let text = doc.scalar(chunk);
        doc.insert(root, "__content__", text);
        DocumentFlow::Continue
    })
    .unwrap();
    assert_eq!(count, 2);

    let values: Vec<Value> = docs.iter().map(|d| d.to_value().unwrap()).collect();
    assert_eq!(
        values,
        vec![
            mapping(&[
                ("foo", Value::from("bar")),
                ("coord", mapping(&[("foo", position(0, 0))])),
                ("__content__", Value::from("bar: bla bla\n\nx: y\n\nz: bogus")),
            ]),
            mapping(&[
                ("foo", Value::from("bar")),
                ("coord", mapping(&[("foo", position(8, 46))])),
                ("__content__", Value::from("foo\n\nfoo")),
            ]),
        ]
    );
}

#[test]
fn test_error_aborts_the_stream() {
    let err = load_all("a: 1\n---\n[b\n---\nc: 3\n").unwrap_err();
    assert_eq!(err.message(), "unexpected end of the stream within a flow collection");
}

#[test]
fn test_anchors_do_not_cross_documents() {
    let err = load_all("a: &x 1\n---\nb: *x\n").unwrap_err();
    assert_eq!(err.message(), "unidentified alias \"x\"");
}
