//! Multi-document stream driver.
//!
//! Documents are composed one at a time from a shared [`DocumentStreamState`].
//! After each document the callback sees the composed graph and the cursor,
//! and may move the cursor or edit the input before the next document is
//! read. This is how callers skip over regions they handle themselves.

use tracing::{debug, trace, warn};

use crate::composer::Composer;
use crate::error::{Error, Located, ParseContext, Result};
use crate::graph::Document;
use crate::mark::Mark;
use crate::options::LoadOptions;
use crate::scanner::Scanner;

/// Cursor over the stream, shared with the per-document callback.
///
/// `position` is the byte offset where the next document begins and
/// `line_start` the offset of the line it is on. On entry to the callback
/// `document_start..position` spans the document just composed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentStreamState {
    pub input: String,
    pub length: usize,
    pub position: usize,
    pub line: usize,
    pub line_start: usize,
    pub document_start: usize,
}

/// What the driver does after the callback returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentFlow {
    /// Stop once the cursor has reached the end of the stream.
    #[default]
    Default,
    /// Keep reading; the input may have changed, so its length is re-read.
    Continue,
}

/// Normalize raw input: drop a leading BOM, reject NUL bytes, and make sure
/// non-empty input ends with a line break.
pub(crate) fn prepare_input(input: &str, ctx: &ParseContext) -> Result<String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    if let Some(at) = input.bytes().position(|b| b == 0) {
        let line = input[..at].matches('\n').count();
        let line_start = input[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let mark = Mark::new(at, line, at - line_start);
        return Err(Error::Lexical(ctx.locate("null byte is not allowed in input", mark, input)));
    }
    let mut text = input.to_string();
    if !text.is_empty() && !text.ends_with(['\n', '\r']) {
        text.push('\n');
    }
    Ok(text)
}

fn emit_warnings(warnings: Vec<Located>, options: &LoadOptions) {
    for located in warnings {
        warn!(line = located.mark.map(|m| m.line + 1), "{}", located.message);
        if let Some(handler) = &options.on_warning {
            handler(&Error::Composition(located));
        }
    }
}

/// Compose every document of `input`, calling `callback` after each one.
///
/// The callback receives the document (which it may edit), its zero-based
/// index and the stream state. Composition resumes at `state.position`,
/// `state.line` and `state.line_start`, so a callback can skip input by
/// moving them forward. The returned list holds the documents as the
/// callback left them.
pub fn for_each_document<F>(input: &str, options: &LoadOptions, mut callback: F) -> Result<Vec<Document>>
where
    F: FnMut(&mut Document, usize, &mut DocumentStreamState) -> DocumentFlow,
{
    let ctx = ParseContext::new(options.filename.as_deref());
    let input = prepare_input(input, &ctx)?;
    let mut state = DocumentStreamState {
        length: input.len(),
        input,
        position: 0,
        line: 0,
        line_start: 0,
        document_start: 0,
    };
    let mut documents = Vec::new();

    loop {
        let mut scanner = Scanner::new(&state.input, &ctx, state.position, state.line, state.line_start);
        if scanner.peek() == b'.' && scanner.at_document_separator() {
            scanner.position += 3;
            scanner.skip_separation_space(true, -1);
        }
        let document_start = scanner.position;
        scanner.skip_separation_space(true, -1);
        if scanner.peek() == 0 {
            emit_warnings(std::mem::take(&mut scanner.warnings), options);
            break;
        }

        let mut composer = Composer::new(scanner, options);
        let composed = composer.compose_document();
        let (mut doc, cursor, warnings) = composer.into_parts();
        emit_warnings(warnings, options);
        composed?;

        let index = documents.len();
        state.document_start = document_start;
        state.position = cursor.position;
        state.line = cursor.line;
        state.line_start = cursor.line_start;
        debug!(index, start = document_start, end = cursor.position, "document composed");

        let flow = callback(&mut doc, index, &mut state);
        documents.push(doc);

        if state.line_start > state.position
            || state.position > state.input.len()
            || !state.input.is_char_boundary(state.position)
            || !state.input.is_char_boundary(state.line_start)
        {
            return Err(Error::Composition(Located::unplaced(format!(
                "document stream cursor is out of range: position {}, line start {}, length {}",
                state.position,
                state.line_start,
                state.input.len()
            ))));
        }

        match flow {
            DocumentFlow::Continue => {
                state.length = state.input.len();
                trace!(length = state.length, "stream length refreshed");
            }
            DocumentFlow::Default => {
                if state.position >= state.length {
                    break;
                }
            }
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn values(docs: &[Document]) -> Vec<Value> {
        docs.iter().map(|d| d.to_value().unwrap()).collect()
    }

    #[test]
    fn test_prepare_input() {
        let ctx = ParseContext::default();
        assert_eq!(prepare_input("", &ctx).unwrap(), "");
        assert_eq!(prepare_input("a", &ctx).unwrap(), "a\n");
        assert_eq!(prepare_input("\u{feff}a\n", &ctx).unwrap(), "a\n");
        let err = prepare_input("a\nb\0", &ctx).unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
        assert_eq!(err.mark().map(|m| (m.line, m.column)), Some((1, 1)));
    }

    #[test]
    fn test_counts_documents() {
        let options = LoadOptions::default();
        let docs = for_each_document("a: 1\n---\nb: 2\n...\n--- c\n", &options, |_, _, _| {
            DocumentFlow::Default
        })
        .unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(values(&docs)[2], Value::from("c"));
    }

    #[test]
    fn test_comment_only_stream_has_no_documents() {
        let options = LoadOptions::default();
        let docs = for_each_document("# nothing\n\n", &options, |_, _, _| DocumentFlow::Default).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_empty_explicit_documents() {
        let options = LoadOptions::default();
        let docs = for_each_document("--- # one\n--- # two\n", &options, |_, _, _| DocumentFlow::Default)
            .unwrap();
        assert_eq!(values(&docs), vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_callback_sees_document_span() {
        let options = LoadOptions::default();
        let mut spans = Vec::new();
        for_each_document("a: 1\n...\nb: 2\n", &options, |_, index, state| {
            spans.push((index, state.document_start, state.position));
            DocumentFlow::Default
        })
        .unwrap();
        assert_eq!(spans, vec![(0, 0, 5), (1, 9, 14)]);
    }

    #[test]
    fn test_cursor_out_of_range_is_rejected() {
        let options = LoadOptions::default();
        let err = for_each_document("a: 1\n", &options, |_, _, state| {
            state.position = state.input.len() + 1;
            DocumentFlow::Continue
        })
        .unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
    }

    #[test]
    fn test_warnings_reach_the_handler() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = LoadOptions::new().with_on_warning(move |err| {
            sink.lock().unwrap().push(err.message().to_string());
        });
        for_each_document("%FOO\n--- a\n", &options, |_, _, _| DocumentFlow::Default).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["unknown document directive \"FOO\"".to_string()]);
    }
}
