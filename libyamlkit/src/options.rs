//! Load and dump configuration.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::schema::Schema;

/// What to do when a mapping repeats a key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateKeys {
    /// Warn and keep the later value at the first key's position.
    #[default]
    Overwrite,
    /// Fail with a composition error.
    Reject,
}

/// Receives load warnings.
pub type WarningHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Options for the loader and the document stream driver.
#[derive(Clone)]
pub struct LoadOptions {
    pub schema: Arc<Schema>,
    /// Attached to error messages.
    pub filename: Option<String>,
    /// Keep the raw content of nodes whose tag cannot be resolved.
    pub lenient: bool,
    /// Adds a key-position entry under this key to every mapping.
    pub meta_key: Option<String>,
    pub duplicate_keys: DuplicateKeys,
    /// `load` of a stream without documents returns null instead of failing.
    pub allow_empty: bool,
    /// Deepest nesting of collections accepted.
    pub max_depth: usize,
    pub on_warning: Option<WarningHandler>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            schema: Arc::new(Schema::default_safe()),
            filename: None,
            lenient: false,
            meta_key: None,
            duplicate_keys: DuplicateKeys::Overwrite,
            allow_empty: true,
            max_depth: 100,
            on_warning: None,
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("schema", &self.schema)
            .field("filename", &self.filename)
            .field("lenient", &self.lenient)
            .field("meta_key", &self.meta_key)
            .field("duplicate_keys", &self.duplicate_keys)
            .field("allow_empty", &self.allow_empty)
            .field("max_depth", &self.max_depth)
            .field("on_warning", &self.on_warning.is_some())
            .finish()
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn with_meta_key(mut self, key: impl Into<String>) -> Self {
        self.meta_key = Some(key.into());
        self
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn with_allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_on_warning(mut self, handler: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Arc::new(handler));
        self
    }
}

/// Mapping key order when dumping.
#[derive(Clone, Default)]
pub enum SortKeys {
    /// Insertion order.
    #[default]
    None,
    Lexicographic,
    By(Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>),
}

impl fmt::Debug for SortKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKeys::None => f.write_str("None"),
            SortKeys::Lexicographic => f.write_str("Lexicographic"),
            SortKeys::By(_) => f.write_str("By(..)"),
        }
    }
}

/// Options for the dumper.
#[derive(Clone, Debug)]
pub struct DumpOptions {
    pub schema: Arc<Schema>,
    /// Spaces per nesting level; at least 1.
    pub indent: usize,
    /// Nesting level from which collections are written in flow style;
    /// -1 keeps block style everywhere.
    pub flow_level: i32,
    /// Leave out values no type can represent instead of failing.
    pub skip_invalid: bool,
    pub sort_keys: SortKeys,
    /// Duplicate repeated nodes instead of writing anchors and aliases.
    pub no_refs: bool,
    /// Do not quote YAML 1.1 booleans and base-60 numbers.
    pub no_compat_mode: bool,
    /// Drop optional spaces in flow collections.
    pub condense_flow: bool,
    /// Preferred maximum line width; -1 disables folding.
    pub line_width: i32,
    styles: HashMap<String, String>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            schema: Arc::new(Schema::default_safe()),
            indent: 2,
            flow_level: -1,
            skip_invalid: false,
            sort_keys: SortKeys::None,
            no_refs: false,
            no_compat_mode: false,
            condense_flow: false,
            line_width: 80,
            styles: HashMap::new(),
        }
    }
}

/// Expand `!!int`, `int` or a full URI to the full tag.
fn normalize_tag(tag: &str) -> String {
    if let Some(short) = tag.strip_prefix("!!") {
        format!("{}{}", crate::scanner::YAML_TAG_PREFIX, short)
    } else if tag.starts_with('!') || tag.contains(':') {
        tag.to_string()
    } else {
        format!("{}{}", crate::scanner::YAML_TAG_PREFIX, tag)
    }
}

fn normalize_style(style: &str) -> String {
    match style {
        "~" => "canonical",
        "lower" => "lowercase",
        "upper" => "uppercase",
        "camel" => "camelcase",
        other => other,
    }
    .to_string()
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    pub fn with_flow_level(mut self, level: i32) -> Self {
        self.flow_level = level;
        self
    }

    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    pub fn with_sort_keys(mut self, sort: SortKeys) -> Self {
        self.sort_keys = sort;
        self
    }

    pub fn with_sort_by(self, compare: impl Fn(&str, &str) -> Ordering + Send + Sync + 'static) -> Self {
        self.with_sort_keys(SortKeys::By(Arc::new(compare)))
    }

    pub fn with_no_refs(mut self, no_refs: bool) -> Self {
        self.no_refs = no_refs;
        self
    }

    pub fn with_no_compat_mode(mut self, no_compat_mode: bool) -> Self {
        self.no_compat_mode = no_compat_mode;
        self
    }

    pub fn with_condense_flow(mut self, condense: bool) -> Self {
        self.condense_flow = condense;
        self
    }

    pub fn with_line_width(mut self, width: i32) -> Self {
        self.line_width = width;
        self
    }

    /// Set the spelling style for a tag, e.g. `("!!int", "hex")`.
    pub fn with_style(mut self, tag: &str, style: &str) -> Self {
        self.styles.insert(normalize_tag(tag), normalize_style(style));
        self
    }

    /// Style configured for a full tag.
    pub fn style(&self, tag: &str) -> Option<&str> {
        self.styles.get(tag).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_keys_are_normalized() {
        let options = DumpOptions::new()
            .with_style("!!int", "hex")
            .with_style("null", "~")
            .with_style("tag:yaml.org,2002:bool", "upper");
        assert_eq!(options.style("tag:yaml.org,2002:int"), Some("hex"));
        assert_eq!(options.style("tag:yaml.org,2002:null"), Some("canonical"));
        assert_eq!(options.style("tag:yaml.org,2002:bool"), Some("uppercase"));
        assert_eq!(options.style("tag:yaml.org,2002:float"), None);
    }

    #[test]
    fn test_indent_is_at_least_one() {
        assert_eq!(DumpOptions::new().with_indent(0).indent, 1);
    }

    #[test]
    fn test_load_defaults() {
        let options = LoadOptions::default();
        assert!(options.allow_empty);
        assert_eq!(options.max_depth, 100);
        assert_eq!(options.duplicate_keys, DuplicateKeys::Overwrite);
    }
}
