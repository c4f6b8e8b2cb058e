//! Property tests: whatever the dumper writes loads back unchanged.

use libyamlkit::{dump_with_options, load, DumpOptions, Mapping, SortKeys, Value};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1.0e9f64..1.0e9).prop_map(Value::from),
        "[ -~]{0,24}".prop_map(Value::from),
        "[a-z]{1,8}( [a-z]{1,8}){0,6}(\n{1,2}[a-z]{1,8}( [a-z]{1,8}){0,6}){0,3}\n?"
            .prop_map(Value::from),
        " {1,3}[a-z]{1,6}(\n {0,3}[a-z]{1,6}){0,3}(\n {0,3}){0,2}\n?".prop_map(Value::from),
        prop::sample::select(vec![
            "true", "null", "~", "12", "0x1F", "yes", "- x", "a: b", "#", "...", "  \n x",
        ])
            .prop_map(Value::from),
    ]
}

fn any_value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Sequence),
            prop::collection::vec(("[a-zA-Z0-9 _:#-]{1,12}", inner), 0..6)
                .prop_map(|pairs| Value::Mapping(pairs.into_iter().collect::<Mapping>())),
        ]
    })
}

fn any_options() -> impl Strategy<Value = DumpOptions> {
    let layout = (1usize..80, -1i32..10, prop_oneof![Just(-1i32), 20i32..120]);
    let styles = (
        prop::sample::select(vec!["decimal", "binary", "octal", "hexadecimal"]),
        prop::sample::select(vec!["canonical", "lowercase", "uppercase", "camelcase"]),
        prop::sample::select(vec!["lowercase", "uppercase", "camelcase"]),
    );
    (layout, prop::array::uniform5(any::<bool>()), styles).prop_map(
        |((indent, flow_level, width), flags, (int, null, boolean))| {
            let [skip_invalid, sort_keys, no_refs, no_compat_mode, condense_flow] = flags;
            DumpOptions::new()
                .with_indent(indent)
                .with_flow_level(if condense_flow { -1 } else { flow_level })
                .with_line_width(width)
                .with_skip_invalid(skip_invalid)
                .with_sort_keys(if sort_keys { SortKeys::Lexicographic } else { SortKeys::None })
                .with_no_refs(no_refs)
                .with_no_compat_mode(no_compat_mode)
                .with_condense_flow(condense_flow)
                .with_style("!!int", int)
                .with_style("!!null", null)
                .with_style("!!bool", boolean)
        },
    )
}

proptest! {
    #[test]
    fn test_dump_then_load(value in any_value(), options in any_options()) {
        let text = dump_with_options(&value, &options).unwrap();
        let loaded = load(&text).unwrap();
        prop_assert_eq!(loaded, value, "dumped:\n{}", text);
    }
}
