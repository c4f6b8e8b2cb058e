use std::sync::LazyLock;

use regex::Regex;

use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{unknown_style, FLOAT_TAG};

static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:[-+]?(?:0|[1-9][0-9_]*)(?:\.[0-9_]*)?(?:[eE][-+]?[0-9]+)?",
        r"|\.[0-9_]+(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
        r"|[-+]?\.(?:inf|Inf|INF)",
        r"|\.(?:nan|NaN|NAN))$",
    ))
    .unwrap()
});

/// Exponent directly after the integer digits, as in `1e21`.
static BARE_EXPONENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+e").unwrap());

pub struct FloatType;

fn parse_float(text: &str) -> Result<f64, String> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_lowercase();
    let (sign, body) = match cleaned.as_bytes().first() {
        Some(b'-') => (-1.0, &cleaned[1..]),
        Some(b'+') => (1.0, &cleaned[1..]),
        _ => (1.0, &cleaned[..]),
    };
    let invalid = |_| format!("cannot parse \"{}\" as a float", text);
    let magnitude = if body == ".inf" {
        f64::INFINITY
    } else if body == ".nan" {
        f64::NAN
    } else if body.contains(':') {
        let mut total = 0.0;
        for part in body.split(':') {
            total = total * 60.0 + part.parse::<f64>().map_err(invalid)?;
        }
        total
    } else {
        body.parse::<f64>().map_err(invalid)?
    };
    Ok(sign * magnitude)
}

fn format_float(value: f64, style: &str) -> Result<String, String> {
    let (nan, inf) = match style {
        "lowercase" => (".nan", ".inf"),
        "uppercase" => (".NAN", ".INF"),
        "camelcase" => (".NaN", ".Inf"),
        other => return Err(unknown_style(FLOAT_TAG, other)),
    };
    if value.is_nan() {
        return Ok(nan.to_string());
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return Ok(format!("{}{}", sign, inf));
    }
    let text = format!("{:?}", value);
    Ok(if BARE_EXPONENT.is_match(&text) {
        text.replacen('e', ".e", 1)
    } else {
        text
    })
}

impl Type for FloatType {
    fn tag(&self) -> &str {
        FLOAT_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        data.as_str()
            .is_some_and(|text| FLOAT_PATTERN.is_match(text) && !text.ends_with('_'))
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        let text = data.as_str().unwrap_or_default();
        Ok(Node::Scalar(Value::Float(parse_float(text)?)))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Float(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, style: Option<&str>) -> Result<String, String> {
        match node {
            Node::Scalar(Value::Float(f)) => format_float(*f, style.unwrap_or("lowercase")),
            _ => Err("not a float".to_string()),
        }
    }
}
