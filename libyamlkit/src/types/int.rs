use std::sync::LazyLock;

use num_bigint::{BigInt, Sign};
use num_traits::{Num, Zero};
use regex::Regex;

use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::{unknown_style, INT_TAG};

static INT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(?:0b[01_]+|0x[0-9a-fA-F_]+|0[0-7_]+|[1-9][0-9_]*(?::[0-5]?[0-9])*|0)$")
        .unwrap()
});

pub struct IntType;

/// Split off a leading sign; `true` means negative.
fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

fn is_integer(text: &str) -> bool {
    if !INT_PATTERN.is_match(text) || text.ends_with('_') {
        return false;
    }
    let (_, body) = split_sign(text);
    let digits = if body.starts_with("0b") || body.starts_with("0x") {
        &body[2..]
    } else if body.len() > 1 && body.starts_with('0') {
        &body[1..]
    } else {
        body
    };
    digits.bytes().any(|b| b.is_ascii_hexdigit())
}

fn parse_integer(text: &str) -> Result<BigInt, String> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, body) = split_sign(&cleaned);
    let invalid = |_| format!("cannot parse \"{}\" as an integer", text);
    let magnitude = if body == "0" {
        BigInt::zero()
    } else if let Some(bin) = body.strip_prefix("0b") {
        BigInt::from_str_radix(bin, 2).map_err(invalid)?
    } else if let Some(hex) = body.strip_prefix("0x") {
        BigInt::from_str_radix(hex, 16).map_err(invalid)?
    } else if let Some(oct) = body.strip_prefix('0') {
        BigInt::from_str_radix(oct, 8).map_err(invalid)?
    } else if body.contains(':') {
        let mut total = BigInt::zero();
        for part in body.split(':') {
            total = total * 60 + BigInt::from_str_radix(part, 10).map_err(invalid)?;
        }
        total
    } else {
        BigInt::from_str_radix(body, 10).map_err(invalid)?
    };
    Ok(if negative { -magnitude } else { magnitude })
}

fn with_prefix(n: &BigInt, prefix: &str, radix: u32) -> String {
    let digits = n.magnitude().to_str_radix(radix);
    let digits = if radix == 16 { digits.to_uppercase() } else { digits };
    if n.sign() == Sign::Minus {
        format!("-{}{}", prefix, digits)
    } else {
        format!("{}{}", prefix, digits)
    }
}

impl Type for IntType {
    fn tag(&self) -> &str {
        INT_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        data.as_str().is_some_and(is_integer)
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        let text = data.as_str().unwrap_or_default();
        Ok(Node::Scalar(Value::Integer(parse_integer(text)?)))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Integer(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, style: Option<&str>) -> Result<String, String> {
        let Node::Scalar(Value::Integer(n)) = node else {
            return Err("not an integer".to_string());
        };
        match style.unwrap_or("decimal") {
            "binary" | "bin" | "2" => Ok(with_prefix(n, "0b", 2)),
            "octal" | "oct" | "8" => Ok(with_prefix(n, "0", 8)),
            "decimal" | "dec" | "10" => Ok(n.to_string()),
            "hexadecimal" | "hex" | "16" => Ok(with_prefix(n, "0x", 16)),
            other => Err(unknown_style(INT_TAG, other)),
        }
    }
}
