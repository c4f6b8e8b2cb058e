use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone};
use regex::Regex;

use crate::graph::{Document, Node};
use crate::schema::{Data, Kind, Type};
use crate::value::Value;

use super::TIMESTAMP_TAG;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").unwrap());

static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})-([0-9][0-9]?)-([0-9][0-9]?)",
        r"(?:[Tt]|[ \t]+)([0-9][0-9]?):([0-9]{2}):([0-9]{2})",
        r"(?:\.([0-9]*))?",
        r"(?:[ \t]*(Z|([-+])([0-9][0-9]?)(?::([0-9]{2}))?))?$",
    ))
    .unwrap()
});

pub struct TimestampType;

fn field(caps: &regex::Captures<'_>, i: usize) -> u32 {
    caps.get(i)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>, String> {
    let invalid = || format!("invalid timestamp \"{}\"", text);
    let utc = FixedOffset::east_opt(0).ok_or_else(invalid)?;

    if let Some(caps) = DATE_PATTERN.captures(text) {
        let date = NaiveDate::from_ymd_opt(field(&caps, 1) as i32, field(&caps, 2), field(&caps, 3))
            .ok_or_else(invalid)?;
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return utc.from_local_datetime(&naive).single().ok_or_else(invalid);
    }

    let caps = TIMESTAMP_PATTERN.captures(text).ok_or_else(invalid)?;
    let date = NaiveDate::from_ymd_opt(field(&caps, 1) as i32, field(&caps, 2), field(&caps, 3))
        .ok_or_else(invalid)?;
    let nanos = match caps.get(7) {
        Some(m) => {
            let mut digits: String = m.as_str().chars().take(9).collect();
            while digits.len() < 9 {
                digits.push('0');
            }
            digits.parse().map_err(|_| invalid())?
        }
        None => 0,
    };
    let naive = date
        .and_hms_nano_opt(field(&caps, 4), field(&caps, 5), field(&caps, 6), nanos)
        .ok_or_else(invalid)?;
    let offset = if caps.get(9).is_some() {
        let seconds = (field(&caps, 10) * 60 + field(&caps, 11)) as i32 * 60;
        let seconds = if &caps[9] == "-" { -seconds } else { seconds };
        FixedOffset::east_opt(seconds).ok_or_else(invalid)?
    } else {
        utc
    };
    offset.from_local_datetime(&naive).single().ok_or_else(invalid)
}

impl Type for TimestampType {
    fn tag(&self) -> &str {
        TIMESTAMP_TAG
    }

    fn kind(&self) -> Kind {
        Kind::Scalar
    }

    fn implicit(&self) -> bool {
        true
    }

    fn resolve(&self, data: &Data<'_>, _doc: &Document) -> bool {
        data.as_str()
            .is_some_and(|text| DATE_PATTERN.is_match(text) || TIMESTAMP_PATTERN.is_match(text))
    }

    fn construct(&self, data: &Data<'_>, _doc: &mut Document) -> Result<Node, String> {
        let text = data.as_str().unwrap_or_default();
        Ok(Node::Scalar(Value::Timestamp(parse_timestamp(text)?)))
    }

    fn predicate(&self, node: &Node, _doc: &Document) -> bool {
        matches!(node, Node::Scalar(Value::Timestamp(_)))
    }

    fn represent(&self, node: &Node, _doc: &Document, _style: Option<&str>) -> Result<String, String> {
        match node {
            Node::Scalar(Value::Timestamp(t)) => Ok(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            _ => Err("not a timestamp".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only_is_utc_midnight() {
        let t = parse_timestamp("2002-12-14").unwrap();
        assert_eq!(t.to_rfc3339(), "2002-12-14T00:00:00+00:00");
    }

    #[test]
    fn test_offsets_and_fractions() {
        let t = parse_timestamp("2001-12-14t21:59:43.10-05:00").unwrap();
        assert_eq!(t.to_rfc3339_opts(SecondsFormat::AutoSi, true), "2001-12-14T21:59:43.100-05:00");
        let t = parse_timestamp("2001-12-14 21:59:43.10 -5").unwrap();
        assert_eq!(t.offset().local_minus_utc(), -5 * 3600);
        let t = parse_timestamp("2001-12-15 2:59:43.10").unwrap();
        assert_eq!(t.to_rfc3339_opts(SecondsFormat::AutoSi, true), "2001-12-15T02:59:43.100Z");
    }

    #[test]
    fn test_invalid_calendar_date() {
        assert!(parse_timestamp("2001-02-30").is_err());
        assert!(parse_timestamp("2001-12-14 25:00:00").is_err());
    }

    #[test]
    fn test_represented_text_resolves_again() {
        let doc = Document::new();
        let node = Node::Scalar(Value::Timestamp(parse_timestamp("2001-12-14 21:59:43.10 +02:30").unwrap()));
        let text = TimestampType.represent(&node, &doc, None).unwrap();
        assert!(TimestampType.resolve(&Data::Scalar(&text), &doc));
    }
}
