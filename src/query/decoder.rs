//! Decodes range and comparison literals found in a single parameter value.
//!
//! Grammar (whitespace around tokens is ignored):
//!
//! - `v` exact value
//! - `a..b`, `..b`, `a..` inclusive range; an unparseable side is treated as unbounded
//! - `>v`, `>=v`, `<v`, `<=v` one-sided comparison
//!
//! Malformed input never errors; it just yields no predicate.

use crate::query::context::{Bound, FilterValue, Predicate};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<op>>=|<=|>|<)?\s*(?P<lhs>.*?)(?:\.\.(?P<rhs>.*?))?\s*$")
        .expect("literal pattern compiles")
});

const DATE_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, PartialEq, Eq)]
enum Literal<'a> {
    Single(&'a str),
    Range(Option<&'a str>, Option<&'a str>),
    Compare(Comparison, &'a str),
}

fn split_literal(raw: &str) -> Option<Literal<'_>> {
    let caps = LITERAL.captures(raw)?;
    let lhs = caps.name("lhs").map(|m| m.as_str().trim()).unwrap_or("");
    let rhs = caps.name("rhs").map(|m| m.as_str().trim());
    match (caps.name("op").map(|m| m.as_str()), rhs) {
        // `>a..b` mixes both forms
        (Some(_), Some(_)) => None,
        (Some(_), None) if lhs.is_empty() => None,
        (Some(op), None) => {
            let cmp = match op {
                ">" => Comparison::Gt,
                ">=" => Comparison::Gte,
                "<" => Comparison::Lt,
                _ => Comparison::Lte,
            };
            Some(Literal::Compare(cmp, lhs))
        }
        (None, Some(rhs)) => Some(Literal::Range(
            Some(lhs).filter(|s| !s.is_empty()),
            Some(rhs).filter(|s| !s.is_empty()),
        )),
        (None, None) if lhs.is_empty() => None,
        (None, None) => Some(Literal::Single(lhs)),
    }
}

fn range(column: &str, lower: Option<Bound>, upper: Option<Bound>) -> Vec<Predicate> {
    if lower.is_none() && upper.is_none() {
        return Vec::new();
    }
    vec![Predicate::Range {
        column: column.to_string(),
        lower,
        upper,
    }]
}

/// Shared shape for numeric and datetime decoding: single value is exact, bounds are taken as-is.
fn decode_exact<F>(column: &str, raw: &str, parse: F) -> Vec<Predicate>
where
    F: Fn(&str) -> Option<FilterValue>,
{
    match split_literal(raw) {
        Some(Literal::Single(t)) => parse(t)
            .map(|value| {
                vec![Predicate::Equals {
                    column: column.to_string(),
                    value,
                }]
            })
            .unwrap_or_default(),
        Some(Literal::Range(lo, hi)) => range(
            column,
            lo.and_then(&parse).map(Bound::inclusive),
            hi.and_then(&parse).map(Bound::inclusive),
        ),
        Some(Literal::Compare(cmp, t)) => match parse(t) {
            Some(v) => match cmp {
                Comparison::Gt => range(column, Some(Bound::exclusive(v)), None),
                Comparison::Gte => range(column, Some(Bound::inclusive(v)), None),
                Comparison::Lt => range(column, None, Some(Bound::exclusive(v))),
                Comparison::Lte => range(column, None, Some(Bound::inclusive(v))),
            },
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

pub fn parse_integer(t: &str) -> Option<FilterValue> {
    t.trim().parse::<i64>().ok().map(FilterValue::Int)
}

pub fn parse_float(t: &str) -> Option<FilterValue> {
    t.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(FilterValue::Float)
}

/// Numeric literal for an integer (`integer = true`) or float column.
pub fn decode_numeric(column: &str, raw: &str, integer: bool) -> Vec<Predicate> {
    if integer {
        decode_exact(column, raw, parse_integer)
    } else {
        decode_exact(column, raw, parse_float)
    }
}

pub fn parse_date(t: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(t.trim(), DATE_FORMAT).ok()
}

fn start_of_day(d: NaiveDate) -> FilterValue {
    FilterValue::Timestamp(d.and_time(NaiveTime::MIN))
}

fn end_of_day(d: NaiveDate) -> Option<FilterValue> {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).map(|t| FilterValue::Timestamp(d.and_time(t)))
}

/// Calendar-date literal. A single date covers the whole day; range ends cover their whole day too.
pub fn decode_date(column: &str, raw: &str) -> Vec<Predicate> {
    match split_literal(raw) {
        Some(Literal::Single(t)) => match parse_date(t) {
            Some(d) => range(
                column,
                Some(Bound::inclusive(start_of_day(d))),
                end_of_day(d).map(Bound::inclusive),
            ),
            None => Vec::new(),
        },
        Some(Literal::Range(lo, hi)) => range(
            column,
            lo.and_then(parse_date).map(|d| Bound::inclusive(start_of_day(d))),
            hi.and_then(parse_date).and_then(end_of_day).map(Bound::inclusive),
        ),
        Some(Literal::Compare(cmp, t)) => match parse_date(t) {
            Some(d) => match cmp {
                Comparison::Gt => range(column, end_of_day(d).map(Bound::exclusive), None),
                Comparison::Gte => range(column, Some(Bound::inclusive(start_of_day(d))), None),
                Comparison::Lt => range(column, None, Some(Bound::exclusive(start_of_day(d)))),
                Comparison::Lte => range(column, None, end_of_day(d).map(Bound::inclusive)),
            },
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

/// RFC 3339 (normalized to UTC), a naive `date time`, or a bare date meaning midnight.
pub fn parse_datetime(t: &str) -> Option<FilterValue> {
    let t = t.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(FilterValue::TimestampTz(dt.with_timezone(&Utc)));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(t, f).ok())
        .or_else(|| parse_date(t).map(|d| d.and_time(NaiveTime::MIN)))
        .map(FilterValue::Timestamp)
}

/// Timestamp literal. A single timestamp is an exact match; there is no day widening.
pub fn decode_datetime(column: &str, raw: &str) -> Vec<Predicate> {
    decode_exact(column, raw, parse_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> FilterValue {
        FilterValue::Timestamp(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap())
    }

    #[test]
    fn splits_literals() {
        assert_eq!(split_literal("18"), Some(Literal::Single("18")));
        assert_eq!(split_literal("18..30"), Some(Literal::Range(Some("18"), Some("30"))));
        assert_eq!(split_literal("..30"), Some(Literal::Range(None, Some("30"))));
        assert_eq!(split_literal("18.."), Some(Literal::Range(Some("18"), None)));
        assert_eq!(split_literal(">= 5"), Some(Literal::Compare(Comparison::Gte, "5")));
        assert_eq!(split_literal("1.5..2.5"), Some(Literal::Range(Some("1.5"), Some("2.5"))));
        assert_eq!(split_literal(">1..2"), None);
        assert_eq!(split_literal("  "), None);
        assert_eq!(split_literal("<"), None);
    }

    #[test]
    fn numeric_single_is_equality() {
        assert_eq!(
            decode_numeric("age", "42", true),
            vec![Predicate::Equals {
                column: "age".into(),
                value: FilterValue::Int(42)
            }]
        );
    }

    #[test]
    fn numeric_two_sided_range_is_inclusive() {
        assert_eq!(
            decode_numeric("age", "18..30", true),
            vec![Predicate::Range {
                column: "age".into(),
                lower: Some(Bound::inclusive(FilterValue::Int(18))),
                upper: Some(Bound::inclusive(FilterValue::Int(30))),
            }]
        );
    }

    #[test]
    fn numeric_open_ended_ranges() {
        assert_eq!(
            decode_numeric("age", "..30", true),
            vec![Predicate::Range {
                column: "age".into(),
                lower: None,
                upper: Some(Bound::inclusive(FilterValue::Int(30))),
            }]
        );
        assert_eq!(
            decode_numeric("age", "18..", true),
            vec![Predicate::Range {
                column: "age".into(),
                lower: Some(Bound::inclusive(FilterValue::Int(18))),
                upper: None,
            }]
        );
    }

    #[test]
    fn numeric_malformed_tokens_degrade() {
        assert!(decode_numeric("age", "abc", true).is_empty());
        assert!(decode_numeric("age", "abc..xyz", true).is_empty());
        assert!(decode_numeric("age", "1.5", true).is_empty());
        assert!(decode_numeric("price", "NaN", false).is_empty());
        // one bad side leaves the other bound in place
        assert_eq!(
            decode_numeric("age", "abc..30", true),
            decode_numeric("age", "..30", true)
        );
    }

    #[test]
    fn numeric_comparisons_are_strict_or_inclusive() {
        assert_eq!(
            decode_numeric("price", ">9.5", false),
            vec![Predicate::Range {
                column: "price".into(),
                lower: Some(Bound::exclusive(FilterValue::Float(9.5))),
                upper: None,
            }]
        );
        assert_eq!(
            decode_numeric("price", "<=10", false),
            vec![Predicate::Range {
                column: "price".into(),
                lower: None,
                upper: Some(Bound::inclusive(FilterValue::Float(10.0))),
            }]
        );
    }

    #[test]
    fn single_date_covers_whole_day() {
        assert_eq!(
            decode_date("born_on", "2024-02-29"),
            vec![Predicate::Range {
                column: "born_on".into(),
                lower: Some(Bound::inclusive(ts("2024-02-29 00:00:00"))),
                upper: Some(Bound::inclusive(ts("2024-02-29 23:59:59.999999"))),
            }]
        );
    }

    #[test]
    fn date_range_spans_end_day() {
        assert_eq!(
            decode_date("born_on", "2024-01-01..2024-01-31"),
            vec![Predicate::Range {
                column: "born_on".into(),
                lower: Some(Bound::inclusive(ts("2024-01-01 00:00:00"))),
                upper: Some(Bound::inclusive(ts("2024-01-31 23:59:59.999999"))),
            }]
        );
        assert_eq!(
            decode_date("born_on", ">2024-01-01"),
            vec![Predicate::Range {
                column: "born_on".into(),
                lower: Some(Bound::exclusive(ts("2024-01-01 23:59:59.999999"))),
                upper: None,
            }]
        );
        assert!(decode_date("born_on", "2024-13-01").is_empty());
        assert!(decode_date("born_on", "yesterday").is_empty());
    }

    #[test]
    fn single_datetime_is_exact() {
        assert_eq!(
            decode_datetime("created_at", "2024-05-01T10:30:00"),
            vec![Predicate::Equals {
                column: "created_at".into(),
                value: ts("2024-05-01 10:30:00"),
            }]
        );
    }

    #[test]
    fn datetime_offsets_normalize_to_utc() {
        let expected = DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            decode_datetime("created_at", "2024-05-01T10:30:00+02:00"),
            vec![Predicate::Equals {
                column: "created_at".into(),
                value: FilterValue::TimestampTz(expected),
            }]
        );
    }

    #[test]
    fn datetime_range_uses_exact_bounds() {
        assert_eq!(
            decode_datetime("created_at", "2024-05-01 10:00..2024-05-01"),
            vec![Predicate::Range {
                column: "created_at".into(),
                lower: Some(Bound::inclusive(ts("2024-05-01 10:00:00"))),
                upper: Some(Bound::inclusive(ts("2024-05-01 00:00:00"))),
            }]
        );
        assert!(decode_datetime("created_at", "soon").is_empty());
    }
}
