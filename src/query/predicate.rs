//! Turns raw query parameters into filter predicates and exclusions.
//!
//! Every column name taken from the request is checked against the entity descriptor before it is
//! used; denylisted columns are removed first so they can never be matched.

use crate::error::DirectiveError;
use crate::query::context::{Exclusion, FilterValue, Predicate};
use crate::query::decoder::{
    decode_date, decode_datetime, decode_numeric, parse_date, parse_datetime, parse_float, parse_integer,
};
use crate::query::ignored;
use crate::query::params::{parse_bool, QueryParams, NOT};
use crate::schema::{ColumnDescriptor, EntityDescriptor, SemanticType};

/// Columns that are never eligible as user-supplied filter keys.
pub const DENYLIST: &[&str] = &["id", "password", "remember_token", "deleted_at"];

pub fn is_denied(column: &str) -> bool {
    DENYLIST.contains(&column)
}

/// Filters and exclusions for one request.
pub fn build(descriptor: &EntityDescriptor, primary_key: &str, params: &QueryParams) -> (Vec<Predicate>, Vec<Exclusion>) {
    (build_filters(descriptor, params), build_exclusions(descriptor, primary_key, params))
}

/// Filter predicates for every non-denylisted column named in `params`, in column order.
pub fn build_filters(descriptor: &EntityDescriptor, params: &QueryParams) -> Vec<Predicate> {
    let strict = params.strict();
    descriptor
        .columns()
        .iter()
        .filter(|c| !is_denied(&c.name))
        .filter_map(|c| params.get(&c.name).map(|v| (c, v)))
        .flat_map(|(c, v)| column_predicates(c, v, strict))
        .collect()
}

fn column_predicates(column: &ColumnDescriptor, value: &str, strict: bool) -> Vec<Predicate> {
    let name = column.name.as_str();
    match column.semantic_type {
        SemanticType::Boolean => vec![Predicate::Equals {
            column: name.to_string(),
            value: FilterValue::Bool(parse_bool(value)),
        }],
        SemanticType::Integer | SemanticType::Float => {
            let integer = column.semantic_type == SemanticType::Integer;
            let tokens: Vec<&str> = value.split(',').collect();
            if tokens.len() > 1 {
                numeric_set(name, &tokens, integer).into_iter().collect()
            } else {
                decode_numeric(name, value, integer)
            }
        }
        SemanticType::Date => decode_date(name, value),
        SemanticType::DateTime => decode_datetime(name, value),
        SemanticType::String | SemanticType::Text => {
            if strict {
                vec![Predicate::Equals {
                    column: name.to_string(),
                    value: FilterValue::Text(value.to_string()),
                }]
            } else {
                vec![Predicate::Contains {
                    column: name.to_string(),
                    needle: value.to_string(),
                }]
            }
        }
        SemanticType::Other => Vec::new(),
    }
}

/// `SetIn` over the numeric tokens of a comma list; `None` when no token is numeric.
fn numeric_set(column: &str, tokens: &[&str], integer: bool) -> Option<Predicate> {
    let parse = if integer { parse_integer } else { parse_float };
    let values: Vec<FilterValue> = tokens.iter().copied().filter_map(parse).collect();
    if values.is_empty() {
        return None;
    }
    Some(Predicate::SetIn {
        column: column.to_string(),
        values,
    })
}

/// Parse the `not` directive: `id,id|column:v,v|...`.
/// Bare lists target the primary key; `column:` lists need a real, non-denylisted column.
pub fn build_exclusions(descriptor: &EntityDescriptor, primary_key: &str, params: &QueryParams) -> Vec<Exclusion> {
    let Some(raw) = params.get(NOT) else {
        return Vec::new();
    };
    raw.split('|')
        .filter_map(|token| match exclusion(descriptor, primary_key, token) {
            Ok(ex) => ex,
            Err(e) => {
                ignored(&e);
                None
            }
        })
        .collect()
}

fn exclusion(
    descriptor: &EntityDescriptor,
    primary_key: &str,
    token: &str,
) -> Result<Option<Exclusion>, DirectiveError> {
    let parts: Vec<&str> = token.split(':').collect();
    let (column, list) = match parts.as_slice() {
        [ids] => {
            let pk = descriptor
                .column(primary_key)
                .ok_or_else(|| DirectiveError::UnknownColumn(primary_key.to_string()))?;
            (pk, *ids)
        }
        [name, list] => {
            let name = name.trim();
            let col = descriptor
                .column(name)
                .filter(|c| !is_denied(&c.name))
                .ok_or_else(|| DirectiveError::UnknownColumn(name.to_string()))?;
            (col, *list)
        }
        _ => return Err(DirectiveError::Unsupported(format!("not={}", token))),
    };
    let values: Vec<FilterValue> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| typed_value(column, s))
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(Exclusion {
        column: column.name.clone(),
        values,
    }))
}

/// Parse a single token as a value of the column's type. Text-like and unrecognized types keep the raw string;
/// uuid columns only accept well-formed uuids.
pub fn typed_value(column: &ColumnDescriptor, raw: &str) -> Option<FilterValue> {
    match column.semantic_type {
        SemanticType::Boolean => Some(FilterValue::Bool(parse_bool(raw))),
        SemanticType::Integer => parse_integer(raw),
        SemanticType::Float => parse_float(raw),
        SemanticType::Date => parse_date(raw).map(FilterValue::Date),
        SemanticType::DateTime => parse_datetime(raw),
        SemanticType::Other if column.pg_type == "uuid" => uuid::Uuid::parse_str(raw.trim())
            .ok()
            .map(|u| FilterValue::Text(u.to_string())),
        SemanticType::String | SemanticType::Text | SemanticType::Other => Some(FilterValue::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::context::Bound;

    fn users() -> EntityDescriptor {
        EntityDescriptor::new(
            "public",
            "users",
            vec![
                ColumnDescriptor::new("id", SemanticType::Integer, "int8"),
                ColumnDescriptor::new("name", SemanticType::String, "varchar"),
                ColumnDescriptor::new("bio", SemanticType::Text, "text"),
                ColumnDescriptor::new("age", SemanticType::Integer, "int4"),
                ColumnDescriptor::new("score", SemanticType::Float, "float8"),
                ColumnDescriptor::new("active", SemanticType::Boolean, "bool"),
                ColumnDescriptor::new("password", SemanticType::String, "varchar"),
                ColumnDescriptor::new("deleted_at", SemanticType::DateTime, "timestamptz"),
                ColumnDescriptor::new("token", SemanticType::Other, "uuid"),
                ColumnDescriptor::new("status", SemanticType::String, "varchar"),
            ],
        )
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn denylisted_and_unknown_columns_never_filter() {
        let filters = build_filters(
            &users(),
            &params(&[
                ("id", "1"),
                ("password", "hunter2"),
                ("deleted_at", "2024-01-01"),
                ("name; DROP TABLE users", "x"),
                ("nope", "1"),
            ]),
        );
        assert!(filters.is_empty());
    }

    #[test]
    fn every_predicate_references_an_eligible_column() {
        let d = users();
        let filters = build_filters(
            &d,
            &params(&[("name", "a"), ("age", "1..5"), ("active", "yes"), ("id", "3"), ("score", "2,3")]),
        );
        assert_eq!(filters.len(), 4);
        for p in &filters {
            assert!(d.has_column(p.column()));
            assert!(!is_denied(p.column()));
        }
    }

    #[test]
    fn strings_use_substring_unless_strict() {
        let loose = build_filters(&users(), &params(&[("name", "Bob")]));
        assert_eq!(
            loose,
            vec![Predicate::Contains {
                column: "name".into(),
                needle: "Bob".into()
            }]
        );
        let strict = build_filters(&users(), &params(&[("name", "Bob"), ("strict", "true")]));
        assert_eq!(
            strict,
            vec![Predicate::Equals {
                column: "name".into(),
                value: FilterValue::Text("Bob".into())
            }]
        );
    }

    #[test]
    fn booleans_are_lenient() {
        let f = build_filters(&users(), &params(&[("active", "YES")]));
        assert_eq!(
            f,
            vec![Predicate::Equals {
                column: "active".into(),
                value: FilterValue::Bool(true)
            }]
        );
        let f = build_filters(&users(), &params(&[("active", "nah")]));
        assert_eq!(
            f,
            vec![Predicate::Equals {
                column: "active".into(),
                value: FilterValue::Bool(false)
            }]
        );
    }

    #[test]
    fn numeric_list_is_a_set_and_not_also_a_range() {
        let f = build_filters(&users(), &params(&[("age", "18,x,21")]));
        assert_eq!(
            f,
            vec![Predicate::SetIn {
                column: "age".into(),
                values: vec![FilterValue::Int(18), FilterValue::Int(21)]
            }]
        );
        assert!(build_filters(&users(), &params(&[("age", "x,y")])).is_empty());
    }

    #[test]
    fn numeric_single_value_goes_through_decoder() {
        let f = build_filters(&users(), &params(&[("age", "18..30")]));
        assert_eq!(
            f,
            vec![Predicate::Range {
                column: "age".into(),
                lower: Some(Bound::inclusive(FilterValue::Int(18))),
                upper: Some(Bound::inclusive(FilterValue::Int(30))),
            }]
        );
    }

    #[test]
    fn unrecognized_types_emit_nothing() {
        assert!(build_filters(&users(), &params(&[("token", "abc")])).is_empty());
    }

    #[test]
    fn bare_not_list_targets_primary_key() {
        let ex = build_exclusions(&users(), "id", &params(&[("not", "1,2,3")]));
        assert_eq!(
            ex,
            vec![Exclusion {
                column: "id".into(),
                values: vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Int(3)]
            }]
        );
    }

    #[test]
    fn column_not_pairs_need_real_columns() {
        let ex = build_exclusions(
            &users(),
            "id",
            &params(&[("not", "status:archived,draft|ghost:1|password:x|a:b:c|4")]),
        );
        assert_eq!(
            ex,
            vec![
                Exclusion {
                    column: "status".into(),
                    values: vec![FilterValue::Text("archived".into()), FilterValue::Text("draft".into())]
                },
                Exclusion {
                    column: "id".into(),
                    values: vec![FilterValue::Int(4)]
                },
            ]
        );
    }

    #[test]
    fn malformed_exclusion_values_are_dropped() {
        let ex = build_exclusions(&users(), "id", &params(&[("not", "a,b|age:x")]));
        assert!(ex.is_empty());
    }

    #[test]
    fn uuid_values_must_be_well_formed() {
        let d = users();
        let token = d.column("token").unwrap();
        assert_eq!(typed_value(token, "nope"), None);
        assert_eq!(
            typed_value(token, " 67E55044-10B1-426F-9247-BB680E5FE0C8 "),
            Some(FilterValue::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into()))
        );
    }
}
