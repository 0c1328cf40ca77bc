//! In-flight representation of one request's intent.
//!
//! Each pipeline stage consumes a [`QueryContext`] and returns a new one; nothing is shared
//! across requests and nothing is mutated behind a reference.

use crate::config::ResolvedEntity;
use crate::schema::EntityDescriptor;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;

/// Typed literal taken from the query string.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    pub value: FilterValue,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: FilterValue) -> Self {
        Bound { value, inclusive: true }
    }

    pub fn exclusive(value: FilterValue) -> Self {
        Bound { value, inclusive: false }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Equals { column: String, value: FilterValue },
    /// Substring match; `needle` is the raw user text, wildcards are escaped when rendered.
    Contains { column: String, needle: String },
    Range {
        column: String,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    SetIn { column: String, values: Vec<FilterValue> },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. }
            | Predicate::Contains { column, .. }
            | Predicate::Range { column, .. }
            | Predicate::SetIn { column, .. } => column,
        }
    }
}

/// `column NOT IN (values)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Exclusion {
    pub column: String,
    pub values: Vec<FilterValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortTarget {
    Column(String),
    /// Cardinality of a to-many relation, exposed as `<relation>_count`.
    RelationCount(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub target: SortTarget,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ShapeDirective {
    Count,
    First,
    Distinct(String),
    Paginate { page: u64, per_page: u64 },
    Take(u64),
    #[default]
    All,
}

#[derive(Clone, Debug)]
pub struct QueryContext {
    pub entity: Arc<ResolvedEntity>,
    pub descriptor: Arc<EntityDescriptor>,
    /// Predicates contributed by named scopes; rendered ahead of `filters`.
    pub scopes: Vec<Predicate>,
    pub filters: Vec<Predicate>,
    pub exclusions: Vec<Exclusion>,
    pub sort: Vec<SortKey>,
    pub shape: ShapeDirective,
    pub relations: Vec<String>,
}

impl QueryContext {
    pub fn new(entity: Arc<ResolvedEntity>, descriptor: Arc<EntityDescriptor>) -> Self {
        QueryContext {
            entity,
            descriptor,
            scopes: Vec::new(),
            filters: Vec::new(),
            exclusions: Vec::new(),
            sort: Vec::new(),
            shape: ShapeDirective::All,
            relations: Vec::new(),
        }
    }

    pub fn with_scopes(self, scopes: Vec<Predicate>) -> Self {
        QueryContext { scopes, ..self }
    }

    pub fn with_filters(self, filters: Vec<Predicate>, exclusions: Vec<Exclusion>) -> Self {
        QueryContext {
            filters,
            exclusions,
            ..self
        }
    }

    pub fn with_sort(self, sort: Vec<SortKey>) -> Self {
        QueryContext { sort, ..self }
    }

    pub fn with_shape(self, shape: ShapeDirective) -> Self {
        QueryContext { shape, ..self }
    }

    pub fn with_relations(self, relations: Vec<String>) -> Self {
        QueryContext { relations, ..self }
    }

    pub fn primary_key(&self) -> &str {
        &self.entity.primary_key
    }
}
