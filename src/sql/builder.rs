//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a descriptor or a query context.
//!
//! Identifiers only ever come from the schema catalog or the entity registry; every value is a parameter.

use crate::config::RelationSpec;
use crate::query::{Bound, Exclusion, FilterValue, Predicate, QueryContext, ShapeDirective, SortDirection, SortTarget};
use crate::query::sort::COUNT_SUFFIX;
use crate::schema::{ColumnDescriptor, EntityDescriptor, SemanticType};
use crate::sql::params::PgBindValue;
use serde_json::{Map, Value};

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    /// Bind a filter literal against `column`. Text bound to a non-text column is cast to the column type.
    fn placeholder(&mut self, column: &ColumnDescriptor, value: &FilterValue) -> String {
        let n = self.push_param(value.into());
        match (value, column.semantic_type) {
            (FilterValue::Text(_), SemanticType::String | SemanticType::Text) => format!("${}", n),
            (FilterValue::Text(_), _) => format!("${}::{}", n, column.pg_type),
            _ => format!("${}", n),
        }
    }

    /// Bind a JSON body value, always cast to the column type.
    fn json_placeholder(&mut self, column: &ColumnDescriptor, value: &Value) -> String {
        let n = self.push_param(PgBindValue::from_json(value));
        format!("${}::{}", n, column.pg_type)
    }
}

fn column_ref(alias: Option<&str>, name: &str) -> String {
    match alias {
        Some(a) => format!("{}.{}", a, quoted(name)),
        None => quoted(name),
    }
}

/// Output expression for one column: numeric and user-defined types as text, arrays as JSON, so rows decode uniformly.
fn output_expr(alias: Option<&str>, c: &ColumnDescriptor) -> String {
    let r = column_ref(alias, &c.name);
    if c.pg_type.contains('.') || c.pg_type == "numeric" {
        format!("{}::text", r)
    } else if c.pg_type.starts_with('_') {
        format!("to_jsonb({})", r)
    } else {
        r
    }
}

/// SELECT list for all columns, each aliased to its own name.
fn select_column_list(descriptor: &EntityDescriptor, alias: Option<&str>) -> String {
    descriptor
        .columns()
        .iter()
        .map(|c| format!("{} AS {}", output_expr(alias, c), quoted(&c.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn render_predicate(q: &mut QueryBuf, descriptor: &EntityDescriptor, p: &Predicate) -> Option<String> {
    let column = descriptor.column(p.column())?;
    let col = column_ref(Some(MAIN_ALIAS), &column.name);
    match p {
        Predicate::Equals { value, .. } => Some(format!("{} = {}", col, q.placeholder(column, value))),
        Predicate::Contains { needle, .. } => {
            let n = q.push_param(PgBindValue::String(format!("%{}%", escape_like(needle))));
            let lhs = match column.semantic_type {
                SemanticType::String | SemanticType::Text => col,
                _ => format!("{}::text", col),
            };
            Some(format!("{} LIKE ${}", lhs, n))
        }
        Predicate::Range { lower, upper, .. } => {
            let mut parts = Vec::new();
            if let Some(Bound { value, inclusive }) = lower {
                let op = if *inclusive { ">=" } else { ">" };
                parts.push(format!("{} {} {}", col, op, q.placeholder(column, value)));
            }
            if let Some(Bound { value, inclusive }) = upper {
                let op = if *inclusive { "<=" } else { "<" };
                parts.push(format!("{} {} {}", col, op, q.placeholder(column, value)));
            }
            (!parts.is_empty()).then(|| parts.join(" AND "))
        }
        Predicate::SetIn { values, .. } => {
            if values.is_empty() {
                return None;
            }
            let phs: Vec<String> = values.iter().map(|v| q.placeholder(column, v)).collect();
            Some(format!("{} IN ({})", col, phs.join(", ")))
        }
    }
}

fn render_exclusion(q: &mut QueryBuf, descriptor: &EntityDescriptor, ex: &Exclusion) -> Option<String> {
    let column = descriptor.column(&ex.column)?;
    if ex.values.is_empty() {
        return None;
    }
    let col = column_ref(Some(MAIN_ALIAS), &column.name);
    let phs: Vec<String> = ex.values.iter().map(|v| q.placeholder(column, v)).collect();
    let not_in = format!("{} NOT IN ({})", col, phs.join(", "));
    // NOT IN alone would also drop rows whose value is NULL
    if column.nullable {
        Some(format!("({} IS NULL OR {})", col, not_in))
    } else {
        Some(not_in)
    }
}

/// Scopes, then filters, then exclusions, all AND-ed. Empty when nothing applies.
fn where_clause(q: &mut QueryBuf, ctx: &QueryContext) -> String {
    let d = &ctx.descriptor;
    let mut parts: Vec<String> = Vec::new();
    for p in ctx.scopes.iter().chain(ctx.filters.iter()) {
        if let Some(sql) = render_predicate(q, d, p) {
            parts.push(sql);
        }
    }
    for ex in &ctx.exclusions {
        if let Some(sql) = render_exclusion(q, d, ex) {
            parts.push(sql);
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn relation_count_expr(rel: &RelationSpec) -> String {
    format!(
        "(SELECT COUNT(*) FROM {} sub WHERE sub.{} = {}.{})",
        qualified_table(&rel.schema_name, &rel.table_name),
        quoted(&rel.their_key),
        MAIN_ALIAS,
        quoted(&rel.our_key)
    )
}

pub fn relation_count_alias(relation: &str) -> String {
    format!("{}{}", relation, COUNT_SUFFIX)
}

/// Relation-count annotations requested by the sort keys, as `(relation, expression)`.
fn count_annotations<'a>(ctx: &'a QueryContext) -> Vec<(&'a str, String)> {
    let mut out: Vec<(&str, String)> = Vec::new();
    for key in &ctx.sort {
        if let SortTarget::RelationCount(name) = &key.target {
            if out.iter().any(|(n, _)| *n == name.as_str()) {
                continue;
            }
            if let Some(rel) = ctx.entity.relation(name) {
                out.push((name.as_str(), relation_count_expr(rel)));
            }
        }
    }
    out
}

/// ORDER BY: the requested keys in order, then the primary key as a stable tiebreak.
fn order_clause(ctx: &QueryContext) -> String {
    let mut parts: Vec<String> = Vec::new();
    let pk = ctx.primary_key();
    let mut pk_sorted = false;
    for key in &ctx.sort {
        match &key.target {
            SortTarget::Column(name) if ctx.descriptor.has_column(name) => {
                pk_sorted |= name == pk;
                parts.push(format!("{} {}", column_ref(Some(MAIN_ALIAS), name), key.direction.as_sql()));
            }
            SortTarget::RelationCount(name) if ctx.entity.relation(name).is_some() => {
                parts.push(format!("{} {}", quoted(&relation_count_alias(name)), key.direction.as_sql()));
            }
            _ => {}
        }
    }
    if !pk_sorted && ctx.descriptor.has_column(pk) {
        parts.push(format!("{} ASC", column_ref(Some(MAIN_ALIAS), pk)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", parts.join(", "))
    }
}

/// Row query for `First`, `Paginate`, `Take` and `All`.
pub fn select_rows(ctx: &QueryContext) -> QueryBuf {
    let mut q = QueryBuf::new();
    let d = &ctx.descriptor;
    let table = qualified_table(&d.schema_name, &d.table_name);
    let mut select = select_column_list(d, Some(MAIN_ALIAS));
    for (name, expr) in count_annotations(ctx) {
        select.push_str(&format!(", {} AS {}", expr, quoted(&relation_count_alias(name))));
    }
    let where_sql = where_clause(&mut q, ctx);
    let order_sql = order_clause(ctx);
    let tail = match &ctx.shape {
        ShapeDirective::First => " LIMIT 1".to_string(),
        ShapeDirective::Take(n) => format!(" LIMIT {}", n),
        ShapeDirective::Paginate { page, per_page } => format!(
            " LIMIT {} OFFSET {}",
            per_page,
            page.saturating_sub(1).saturating_mul(*per_page).min(i64::MAX as u64)
        ),
        ShapeDirective::All | ShapeDirective::Count | ShapeDirective::Distinct(_) => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}",
        select, table, MAIN_ALIAS, where_sql, order_sql, tail
    );
    q
}

/// `SELECT COUNT(*)` over the same WHERE group; sort and shape do not apply.
pub fn select_count(ctx: &QueryContext) -> QueryBuf {
    let mut q = QueryBuf::new();
    let d = &ctx.descriptor;
    let table = qualified_table(&d.schema_name, &d.table_name);
    let where_sql = where_clause(&mut q, ctx);
    q.sql = format!("SELECT COUNT(*) FROM {} {}{}", table, MAIN_ALIAS, where_sql);
    q
}

/// Distinct values of one column, ordered by that column (direction from a matching sort key, else ascending).
pub fn select_distinct(ctx: &QueryContext, column: &str) -> Option<QueryBuf> {
    let c = ctx.descriptor.column(column)?;
    let mut q = QueryBuf::new();
    let d = &ctx.descriptor;
    let table = qualified_table(&d.schema_name, &d.table_name);
    let where_sql = where_clause(&mut q, ctx);
    let direction = ctx
        .sort
        .iter()
        .find(|k| k.target == SortTarget::Column(column.to_string()))
        .map(|k| k.direction)
        .unwrap_or(SortDirection::Asc);
    q.sql = format!(
        "SELECT {} AS {} FROM (SELECT DISTINCT {} FROM {} {}{}) distinct_rows ORDER BY {} {}",
        output_expr(Some("distinct_rows"), c),
        quoted(&c.name),
        column_ref(Some(MAIN_ALIAS), &c.name),
        table,
        MAIN_ALIAS,
        where_sql,
        column_ref(Some("distinct_rows"), &c.name),
        direction.as_sql()
    );
    Some(q)
}

/// SELECT by primary key.
pub fn select_by_id(descriptor: &EntityDescriptor, pk: &ColumnDescriptor, id: &FilterValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&descriptor.schema_name, &descriptor.table_name);
    let ph = q.placeholder(pk, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(descriptor, None),
        table,
        quoted(&pk.name),
        ph
    );
    q
}

/// SELECT * FROM entity WHERE column IN (...). Used for batch-fetching related rows.
pub fn select_by_column_in(descriptor: &EntityDescriptor, column: &ColumnDescriptor, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&descriptor.schema_name, &descriptor.table_name);
    let cols = select_column_list(descriptor, None);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let placeholders: Vec<String> = values.iter().map(|v| q.json_placeholder(column, v)).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(&column.name),
        placeholders.join(", "),
        quoted(&column.name)
    );
    q
}

/// INSERT of every body key that is a column of the table. Keys the table does not have are dropped.
pub fn insert(descriptor: &EntityDescriptor, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&descriptor.schema_name, &descriptor.table_name);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in descriptor.columns() {
        if let Some(v) = body.get(&c.name) {
            placeholders.push(q.json_placeholder(c, v));
            cols.push(quoted(&c.name));
        }
    }
    let returning = select_column_list(descriptor, None);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by primary key: SET the body keys that are columns (never the key itself).
/// Touches `updated_at` when the table has one and the body does not set it.
pub fn update(descriptor: &EntityDescriptor, pk: &ColumnDescriptor, id: &FilterValue, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&descriptor.schema_name, &descriptor.table_name);
    let mut sets = Vec::new();
    for c in descriptor.columns() {
        if c.name == pk.name {
            continue;
        }
        if let Some(v) = body.get(&c.name) {
            let ph = q.json_placeholder(c, v);
            sets.push(format!("{} = {}", quoted(&c.name), ph));
        }
    }
    if sets.is_empty() {
        return select_by_id(descriptor, pk, id);
    }
    if descriptor.has_column("updated_at") && !body.contains_key("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_ph = q.placeholder(pk, id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table,
        sets.join(", "),
        quoted(&pk.name),
        id_ph,
        select_column_list(descriptor, None)
    );
    q
}

/// DELETE by primary key.
pub fn delete(descriptor: &EntityDescriptor, pk: &ColumnDescriptor, id: &FilterValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&descriptor.schema_name, &descriptor.table_name);
    let ph = q.placeholder(pk, id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        table,
        quoted(&pk.name),
        ph,
        select_column_list(descriptor, None)
    );
    q
}
